//! Value completion: from what resolvers return to what the response contains.
//!
//! Spec: <https://spec.graphql.org/October2021/#sec-Value-Completion>

use apollo_compiler::ast;
use apollo_compiler::schema::ExtendedType;
use futures::StreamExt;
use futures::future::BoxFuture;
use futures::future::join_all;
use futures::stream;

use super::ExecutionParameters;
use super::collect::CollectedField;
use super::execute_selection_set;
use super::result::InvalidValue;
use crate::error::ExecutionError;
use crate::graphql::Error;
use crate::json_ext::PathElement;
use crate::json_ext::ResponsePath;
use crate::json_ext::Value;
use crate::json_ext::ValueExt;
use crate::spec::TYPENAME;

/// Completes a value against the type it was resolved for.
///
/// Errors are recorded where they happen. `Err(InvalidValue)` asks the caller
/// to become null, if it can.
pub(crate) fn complete_value<'a>(
    parameters: &'a ExecutionParameters<'a>,
    parent_type: &'a str,
    field: &'a CollectedField<'a>,
    ty: &'a ast::Type,
    value: Value,
    path: ResponsePath,
) -> BoxFuture<'a, Result<Value, InvalidValue>> {
    Box::pin(async move {
        match ty {
            ast::Type::Named(name) => {
                Ok(complete_named(parameters, field, name.as_str(), value, &path)
                    .await
                    .unwrap_or_default())
            }
            ast::Type::List(inner) => {
                Ok(
                    complete_list(parameters, parent_type, field, inner, value, &path)
                        .await
                        .unwrap_or_default(),
                )
            }
            // for non null types, we complete with the inner type, then a null
            // has to go up to the next nullable parent
            ast::Type::NonNullNamed(name) => {
                let completed =
                    complete_named(parameters, field, name.as_str(), value, &path).await?;
                non_null(parameters, parent_type, field, ty, completed, &path)
            }
            ast::Type::NonNullList(inner) => {
                let completed =
                    complete_list(parameters, parent_type, field, inner, value, &path).await?;
                non_null(parameters, parent_type, field, ty, completed, &path)
            }
        }
    })
}

fn non_null(
    parameters: &ExecutionParameters<'_>,
    parent_type: &str,
    field: &CollectedField<'_>,
    ty: &ast::Type,
    value: Value,
    path: &ResponsePath,
) -> Result<Value, InvalidValue> {
    if !value.is_null() {
        return Ok(value);
    }

    let message = match path.last() {
        Some(PathElement::Index(i)) => format!(
            "Cannot return null for non-nullable array element of type {} at index {i}",
            ty.clone().nullable()
        ),
        _ => format!(
            "Cannot return null for non-nullable field {parent_type}.{}",
            field.field.name
        ),
    };
    parameters.errors.push(
        Error::builder()
            .message(message)
            .path(path.to_path())
            .locations(parameters.locations(field.field))
            .build(),
    );
    Err(InvalidValue)
}

async fn complete_list<'a>(
    parameters: &'a ExecutionParameters<'a>,
    parent_type: &'a str,
    field: &'a CollectedField<'a>,
    inner: &'a ast::Type,
    value: Value,
    path: &ResponsePath,
) -> Result<Value, InvalidValue> {
    let items = match value {
        Value::Null => return Ok(Value::Null),
        Value::Array(items) => items,
        other => {
            return Err(invalid_result(
                parameters,
                field,
                path,
                format!(
                    "Expected a list for field {parent_type}.{}, found {}",
                    field.field.name,
                    other.json_type_name()
                ),
            ));
        }
    };

    let completions = items.into_iter().enumerate().map(|(i, item)| {
        complete_value(parameters, parent_type, field, inner, item, path.index(i))
    });
    let completed: Vec<_> = match parameters.configuration.max_concurrent_fields() {
        Some(limit) => {
            stream::iter(completions)
                .buffered(limit.get())
                .collect::<Vec<_>>()
                .await
        }
        None => join_all(completions).await,
    };

    // one element that cannot be null makes the whole list null
    completed
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

async fn complete_named<'a>(
    parameters: &'a ExecutionParameters<'a>,
    field: &'a CollectedField<'a>,
    type_name: &'a str,
    value: Value,
    path: &ResponsePath,
) -> Result<Value, InvalidValue> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    let schema = parameters.schema;
    let object_type = match schema.definitions.types.get(type_name) {
        Some(ExtendedType::Scalar(_)) => {
            return serialize_scalar(parameters, type_name, value)
                .map_err(|reason| invalid_result(parameters, field, path, reason));
        }
        Some(ExtendedType::Enum(_)) => {
            return match value.as_str() {
                Some(enum_value) if schema.has_enum_value(type_name, enum_value) => Ok(value),
                _ => Err(invalid_result(
                    parameters,
                    field,
                    path,
                    format!("Enum \"{type_name}\" cannot represent value: {value}"),
                )),
            };
        }
        Some(ExtendedType::Object(object)) => object.name.as_str(),
        Some(ExtendedType::Interface(_) | ExtendedType::Union(_)) => {
            resolve_runtime_type(parameters, field, type_name, &value, path)?
        }
        Some(ExtendedType::InputObject(_)) | None => {
            failfast_debug!("field of unknown output type '{}'", type_name);
            return Err(invalid_result(
                parameters,
                field,
                path,
                format!("'{type_name}' is not an output type"),
            ));
        }
    };

    if !value.is_object() {
        return Err(invalid_result(
            parameters,
            field,
            path,
            format!(
                "Expected an object of type {object_type}, found {}",
                value.json_type_name()
            ),
        ));
    }

    execute_selection_set(
        parameters,
        object_type,
        value,
        &field.selection_sets,
        path,
        false,
    )
    .await
}

/// The object type of a value of an interface or a union: what the type
/// resolver of the abstract type says, else the `__typename` of the value.
fn resolve_runtime_type<'a>(
    parameters: &'a ExecutionParameters<'a>,
    field: &CollectedField<'_>,
    abstract_type: &str,
    value: &Value,
    path: &ResponsePath,
) -> Result<&'a str, InvalidValue> {
    let runtime_type = parameters
        .resolvers
        .type_resolver(abstract_type)
        .and_then(|type_resolver| type_resolver.resolve_type(value))
        .or_else(|| {
            value
                .get(TYPENAME)
                .and_then(|typename| typename.as_str())
                .map(str::to_string)
        });

    let Some(runtime_type) = runtime_type else {
        return Err(invalid_result(
            parameters,
            field,
            path,
            format!(
                "Abstract type \"{abstract_type}\" must resolve to an object type at runtime for field {}",
                field.field.name
            ),
        ));
    };

    match parameters.schema.get_object(&runtime_type) {
        Some(object) if parameters.schema.is_subtype(abstract_type, &runtime_type) => {
            Ok(object.name.as_str())
        }
        _ => Err(invalid_result(
            parameters,
            field,
            path,
            format!(
                "Runtime object type \"{runtime_type}\" is not a possible type for \"{abstract_type}\""
            ),
        )),
    }
}

/// Output coercion of a scalar.
///
/// Spec: <https://spec.graphql.org/October2021/#sec-Scalars.Result-Coercion-and-Serialization>
fn serialize_scalar(
    parameters: &ExecutionParameters<'_>,
    type_name: &str,
    value: Value,
) -> Result<Value, String> {
    match type_name {
        "Int" if value.is_valid_int_output() => Ok(match value.as_f64() {
            // 1.0 is written as 1
            Some(float) if !value.is_i64() && !value.is_u64() => Value::from(float as i64),
            _ => value,
        }),
        "Float" if value.is_number() => Ok(value),
        "String" if value.is_string() => Ok(value),
        "Boolean" if value.is_boolean() => Ok(value),
        "ID" if value.is_string() => Ok(value),
        "ID" if value.is_i64() || value.is_u64() => Ok(Value::String(value.to_string().into())),
        "Int" | "Float" | "String" | "Boolean" | "ID" => {
            Err(format!("{type_name} cannot represent value: {value}"))
        }
        _ => match parameters.schema.custom_scalar(type_name) {
            Some(scalar) => scalar
                .serialize(value)
                .map_err(|error| format!("{type_name} cannot represent value: {error}")),
            None => Ok(value),
        },
    }
}

fn invalid_result(
    parameters: &ExecutionParameters<'_>,
    field: &CollectedField<'_>,
    path: &ResponsePath,
    reason: String,
) -> InvalidValue {
    let error = ExecutionError::InvalidResultValue { reason };
    tracing::debug!("invalid value at {path}: {error}");
    parameters.errors.push(
        error.to_graphql_error(Some(path.to_path()), parameters.locations(field.field)),
    );
    InvalidValue
}
