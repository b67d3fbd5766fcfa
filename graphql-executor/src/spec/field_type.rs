use std::fmt;

use apollo_compiler::ast;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::InputObjectType;
use serde_json_bytes::ByteString;

use crate::error::InputCoercionError;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::json_ext::ValueExt;
use crate::spec::Schema;

/// A type reference of the schema or of a variable definition, with the
/// input coercion rules of the GraphQL specification.
///
/// Spec: <https://spec.graphql.org/October2021/#sec-Input-Values>
#[derive(Debug, Clone, Copy)]
pub(crate) struct FieldType<'a>(pub(crate) &'a ast::Type);

impl fmt::Display for FieldType<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FieldType<'_> {
    pub(crate) fn is_non_null(&self) -> bool {
        self.0.is_non_null()
    }

    fn null_error(&self) -> InputCoercionError {
        InputCoercionError::UnexpectedNull {
            ty: self.to_string(),
        }
    }

    // This function coerces input values according to the graphql specification.
    // Each of the values are coerced against the "input coercion" rules.
    pub(crate) fn coerce_input_value(
        &self,
        value: &Value,
        schema: &Schema,
    ) -> Result<Value, InputCoercionError> {
        if value.is_null() {
            return if self.is_non_null() {
                Err(self.null_error())
            } else {
                Ok(Value::Null)
            };
        }
        match self.0 {
            ast::Type::Named(name) | ast::Type::NonNullNamed(name) => {
                coerce_named_input_value(name.as_str(), value, schema)
            }
            ast::Type::List(inner) | ast::Type::NonNullList(inner) => match value {
                Value::Array(items) => items
                    .iter()
                    .map(|item| FieldType(inner).coerce_input_value(item, schema))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
                // For coercion from single value to list
                single => Ok(Value::Array(vec![
                    FieldType(inner).coerce_input_value(single, schema)?,
                ])),
            },
        }
    }

    /// Coerces a literal of the document (argument or default value), replacing
    /// the variables it references by their coerced value.
    ///
    /// A variable without a value is null, unless its position is non-null.
    pub(crate) fn coerce_literal(
        &self,
        value: &ast::Value,
        variables: &Object,
        schema: &Schema,
    ) -> Result<Value, InputCoercionError> {
        match value {
            ast::Value::Variable(name) => match variables.get(name.as_str()) {
                Some(Value::Null) | None if self.is_non_null() => Err(self.null_error()),
                Some(value) => Ok(value.clone()),
                None => Ok(Value::Null),
            },
            ast::Value::Null if self.is_non_null() => Err(self.null_error()),
            ast::Value::Null => Ok(Value::Null),
            literal => match self.0 {
                ast::Type::Named(name) | ast::Type::NonNullNamed(name) => {
                    coerce_named_literal(name.as_str(), literal, variables, schema)
                }
                ast::Type::List(inner) | ast::Type::NonNullList(inner) => match literal {
                    ast::Value::List(items) => items
                        .iter()
                        .map(|item| FieldType(inner).coerce_literal(item, variables, schema))
                        .collect::<Result<Vec<_>, _>>()
                        .map(Value::Array),
                    single => Ok(Value::Array(vec![
                        FieldType(inner).coerce_literal(single, variables, schema)?,
                    ])),
                },
            },
        }
    }
}

fn invalid_scalar(ty: &str, value: impl fmt::Display) -> InputCoercionError {
    InputCoercionError::InvalidScalar {
        ty: ty.to_string(),
        value: value.to_string(),
    }
}

fn coerce_named_input_value(
    name: &str,
    value: &Value,
    schema: &Schema,
) -> Result<Value, InputCoercionError> {
    match name {
        // Spec: https://spec.graphql.org/October2021/#sec-Int
        "Int" if value.is_valid_int_input() => Ok(value.clone()),
        // Spec: https://spec.graphql.org/October2021/#sec-Float.Input-Coercion
        "Float" if value.is_valid_float_input() => Ok(value.clone()),
        "String" if value.is_string() => Ok(value.clone()),
        "Boolean" if value.is_boolean() => Ok(value.clone()),
        // "The ID scalar type represents a unique identifier, often used to refetch an object
        // or as the key for a cache. The ID type is serialized in the same way as a String"
        "ID" if value.is_string() => Ok(value.clone()),
        "ID" if value.is_i64() || value.is_u64() => Ok(Value::String(value.to_string().into())),
        "Int" | "Float" | "String" | "Boolean" | "ID" => Err(invalid_scalar(name, value)),
        _ => match schema.definitions.types.get(name) {
            Some(ExtendedType::Scalar(_)) => coerce_custom_scalar(name, value.clone(), schema),
            Some(ExtendedType::Enum(_)) => match value.as_str() {
                Some(enum_value) if schema.has_enum_value(name, enum_value) => Ok(value.clone()),
                _ => Err(InputCoercionError::InvalidEnumValue {
                    ty: name.to_string(),
                    value: value.to_string(),
                }),
            },
            Some(ExtendedType::InputObject(input_object)) => match value {
                Value::Object(object) => {
                    let fields: Vec<_> = object
                        .iter()
                        .map(|(key, value)| (key.as_str(), value))
                        .collect();
                    coerce_input_object(name, input_object, fields.into_iter(), schema, |ty, value| {
                        ty.coerce_input_value(value, schema)
                    })
                }
                _ => Err(InputCoercionError::ExpectedInputObject {
                    ty: name.to_string(),
                    value: value.to_string(),
                }),
            },
            _ => Err(InputCoercionError::NotAnInputType {
                ty: name.to_string(),
            }),
        },
    }
}

fn coerce_named_literal(
    name: &str,
    literal: &ast::Value,
    variables: &Object,
    schema: &Schema,
) -> Result<Value, InputCoercionError> {
    match (name, literal) {
        ("Int", ast::Value::Int(int)) => int
            .try_to_i32()
            .map(Value::from)
            .map_err(|_| invalid_scalar(name, literal)),
        ("Float", ast::Value::Int(_) | ast::Value::Float(_)) => literal
            .to_f64()
            .and_then(|float| serde_json::Number::from_f64(float).map(Value::Number))
            .ok_or_else(|| invalid_scalar(name, literal)),
        ("String" | "ID", ast::Value::String(s)) => Ok(Value::String(s.as_str().into())),
        ("ID", ast::Value::Int(int)) => Ok(Value::String(int.as_str().into())),
        ("Boolean", ast::Value::Boolean(b)) => Ok(Value::Bool(*b)),
        ("Int" | "Float" | "String" | "Boolean" | "ID", _) => Err(invalid_scalar(name, literal)),
        _ => match schema.definitions.types.get(name) {
            Some(ExtendedType::Scalar(_)) => {
                let value = literal_to_json(literal, variables);
                coerce_custom_scalar(name, value, schema)
            }
            Some(ExtendedType::Enum(_)) => match literal {
                ast::Value::Enum(value) if schema.has_enum_value(name, value.as_str()) => {
                    Ok(Value::String(value.as_str().into()))
                }
                _ => Err(InputCoercionError::InvalidEnumValue {
                    ty: name.to_string(),
                    value: literal.to_string(),
                }),
            },
            Some(ExtendedType::InputObject(input_object)) => match literal {
                ast::Value::Object(fields) => {
                    let fields = fields
                        .iter()
                        // an absent variable is an absent field, so that its default applies
                        .filter(|(_, value)| match &**value {
                            ast::Value::Variable(variable) => {
                                variables.contains_key(variable.as_str())
                            }
                            _ => true,
                        })
                        .map(|(name, value)| (name.as_str(), &**value));
                    coerce_input_object(name, input_object, fields, schema, |ty, value| {
                        ty.coerce_literal(value, variables, schema)
                    })
                }
                _ => Err(InputCoercionError::ExpectedInputObject {
                    ty: name.to_string(),
                    value: literal.to_string(),
                }),
            },
            _ => Err(InputCoercionError::NotAnInputType {
                ty: name.to_string(),
            }),
        },
    }
}

fn coerce_custom_scalar(
    name: &str,
    value: Value,
    schema: &Schema,
) -> Result<Value, InputCoercionError> {
    match schema.custom_scalar(name) {
        Some(scalar) => scalar
            .parse_value(value)
            .map_err(|error| InputCoercionError::CustomScalar {
                ty: name.to_string(),
                reason: error.to_string(),
            }),
        None => Ok(value),
    }
}

/// Coerces the fields of an input object, whether they come from JSON or from a literal.
fn coerce_input_object<'v, K, V, F>(
    name: &str,
    input_object: &InputObjectType,
    fields: impl Iterator<Item = (K, &'v V)> + Clone,
    schema: &Schema,
    coerce: F,
) -> Result<Value, InputCoercionError>
where
    K: AsRef<str>,
    V: ?Sized + 'v,
    F: Fn(FieldType<'_>, &V) -> Result<Value, InputCoercionError>,
{
    if let Some((unknown, _)) = fields
        .clone()
        .find(|(field, _)| !input_object.fields.contains_key(field.as_ref()))
    {
        return Err(InputCoercionError::UnknownInputField {
            ty: name.to_string(),
            field: unknown.as_ref().to_string(),
        });
    }

    let mut coerced = Object::new();
    for (field_name, definition) in &input_object.fields {
        let ty = FieldType(&definition.ty);
        let provided = fields
            .clone()
            .find(|(field, _)| field.as_ref() == field_name.as_str());
        let value = match (provided, &definition.default_value) {
            (Some((_, value)), _) => coerce(ty, value)?,
            (None, Some(default_value)) => ty.coerce_literal(default_value, &Object::new(), schema)?,
            (None, None) if ty.is_non_null() => {
                return Err(InputCoercionError::MissingInputField {
                    ty: name.to_string(),
                    field: field_name.to_string(),
                    field_type: ty.to_string(),
                });
            }
            (None, None) => continue,
        };
        coerced.insert(ByteString::from(field_name.as_str()), value);
    }
    Ok(Value::Object(coerced))
}

/// Converts a literal to JSON, replacing variables by their value, without any
/// type coercion. Used to hand literals over to custom scalars.
pub(crate) fn literal_to_json(literal: &ast::Value, variables: &Object) -> Value {
    match literal {
        ast::Value::Null => Value::Null,
        ast::Value::Enum(value) => Value::String(value.as_str().into()),
        ast::Value::Variable(name) => variables.get(name.as_str()).cloned().unwrap_or_default(),
        ast::Value::String(s) => Value::String(s.as_str().into()),
        ast::Value::Float(_) => literal
            .to_f64()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_default(),
        ast::Value::Int(int) => match int.as_str().parse::<i64>() {
            Ok(int) => Value::from(int),
            Err(_) => literal
                .to_f64()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or_default(),
        },
        ast::Value::Boolean(b) => Value::Bool(*b),
        ast::Value::List(items) => Value::Array(
            items
                .iter()
                .map(|item| literal_to_json(item, variables))
                .collect::<Vec<_>>(),
        ),
        ast::Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(name, value)| {
                    (
                        ByteString::from(name.as_str()),
                        literal_to_json(value, variables),
                    )
                })
                .collect::<Object>(),
        ),
    }
}
