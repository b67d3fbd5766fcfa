//! Field resolver dispatch.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use apollo_compiler::Node;
use apollo_compiler::ast;
use apollo_compiler::executable::Field;
use apollo_compiler::schema::FieldDefinition;
use futures::FutureExt;

use super::ExecutionParameters;
use super::collect::CollectedField;
use crate::error::ExecutionError;
use crate::error::InputCoercionError;
use crate::graphql::Error;
use crate::json_ext::Object;
use crate::json_ext::ResponsePath;
use crate::json_ext::Value;
use crate::resolver::Extensions;
use crate::resolver::FieldMiddleware;
use crate::resolver::Next;
use crate::resolver::ResolverContext;
use crate::spec::FieldType;
use crate::spec::Schema;
use crate::spec::literal_to_json;

/// Calls the resolver of a field, wrapped in the middleware of its directives.
///
/// Failures, panics included, come back as the GraphQL error of the field.
pub(crate) async fn resolve_field(
    parameters: &ExecutionParameters<'_>,
    parent_type: &Arc<str>,
    parent: &Arc<Value>,
    collected: &CollectedField<'_>,
    path: &ResponsePath,
) -> Result<Value, Error> {
    let field = collected.field;
    let field_name = field.name.as_str();
    let error_path = || Some(path.to_path());

    let arguments = coerce_arguments(
        &collected.definition.arguments,
        &field.arguments,
        parameters.variables,
        parameters.schema,
    )
    .map_err(|error| error.to_graphql_error(error_path(), parameters.locations(field)))?;
    let middleware = directive_middleware(parameters, collected.definition, field)
        .map_err(|error| error.to_graphql_error(error_path(), parameters.locations(field)))?;

    let ctx = ResolverContext {
        parent: parent.clone(),
        parent_type: parent_type.clone(),
        field_name: field_name.into(),
        response_key: field.response_key().as_str().into(),
        return_type: collected.ty().clone(),
        arguments,
        variables: parameters.variables.clone(),
        path: path.clone(),
        local_extensions: Extensions::default(),
        execution_extensions: parameters.execution_extensions.clone(),
        cancellation: parameters.cancellation.clone(),
    };
    let resolvable = parameters.resolvers.get(parent_type, field_name);

    match AssertUnwindSafe(Next::new(&middleware, resolvable).run(ctx))
        .catch_unwind()
        .await
    {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => {
            tracing::debug!(
                "resolver for field '{parent_type}.{field_name}' failed at {path}: {}",
                error.message()
            );
            Err(error.to_graphql_error(path.to_path(), parameters.locations(field)))
        }
        Err(payload) => {
            let error = ExecutionError::ResolverPanicked {
                field: format!("{parent_type}.{field_name}"),
                reason: panic_message(payload.as_ref()),
            };
            tracing::error!("{error}");
            Err(error.to_graphql_error(error_path(), parameters.locations(field)))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// The middleware chain of a field, outermost first: the directives of the
/// field definition, then the directives of the selection.
fn directive_middleware(
    parameters: &ExecutionParameters<'_>,
    definition: &FieldDefinition,
    field: &Field,
) -> Result<Vec<Arc<dyn FieldMiddleware>>, ExecutionError> {
    if parameters.directives.is_empty() {
        return Ok(Vec::new());
    }

    let no_variables = Object::new();
    let variables: &Object = parameters.variables;
    let schema_directives = definition
        .directives
        .iter()
        .map(|directive| (directive, &no_variables));
    let selection_directives = field
        .directives
        .iter()
        .map(|directive| (directive, variables));

    schema_directives
        .chain(selection_directives)
        .filter_map(|(directive, variables)| {
            let factory = parameters.directives.get(directive.name.as_str())?;
            Some((factory, directive, variables))
        })
        .map(|(factory, directive, variables)| {
            let arguments = match parameters
                .schema
                .definitions
                .directive_definitions
                .get(&directive.name)
            {
                Some(definition) => coerce_arguments(
                    &definition.arguments,
                    &directive.arguments,
                    variables,
                    parameters.schema,
                )
                .map_err(|error| match error {
                    ExecutionError::ArgumentCoercionFailed { argument, reason } => {
                        ExecutionError::ArgumentCoercionFailed {
                            argument: format!("@{}({argument}:)", directive.name),
                            reason,
                        }
                    }
                    error => error,
                })?,
                None => directive
                    .arguments
                    .iter()
                    .map(|argument| {
                        (
                            argument.name.as_str().into(),
                            literal_to_json(&argument.value, variables),
                        )
                    })
                    .collect(),
            };
            Ok(factory.create(&arguments))
        })
        .collect()
}

/// Coerces the arguments written in the document against their definitions.
///
/// Spec: <https://spec.graphql.org/October2021/#sec-Coercing-Field-Arguments>
pub(crate) fn coerce_arguments(
    definitions: &[Node<ast::InputValueDefinition>],
    arguments: &[Node<ast::Argument>],
    variables: &Object,
    schema: &Schema,
) -> Result<Object, ExecutionError> {
    let mut coerced = Object::new();
    for definition in definitions {
        let name = definition.name.as_str();
        let ty = FieldType(&definition.ty);
        let failed = |reason: InputCoercionError| ExecutionError::ArgumentCoercionFailed {
            argument: name.to_string(),
            reason: reason.to_string(),
        };

        let provided = arguments
            .iter()
            .find(|argument| argument.name == definition.name)
            .map(|argument| &argument.value)
            .filter(|value| is_provided(value, variables));

        let value = match (provided, &definition.default_value) {
            (Some(value), _) => ty.coerce_literal(value, variables, schema),
            (None, Some(default_value)) => ty.coerce_literal(default_value, variables, schema),
            (None, None) if ty.is_non_null() => Err(InputCoercionError::MissingArgument {
                argument: name.to_string(),
                ty: ty.to_string(),
            }),
            (None, None) => continue,
        }
        .map_err(failed)?;
        coerced.insert(name, value);
    }
    Ok(coerced)
}

/// A variable without a value is as if the argument was not written.
fn is_provided(value: &ast::Value, variables: &Object) -> bool {
    match value {
        ast::Value::Variable(variable) => variables.contains_key(variable.as_str()),
        _ => true,
    }
}
