//! Query processing.
//!
//! Parsing and validation of the executable document, operation selection and
//! variable coercion.

use std::collections::HashSet;
use std::fmt;

use apollo_compiler::ExecutableDocument;
use apollo_compiler::Node;
use apollo_compiler::executable::Operation;
use apollo_compiler::executable::OperationType;
use apollo_compiler::validation::Valid;
use derivative::Derivative;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ExecutionError;
use crate::error::ParseErrors;
use crate::graphql::Error;
use crate::graphql::Location;
use crate::json_ext::Object;
use crate::spec::FieldType;
use crate::spec::Fragments;
use crate::spec::Schema;
use crate::spec::SpecError;

pub(crate) const TYPENAME: &str = "__typename";

/// The kind of a GraphQL operation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// A read-only operation: root fields run concurrently.
    #[default]
    Query,
    /// A write operation: root fields run one after the other.
    Mutation,
    /// A subscription, executed once against the given root value.
    Subscription,
}

impl OperationKind {
    pub(crate) const fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<OperationType> for OperationKind {
    fn from(operation_type: OperationType) -> Self {
        match operation_type {
            OperationType::Query => Self::Query,
            OperationType::Mutation => Self::Mutation,
            OperationType::Subscription => Self::Subscription,
        }
    }
}

impl From<OperationKind> for OperationType {
    fn from(kind: OperationKind) -> Self {
        match kind {
            OperationKind::Query => Self::Query,
            OperationKind::Mutation => Self::Mutation,
            OperationKind::Subscription => Self::Subscription,
        }
    }
}

/// A parsed and validated GraphQL document, ready to be executed any number of times.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Query {
    string: String,
    #[derivative(Debug = "ignore")]
    pub(crate) executable: Valid<ExecutableDocument>,
    #[derivative(Debug = "ignore")]
    pub(crate) fragments: Fragments,
}

impl Query {
    /// Parses and validates a document against the schema.
    pub fn parse(query: impl Into<String>, schema: &Schema) -> Result<Self, SpecError> {
        let string = query.into();
        let executable =
            ExecutableDocument::parse_and_validate(&schema.definitions, &string, "query.graphql")
                .map_err(|invalid| {
                    SpecError::ValidationError(ParseErrors {
                        errors: invalid.errors,
                    })
                })?;
        let fragments = Fragments::from_hir(&executable);

        Ok(Query {
            string,
            executable,
            fragments,
        })
    }

    /// Wraps a document that was validated, or is trusted, by the caller.
    pub fn from_executable(executable: Valid<ExecutableDocument>) -> Self {
        let fragments = Fragments::from_hir(&executable);
        Query {
            string: executable.to_string(),
            executable,
            fragments,
        }
    }

    /// The source of the document.
    pub fn string(&self) -> &str {
        &self.string
    }

    /// The validated `apollo-compiler` document.
    pub fn executable(&self) -> &Valid<ExecutableDocument> {
        &self.executable
    }

    /// Selects the operation to execute.
    ///
    /// Without a name, the document must contain exactly one operation.
    pub(crate) fn operation(&self, operation_name: Option<&str>) -> Result<&Node<Operation>, SpecError> {
        let operations = &self.executable.operations;
        match operation_name {
            Some(name) => operations
                .named
                .get(name)
                .ok_or_else(|| SpecError::UnknownOperation(name.to_string())),
            None => match (&operations.anonymous, operations.named.len()) {
                (Some(operation), 0) => Ok(operation),
                (None, 1) => operations
                    .named
                    .values()
                    .next()
                    .ok_or(SpecError::NoOperation),
                (None, 0) => Err(SpecError::NoOperation),
                _ => Err(SpecError::MultipleOperationWithoutOperationName),
            },
        }
    }

    /// The line and column where a node of this document starts.
    pub(crate) fn location<T>(&self, node: &Node<T>) -> Option<Location> {
        let range = node.line_column_range(&self.executable.sources)?;
        Some(Location {
            line: range.start.line as u32,
            column: range.start.column as u32,
        })
    }

    /// Coerces the raw variables of a request against the variable definitions
    /// of the operation.
    ///
    /// Every invalid variable is reported, not only the first one.
    pub(crate) fn coerce_variables(
        &self,
        operation: &Operation,
        variables: &Object,
        schema: &Schema,
    ) -> Result<Object, Vec<Error>> {
        if tracing::enabled!(tracing::Level::DEBUG) {
            let known_variables = operation
                .variables
                .iter()
                .map(|definition| definition.name.as_str())
                .collect::<HashSet<_>>();
            let unknown_variables = variables
                .keys()
                .map(|k| k.as_str())
                .filter(|k| !known_variables.contains(k))
                .collect::<Vec<_>>();
            if !unknown_variables.is_empty() {
                tracing::debug!(
                    "Received variable unknown to the operation: {:?}",
                    unknown_variables,
                );
            }
        }

        let no_variables = Object::new();
        let mut coerced = Object::new();
        let mut errors = Vec::new();
        for definition in &operation.variables {
            let name = definition.name.as_str();
            let ty = FieldType(&definition.ty);
            let value = match (variables.get(name), &definition.default_value) {
                (Some(value), _) => ty.coerce_input_value(value, schema),
                (None, Some(default_value)) => {
                    ty.coerce_literal(default_value, &no_variables, schema)
                }
                (None, None) if ty.is_non_null() => {
                    errors.push(
                        ExecutionError::ValidationMissingVariable {
                            name: name.to_string(),
                            ty: ty.to_string(),
                        }
                        .to_graphql_error(None, self.location(definition).into_iter().collect()),
                    );
                    continue;
                }
                (None, None) => continue,
            };
            match value {
                Ok(value) => {
                    coerced.insert(name, value);
                }
                Err(reason) => errors.push(
                    ExecutionError::ValidationInvalidTypeVariable {
                        name: name.to_string(),
                        reason: reason.to_string(),
                    }
                    .to_graphql_error(None, self.location(definition).into_iter().collect()),
                ),
            }
        }

        if errors.is_empty() {
            Ok(coerced)
        } else {
            Err(errors)
        }
    }
}
