//! Execution errors.
use std::fmt;

use apollo_compiler::validation::DiagnosticList;
use displaydoc::Display;
use serde::Serialize;
use thiserror::Error;

pub use crate::configuration::ConfigurationError;
pub use crate::graphql::Error;
use crate::graphql::ErrorExtension;
use crate::graphql::Location as ErrorLocation;
use crate::graphql::Response;
use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::json_ext::Value;

/// A boxed error, as returned by user supplied hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Reasons why an input value could not be coerced to its declared type.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InputCoercionError {
    /// expected a non-null value of type '{ty}', found null
    UnexpectedNull {
        /// The declared type.
        ty: String,
    },

    /// {ty} cannot represent value: {value}
    InvalidScalar {
        /// The scalar type.
        ty: String,
        /// The rejected value, as JSON.
        value: String,
    },

    /// value {value} does not exist in '{ty}' enum
    InvalidEnumValue {
        /// The enum type.
        ty: String,
        /// The rejected value, as JSON.
        value: String,
    },

    /// expected an object of type '{ty}', found {value}
    ExpectedInputObject {
        /// The input object type.
        ty: String,
        /// The rejected value, as JSON.
        value: String,
    },

    /// field '{field}' is not defined by type '{ty}'
    UnknownInputField {
        /// The input object type.
        ty: String,
        /// The unexpected field.
        field: String,
    },

    /// field '{ty}.{field}' of required type '{field_type}' was not provided
    MissingInputField {
        /// The input object type.
        ty: String,
        /// The missing field.
        field: String,
        /// The type of the missing field.
        field_type: String,
    },

    /// argument '{argument}' of required type '{ty}' was not provided
    MissingArgument {
        /// The argument name.
        argument: String,
        /// The argument type.
        ty: String,
    },

    /// '{ty}' is not an input type
    NotAnInputType {
        /// The named type.
        ty: String,
    },

    /// {ty} cannot represent value: {reason}
    CustomScalar {
        /// The custom scalar type.
        ty: String,
        /// The message of the custom scalar hook.
        reason: String,
    },
}

/// Error types for execution.
///
/// These are never returned to the caller directly: they are converted to a
/// GraphQL [`struct@Error`] at the path where they happened.
#[derive(Error, Display, Debug, Clone, Serialize, Eq, PartialEq)]
#[serde(untagged)]
#[ignore_extra_doc_attributes]
#[non_exhaustive]
pub(crate) enum ExecutionError {
    /// Variable "${name}" got invalid value: {reason}
    ValidationInvalidTypeVariable {
        /// Name of the variable.
        name: String,
        /// Why coercion failed.
        #[serde(skip)]
        reason: String,
    },

    /// Variable "${name}" of required type "{ty}" was not provided.
    ValidationMissingVariable {
        /// Name of the variable.
        name: String,
        /// Declared type of the variable.
        #[serde(skip)]
        ty: String,
    },

    /// invalid value for argument '{argument}': {reason}
    ArgumentCoercionFailed {
        /// Name of the argument.
        argument: String,
        /// Why coercion failed.
        #[serde(skip)]
        reason: String,
    },

    /// resolver for field '{field}' panicked: {reason}
    ResolverPanicked {
        /// `Type.field` of the resolver.
        #[serde(skip)]
        field: String,
        /// The panic payload, when it is a string.
        #[serde(skip)]
        reason: String,
    },

    /// {reason}
    ///
    /// value returned by a resolver does not match the type of its field
    InvalidResultValue {
        /// What is wrong with the value.
        #[serde(skip)]
        reason: String,
    },

    /// fields '{response_key}' conflict because {reason}
    FieldMergeConflict {
        /// Response key shared by the conflicting fields.
        #[serde(rename = "responseKey")]
        response_key: String,
        /// What differs between the selections.
        #[serde(skip)]
        reason: String,
    },

    /// operation was canceled
    OperationCanceled,
}

impl ExecutionError {
    /// Convert the execution error to a GraphQL error.
    pub(crate) fn to_graphql_error(
        &self,
        path: Option<Path>,
        locations: Vec<ErrorLocation>,
    ) -> Error {
        let mut extensions = match serde_json_bytes::to_value(self) {
            Ok(Value::Object(extensions)) => extensions,
            _ => Object::new(),
        };
        extensions
            .entry("code")
            .or_insert_with(|| self.extension_code().into());

        Error::builder()
            .message(self.to_string())
            .locations(locations)
            .and_path(path)
            .extensions(extensions)
            .build()
    }

    /// Convert the error to an appropriate response.
    pub(crate) fn to_response(&self) -> Response {
        Response {
            errors: vec![self.to_graphql_error(None, Vec::new())],
            ..Response::default()
        }
    }
}

impl ErrorExtension for ExecutionError {
    fn extension_code(&self) -> String {
        match self {
            ExecutionError::ValidationInvalidTypeVariable { .. }
            | ExecutionError::ValidationMissingVariable { .. } => "VALIDATION_INVALID_TYPE_VARIABLE",
            ExecutionError::ArgumentCoercionFailed { .. } => "ARGUMENT_COERCION_FAILED",
            ExecutionError::ResolverPanicked { .. } => "RESOLVER_PANICKED",
            ExecutionError::InvalidResultValue { .. } => "INVALID_RESULT_VALUE",
            ExecutionError::FieldMergeConflict { .. } => "FIELD_MERGE_CONFLICT",
            ExecutionError::OperationCanceled => "OPERATION_CANCELED",
        }
        .to_string()
    }
}

/// An error returned by a field resolver.
///
/// Any error that implements [`fmt::Display`] converts into a `FieldError`,
/// so resolvers can use `?` on whatever they call. The message ends up in the
/// `errors` of the response, at the path of the field.
///
/// `FieldError` itself does not implement [`fmt::Display`]: the blanket
/// conversion requires it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    message: String,
    extensions: Object,
}

impl<E> From<E> for FieldError
where
    E: fmt::Display,
{
    fn from(error: E) -> Self {
        FieldError {
            message: error.to_string(),
            extensions: Object::new(),
        }
    }
}

impl FieldError {
    /// A field error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        FieldError {
            message: message.into(),
            extensions: Object::new(),
        }
    }

    /// Adds an entry to the extensions of the resulting GraphQL error.
    ///
    /// Setting `code` replaces the default `RESOLVER_ERROR` code.
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }

    /// The message of the error.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The extensions of the error.
    pub fn extensions(&self) -> &Object {
        &self.extensions
    }

    pub(crate) fn to_graphql_error(&self, path: Path, locations: Vec<ErrorLocation>) -> Error {
        Error::builder()
            .message(self.message.clone())
            .locations(locations)
            .path(path)
            .extensions(self.extensions.clone())
            .extension_code("RESOLVER_ERROR")
            .build()
    }
}

/// Errors raised while building a [`crate::spec::Schema`].
#[derive(Error, Display, Debug)]
#[non_exhaustive]
pub enum SchemaError {
    /// GraphQL schema is invalid: {0}
    Validate(ParseErrors),
    /// cannot register a custom scalar for '{0}': it is not a scalar of the schema
    UnknownScalar(String),
}

/// Collection of GraphQL diagnostics.
#[derive(Debug)]
pub struct ParseErrors {
    pub(crate) errors: DiagnosticList,
}

impl std::fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut errors = self.errors.iter();
        for (i, error) in errors.by_ref().take(5).enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", error)?;
        }
        let remaining = errors.count();
        if remaining > 0 {
            write!(f, "\n...and {remaining} other errors")?;
        }
        Ok(())
    }
}

impl ParseErrors {
    pub(crate) fn into_graphql_errors(self) -> Vec<Error> {
        self.errors
            .iter()
            .map(|diagnostic| {
                let mut error = Error::from(diagnostic.to_json());
                error
                    .extensions
                    .entry("code")
                    .or_insert_with(|| "GRAPHQL_VALIDATION_FAILED".into());
                error
            })
            .collect()
    }
}
