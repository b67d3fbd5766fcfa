//! Schema, operation and type-system logic on top of `apollo-compiler`.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

mod field_type;
mod fragments;
pub(crate) mod query;
mod schema;
mod selection;

use displaydoc::Display;
pub(crate) use field_type::*;
pub(crate) use fragments::*;
pub use query::OperationKind;
pub use query::Query;
pub(crate) use query::TYPENAME;
pub use schema::CustomScalar;
pub use schema::Schema;
pub(crate) use selection::*;
use thiserror::Error;

use crate::error::ParseErrors;
use crate::graphql::Error;
use crate::graphql::ErrorExtension;
use crate::graphql::Response;
use crate::json_ext::Object;

/// GraphQL request errors: the operation cannot be executed at all.
#[derive(Error, Debug, Display)]
#[non_exhaustive]
pub enum SpecError {
    /// selection processing recursion limit exceeded
    RecursionLimitExceeded,
    /// GraphQL document is invalid: {0}
    ValidationError(ParseErrors),
    /// Unknown operation named "{0}"
    UnknownOperation(String),
    /// Must provide operation name if query contains multiple operations.
    MultipleOperationWithoutOperationName,
    /// Must provide an operation.
    NoOperation,
    /// Schema is not configured to execute {0} operation.
    MissingRootType(OperationKind),
}

impl ErrorExtension for SpecError {
    fn extension_code(&self) -> String {
        match self {
            SpecError::RecursionLimitExceeded => "RECURSION_LIMIT_EXCEEDED",
            SpecError::ValidationError(_) => "GRAPHQL_VALIDATION_FAILED",
            SpecError::UnknownOperation(_)
            | SpecError::MultipleOperationWithoutOperationName
            | SpecError::NoOperation => "GRAPHQL_UNKNOWN_OPERATION_NAME",
            SpecError::MissingRootType(_) => "MISSING_ROOT_TYPE",
        }
        .to_string()
    }
}

impl SpecError {
    fn custom_extension_details(&self) -> Option<Object> {
        let mut obj = Object::new();
        if let SpecError::MissingRootType(kind) = self {
            obj.insert("operation", kind.to_string().into());
        }

        (!obj.is_empty()).then_some(obj)
    }

    /// Convert the error to the GraphQL errors of a request that cannot be executed.
    pub(crate) fn into_graphql_errors(self) -> Vec<Error> {
        match self {
            SpecError::ValidationError(errors) => errors.into_graphql_errors(),
            error => vec![error.to_graphql_error()],
        }
    }

    pub(crate) fn to_graphql_error(&self) -> Error {
        Error::builder()
            .message(self.to_string())
            .extensions(self.custom_extension_details().unwrap_or_default())
            .extension_code(self.extension_code())
            .build()
    }

    /// Convert the error to an appropriate response, without `data`.
    pub fn to_response(self) -> Response {
        Response {
            errors: self.into_graphql_errors(),
            ..Response::default()
        }
    }
}
