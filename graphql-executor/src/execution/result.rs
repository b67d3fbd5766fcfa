//! Result assembly.

use parking_lot::Mutex;

use crate::graphql::Error;
use crate::graphql::Response;
use crate::json_ext::Value;

/// A completed value had to become null, and the nearest nullable position
/// above it must become null instead.
///
/// The error explaining why is already recorded when this is returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct InvalidValue;

/// The errors of one execution, appended by concurrently running fields.
#[derive(Debug, Default)]
pub(crate) struct ErrorCollector {
    errors: Mutex<Vec<Error>>,
}

impl ErrorCollector {
    pub(crate) fn push(&self, error: Error) {
        self.errors.lock().push(error);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.errors.lock().len()
    }

    pub(crate) fn into_inner(self) -> Vec<Error> {
        self.errors.into_inner()
    }

    /// The final response of an execution that reached its root selection set.
    ///
    /// A root that had to become null is kept as an explicit `null`.
    pub(crate) fn into_response(self, data: Result<Value, InvalidValue>) -> Response {
        Response::builder()
            .data(data.unwrap_or_default())
            .errors(self.into_inner())
            .build()
    }
}
