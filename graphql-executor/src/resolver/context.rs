use std::sync::Arc;

use apollo_compiler::ast;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::error::FieldError;
use crate::json_ext::Object;
use crate::json_ext::ResponsePath;
use crate::json_ext::Value;
use crate::resolver::Extensions;
use crate::resolver::ExtensionsMutex;

/// Everything a resolver knows about the field it resolves.
///
/// A context is owned by one resolver call: middleware can change the
/// arguments or fill the local extensions before handing it over to the next
/// link of the chain.
#[derive(Debug, Clone)]
pub struct ResolverContext {
    pub(crate) parent: Arc<Value>,
    pub(crate) parent_type: Arc<str>,
    pub(crate) field_name: Arc<str>,
    pub(crate) response_key: Arc<str>,
    pub(crate) return_type: ast::Type,
    /// The coerced arguments of the field, defaults included.
    pub arguments: Object,
    pub(crate) variables: Arc<Object>,
    pub(crate) path: ResponsePath,
    pub(crate) local_extensions: Extensions,
    pub(crate) execution_extensions: ExtensionsMutex,
    pub(crate) cancellation: CancellationToken,
}

impl ResolverContext {
    /// The value of the parent object, as completed by the parent field's resolver.
    pub fn parent(&self) -> &Value {
        &self.parent
    }

    /// The object type the field belongs to.
    pub fn parent_type(&self) -> &str {
        &self.parent_type
    }

    /// The name of the field in the schema.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// The key of the field in the response: its alias, or its name.
    pub fn response_key(&self) -> &str {
        &self.response_key
    }

    /// The declared type of the field.
    pub fn return_type(&self) -> &ast::Type {
        &self.return_type
    }

    /// A coerced argument, `None` when it was not provided and has no default.
    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name)
    }

    /// Deserializes the arguments into a typed struct.
    pub fn arguments_as<T: DeserializeOwned>(&self) -> Result<T, FieldError> {
        Ok(serde_json_bytes::from_value(Value::Object(
            self.arguments.clone(),
        ))?)
    }

    /// The coerced variables of the operation.
    pub fn variables(&self) -> &Object {
        &self.variables
    }

    /// Where the field is written in the response.
    pub fn path(&self) -> &ResponsePath {
        &self.path
    }

    /// Values left by the middleware wrapping this resolver.
    pub fn local_extensions(&self) -> &Extensions {
        &self.local_extensions
    }

    /// Values for this resolver call only. Middleware inserts them before calling
    /// [`super::Next::run`].
    pub fn local_extensions_mut(&mut self) -> &mut Extensions {
        &mut self.local_extensions
    }

    /// Values shared by every field of the execution.
    pub fn execution_extensions(&self) -> &ExtensionsMutex {
        &self.execution_extensions
    }

    /// Cancelled when the execution is abandoned. Long running resolvers can
    /// watch it to stop early.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Whether the execution was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
