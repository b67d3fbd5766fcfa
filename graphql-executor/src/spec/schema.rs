//! GraphQL schema.

use std::collections::HashMap;
use std::sync::Arc;

use apollo_compiler::Node;
use apollo_compiler::executable::OperationType;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::FieldDefinition;
use apollo_compiler::schema::ObjectType;
use apollo_compiler::validation::Valid;
use derivative::Derivative;

use crate::error::BoxError;
use crate::error::ParseErrors;
use crate::error::SchemaError;
use crate::json_ext::Value;
use crate::spec::OperationKind;

/// Input and output coercion of a custom scalar.
///
/// Both hooks default to accepting the value unchanged.
pub trait CustomScalar: Send + Sync + 'static {
    /// Coerces an input value (variable value, or argument literal converted to JSON).
    fn parse_value(&self, value: Value) -> Result<Value, BoxError> {
        Ok(value)
    }

    /// Coerces a value returned by a resolver before it is written to the response.
    fn serialize(&self, value: Value) -> Result<Value, BoxError> {
        Ok(value)
    }
}

/// A scalar whose values pass through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct PassThrough;

impl CustomScalar for PassThrough {}

/// A GraphQL schema, and how its custom scalars are coerced.
///
/// Read-only once built: an execution only ever borrows it.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Schema {
    pub(crate) definitions: Valid<apollo_compiler::Schema>,
    #[derivative(Debug = "ignore")]
    custom_scalars: HashMap<String, Arc<dyn CustomScalar>>,
}

impl Schema {
    /// Parses and validates a schema from SDL.
    pub fn parse(sdl: &str) -> Result<Self, SchemaError> {
        let definitions = apollo_compiler::Schema::parse_and_validate(sdl, "schema.graphql")
            .map_err(|invalid| {
                SchemaError::Validate(ParseErrors {
                    errors: invalid.errors,
                })
            })?;
        Ok(Self::new(definitions))
    }

    /// Wraps an already validated schema.
    pub fn new(definitions: Valid<apollo_compiler::Schema>) -> Self {
        Self {
            definitions,
            custom_scalars: HashMap::new(),
        }
    }

    /// Registers the coercion of a custom scalar of the schema.
    ///
    /// Custom scalars without a registration accept any value.
    pub fn with_custom_scalar(
        mut self,
        name: &str,
        scalar: impl CustomScalar,
    ) -> Result<Self, SchemaError> {
        match self.definitions.types.get(name) {
            Some(ExtendedType::Scalar(_)) if !is_built_in_scalar(name) => {
                self.custom_scalars
                    .insert(name.to_string(), Arc::new(scalar));
                Ok(self)
            }
            _ => Err(SchemaError::UnknownScalar(name.to_string())),
        }
    }

    /// The validated `apollo-compiler` schema.
    pub fn definitions(&self) -> &Valid<apollo_compiler::Schema> {
        &self.definitions
    }

    /// Name of the root type of an operation kind, if the schema defines one.
    pub(crate) fn root_operation_type(&self, kind: OperationKind) -> Option<&str> {
        self.definitions
            .root_operation(OperationType::from(kind))
            .map(|name| name.as_str())
    }

    pub(crate) fn get_object(&self, name: &str) -> Option<&Node<ObjectType>> {
        self.definitions.get_object(name)
    }

    /// The definition of a field on an object type, as declared by the object
    /// itself rather than by an interface it implements.
    pub(crate) fn object_field(
        &self,
        object_type: &str,
        field_name: &str,
    ) -> Option<&Node<FieldDefinition>> {
        self.get_object(object_type)?
            .fields
            .get(field_name)
            .map(|field| &field.node)
    }

    /// Whether an object of type `maybe_subtype` may be used where `ty` is expected.
    pub(crate) fn is_subtype(&self, ty: &str, maybe_subtype: &str) -> bool {
        ty == maybe_subtype || self.definitions.is_subtype(ty, maybe_subtype)
    }

    pub(crate) fn has_enum_value(&self, enum_name: &str, value: &str) -> bool {
        self.definitions
            .get_enum(enum_name)
            .is_some_and(|enum_type| enum_type.values.contains_key(value))
    }

    pub(crate) fn custom_scalar(&self, name: &str) -> Option<&dyn CustomScalar> {
        match self.custom_scalars.get(name) {
            Some(scalar) => Some(scalar.as_ref()),
            None if !is_built_in_scalar(name)
                && matches!(
                    self.definitions.types.get(name),
                    Some(ExtendedType::Scalar(_))
                ) =>
            {
                Some(&PassThrough)
            }
            None => None,
        }
    }
}

pub(crate) fn is_built_in_scalar(name: &str) -> bool {
    matches!(name, "Int" | "Float" | "String" | "Boolean" | "ID")
}
