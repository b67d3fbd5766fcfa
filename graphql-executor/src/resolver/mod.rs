//! Field resolvers and what wraps them.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::FieldError;
use crate::json_ext::Value;

mod context;
mod extensions;
mod middleware;

pub use context::ResolverContext;
pub use extensions::Extensions;
pub use extensions::ExtensionsGuard;
pub use extensions::ExtensionsMutex;
pub use middleware::DirectiveMiddlewareFactory;
pub use middleware::DirectiveRegistry;
pub use middleware::FieldMiddleware;
pub use middleware::Next;

/// Resolves the value of one field for one parent value.
///
/// Implemented for every `Fn(ResolverContext) -> impl Future<Output = Result<Value, FieldError>>`.
#[async_trait::async_trait]
pub trait Resolver: Send + Sync + 'static {
    /// Resolves the field.
    async fn resolve(&self, ctx: ResolverContext) -> Result<Value, FieldError>;
}

#[async_trait::async_trait]
impl<F, Fut> Resolver for F
where
    F: Fn(ResolverContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, FieldError>> + Send + 'static,
{
    async fn resolve(&self, ctx: ResolverContext) -> Result<Value, FieldError> {
        (self)(ctx).await
    }
}

/// Picks the object type of a value returned for an interface or a union.
pub trait TypeResolver: Send + Sync + 'static {
    /// The name of the object type, `None` to fall back to the `__typename`
    /// of the value.
    fn resolve_type(&self, value: &Value) -> Option<String>;
}

impl<F> TypeResolver for F
where
    F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
{
    fn resolve_type(&self, value: &Value) -> Option<String> {
        (self)(value)
    }
}

const PROPERTY: &Resolvable = &Resolvable::Property;

type SyncResolver = dyn Fn(&ResolverContext) -> Result<Value, FieldError> + Send + Sync;

/// How a field gets its value.
#[derive(Clone)]
pub(crate) enum Resolvable {
    /// A registered asynchronous resolver.
    Delegate(Arc<dyn Resolver>),
    /// A registered synchronous function.
    Sync(Arc<SyncResolver>),
    /// Nothing registered: the property of the parent object named like the field.
    Property,
}

impl Resolvable {
    /// Resolves the field. Nothing runs before the future is polled.
    pub(crate) fn resolve(&self, ctx: ResolverContext) -> BoxFuture<'_, Result<Value, FieldError>> {
        match self {
            Resolvable::Delegate(resolver) => resolver.resolve(ctx),
            Resolvable::Sync(resolver) => Box::pin(async move { resolver(&ctx) }),
            Resolvable::Property => Box::pin(async move {
                Ok(ctx
                    .parent()
                    .get(ctx.field_name())
                    .cloned()
                    .unwrap_or_default())
            }),
        }
    }
}

/// The resolvers of a schema, by object type and field name.
///
/// Fields without a resolver read the property of the parent object named
/// like the field, so plain JSON parents need no registration at all.
#[derive(Clone, Default)]
pub struct ResolverRegistry {
    fields: HashMap<String, HashMap<String, Resolvable>>,
    type_resolvers: HashMap<String, Arc<dyn TypeResolver>>,
}

impl ResolverRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an asynchronous closure as the resolver of `type_name.field_name`.
    pub fn register<F, Fut>(
        self,
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        resolver: F,
    ) -> Self
    where
        F: Fn(ResolverContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, FieldError>> + Send + 'static,
    {
        self.register_resolver(type_name, field_name, resolver)
    }

    /// Registers a [`Resolver`] implementation for `type_name.field_name`.
    pub fn register_resolver(
        mut self,
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        resolver: impl Resolver,
    ) -> Self {
        self.insert(
            type_name.into(),
            field_name.into(),
            Resolvable::Delegate(Arc::new(resolver)),
        );
        self
    }

    /// Registers a synchronous function as the resolver of `type_name.field_name`.
    pub fn register_sync<F>(
        mut self,
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        resolver: F,
    ) -> Self
    where
        F: Fn(&ResolverContext) -> Result<Value, FieldError> + Send + Sync + 'static,
    {
        self.insert(
            type_name.into(),
            field_name.into(),
            Resolvable::Sync(Arc::new(resolver)),
        );
        self
    }

    /// Registers how values of an interface or union find their object type.
    pub fn register_type_resolver(
        mut self,
        abstract_type: impl Into<String>,
        type_resolver: impl TypeResolver,
    ) -> Self {
        self.type_resolvers
            .insert(abstract_type.into(), Arc::new(type_resolver));
        self
    }

    fn insert(&mut self, type_name: String, field_name: String, resolvable: Resolvable) {
        if self
            .fields
            .entry(type_name.clone())
            .or_default()
            .insert(field_name.clone(), resolvable)
            .is_some()
        {
            tracing::debug!("replacing the resolver of {type_name}.{field_name}");
        }
    }

    pub(crate) fn get(&self, type_name: &str, field_name: &str) -> &Resolvable {
        self.fields
            .get(type_name)
            .and_then(|fields| fields.get(field_name))
            .unwrap_or(PROPERTY)
    }

    pub(crate) fn type_resolver(&self, abstract_type: &str) -> Option<&dyn TypeResolver> {
        self.type_resolvers
            .get(abstract_type)
            .map(|type_resolver| type_resolver.as_ref())
    }
}

impl std::fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut fields = self
            .fields
            .iter()
            .flat_map(|(type_name, fields)| {
                fields
                    .keys()
                    .map(move |field_name| format!("{type_name}.{field_name}"))
            })
            .collect::<Vec<_>>();
        fields.sort();
        let mut type_resolvers = self.type_resolvers.keys().collect::<Vec<_>>();
        type_resolvers.sort();
        f.debug_struct("ResolverRegistry")
            .field("fields", &fields)
            .field("type_resolvers", &type_resolvers)
            .finish()
    }
}
