//! Directive middleware around field resolvers.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::FieldError;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::resolver::Resolvable;
use crate::resolver::ResolverContext;

/// A link of the chain wrapping a field resolver.
///
/// A middleware receives the owned context of the call and the rest of the
/// chain. It may change the context, call [`Next::run`] any number of times
/// (including zero), and transform or replace the result.
///
/// ```ignore
/// struct Upper;
///
/// #[async_trait::async_trait]
/// impl FieldMiddleware for Upper {
///     async fn call(&self, ctx: ResolverContext, next: Next<'_>) -> Result<Value, FieldError> {
///         let value = next.run(ctx).await?;
///         Ok(value.as_str().map(|s| s.to_uppercase().into()).unwrap_or(value))
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait FieldMiddleware: Send + Sync + 'static {
    /// Runs this link of the chain.
    async fn call(&self, ctx: ResolverContext, next: Next<'_>) -> Result<Value, FieldError>;
}

/// The rest of a middleware chain, ending with the field resolver.
pub struct Next<'a> {
    chain: &'a [Arc<dyn FieldMiddleware>],
    resolver: &'a Resolvable,
}

impl<'a> Next<'a> {
    pub(crate) fn new(chain: &'a [Arc<dyn FieldMiddleware>], resolver: &'a Resolvable) -> Self {
        Self { chain, resolver }
    }

    /// Calls the next middleware, or the resolver at the end of the chain.
    pub fn run(self, ctx: ResolverContext) -> BoxFuture<'a, Result<Value, FieldError>> {
        match self.chain.split_first() {
            Some((middleware, chain)) => middleware.call(
                ctx,
                Next {
                    chain,
                    resolver: self.resolver,
                },
            ),
            None => self.resolver.resolve(ctx),
        }
    }
}

/// Creates the middleware of a directive, once per field occurrence, from the
/// coerced arguments of the directive.
pub trait DirectiveMiddlewareFactory: Send + Sync + 'static {
    /// The middleware for a directive with these arguments.
    fn create(&self, arguments: &Object) -> Arc<dyn FieldMiddleware>;
}

impl<F> DirectiveMiddlewareFactory for F
where
    F: Fn(&Object) -> Arc<dyn FieldMiddleware> + Send + Sync + 'static,
{
    fn create(&self, arguments: &Object) -> Arc<dyn FieldMiddleware> {
        (self)(arguments)
    }
}

/// The directives that wrap resolvers with middleware, by directive name.
///
/// A directive without a registration has no effect on resolution, except
/// `@skip` and `@include` which are applied while collecting fields.
#[derive(Clone, Default)]
pub struct DirectiveRegistry {
    factories: HashMap<String, Arc<dyn DirectiveMiddlewareFactory>>,
}

impl DirectiveRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the middleware factory of a directive.
    pub fn register(
        mut self,
        directive_name: impl Into<String>,
        factory: impl DirectiveMiddlewareFactory,
    ) -> Self {
        self.factories
            .insert(directive_name.into(), Arc::new(factory));
        self
    }

    pub(crate) fn get(&self, directive_name: &str) -> Option<&dyn DirectiveMiddlewareFactory> {
        self.factories.get(directive_name).map(|factory| factory.as_ref())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for DirectiveRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}
