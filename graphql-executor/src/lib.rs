//! Executes GraphQL operations against a schema and user supplied resolvers.
//!
//! ```ignore
//! let schema = Arc::new(Schema::parse("type Query { hello(name: String = \"world\"): String }")?);
//! let resolvers = ResolverRegistry::new().register("Query", "hello", |ctx: ResolverContext| async move {
//!     let name = ctx.argument("name").and_then(|name| name.as_str()).unwrap_or_default();
//!     Ok(format!("hello {name}").into())
//! });
//! let executor = Executor::builder().schema(schema).resolvers(resolvers).build();
//!
//! let query = Query::parse("{ hello }", executor.schema())?;
//! let response = executor
//!     .execute(ExecutionRequest::builder().query(query).build())
//!     .await;
//! ```
//!
//! Parsing and validation of schemas and documents are done by `apollo-compiler`.

#![cfg_attr(feature = "failfast", allow(unreachable_code))]
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo
    )
)]
#![warn(unreachable_pub)]

macro_rules! failfast_debug {
    ($($tokens:tt)+) => {{
        tracing::debug!($($tokens)+);
        #[cfg(feature = "failfast")]
        panic!(
            "failfast triggered. \
            Please remove the feature failfast if you don't want to see these panics"
        );
    }};
}

pub mod configuration;
pub mod error;
mod execution;
pub mod graphql;
pub mod json_ext;
pub mod resolver;
mod spec;

pub use configuration::Configuration;
pub use execution::ErrorSink;
pub use execution::ExecutionRequest;
pub use execution::Executor;
pub use execution::FieldMergeConflict;
pub use graphql::Response;
pub use resolver::ResolverContext;
pub use resolver::ResolverRegistry;
pub use spec::CustomScalar;
pub use spec::OperationKind;
pub use spec::Query;
pub use spec::Schema;
pub use spec::SpecError;
