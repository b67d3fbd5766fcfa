use std::sync::Arc;

use graphql_executor::ExecutionRequest;
use graphql_executor::Executor;
use graphql_executor::Query;
use graphql_executor::ResolverRegistry;
use graphql_executor::Response;
use graphql_executor::Schema;
use serde_json_bytes::Value;

mod coercion;
mod execution;
mod null_propagation;

pub(crate) fn executor(sdl: &str, resolvers: ResolverRegistry) -> Executor {
    Executor::builder()
        .schema(Arc::new(Schema::parse(sdl).expect("schema must be valid")))
        .resolvers(resolvers)
        .build()
}

pub(crate) fn request(executor: &Executor, query: &str, variables: Value) -> ExecutionRequest {
    let query = Query::parse(query, executor.schema()).expect("query must be valid");
    let Value::Object(variables) = variables else {
        panic!("variables must be an object");
    };
    ExecutionRequest::builder()
        .query(query.into())
        .variables(variables)
        .build()
}

/// Executes a query without root value, and returns the response as JSON.
pub(crate) async fn run(executor: &Executor, query: &str, variables: Value) -> Value {
    to_json(executor.execute(request(executor, query, variables)).await)
}

pub(crate) fn to_json(response: Response) -> Value {
    serde_json_bytes::to_value(&response).expect("responses serialize")
}
