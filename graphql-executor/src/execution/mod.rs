//! Execution of an operation: from a request to a [`Response`].
//!
//! Spec: <https://spec.graphql.org/October2021/#sec-Execution>

use std::sync::Arc;

use apollo_compiler::Node;
use apollo_compiler::executable::Operation;
use apollo_compiler::executable::SelectionSet;
use derivative::Derivative;
use futures::StreamExt;
use futures::future::join_all;
use futures::stream;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map as JsonMap;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::configuration::Configuration;
use crate::configuration::Execution;
use crate::error::ExecutionError;
use crate::graphql::Location;
use crate::graphql::Response;
use crate::json_ext::Object;
use crate::json_ext::ResponsePath;
use crate::json_ext::Value;
use crate::resolver::DirectiveRegistry;
use crate::resolver::Extensions;
use crate::resolver::ExtensionsMutex;
use crate::resolver::ResolverRegistry;
use crate::spec::OperationKind;
use crate::spec::Query;
use crate::spec::Schema;
use crate::spec::SpecError;
use crate::spec::TYPENAME;

mod collect;
mod complete;
mod resolve;
mod result;

pub use collect::ErrorSink;
pub use collect::FieldMergeConflict;
use collect::CollectedField;
use collect::collect_fields;
use complete::complete_value;
use resolve::resolve_field;
pub(crate) use result::ErrorCollector;
use result::InvalidValue;

pub(crate) const EXECUTE_SPAN_NAME: &str = "execute";
pub(crate) const SEQUENCE_SPAN_NAME: &str = "sequence";
pub(crate) const PARALLEL_SPAN_NAME: &str = "parallel";
pub(crate) const FIELD_SPAN_NAME: &str = "resolve_field";

/// Executes operations against a schema and its resolvers.
///
/// Cheap to clone: everything it holds is shared.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct Executor {
    schema: Arc<Schema>,
    resolvers: Arc<ResolverRegistry>,
    directives: Arc<DirectiveRegistry>,
    configuration: Arc<Configuration>,
    #[derivative(Debug = "ignore")]
    error_sink: Option<Arc<dyn ErrorSink>>,
}

#[buildstructor::buildstructor]
impl Executor {
    /// Returns a builder that builds an [`Executor`].
    ///
    /// Builder methods:
    ///
    /// * `.schema(impl Into<Arc<Schema>>)`
    ///   Required.
    ///
    /// * `.resolvers(ResolverRegistry)`
    ///   Required.
    ///
    /// * `.directives(DirectiveRegistry)`
    ///   Optional. Middleware of the directives of the schema and the documents.
    ///
    /// * `.configuration(Configuration)`
    ///   Optional, defaults to [`Configuration::default`].
    ///
    /// * `.error_sink(Arc<dyn ErrorSink>)`
    ///   Optional. Receives the anomalies that do not fail an execution.
    ///
    /// * `.build()`
    ///   Finishes the builder and returns an [`Executor`].
    #[builder(visibility = "pub")]
    fn new(
        schema: Arc<Schema>,
        resolvers: ResolverRegistry,
        directives: Option<DirectiveRegistry>,
        configuration: Option<Configuration>,
        error_sink: Option<Arc<dyn ErrorSink>>,
    ) -> Self {
        Self {
            schema,
            resolvers: Arc::new(resolvers),
            directives: Arc::new(directives.unwrap_or_default()),
            configuration: Arc::new(configuration.unwrap_or_default()),
            error_sink,
        }
    }

    /// The schema operations are executed against.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// The configuration of this executor.
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Executes one operation of a document.
    ///
    /// Never fails: request errors end up in a [`Response`] without `data`, field
    /// errors next to the data that could be resolved.
    pub async fn execute(&self, request: ExecutionRequest) -> Response {
        let ExecutionRequest {
            query,
            operation_name,
            variables,
            root_value,
            extensions,
            cancellation,
        } = request;

        let operation = match query.operation(operation_name.as_deref()) {
            Ok(operation) => operation,
            Err(error) => {
                tracing::debug!("cannot select the operation to execute: {error}");
                return error.to_response();
            }
        };
        let kind = OperationKind::from(operation.operation_type);
        let span = tracing::info_span!(
            EXECUTE_SPAN_NAME,
            "graphql.operation.kind" = %kind,
            "graphql.operation.name" = operation.name.as_ref().map(|name| name.as_str()).unwrap_or_default(),
            "otel.kind" = "INTERNAL"
        );

        async {
            if cancellation.is_cancelled() {
                tracing::debug!("operation canceled before execution");
                return ExecutionError::OperationCanceled.to_response();
            }

            tokio::select! {
                biased;
                _ = cancellation.cancelled() => {
                    tracing::debug!("operation canceled during execution");
                    ExecutionError::OperationCanceled.to_response()
                }
                response = self.execute_operation(
                    &query,
                    operation,
                    &variables,
                    root_value,
                    extensions,
                    &cancellation,
                ) => response,
            }
        }
        .instrument(span)
        .await
    }

    async fn execute_operation(
        &self,
        query: &Query,
        operation: &Node<Operation>,
        variables: &Object,
        root_value: Value,
        extensions: Extensions,
        cancellation: &CancellationToken,
    ) -> Response {
        let kind = OperationKind::from(operation.operation_type);
        let Some(root_type) = self.schema.root_operation_type(kind) else {
            return SpecError::MissingRootType(kind).to_response();
        };

        let variables = match query.coerce_variables(operation, variables, &self.schema) {
            Ok(variables) => Arc::new(variables),
            Err(errors) => {
                tracing::debug!("invalid variables: {} errors", errors.len());
                return Response::builder().errors(errors).build();
            }
        };

        let errors = ErrorCollector::default();
        let execution_extensions = ExtensionsMutex::from(extensions);
        let parameters = ExecutionParameters {
            schema: &self.schema,
            query,
            resolvers: &self.resolvers,
            directives: &self.directives,
            configuration: self.configuration.execution(),
            error_sink: self.error_sink.as_deref(),
            variables: &variables,
            errors: &errors,
            execution_extensions: &execution_extensions,
            cancellation,
        };

        let root_path = ResponsePath::root();
        // the root selection set is collected up front: failing to do so fails
        // the whole request
        let fields = match collect_fields(
            &parameters,
            root_type,
            &[&operation.selection_set],
            &root_path,
        ) {
            Ok(fields) => fields,
            Err(error) => return error.to_response(),
        };

        let serial = kind == OperationKind::Mutation;
        let span = if serial {
            tracing::info_span!(SEQUENCE_SPAN_NAME, "otel.kind" = "INTERNAL")
        } else {
            tracing::info_span!(PARALLEL_SPAN_NAME, "otel.kind" = "INTERNAL")
        };
        let data = execute_fields(
            &parameters,
            root_type,
            Arc::new(root_value),
            &fields,
            &root_path,
            serial,
        )
        .instrument(span)
        .await
        .map(Value::Object);

        errors.into_response(data)
    }
}

/// One execution of an operation.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct ExecutionRequest {
    /// The document.
    pub query: Arc<Query>,
    /// The operation of the document to execute, required when it has more than one.
    pub operation_name: Option<String>,
    /// The raw variables, coerced against the variable definitions of the operation.
    pub variables: Object,
    /// The parent value of the root fields.
    pub root_value: Value,
    /// The initial content of the extensions shared by every resolver of the execution.
    pub extensions: Extensions,
    /// Stops the execution when cancelled.
    pub cancellation: CancellationToken,
}

#[buildstructor::buildstructor]
impl ExecutionRequest {
    /// Returns a builder that builds an [`ExecutionRequest`].
    ///
    /// Builder methods:
    ///
    /// * `.query(impl Into<Arc<Query>>)`
    ///   Required.
    ///
    /// * `.operation_name(impl Into<String>)`
    ///   Optional.
    ///
    /// * `.variables(Object)` or `.variable(impl Into<ByteString>, impl Into<Value>)`
    ///   Optional, may be called multiple times.
    ///
    /// * `.root_value(impl Into<Value>)`
    ///   Optional, defaults to `null`.
    ///
    /// * `.extensions(Extensions)`
    ///   Optional.
    ///
    /// * `.cancellation(CancellationToken)`
    ///   Optional.
    ///
    /// * `.build()`
    ///   Finishes the builder and returns an [`ExecutionRequest`].
    #[builder(visibility = "pub")]
    fn new(
        query: Arc<Query>,
        operation_name: Option<String>,
        // Skip the `Object` type alias in order to use buildstructor's map special-casing
        variables: JsonMap<ByteString, Value>,
        root_value: Option<Value>,
        extensions: Option<Extensions>,
        cancellation: Option<CancellationToken>,
    ) -> Self {
        Self {
            query,
            operation_name,
            variables,
            root_value: root_value.unwrap_or_default(),
            extensions: extensions.unwrap_or_default(),
            cancellation: cancellation.unwrap_or_default(),
        }
    }
}

// holds the execution arguments that do not change between fields
#[derive(Derivative)]
#[derivative(Debug)]
pub(crate) struct ExecutionParameters<'a> {
    pub(crate) schema: &'a Schema,
    pub(crate) query: &'a Query,
    pub(crate) resolvers: &'a ResolverRegistry,
    pub(crate) directives: &'a DirectiveRegistry,
    pub(crate) configuration: &'a Execution,
    #[derivative(Debug = "ignore")]
    pub(crate) error_sink: Option<&'a dyn ErrorSink>,
    pub(crate) variables: &'a Arc<Object>,
    pub(crate) errors: &'a ErrorCollector,
    pub(crate) execution_extensions: &'a ExtensionsMutex,
    pub(crate) cancellation: &'a CancellationToken,
}

impl ExecutionParameters<'_> {
    /// Where a node of the document starts, when errors carry locations.
    pub(crate) fn locations<T>(&self, node: &Node<T>) -> Vec<Location> {
        if !self.configuration.error_locations() {
            return Vec::new();
        }
        self.query.location(node).into_iter().collect()
    }
}

/// Collects the fields of an object, then executes them.
pub(crate) async fn execute_selection_set<'a>(
    parameters: &'a ExecutionParameters<'a>,
    object_type: &'a str,
    value: Value,
    selection_sets: &[&'a SelectionSet],
    path: &ResponsePath,
    serial: bool,
) -> Result<Value, InvalidValue> {
    let fields = collect_fields(parameters, object_type, selection_sets, path).map_err(|error| {
        let mut error = error.to_graphql_error();
        error.path = Some(path.to_path());
        parameters.errors.push(error);
        InvalidValue
    })?;

    execute_fields(
        parameters,
        object_type,
        Arc::new(value),
        &fields,
        path,
        serial,
    )
    .await
    .map(Value::Object)
}

/// Executes the fields of one object, one after the other when `serial`, all
/// at once otherwise. The response keys keep the order of `fields`.
async fn execute_fields<'a>(
    parameters: &'a ExecutionParameters<'a>,
    object_type: &'a str,
    parent: Arc<Value>,
    fields: &'a [CollectedField<'a>],
    path: &ResponsePath,
    serial: bool,
) -> Result<Object, InvalidValue> {
    let parent_type: Arc<str> = Arc::from(object_type);
    let executions = fields.iter().map(|field| {
        execute_field(
            parameters,
            object_type,
            &parent_type,
            &parent,
            field,
            path.key(field.response_key()),
        )
    })
    .collect::<Vec<_>>();

    let results: Vec<_> = if serial {
        let mut results = Vec::with_capacity(fields.len());
        for execution in executions {
            let result = execution.await;
            let failed = result.is_err();
            results.push(result);
            // the remaining fields would be discarded with this object
            if failed {
                break;
            }
        }
        results
    } else {
        match parameters.configuration.max_concurrent_fields() {
            Some(limit) => {
                stream::iter(executions)
                    .buffered(limit.get())
                    .collect::<Vec<_>>()
                    .await
            }
            None => join_all(executions).await,
        }
    };

    let mut object = Object::with_capacity(fields.len());
    for (field, result) in fields.iter().zip(results) {
        object.insert(field.response_key(), result?);
    }
    Ok(object)
}

async fn execute_field<'a>(
    parameters: &'a ExecutionParameters<'a>,
    object_type: &'a str,
    parent_type: &'a Arc<str>,
    parent: &'a Arc<Value>,
    field: &'a CollectedField<'a>,
    path: ResponsePath,
) -> Result<Value, InvalidValue> {
    let field_name = field.name();
    if field_name == TYPENAME {
        return Ok(Value::String(object_type.into()));
    }

    let span = tracing::trace_span!(
        FIELD_SPAN_NAME,
        "graphql.field.path" = %path,
        "graphql.field.type" = object_type,
        "graphql.field.name" = field_name,
    );
    let resolved = match resolve_field(parameters, parent_type, parent, field, &path)
        .instrument(span)
        .await
    {
        Ok(value) => value,
        Err(error) => {
            parameters.errors.push(error);
            return if field.ty().is_non_null() {
                Err(InvalidValue)
            } else {
                Ok(Value::Null)
            };
        }
    };

    complete_value(
        parameters,
        object_type,
        field,
        field.ty(),
        resolved,
        path,
    )
    .await
}
