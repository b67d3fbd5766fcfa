//! Logic for loading configuration in to an object model

use std::num::NonZeroUsize;
use std::str::FromStr;

use derivative::Derivative;
use displaydoc::Display;
use schemars::JsonSchema;
use schemars::r#gen::SchemaSettings;
use schemars::schema::RootSchema;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Configuration error.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// {message}: {error}
    InvalidConfiguration {
        /// What is invalid.
        message: &'static str,
        /// The offending value.
        error: String,
    },
    /// could not deserialize configuration: {0}
    DeserializeConfigError(serde_yaml::Error),
}

/// The configuration of an [`crate::Executor`].
///
/// Can be created through `serde::Deserialize` from various formats,
/// from YAML with [`FromStr`], or inline in Rust code with the builder.
#[derive(Clone, Derivative, Deserialize, Serialize, JsonSchema, Default)]
#[derivative(Debug)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    /// Configuration options pertaining to query execution.
    #[serde(default)]
    pub(crate) execution: Execution,
}

#[buildstructor::buildstructor]
impl Configuration {
    #[builder(visibility = "pub")]
    fn new(execution: Option<Execution>) -> Result<Self, ConfigurationError> {
        let configuration = Self {
            execution: execution.unwrap_or_default(),
        };
        configuration.validate()
    }

    /// The execution options.
    pub fn execution(&self) -> &Execution {
        &self.execution
    }

    /// Generate the JSON schema of the configuration.
    pub fn json_schema() -> RootSchema {
        let settings = SchemaSettings::draft07().with(|s| {
            s.option_nullable = true;
            s.option_add_null_type = false;
            s.inline_subschemas = false;
        });
        settings
            .into_generator()
            .into_root_schema_for::<Configuration>()
    }

    pub(crate) fn validate(self) -> Result<Self, ConfigurationError> {
        if self.execution.recursion_limit == 0 {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "execution.recursion_limit must be greater than zero",
                error: self.execution.recursion_limit.to_string(),
            });
        }
        Ok(self)
    }
}

impl FromStr for Configuration {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let configuration: Configuration =
            serde_yaml::from_str(s).map_err(ConfigurationError::DeserializeConfigError)?;
        configuration.validate()
    }
}

/// Query execution options.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Execution {
    /// Maximum nesting of selection sets and fragments collected for one field.
    ///
    /// Defaults to 512
    pub(crate) recursion_limit: usize,

    /// Maximum number of sibling fields resolved at the same time.
    ///
    /// Unbounded when absent. Mutation root fields always run one at a time.
    pub(crate) max_concurrent_fields: Option<NonZeroUsize>,

    /// What to do when two selections share a response key but select different
    /// fields or pass different arguments.
    pub(crate) field_merge: FieldMergePolicy,

    /// Attach the location of the field in the document to field errors.
    ///
    /// Defaults to true
    pub(crate) error_locations: bool,
}

/// Handling of conflicting selections for a response key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldMergePolicy {
    /// Keep the first selection, report the conflict to the error sink and the logs.
    #[default]
    Lenient,
    /// Like `lenient`, and also add an error to the response.
    Strict,
}

#[buildstructor::buildstructor]
impl Execution {
    #[builder(visibility = "pub")]
    fn new(
        recursion_limit: Option<usize>,
        max_concurrent_fields: Option<NonZeroUsize>,
        field_merge: Option<FieldMergePolicy>,
        error_locations: Option<bool>,
    ) -> Self {
        Self {
            recursion_limit: recursion_limit.unwrap_or_else(default_recursion_limit),
            max_concurrent_fields,
            field_merge: field_merge.unwrap_or_default(),
            error_locations: error_locations.unwrap_or(true),
        }
    }

    /// Maximum nesting of collected selection sets.
    pub fn recursion_limit(&self) -> usize {
        self.recursion_limit
    }

    /// Bound on sibling fields in flight, if any.
    pub fn max_concurrent_fields(&self) -> Option<NonZeroUsize> {
        self.max_concurrent_fields
    }

    /// Policy for conflicting selections.
    pub fn field_merge(&self) -> FieldMergePolicy {
        self.field_merge
    }

    /// Whether field errors carry document locations.
    pub fn error_locations(&self) -> bool {
        self.error_locations
    }
}

impl Default for Execution {
    fn default() -> Self {
        Execution::builder().build()
    }
}

fn default_recursion_limit() -> usize {
    512
}
