//! Field collection: from selection sets to the fields of one object type.
//!
//! Spec: <https://spec.graphql.org/October2021/#sec-Field-Collection>

use std::collections::HashSet;

use apollo_compiler::Node;
use apollo_compiler::ast;
use apollo_compiler::ast::Directive;
use apollo_compiler::ast::DirectiveList;
use apollo_compiler::executable::Field;
use apollo_compiler::executable::Selection;
use apollo_compiler::executable::SelectionSet;
use apollo_compiler::schema::FieldDefinition;
use indexmap::IndexMap;
use serde::Serialize;

use super::ExecutionParameters;
use crate::configuration::FieldMergePolicy;
use crate::error::ExecutionError;
use crate::json_ext::Path;
use crate::json_ext::ResponsePath;
use crate::spec::IncludeSkip;
use crate::spec::SpecError;

/// The fields of a selection set sharing one response key.
#[derive(Debug)]
pub(crate) struct CollectedField<'a> {
    /// The first occurrence, which decides the field name, arguments and directives.
    pub(crate) field: &'a Node<Field>,
    /// The definition of the field on the object type being executed.
    ///
    /// A selection made through an interface points at the interface field, whose
    /// type can be wider than the one of the object.
    pub(crate) definition: &'a Node<FieldDefinition>,
    /// The selection sets of every occurrence, in document order.
    pub(crate) selection_sets: Vec<&'a SelectionSet>,
}

impl<'a> CollectedField<'a> {
    pub(crate) fn response_key(&self) -> &str {
        self.field.response_key().as_str()
    }

    pub(crate) fn name(&self) -> &str {
        self.field.name.as_str()
    }

    /// The return type declared by the object type.
    pub(crate) fn ty(&self) -> &'a ast::Type {
        &self.definition.ty
    }
}

/// Two selections with the same response key that select different fields,
/// or the same field with different arguments or directives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct FieldMergeConflict {
    /// The object type the fields were collected for.
    pub parent_type: String,
    /// The response key shared by both selections.
    pub response_key: String,
    /// Where the field is written in the response.
    pub path: Path,
    /// What differs between the two selections.
    pub reason: String,
}

/// Receives the anomalies that do not stop an execution.
pub trait ErrorSink: Send + Sync + 'static {
    /// A later selection was merged into an earlier one it conflicts with.
    /// The earlier selection wins.
    fn field_merge_conflict(&self, conflict: &FieldMergeConflict);
}

/// Collects the fields of `selection_sets` that apply to `object_type`, merged
/// by response key, in the order their keys first appear.
pub(crate) fn collect_fields<'a>(
    parameters: &ExecutionParameters<'a>,
    object_type: &str,
    selection_sets: &[&'a SelectionSet],
    path: &ResponsePath,
) -> Result<Vec<CollectedField<'a>>, SpecError> {
    let mut collector = Collector {
        parameters,
        object_type,
        path,
        fields: IndexMap::new(),
        visited_fragments: HashSet::new(),
    };
    for selection_set in selection_sets {
        collector.collect(selection_set, 0)?;
    }
    Ok(collector.fields.into_values().collect())
}

struct Collector<'p, 'a> {
    parameters: &'p ExecutionParameters<'a>,
    object_type: &'p str,
    path: &'p ResponsePath,
    fields: IndexMap<&'a str, CollectedField<'a>>,
    visited_fragments: HashSet<&'a str>,
}

impl<'a> Collector<'_, 'a> {
    fn collect(&mut self, selection_set: &'a SelectionSet, depth: usize) -> Result<(), SpecError> {
        if depth > self.parameters.configuration.recursion_limit() {
            return Err(SpecError::RecursionLimitExceeded);
        }

        for selection in &selection_set.selections {
            match selection {
                Selection::Field(field) => {
                    if IncludeSkip::parse(&field.directives).should_skip(self.parameters.variables)
                    {
                        continue;
                    }
                    self.merge(field);
                }
                Selection::FragmentSpread(spread) => {
                    if IncludeSkip::parse(&spread.directives).should_skip(self.parameters.variables)
                    {
                        continue;
                    }
                    let name = spread.fragment_name.as_str();
                    let Some(fragment) = self.parameters.query.fragments.get(name) else {
                        failfast_debug!("unknown fragment '{}'", name);
                        continue;
                    };
                    // a fragment is applied once per collection, wherever it is spread
                    if !self.visited_fragments.insert(fragment.name.as_str()) {
                        continue;
                    }
                    if self.applies(fragment.type_condition().as_str()) {
                        self.collect(&fragment.selection_set, depth + 1)?;
                    }
                }
                Selection::InlineFragment(inline) => {
                    if IncludeSkip::parse(&inline.directives).should_skip(self.parameters.variables)
                    {
                        continue;
                    }
                    let applies = inline
                        .type_condition
                        .as_ref()
                        .is_none_or(|condition| self.applies(condition.as_str()));
                    if applies {
                        self.collect(&inline.selection_set, depth + 1)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn applies(&self, type_condition: &str) -> bool {
        self.parameters
            .schema
            .is_subtype(type_condition, self.object_type)
    }

    fn merge(&mut self, field: &'a Node<Field>) {
        let response_key = field.response_key().as_str();
        match self.fields.get_mut(response_key) {
            None => {
                // meta fields such as `__typename` are only known to the document
                let definition = self
                    .parameters
                    .schema
                    .object_field(self.object_type, field.name.as_str())
                    .unwrap_or(&field.definition);
                self.fields.insert(
                    response_key,
                    CollectedField {
                        field,
                        definition,
                        selection_sets: vec![&field.selection_set],
                    },
                );
            }
            Some(collected) => {
                collected.selection_sets.push(&field.selection_set);
                if let Some(reason) = conflict(collected.field, field) {
                    self.report_conflict(field, reason);
                }
            }
        }
    }

    fn report_conflict(&self, field: &Node<Field>, reason: String) {
        let response_key = field.response_key().as_str();
        let path = self.path.key(response_key).to_path();
        tracing::warn!(
            parent_type = self.object_type,
            response_key,
            path = %path,
            "conflicting selections for the same response key: {reason}"
        );

        if self.parameters.configuration.field_merge() == FieldMergePolicy::Strict {
            let error = ExecutionError::FieldMergeConflict {
                response_key: response_key.to_string(),
                reason: reason.clone(),
            };
            self.parameters.errors.push(
                error.to_graphql_error(Some(path.clone()), self.parameters.locations(field)),
            );
        }

        if let Some(sink) = self.parameters.error_sink {
            sink.field_merge_conflict(&FieldMergeConflict {
                parent_type: self.object_type.to_string(),
                response_key: response_key.to_string(),
                path,
                reason,
            });
        }
    }
}

/// Why `other` cannot be merged into `first`, if it cannot.
fn conflict(first: &Field, other: &Field) -> Option<String> {
    if first.name != other.name {
        return Some(format!(
            "'{}' and '{}' are different fields",
            first.name, other.name
        ));
    }
    let same_arguments = first.arguments.len() == other.arguments.len()
        && first.arguments.iter().all(|argument| {
            other
                .arguments
                .iter()
                .any(|candidate| candidate.name == argument.name && candidate.value == argument.value)
        });
    if !same_arguments {
        return Some(format!(
            "they have differing arguments for field '{}'",
            first.name
        ));
    }
    if !same_directives(&first.directives, &other.directives) {
        return Some(format!(
            "they have differing directives for field '{}'",
            first.name
        ));
    }
    None
}

/// Compares the directives that build middleware. `@skip` and `@include` were
/// already applied during collection.
fn same_directives(first: &DirectiveList, other: &DirectiveList) -> bool {
    fn middleware(directives: &DirectiveList) -> impl Iterator<Item = &Node<Directive>> {
        directives
            .iter()
            .filter(|directive| !matches!(directive.name.as_str(), "skip" | "include"))
    }
    middleware(first).eq(middleware(other))
}
