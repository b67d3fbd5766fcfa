use apollo_compiler::executable;

use crate::json_ext::Object;

pub(crate) const SKIP_DIRECTIVE_NAME: &str = "skip";
pub(crate) const INCLUDE_DIRECTIVE_NAME: &str = "include";

/// The `@include` and `@skip` conditions of a selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct IncludeSkip {
    include: Condition,
    skip: Condition,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Condition {
    Yes,
    No,
    Variable(String),
}

impl IncludeSkip {
    pub(crate) fn parse(directives: &executable::DirectiveList) -> Self {
        let mut include = None;
        let mut skip = None;
        for directive in &directives.0 {
            if include.is_none() && directive.name == INCLUDE_DIRECTIVE_NAME {
                include = Condition::parse(directive)
            }
            if skip.is_none() && directive.name == SKIP_DIRECTIVE_NAME {
                skip = Condition::parse(directive)
            }
        }
        Self {
            include: include.unwrap_or(Condition::Yes),
            skip: skip.unwrap_or(Condition::No),
        }
    }

    pub(crate) fn should_skip(&self, variables: &Object) -> bool {
        // coerced variables are booleans, an absent one keeps the directive default
        self.skip.eval(variables).unwrap_or(false) || !self.include.eval(variables).unwrap_or(true)
    }
}

impl Condition {
    pub(crate) fn parse(directive: &executable::Directive) -> Option<Self> {
        match directive.specified_argument_by_name("if")?.as_ref() {
            executable::Value::Boolean(true) => Some(Condition::Yes),
            executable::Value::Boolean(false) => Some(Condition::No),
            executable::Value::Variable(variable) => {
                Some(Condition::Variable(variable.as_str().to_owned()))
            }
            _ => None,
        }
    }

    pub(crate) fn eval(&self, variables: &Object) -> Option<bool> {
        match self {
            Condition::Yes => Some(true),
            Condition::No => Some(false),
            Condition::Variable(variable_name) => variables
                .get(variable_name.as_str())
                .and_then(|v| v.as_bool()),
        }
    }
}
