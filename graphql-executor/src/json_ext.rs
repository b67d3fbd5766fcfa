//! Performance oriented JSON manipulation.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map;
pub use serde_json_bytes::Value;

/// A JSON object.
pub type Object = Map<ByteString, Value>;

/// Extension trait for [`serde_json_bytes::Value`].
pub trait ValueExt {
    /// Returns `true` if the values are equal and the objects are ordered the same.
    ///
    /// **Note:** this is recursive.
    fn eq_and_ordered(&self, other: &Self) -> bool;

    /// Whether the value can be accepted as an `Int` input.
    ///
    /// Spec: <https://spec.graphql.org/October2021/#sec-Int.Input-Coercion>
    fn is_valid_int_input(&self) -> bool;

    /// Whether the value can be accepted as a `Float` input.
    ///
    /// Spec: <https://spec.graphql.org/October2021/#sec-Float.Input-Coercion>
    fn is_valid_float_input(&self) -> bool;

    /// Whether the value is an integral number that fits in 32 bits, the only
    /// values an `Int` field may serialize to.
    fn is_valid_int_output(&self) -> bool;

    /// A short name for the kind of value, used in error messages.
    fn json_type_name(&self) -> &'static str;
}

impl ValueExt for Value {
    fn eq_and_ordered(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => {
                let mut it_a = a.iter();
                let mut it_b = b.iter();

                loop {
                    match (it_a.next(), it_b.next()) {
                        (Some(_), None) | (None, Some(_)) => break false,
                        (None, None) => break true,
                        (Some((field_a, value_a)), Some((field_b, value_b)))
                            if field_a == field_b && ValueExt::eq_and_ordered(value_a, value_b) =>
                        {
                            continue;
                        }
                        (Some(_), Some(_)) => break false,
                    }
                }
            }
            (Value::Array(a), Value::Array(b)) => {
                let mut it_a = a.iter();
                let mut it_b = b.iter();

                loop {
                    match (it_a.next(), it_b.next()) {
                        (Some(_), None) | (None, Some(_)) => break false,
                        (None, None) => break true,
                        (Some(value_a), Some(value_b))
                            if ValueExt::eq_and_ordered(value_a, value_b) =>
                        {
                            continue;
                        }
                        (Some(_), Some(_)) => break false,
                    }
                }
            }
            (a, b) => a == b,
        }
    }

    fn is_valid_int_input(&self) -> bool {
        self.as_i64().and_then(|x| i32::try_from(x).ok()).is_some()
            || self.as_u64().and_then(|x| i32::try_from(x).ok()).is_some()
    }

    fn is_valid_float_input(&self) -> bool {
        self.is_number()
    }

    fn is_valid_int_output(&self) -> bool {
        if self.is_valid_int_input() {
            return true;
        }
        // 1.0 is an acceptable output for an Int field, 1.5 is not
        self.as_f64()
            .is_some_and(|f| f.fract() == 0.0 && f >= i32::MIN as f64 && f <= i32::MAX as f64)
    }

    fn json_type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "list",
            Value::Object(_) => "object",
        }
    }
}

/// A GraphQL path element that is composed of strings or numbers.
/// e.g `/book/3/name`
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathElement {
    /// An index path element.
    Index(usize),

    /// A key path element.
    Key(String),
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElement::Index(index) => write!(f, "{index}"),
            PathElement::Key(key) => write!(f, "{key}"),
        }
    }
}

impl From<usize> for PathElement {
    fn from(index: usize) -> Self {
        PathElement::Index(index)
    }
}

impl From<&str> for PathElement {
    fn from(key: &str) -> Self {
        PathElement::Key(key.to_string())
    }
}

impl From<String> for PathElement {
    fn from(key: String) -> Self {
        PathElement::Key(key)
    }
}

/// A path into the result document.
///
/// This can be composed of strings and numbers
#[derive(Clone, Debug, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(pub Vec<PathElement>);

impl Path {
    pub fn empty() -> Path {
        Path(Default::default())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathElement> {
        self.0.iter()
    }

    pub fn last(&self) -> Option<&PathElement> {
        self.0.last()
    }

    pub fn push(&mut self, element: PathElement) {
        self.0.push(element)
    }
}

impl<T> From<T> for Path
where
    T: AsRef<str>,
{
    fn from(s: T) -> Self {
        Self(
            s.as_ref()
                .split('/')
                .filter(|s| !s.is_empty())
                .map(|s| match s.parse::<usize>() {
                    Ok(index) => PathElement::Index(index),
                    Err(_) => PathElement::Key(s.to_string()),
                })
                .collect(),
        )
    }
}

impl FromIterator<PathElement> for Path {
    fn from_iter<T: IntoIterator<Item = PathElement>>(iter: T) -> Self {
        Path(iter.into_iter().collect())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in self.iter() {
            write!(f, "/{element}")?;
        }
        Ok(())
    }
}

/// The path of the value currently being completed.
///
/// Every field of a response extends the path of its parent, so paths are
/// kept as a linked list sharing their tail: extending is an allocation of a
/// single node, and the full [`Path`] is only materialized when an error needs it.
#[derive(Clone, Default)]
pub struct ResponsePath(Option<Arc<PathNode>>);

struct PathNode {
    element: PathElement,
    parent: ResponsePath,
    depth: usize,
}

impl ResponsePath {
    /// The path of the operation's root selection set.
    pub fn root() -> Self {
        Self(None)
    }

    /// Path of a field of the current object.
    pub fn key(&self, key: impl Into<String>) -> Self {
        self.child(PathElement::Key(key.into()))
    }

    /// Path of an element of the current list.
    pub fn index(&self, index: usize) -> Self {
        self.child(PathElement::Index(index))
    }

    fn child(&self, element: PathElement) -> Self {
        Self(Some(Arc::new(PathNode {
            element,
            parent: self.clone(),
            depth: self.len() + 1,
        })))
    }

    pub fn is_root(&self) -> bool {
        self.0.is_none()
    }

    pub fn len(&self) -> usize {
        self.0.as_ref().map(|node| node.depth).unwrap_or(0)
    }

    pub fn last(&self) -> Option<&PathElement> {
        self.0.as_ref().map(|node| &node.element)
    }

    /// Materializes the path, root first.
    pub fn to_path(&self) -> Path {
        let mut elements = Vec::with_capacity(self.len());
        let mut current = self;
        while let Some(node) = &current.0 {
            elements.push(node.element.clone());
            current = &node.parent;
        }
        elements.reverse();
        Path(elements)
    }
}

impl fmt::Debug for ResponsePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResponsePath").field(&self.to_path()).finish()
    }
}

impl fmt::Display for ResponsePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_path().fmt(f)
    }
}

impl From<&ResponsePath> for Path {
    fn from(path: &ResponsePath) -> Self {
        path.to_path()
    }
}
