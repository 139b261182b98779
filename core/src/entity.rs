//! Stored entities and their property values.
//!
//! An [`Entity`] is a key plus a map of named [`Value`]s. Domain types map
//! themselves to and from entities explicitly; the store only understands
//! property values, never domain structs.

use crate::key::Key;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A single property value.
///
/// Lists model multi-valued properties: a filter matches a list when any
/// element matches.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    /// Explicitly unset
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// UTF-8 text
    Str(String),
    /// Multi-valued property
    List(Vec<Value>),
}

impl Value {
    /// Compare two scalar values in index order.
    ///
    /// `Null` sorts before every other scalar. Otherwise only values of the
    /// same type compare; mismatched types and lists return `None` and never
    /// satisfy a filter.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::List(_), _) | (_, Self::List(_)) => None,
            (Self::Null, Self::Null) => Some(Ordering::Equal),
            (Self::Null, _) => Some(Ordering::Less),
            (_, Self::Null) => Some(Ordering::Greater),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Str(a), Self::Str(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// The scalar values this property contributes to filtering and sorting.
    #[must_use]
    pub fn scalars(&self) -> Vec<&Self> {
        match self {
            Self::List(items) => items.iter().collect(),
            other => vec![other],
        }
    }

    /// Borrow the text of a `Str` value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Read an `Int` value.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

/// A keyed bag of properties as held by the entity store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    key: Key,
    properties: BTreeMap<String, Value>,
}

impl Entity {
    /// Create an entity with no properties.
    #[must_use]
    pub const fn new(key: Key) -> Self {
        Self {
            key,
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style property setter.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Set (or replace) a property.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.properties.insert(name.to_string(), value.into());
    }

    /// The entity's key.
    #[must_use]
    pub const fn key(&self) -> &Key {
        &self.key
    }

    /// Raw property lookup.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Text property, `None` when absent, null, or not text.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Integer property, `None` when absent, null, or not an integer.
    #[must_use]
    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_int)
    }

    /// Text elements of a list property; empty when absent.
    #[must_use]
    pub fn get_str_list(&self, name: &str) -> Vec<String> {
        match self.get(name) {
            Some(Value::List(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// All properties, ordered by name.
    #[must_use]
    pub const fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparisons_only_within_a_type() {
        assert_eq!(Value::Int(1).compare(&Value::Int(2)), Some(Ordering::Less));
        assert_eq!(
            Value::from("b").compare(&Value::from("a")),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::Int(1).compare(&Value::from("1")), None);
        assert_eq!(Value::from(vec!["a"]).compare(&Value::from("a")), None);
        assert_eq!(Value::Null.compare(&Value::from("a")), Some(Ordering::Less));
        assert_eq!(Value::Int(0).compare(&Value::Null), Some(Ordering::Greater));
    }

    #[test]
    fn typed_accessors() {
        let entity = Entity::new(Key::named("Speaker", "ada@example.com"))
            .with("name", "Ada")
            .with("duration", 45_i64)
            .with("topics", vec!["Rust", "Compilers"])
            .with("missing", Option::<String>::None);

        assert_eq!(entity.get_str("name"), Some("Ada"));
        assert_eq!(entity.get_int("duration"), Some(45));
        assert_eq!(entity.get_str_list("topics"), vec!["Rust", "Compilers"]);
        assert_eq!(entity.get("missing"), Some(&Value::Null));
        assert_eq!(entity.get_str("missing"), None);
        assert!(entity.get_str_list("nothing").is_empty());
    }

    #[test]
    fn list_scalars_flatten_one_level() {
        let list = Value::from(vec!["x", "y"]);
        assert_eq!(list.scalars().len(), 2);
        assert_eq!(Value::Int(3).scalars(), vec![&Value::Int(3)]);
    }
}
