//! Value Bindings - Caller-Supplied Property Values
//!
//! Bindings are matched to properties ignoring case. Coercion turns a raw
//! value into the shape its property kind renders from.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::error::RenderError;
use crate::rules::{normalize, Property, PropertyKind};

/// An item record: a primary specifier (usually a path) plus metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskItem {
    pub item_spec: String,
    /// Tasks may emit metadata with a null value.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Option<String>>,
}

impl TaskItem {
    pub fn new(item_spec: impl Into<String>) -> Self {
        Self { item_spec: item_spec.into(), metadata: BTreeMap::new() }
    }

    pub fn with_metadata(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(name.into(), Some(value.into()));
        self
    }

    pub fn with_null_metadata(mut self, name: impl Into<String>) -> Self {
        self.metadata.insert(name.into(), None);
        self
    }

    /// Metadata by name; a null value reads as empty text.
    pub fn metadata(&self, name: &str) -> Option<&str> {
        self.metadata.get(name).map(|value| value.as_deref().unwrap_or(""))
    }
}

/// A raw bound value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Integer(i64),
    String(String),
    StringList(Vec<String>),
    Items(Vec<TaskItem>),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::String(_) => "string",
            Self::StringList(_) => "string list",
            Self::Items(_) => "item list",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self { Self::Bool(v) }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self { Self::Integer(v) }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self { Self::Integer(i64::from(v)) }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self { Self::String(v.to_string()) }
}

impl From<String> for Value {
    fn from(v: String) -> Self { Self::String(v) }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self { Self::StringList(v) }
}

impl From<Vec<&str>> for Value {
    fn from(v: Vec<&str>) -> Self {
        Self::StringList(v.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<TaskItem>> for Value {
    fn from(v: Vec<TaskItem>) -> Self { Self::Items(v) }
}

/// Case-insensitive property name → value map for one render call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Value>", into = "BTreeMap<String, Value>")]
pub struct ValueBinding {
    // normalized name -> (name as supplied, value)
    entries: BTreeMap<String, (String, Value)>,
}

impl ValueBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value`; a later binding under the same name (in any case) wins.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        self.entries.insert(normalize(&name), (name, value.into()));
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(&normalize(name)).map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&normalize(name))
    }

    /// Entries as `(name as supplied, value)`, ordered by normalized name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.values().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, V: Into<Value>> FromIterator<(N, V)> for ValueBinding {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut binding = Self::new();
        for (name, value) in iter {
            binding.insert(name, value);
        }
        binding
    }
}

impl From<BTreeMap<String, Value>> for ValueBinding {
    fn from(map: BTreeMap<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

impl From<ValueBinding> for BTreeMap<String, Value> {
    fn from(binding: ValueBinding) -> Self {
        binding.entries.into_values().collect()
    }
}

/// A bound value reduced to what its property kind renders from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coerced<'a> {
    Flag(bool),
    Text(Cow<'a, str>),
    List(Vec<&'a str>),
    Choice(&'a str),
}

impl Coerced<'_> {
    /// `false`, empty text and empty lists render nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Flag(flag) => !flag,
            Self::Text(text) => text.is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Choice(_) => false,
        }
    }
}

/// Coerce `value` to the shape `property` expects.
pub fn coerce<'a>(property: &Property, value: &'a Value) -> Result<Coerced<'a>, RenderError> {
    let coerced = match (&property.kind, value) {
        (PropertyKind::Boolean, Value::Bool(flag)) => Some(Coerced::Flag(*flag)),
        (PropertyKind::Boolean, Value::String(text)) => parse_flag(text).map(Coerced::Flag),

        (PropertyKind::String, Value::String(text)) => {
            Some(Coerced::Text(Cow::Borrowed(text.as_str())))
        }
        (PropertyKind::String, Value::Integer(n)) | (PropertyKind::Integer, Value::Integer(n)) => {
            Some(Coerced::Text(Cow::Owned(n.to_string())))
        }

        (PropertyKind::Integer, Value::String(text)) => text
            .trim()
            .parse::<i64>()
            .ok()
            .map(|n| Coerced::Text(Cow::Owned(n.to_string()))),

        (PropertyKind::StringList { .. }, Value::StringList(items))
        | (PropertyKind::ItemList { .. }, Value::StringList(items)) => {
            Some(Coerced::List(non_empty(items.iter().map(String::as_str))))
        }
        (PropertyKind::StringList { .. }, Value::String(text))
        | (PropertyKind::ItemList { .. }, Value::String(text)) => Some(Coerced::List(
            if text.is_empty() { vec![] } else { vec![text.as_str()] },
        )),
        (PropertyKind::ItemList { .. }, Value::Items(items)) => {
            Some(Coerced::List(non_empty(items.iter().map(|item| item.item_spec.as_str()))))
        }

        (PropertyKind::Enumeration { .. }, Value::String(name)) => {
            Some(Coerced::Choice(name.as_str()))
        }

        _ => None,
    };

    coerced.ok_or_else(|| RenderError::TypeMismatch {
        property: property.name.clone(),
        expected: property.kind.name().to_string(),
        found: describe(value),
    })
}

/// Empty list elements contribute no token.
fn non_empty<'a>(items: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    items.filter(|item| !item.is_empty()).collect()
}

fn parse_flag(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(text) => format!("string '{}'", text),
        other => other.kind_name().to_string(),
    }
}
