//! Tree-shaped values for normalized headers and bodies.
//!
//! Request and response payloads can be a map, a list, a scalar, or missing
//! entirely. `TreeValue` is the tagged union that carries all of them.
//!
//! Equality rules (shared with the structural differ):
//! - numbers compare by numeric value, so `1` and `1.0` are equal
//! - `Absent` and `Null` are equal to each other
//! - `Absent`/`Null` never equal an empty map or list

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;

/// A normalized tree value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum TreeValue {
    /// No value was captured at all.
    #[default]
    Absent,
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<TreeValue>),
    Map(BTreeMap<String, TreeValue>),
}

/// Runtime kind of a [`TreeValue`], as reported in `type_changed` deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    List,
    Map,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::List => "list",
            ValueKind::Map => "map",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TreeValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            TreeValue::Absent | TreeValue::Null => ValueKind::Null,
            TreeValue::Bool(_) => ValueKind::Bool,
            TreeValue::Number(_) => ValueKind::Number,
            TreeValue::String(_) => ValueKind::String,
            TreeValue::List(_) => ValueKind::List,
            TreeValue::Map(_) => ValueKind::Map,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, TreeValue::Absent)
    }

    /// True for `Absent` and `Null`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, TreeValue::Absent | TreeValue::Null)
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, TreeValue>> {
        match self {
            TreeValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TreeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TreeValue::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// Build a map value from string pairs, as used for parsed headers.
    pub fn string_map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        TreeValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), TreeValue::String(v.into())))
                .collect(),
        )
    }

    /// Returns a copy with every map key lowercased, at the top level only.
    pub fn with_lowercase_keys(self) -> Self {
        match self {
            TreeValue::Map(map) => TreeValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k.to_lowercase(), v))
                    .collect(),
            ),
            other => other,
        }
    }

    pub fn to_json(&self) -> Value {
        Value::from(self.clone())
    }
}

/// Numeric equality by value. Integers compare exactly, including against a
/// float with no fractional part; two floats compare as `f64`.
pub fn numbers_equal(a: &Number, b: &Number) -> bool {
    match (integer(a), integer(b)) {
        (Some(x), Some(y)) => x == y,
        (Some(x), None) => b.as_f64().is_some_and(|f| integer_equals_float(x, f)),
        (None, Some(y)) => a.as_f64().is_some_and(|f| integer_equals_float(y, f)),
        (None, None) => matches!((a.as_f64(), b.as_f64()), (Some(x), Some(y)) if x == y),
    }
}

fn integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

fn integer_equals_float(i: i128, f: f64) -> bool {
    // `as` saturates, which is out of any JSON integer's range anyway.
    f.is_finite() && f.fract() == 0.0 && f as i128 == i
}

impl PartialEq for TreeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (TreeValue::Bool(a), TreeValue::Bool(b)) => a == b,
            (TreeValue::Number(a), TreeValue::Number(b)) => numbers_equal(a, b),
            (TreeValue::String(a), TreeValue::String(b)) => a == b,
            (TreeValue::List(a), TreeValue::List(b)) => a == b,
            (TreeValue::Map(a), TreeValue::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl From<Value> for TreeValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => TreeValue::Null,
            Value::Bool(b) => TreeValue::Bool(b),
            Value::Number(n) => TreeValue::Number(n),
            Value::String(s) => TreeValue::String(s),
            Value::Array(items) => TreeValue::List(items.into_iter().map(TreeValue::from).collect()),
            Value::Object(map) => {
                TreeValue::Map(map.into_iter().map(|(k, v)| (k, TreeValue::from(v))).collect())
            }
        }
    }
}

impl From<TreeValue> for Value {
    fn from(value: TreeValue) -> Self {
        match value {
            TreeValue::Absent | TreeValue::Null => Value::Null,
            TreeValue::Bool(b) => Value::Bool(b),
            TreeValue::Number(n) => Value::Number(n),
            TreeValue::String(s) => Value::String(s),
            TreeValue::List(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            TreeValue::Map(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }
}

impl From<&str> for TreeValue {
    fn from(s: &str) -> Self {
        TreeValue::String(s.to_string())
    }
}

impl From<String> for TreeValue {
    fn from(s: String) -> Self {
        TreeValue::String(s)
    }
}

impl From<i64> for TreeValue {
    fn from(n: i64) -> Self {
        TreeValue::Number(n.into())
    }
}

impl From<bool> for TreeValue {
    fn from(b: bool) -> Self {
        TreeValue::Bool(b)
    }
}

impl<T: Into<TreeValue>> From<Option<T>> for TreeValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(TreeValue::Absent)
    }
}

impl fmt::Display for TreeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeValue::Absent => f.write_str("<absent>"),
            other => write!(f, "{}", other.to_json()),
        }
    }
}
