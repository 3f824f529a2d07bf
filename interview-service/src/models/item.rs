//! Storage representation of a record in the document store.
//!
//! Attribute values follow the document store's native type system,
//! including a string-set type that has no JSON counterpart. Converting an
//! item to JSON turns every set into an ordered list.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Primary key attribute of every item.
pub const PRIMARY_KEY: &str = "id";

/// A stored record: attribute name to typed value.
pub type Item = BTreeMap<String, AttributeValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    S(String),
    /// Integers keep their exact value; only fractional numbers are floats.
    N(Number),
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "NULL")]
    Null,
    #[serde(rename = "SS")]
    Ss(BTreeSet<String>),
    L(Vec<AttributeValue>),
    M(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    pub fn string(value: impl Into<String>) -> Self {
        AttributeValue::S(value.into())
    }

    pub fn string_set<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AttributeValue::Ss(values.into_iter().map(Into::into).collect())
    }

    pub fn int(value: i64) -> Self {
        AttributeValue::N(Number::from(value))
    }

    /// A non-finite float has no numeric representation and becomes `Null`.
    pub fn float(value: f64) -> Self {
        Number::from_f64(value)
            .map(AttributeValue::N)
            .unwrap_or(AttributeValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::S(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to JSON. Sets become lists in their stable (sorted) order.
    pub fn into_json(self) -> Value {
        match self {
            AttributeValue::S(s) => Value::String(s),
            AttributeValue::N(n) => Value::Number(n),
            AttributeValue::Bool(b) => Value::Bool(b),
            AttributeValue::Null => Value::Null,
            AttributeValue::Ss(set) => Value::Array(set.into_iter().map(Value::String).collect()),
            AttributeValue::L(list) => {
                Value::Array(list.into_iter().map(AttributeValue::into_json).collect())
            }
            AttributeValue::M(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, v.into_json()))
                    .collect(),
            ),
        }
    }

    /// Convert from JSON. Arrays become lists; sets are only produced explicitly.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => AttributeValue::Null,
            Value::Bool(b) => AttributeValue::Bool(b),
            Value::Number(n) => AttributeValue::N(n),
            Value::String(s) => AttributeValue::S(s),
            Value::Array(values) => {
                AttributeValue::L(values.into_iter().map(AttributeValue::from_json).collect())
            }
            Value::Object(map) => AttributeValue::M(
                map.into_iter()
                    .map(|(k, v)| (k, AttributeValue::from_json(v)))
                    .collect(),
            ),
        }
    }
}

/// Normalize a stored item into a JSON object.
pub fn item_to_json(item: Item) -> Map<String, Value> {
    item.into_iter().map(|(k, v)| (k, v.into_json())).collect()
}

/// Build a stored item from a JSON object.
pub fn item_from_json(object: Map<String, Value>) -> Item {
    object
        .into_iter()
        .map(|(k, v)| (k, AttributeValue::from_json(v)))
        .collect()
}

/// Primary key of an item, if present and a string.
pub fn item_key(item: &Item) -> Option<&str> {
    item.get(PRIMARY_KEY).and_then(AttributeValue::as_str)
}
