//! Property and field values.
//!
//! A [`PropValue`] is either an owned JSON value or a [`SharedValue`] cell.
//! Shallow copies clone the enum, so shared cells stay aliased between the
//! source and the copy. Deep copies go through `serde_json`, which turns
//! every shared cell into an independent plain value.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::sync::{Arc, RwLock};

/// String-keyed, insertion-ordered property map.
pub type Props = IndexMap<String, PropValue>;

/// A mutable JSON value that may be aliased by several nodes.
#[derive(Debug, Clone, Default)]
pub struct SharedValue(Arc<RwLock<Value>>);

impl SharedValue {
    pub fn new(value: Value) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }

    /// Snapshot of the current value.
    pub fn get(&self) -> Value {
        self.0.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set(&self, value: Value) {
        *self.0.write().unwrap_or_else(|e| e.into_inner()) = value;
    }

    /// Returns `true` if both cells are the same allocation.
    pub fn ptr_eq(&self, other: &SharedValue) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A property or value-field payload.
#[derive(Debug, Clone)]
pub enum PropValue {
    Json(Value),
    Shared(SharedValue),
}

impl PropValue {
    /// Wrap `value` in a fresh shared cell.
    pub fn shared(value: Value) -> Self {
        PropValue::Shared(SharedValue::new(value))
    }

    /// Snapshot of the carried value.
    pub fn get(&self) -> Value {
        match self {
            PropValue::Json(v) => v.clone(),
            PropValue::Shared(cell) => cell.get(),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            PropValue::Json(v) => Some(v),
            PropValue::Shared(_) => None,
        }
    }

    pub fn as_shared(&self) -> Option<&SharedValue> {
        match self {
            PropValue::Shared(cell) => Some(cell),
            PropValue::Json(_) => None,
        }
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, PropValue::Shared(_))
    }

    /// Independent copy produced by a serialization round trip.
    pub fn deep_copy(&self) -> Result<PropValue, serde_json::Error> {
        let encoded = serde_json::to_value(self)?;
        serde_json::from_value(encoded)
    }
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl From<Value> for PropValue {
    fn from(value: Value) -> Self {
        PropValue::Json(value)
    }
}

impl From<SharedValue> for PropValue {
    fn from(cell: SharedValue) -> Self {
        PropValue::Shared(cell)
    }
}

impl From<&str> for PropValue {
    fn from(s: &str) -> Self {
        PropValue::Json(Value::String(s.to_string()))
    }
}

impl From<i64> for PropValue {
    fn from(n: i64) -> Self {
        PropValue::Json(Value::from(n))
    }
}

impl From<bool> for PropValue {
    fn from(b: bool) -> Self {
        PropValue::Json(Value::Bool(b))
    }
}

impl Serialize for PropValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PropValue::Json(v) => v.serialize(serializer),
            PropValue::Shared(cell) => cell.get().serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for PropValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(PropValue::Json)
    }
}

/// Deep copy of a whole property map through `serde_json`.
pub fn deep_copy_props(props: &Props) -> Result<Props, serde_json::Error> {
    let encoded = serde_json::to_value(props)?;
    serde_json::from_value(encoded)
}
