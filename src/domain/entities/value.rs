//! Field values and partial records.
//!
//! A partial record is what the extractor produces for one entity instance:
//! some fields concrete, some explicitly absent.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A single field's value: concrete, or explicitly absent.
///
/// Serialized as the bare JSON value, with `null` standing for `Absent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<Value>", into = "Option<Value>")]
pub enum FieldValue {
    Present(Value),
    Absent,
}

impl FieldValue {
    /// Wraps a JSON value; `null` becomes `Absent`.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Absent,
            other => FieldValue::Present(other),
        }
    }

    /// Returns true if a concrete value is held.
    pub fn is_present(&self) -> bool {
        matches!(self, FieldValue::Present(_))
    }

    /// Returns the concrete value, if any.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            FieldValue::Present(v) => Some(v),
            FieldValue::Absent => None,
        }
    }
}

impl From<Option<Value>> for FieldValue {
    fn from(value: Option<Value>) -> Self {
        match value {
            Some(v) => FieldValue::from_json(v),
            None => FieldValue::Absent,
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::from_json(value)
    }
}

impl From<FieldValue> for Option<Value> {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Present(v) => Some(v),
            FieldValue::Absent => None,
        }
    }
}

/// Field map for one entity instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartialRecord(BTreeMap<String, FieldValue>);

impl PartialRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion of a concrete value.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, FieldValue::from_json(value.into()));
        self
    }

    /// Builder-style insertion of an explicit absent marker.
    pub fn with_absent(mut self, field: impl Into<String>) -> Self {
        self.set(field, FieldValue::Absent);
        self
    }

    /// Builds a record from a JSON object; nulls become absent markers.
    pub fn from_json_object(object: &serde_json::Map<String, Value>) -> Self {
        let fields = object
            .iter()
            .map(|(k, v)| (k.clone(), FieldValue::from_json(v.clone())))
            .collect();
        Self(fields)
    }

    /// Sets a field.
    pub fn set(&mut self, field: impl Into<String>, value: FieldValue) {
        self.0.insert(field.into(), value);
    }

    /// Returns the field's value, if the field is mentioned at all.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    /// Returns the concrete value of a field.
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.0.get(field).and_then(FieldValue::as_value)
    }

    /// Returns true if the field holds a concrete value.
    pub fn is_concrete(&self, field: &str) -> bool {
        self.value(field).is_some()
    }

    /// Returns true if at least one field is concrete.
    pub fn has_any_concrete(&self) -> bool {
        self.0.values().any(FieldValue::is_present)
    }

    /// Iterates over concrete fields in name order.
    pub fn concrete(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0
            .iter()
            .filter_map(|(k, v)| v.as_value().map(|value| (k.as_str(), value)))
    }

    /// Iterates over all mentioned fields.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    /// Number of mentioned fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no field is mentioned.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Concrete fields as a JSON object.
    pub fn to_json(&self) -> Value {
        let map = self
            .concrete()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect::<serde_json::Map<_, _>>();
        Value::Object(map)
    }
}

/// One extraction call's output: entity type → instances mentioned.
pub type Extraction = BTreeMap<String, Vec<PartialRecord>>;
