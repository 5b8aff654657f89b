//! Intermediate document shared by every source and sink.
//!
//! A source turns one underlying record into one [`IntermediateDocument`];
//! a sink persists it. The document is an ordered mapping from field name to
//! a [`FieldValue`], where repeated ISIS fields collapse into one
//! [`FieldValue::Repeated`] value instead of several fields with the same name.

use bson::{Bson, Document};
use indexmap::IndexMap;
use serde::Serialize;

/// Value of one exported field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Field occurs once in the record
    Single(String),
    /// Field occurs more than once, occurrences kept in record order
    Repeated(Vec<String>),
}

impl FieldValue {
    /// Occurrences of the field, in order
    pub fn values(&self) -> Vec<&str> {
        match self {
            FieldValue::Single(value) => vec![value.as_str()],
            FieldValue::Repeated(values) => values.iter().map(String::as_str).collect(),
        }
    }

    /// Join occurrences with `separator`
    pub fn join(&self, separator: &str) -> String {
        match self {
            FieldValue::Single(value) => value.clone(),
            FieldValue::Repeated(values) => values.join(separator),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            FieldValue::Single(first) => {
                let first = std::mem::take(first);
                *self = FieldValue::Repeated(vec![first, value]);
            }
            FieldValue::Repeated(values) => values.push(value),
        }
    }
}

impl From<&FieldValue> for Bson {
    fn from(value: &FieldValue) -> Self {
        match value {
            FieldValue::Single(value) => Bson::String(value.clone()),
            FieldValue::Repeated(values) => {
                Bson::Array(values.iter().cloned().map(Bson::String).collect())
            }
        }
    }
}

/// One exported record, format agnostic
///
/// Field insertion order is preserved; the CSV sink derives its header from it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IntermediateDocument {
    fields: IndexMap<String, FieldValue>,
}

impl IntermediateDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one occurrence of `name`.
    ///
    /// The first occurrence creates a [`FieldValue::Single`]; further
    /// occurrences turn it into a [`FieldValue::Repeated`] in arrival order.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.get_mut(&name) {
            Some(existing) => existing.push(value),
            None => {
                self.fields.insert(name, FieldValue::Single(value));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Field names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Compact JSON rendering, logged at trace level by the export driver
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// BSON document with one key per field; repeated fields become arrays
    pub fn to_bson(&self) -> Document {
        let mut doc = Document::new();
        for (name, value) in &self.fields {
            doc.insert(name.clone(), Bson::from(value));
        }
        doc
    }
}
