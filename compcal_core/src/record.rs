//! Turns scanned records into plain competition field maps.

use std::collections::HashMap;

use crate::{
    error::{Error, Result},
    store::{RawRecord, StoreValue},
};

/// A competition record with every field as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompetitionRecord {
    fields: HashMap<String, String>,
}

impl CompetitionRecord {
    /// Get a field which the calendar cannot do without.
    pub fn field(&self, name: &str) -> Result<&str> {
        self.optional(name).ok_or_else(|| Error::MissingField {
            field: String::from(name),
            id: String::from(self.id()),
        })
    }

    pub fn optional(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// The record id, for error messages.
    pub fn id(&self) -> &str {
        self.optional("id").unwrap_or("<unknown>")
    }
}

impl FromIterator<(String, String)> for CompetitionRecord {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl From<RawRecord> for CompetitionRecord {
    fn from(value: RawRecord) -> Self {
        value
            .into_iter()
            .filter_map(|(name, value)| Some((name, to_text(value)?)))
            .collect()
    }
}

/// Normalize scanned records, keeping their order.
pub fn normalize(records: Vec<RawRecord>) -> Vec<CompetitionRecord> {
    records.into_iter().map(CompetitionRecord::from).collect()
}

/// Null and unsupported values leave the field absent.
fn to_text(value: StoreValue) -> Option<String> {
    match value {
        StoreValue::Text(text) | StoreValue::Number(text) => Some(text),
        StoreValue::Bool(value) => Some(value.to_string()),
        StoreValue::Null | StoreValue::Unsupported => None,
    }
}
