//! In-memory competition store.
//!
//! Evaluates filter queries the way the real store does, for tests and offline use.

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    error::Result,
    query::FilterQuery,
    store::{CompetitionStore, RawRecord, StoreValue},
};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<RawRecord>,
}

impl MemoryStore {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self { records }
    }

    /// Read records from a JSON array of flat objects, e.g. a table export.
    pub fn from_json(json: &str) -> Result<Self> {
        let objects: Vec<serde_json::Map<String, Value>> = serde_json::from_str(json)?;
        let records = objects
            .into_iter()
            .map(|object| {
                object
                    .into_iter()
                    .map(|(name, value)| (name, from_json_value(value)))
                    .collect()
            })
            .collect();
        Ok(Self::new(records))
    }

    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }
}

fn from_json_value(value: Value) -> StoreValue {
    match value {
        Value::String(text) => StoreValue::Text(text),
        Value::Number(number) => StoreValue::Number(number.to_string()),
        Value::Bool(value) => StoreValue::Bool(value),
        Value::Null => StoreValue::Null,
        Value::Array(_) | Value::Object(_) => StoreValue::Unsupported,
    }
}

/// Every clause must hold: the record's attribute is text equal to one of the bound values.
fn matches(query: &FilterQuery, record: &RawRecord) -> bool {
    query.clauses().iter().all(|clause| {
        let attribute = query.name(clause.attribute()).unwrap_or(clause.attribute());
        let Some(StoreValue::Text(text)) = record.get(attribute) else {
            return false;
        };
        clause
            .placeholders()
            .iter()
            .filter_map(|placeholder| query.value(placeholder))
            .any(|value| value == text)
    })
}

#[async_trait]
impl CompetitionStore for MemoryStore {
    async fn scan(&self, query: &FilterQuery) -> Result<Vec<RawRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|record| matches(query, record))
            .cloned()
            .collect())
    }
}
