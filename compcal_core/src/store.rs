//! The competition store the calendar is read from.

pub mod dynamo;
pub mod memory;

use std::collections::HashMap;

use async_trait::async_trait;

pub use self::{dynamo::DynamoStore, memory::MemoryStore};
use crate::{error::Result, query::FilterQuery};

/// A stored value with the store's type envelope already removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreValue {
    Text(String),
    /// Numbers keep their textual representation.
    Number(String),
    Bool(bool),
    Null,
    /// Sets, lists, maps and binaries, which competition records never use.
    Unsupported,
}

/// A competition as returned by a scan, keyed by attribute name.
pub type RawRecord = HashMap<String, StoreValue>;

#[async_trait]
pub trait CompetitionStore: Send + Sync {
    /// Return every record matching the query, in the store's order.
    async fn scan(&self, query: &FilterQuery) -> Result<Vec<RawRecord>>;
}
