//! Errors of the calendar pipeline.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("scanning the competition store failed: {0}")]
    Store(String),

    #[error("competition `{id}` has no `{field}` field")]
    MissingField { field: String, id: String },

    #[error("field `{field}` of competition `{id}` is not a date: `{value}`")]
    InvalidDate {
        field: String,
        id: String,
        value: String,
    },

    #[error("field `{field}` of competition `{id}` is not a date-time: `{value}`")]
    InvalidDateTime {
        field: String,
        id: String,
        value: String,
    },

    #[error("competition records could not be read: {0}")]
    Records(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error was caused by the store rather than by the stored data.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Error::Store(_))
    }
}
