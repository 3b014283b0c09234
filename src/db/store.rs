//! Table store abstraction.
//!
//! Every persisted record is a JSON object ("row") living in a named logical
//! table. Callers filter by column equality only.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// A single row: column name to JSON value.
pub type Row = Map<String, Value>;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a table store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt row in table {table}: {reason}")]
    Corrupt { table: String, reason: String },

    #[error("blob io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid blob name '{0}'")]
    InvalidBlobName(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Equality filters plus an optional descending order column.
#[derive(Debug, Clone, Default)]
pub struct Query {
    filters: Vec<(String, Value)>,
    order_desc: Option<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a single `column = value` filter.
    pub fn by(column: &str, value: impl Into<Value>) -> Self {
        Self::new().eq(column, value)
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push((column.to_string(), value.into()));
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.order_desc = Some(column.to_string());
        self
    }

    pub fn filters(&self) -> &[(String, Value)] {
        &self.filters
    }

    pub fn order_column(&self) -> Option<&str> {
        self.order_desc.as_deref()
    }

    /// Whether `row` satisfies every filter. A missing column only matches `null`.
    pub fn matches(&self, row: &Row) -> bool {
        self.filters
            .iter()
            .all(|(column, expected)| row.get(column).unwrap_or(&Value::Null) == expected)
    }
}

/// Persistence gateway over a table-oriented backing store.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Insert a row and return it as stored.
    async fn insert(&self, table: &str, row: Row) -> StoreResult<Row>;

    /// Return every row matching the query.
    async fn select(&self, table: &str, query: &Query) -> StoreResult<Vec<Row>>;

    /// Return the first matching row, if any.
    async fn select_one(&self, table: &str, query: &Query) -> StoreResult<Option<Row>> {
        Ok(self.select(table, query).await?.into_iter().next())
    }

    /// Merge `patch` into every matching row; returns the updated rows.
    async fn update(&self, table: &str, query: &Query, patch: Row) -> StoreResult<Vec<Row>>;

    /// Remove every matching row; returns the removed rows.
    async fn delete(&self, table: &str, query: &Query) -> StoreResult<Vec<Row>>;

    /// Store a blob and return its public address.
    async fn upload_blob(
        &self,
        bucket: &str,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> StoreResult<String>;
}

/// Reject names that could escape the blob root.
pub fn validate_blob_name(name: &str) -> StoreResult<()> {
    if name.is_empty()
        || name == "."
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
    {
        return Err(StoreError::InvalidBlobName(name.to_string()));
    }
    Ok(())
}
