//! Dual-record coordinator.
//!
//! Colleges and exams are persisted as two rows sharing one identity: a
//! detail row and a summary row. This module keeps the pair consistent and
//! reports precisely which half landed when it cannot.

mod announcements;
mod colleges;
mod exams;
mod locks;

pub use locks::IdentityLocks;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::db::{Query, Row, StoreError, StoreResult, TableStore};
use crate::errors::AppError;

/// How often a failed store call is attempted before giving up.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff,
        }
    }

    /// Single attempt, no waiting.
    #[cfg(test)]
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

/// One half of a paired record: table plus the column holding the identity.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Half<'a> {
    pub table: &'a str,
    pub key: &'a str,
}

impl<'a> Half<'a> {
    pub fn new(table: &'a str, key: &'a str) -> Self {
        Self { table, key }
    }

    fn query(&self, identity: &str) -> Query {
        Query::by(self.key, identity)
    }
}

/// Orchestrates every mutation and lookup over the table store.
pub struct Coordinator {
    store: Arc<dyn TableStore>,
    locks: IdentityLocks,
    retry: RetryPolicy,
}

impl Coordinator {
    pub fn new(store: Arc<dyn TableStore>, retry: RetryPolicy) -> Self {
        Self {
            store,
            locks: IdentityLocks::new(),
            retry,
        }
    }

    /// Run `op` until it succeeds or the retry policy is exhausted.
    /// `op` receives the 1-based attempt number.
    async fn retrying<T, F, Fut>(&self, table: &str, identity: &str, mut op: F) -> StoreResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.retry.attempts => {
                    tracing::warn!(
                        table,
                        identity,
                        attempt,
                        error = %err,
                        "Store call failed, retrying"
                    );
                    tokio::time::sleep(self.retry.backoff * attempt).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Insert one row. Before a retry, checks whether the failed attempt
    /// actually landed so the row is never written twice.
    async fn insert_row(&self, identity: &str, half: Half<'_>, row: &Row) -> StoreResult<()> {
        let probe = half.query(identity);
        self.retrying(half.table, identity, |attempt| {
            let probe = &probe;
            let row = row.clone();
            async move {
                if attempt > 1 && self.store.select_one(half.table, probe).await?.is_some() {
                    tracing::debug!(table = half.table, identity, "Earlier insert attempt landed");
                    return Ok(());
                }
                self.store.insert(half.table, row).await.map(|_| ())
            }
        })
        .await
    }

    async fn update_rows(&self, identity: &str, half: Half<'_>, patch: &Row) -> StoreResult<usize> {
        let query = half.query(identity);
        self.retrying(half.table, identity, |_| {
            self.store.update(half.table, &query, patch.clone())
        })
        .await
        .map(|rows| rows.len())
    }

    async fn delete_rows(&self, identity: &str, half: Half<'_>) -> StoreResult<usize> {
        let query = half.query(identity);
        self.retrying(half.table, identity, |_| self.store.delete(half.table, &query))
            .await
            .map(|rows| rows.len())
    }

    /// Write `first` then `second`. If `second` fails, `first` is deleted again
    /// and the failure is reported as a partial write either way.
    pub(crate) async fn dual_insert(
        &self,
        identity: &str,
        first: (Half<'_>, Row),
        second: (Half<'_>, Row),
    ) -> Result<(), AppError> {
        let (first, first_row) = first;
        let (second, second_row) = second;

        self.insert_row(identity, first, &first_row).await?;

        if let Err(err) = self.insert_row(identity, second, &second_row).await {
            tracing::error!(
                identity,
                written = first.table,
                failed = second.table,
                error = %err,
                "Paired insert failed halfway, compensating"
            );
            let rolled_back = match self.delete_rows(identity, first).await {
                Ok(_) => true,
                Err(rollback_err) => {
                    tracing::error!(
                        identity,
                        table = first.table,
                        error = %rollback_err,
                        "Compensating delete failed, orphan row left behind"
                    );
                    false
                }
            };
            return Err(partial_write(identity, first, second, rolled_back, &err));
        }
        Ok(())
    }

    /// Patch both halves. Returns the tables that changed.
    pub(crate) async fn dual_update(
        &self,
        identity: &str,
        first: (Half<'_>, Row),
        second: (Half<'_>, Row),
    ) -> Result<Vec<String>, AppError> {
        let (first, first_patch) = first;
        let (second, second_patch) = second;

        let first_count = self.update_rows(identity, first, &first_patch).await?;
        let second_count = match self.update_rows(identity, second, &second_patch).await {
            Ok(count) => count,
            Err(err) if first_count > 0 => {
                return Err(partial_write(identity, first, second, false, &err));
            }
            Err(err) => return Err(err.into()),
        };

        match (first_count > 0, second_count > 0) {
            (true, true) => Ok(vec![first.table.to_string(), second.table.to_string()]),
            (false, false) => Err(AppError::NotFound(format!(
                "Record {} not found in {} or {}",
                identity, first.table, second.table
            ))),
            (true, false) => Err(missing_half(identity, first, second)),
            (false, true) => Err(missing_half(identity, second, first)),
        }
    }

    /// Remove both halves, `first` before `second`. Returns rows removed;
    /// zero is not an error.
    pub(crate) async fn dual_delete(
        &self,
        identity: &str,
        first: Half<'_>,
        second: Half<'_>,
    ) -> Result<usize, AppError> {
        let first_count = self.delete_rows(identity, first).await?;
        let second_count = match self.delete_rows(identity, second).await {
            Ok(count) => count,
            Err(err) if first_count > 0 => {
                return Err(partial_write(identity, first, second, false, &err));
            }
            Err(err) => return Err(err.into()),
        };
        Ok(first_count + second_count)
    }
}

fn partial_write(
    identity: &str,
    written: Half<'_>,
    failed: Half<'_>,
    rolled_back: bool,
    cause: &StoreError,
) -> AppError {
    AppError::PartialWrite {
        identity: identity.to_string(),
        written: vec![written.table.to_string()],
        failed: vec![failed.table.to_string()],
        rolled_back,
        cause: cause.to_string(),
    }
}

fn missing_half(identity: &str, written: Half<'_>, failed: Half<'_>) -> AppError {
    tracing::error!(
        identity,
        written = written.table,
        failed = failed.table,
        "Paired update matched only one half"
    );
    AppError::PartialWrite {
        identity: identity.to_string(),
        written: vec![written.table.to_string()],
        failed: vec![failed.table.to_string()],
        rolled_back: false,
        cause: format!("no row with {} = {} in {}", failed.key, identity, failed.table),
    }
}

/// Non-blank string attribute of a payload, trimmed.
pub(crate) fn string_field(row: &Row, key: &str) -> Option<String> {
    row.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Nested object attribute, empty when absent or not an object.
pub(crate) fn object_field(row: &Row, key: &str) -> Row {
    row.get(key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
