//! In-memory table store for tests.
//!
//! Records every call and can be primed to fail specific operations.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::store::{validate_blob_name, Query, Row, StoreError, StoreResult, TableStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Insert,
    Select,
    Update,
    Delete,
    Upload,
}

#[derive(Default)]
struct Inner {
    tables: HashMap<String, Vec<Row>>,
    log: Vec<(StoreOp, String)>,
    failures: HashMap<(StoreOp, String), u32>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `times` calls of `op` against `table` fail.
    pub fn fail_next(&self, op: StoreOp, table: &str, times: u32) {
        let mut inner = self.inner.lock().unwrap();
        inner.failures.insert((op, table.to_string()), times);
    }

    /// Every call made so far, in order.
    pub fn log(&self) -> Vec<(StoreOp, String)> {
        self.inner.lock().unwrap().log.clone()
    }

    pub fn clear_log(&self) {
        self.inner.lock().unwrap().log.clear();
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        let inner = self.inner.lock().unwrap();
        inner.tables.get(table).cloned().unwrap_or_default()
    }

    fn enter(&self, op: StoreOp, table: &str) -> StoreResult<std::sync::MutexGuard<'_, Inner>> {
        let mut inner = self.inner.lock().unwrap();
        inner.log.push((op, table.to_string()));

        if let Some(remaining) = inner.failures.get_mut(&(op, table.to_string())) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(StoreError::Unavailable(format!(
                    "injected {:?} failure on {}",
                    op, table
                )));
            }
        }
        Ok(inner)
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn insert(&self, table: &str, row: Row) -> StoreResult<Row> {
        let mut inner = self.enter(StoreOp::Insert, table)?;
        inner
            .tables
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn select(&self, table: &str, query: &Query) -> StoreResult<Vec<Row>> {
        let inner = self.enter(StoreOp::Select, table)?;
        let mut rows: Vec<Row> = inner
            .tables
            .get(table)
            .map(|rows| rows.iter().filter(|r| query.matches(r)).cloned().collect())
            .unwrap_or_default();

        if let Some(column) = query.order_column() {
            rows.reverse();
            rows.sort_by(|a, b| {
                let a = a.get(column).map(|v| v.to_string()).unwrap_or_default();
                let b = b.get(column).map(|v| v.to_string()).unwrap_or_default();
                b.cmp(&a)
            });
        }
        Ok(rows)
    }

    async fn update(&self, table: &str, query: &Query, patch: Row) -> StoreResult<Vec<Row>> {
        let mut inner = self.enter(StoreOp::Update, table)?;
        let mut updated = Vec::new();
        if let Some(rows) = inner.tables.get_mut(table) {
            for row in rows.iter_mut().filter(|r| query.matches(r)) {
                for (column, value) in &patch {
                    row.insert(column.clone(), value.clone());
                }
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, query: &Query) -> StoreResult<Vec<Row>> {
        let mut inner = self.enter(StoreOp::Delete, table)?;
        let mut removed = Vec::new();
        if let Some(rows) = inner.tables.get_mut(table) {
            let (gone, kept): (Vec<Row>, Vec<Row>) =
                rows.drain(..).partition(|r| query.matches(r));
            *rows = kept;
            removed = gone;
        }
        Ok(removed)
    }

    async fn upload_blob(
        &self,
        bucket: &str,
        name: &str,
        _bytes: Vec<u8>,
        _content_type: &str,
    ) -> StoreResult<String> {
        let _inner = self.enter(StoreOp::Upload, bucket)?;
        validate_blob_name(name)?;
        Ok(format!("memory://{}/{}", bucket, name))
    }
}
