//! SQLite-backed table store.
//!
//! Rows are kept as JSON documents in a single `documents` table, partitioned
//! by logical table name. Column filters go through `json_extract`.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::{SqliteArguments, SqliteConnection};
use sqlx::{Row as _, Sqlite, SqlitePool};

use super::store::{validate_blob_name, Query, Row, StoreError, StoreResult, TableStore};

type SqlQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// Where uploaded blobs go and how they are addressed.
#[derive(Debug, Clone)]
pub struct BlobSettings {
    pub root: PathBuf,
    pub public_base_url: String,
}

/// Table store over a SQLite pool plus a local blob directory.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    blobs: BlobSettings,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, blobs: BlobSettings) -> Self {
        Self { pool, blobs }
    }
}

enum Bound {
    Text(String),
    Int(i64),
    Real(f64),
}

fn json_path(column: &str) -> String {
    format!("$.\"{}\"", column.replace('"', "\\\""))
}

/// Build the WHERE/ORDER BY tail for a query, with its bind values in order.
fn query_tail(table: &str, query: &Query) -> (String, Vec<Bound>) {
    let mut sql = String::from("WHERE table_name = ?");
    let mut binds = vec![Bound::Text(table.to_string())];

    for (column, value) in query.filters() {
        binds.push(Bound::Text(json_path(column)));
        match value {
            Value::Null => sql.push_str(" AND json_extract(body, ?) IS NULL"),
            Value::Bool(b) => {
                sql.push_str(" AND json_extract(body, ?) = ?");
                binds.push(Bound::Int(*b as i64));
            }
            Value::Number(n) => {
                sql.push_str(" AND json_extract(body, ?) = ?");
                binds.push(match n.as_i64() {
                    Some(i) => Bound::Int(i),
                    None => Bound::Real(n.as_f64().unwrap_or_default()),
                });
            }
            Value::String(s) => {
                sql.push_str(" AND json_extract(body, ?) = ?");
                binds.push(Bound::Text(s.clone()));
            }
            Value::Array(_) | Value::Object(_) => {
                sql.push_str(" AND json_extract(body, ?) = ?");
                binds.push(Bound::Text(value.to_string()));
            }
        }
    }

    match query.order_column() {
        Some(column) => {
            sql.push_str(" ORDER BY json_extract(body, ?) DESC, seq DESC");
            binds.push(Bound::Text(json_path(column)));
        }
        None => sql.push_str(" ORDER BY seq"),
    }

    (sql, binds)
}

fn bind_all(mut q: SqlQuery<'_>, binds: Vec<Bound>) -> SqlQuery<'_> {
    for bound in binds {
        q = match bound {
            Bound::Text(s) => q.bind(s),
            Bound::Int(i) => q.bind(i),
            Bound::Real(f) => q.bind(f),
        };
    }
    q
}

fn parse_body(table: &str, body: &str) -> StoreResult<Row> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::Corrupt {
            table: table.to_string(),
            reason: format!("expected object, found {}", other),
        }),
        Err(e) => Err(StoreError::Corrupt {
            table: table.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Fetch `(seq, row)` pairs matching the query.
async fn matching_rows(
    conn: &mut SqliteConnection,
    table: &str,
    query: &Query,
) -> StoreResult<Vec<(i64, Row)>> {
    let (tail, binds) = query_tail(table, query);
    let sql = format!("SELECT seq, body FROM documents {}", tail);

    let rows = bind_all(sqlx::query(&sql), binds)
        .fetch_all(&mut *conn)
        .await?;

    rows.iter()
        .map(|row| -> StoreResult<(i64, Row)> {
            let seq: i64 = row.get("seq");
            let body: String = row.get("body");
            Ok((seq, parse_body(table, &body)?))
        })
        .collect()
}

#[async_trait]
impl TableStore for SqliteStore {
    async fn insert(&self, table: &str, row: Row) -> StoreResult<Row> {
        let now = Utc::now().to_rfc3339();
        let body = Value::Object(row.clone()).to_string();

        sqlx::query("INSERT INTO documents (table_name, body, created_at) VALUES (?, ?, ?)")
            .bind(table)
            .bind(&body)
            .bind(&now)
            .execute(&self.pool)
            .await?;

        Ok(row)
    }

    async fn select(&self, table: &str, query: &Query) -> StoreResult<Vec<Row>> {
        let mut conn = self.pool.acquire().await?;
        let rows = matching_rows(&mut conn, table, query).await?;
        Ok(rows.into_iter().map(|(_, row)| row).collect())
    }

    async fn update(&self, table: &str, query: &Query, patch: Row) -> StoreResult<Vec<Row>> {
        let mut tx = self.pool.begin().await?;
        let existing = matching_rows(&mut tx, table, query).await?;

        let mut updated = Vec::with_capacity(existing.len());
        for (seq, mut row) in existing {
            for (column, value) in &patch {
                row.insert(column.clone(), value.clone());
            }

            sqlx::query("UPDATE documents SET body = ? WHERE seq = ?")
                .bind(Value::Object(row.clone()).to_string())
                .bind(seq)
                .execute(&mut *tx)
                .await?;

            updated.push(row);
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete(&self, table: &str, query: &Query) -> StoreResult<Vec<Row>> {
        let mut tx = self.pool.begin().await?;
        let existing = matching_rows(&mut tx, table, query).await?;

        let mut removed = Vec::with_capacity(existing.len());
        for (seq, row) in existing {
            sqlx::query("DELETE FROM documents WHERE seq = ?")
                .bind(seq)
                .execute(&mut *tx)
                .await?;
            removed.push(row);
        }

        tx.commit().await?;
        Ok(removed)
    }

    async fn upload_blob(
        &self,
        bucket: &str,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> StoreResult<String> {
        validate_blob_name(bucket)?;
        validate_blob_name(name)?;

        let dir = self.blobs.root.join(bucket);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(name), &bytes).await?;

        tracing::debug!(
            bucket,
            name,
            content_type,
            size = bytes.len(),
            "Stored blob"
        );

        Ok(format!(
            "{}/storage/{}/{}",
            self.blobs.public_base_url.trim_end_matches('/'),
            bucket,
            name
        ))
    }
}
