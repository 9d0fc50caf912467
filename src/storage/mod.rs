//! Record store boundary and its SQLite backend.
//!
//! Everything above this module talks to a [`RecordStore`]: a small generic
//! query interface (filters, projection, ordering, limit, count) plus inserts
//! and keyed updates. [`SqliteStore`] is the shipped implementation.

pub mod query;
pub mod schema;
pub mod sqlite;
#[cfg(test)]
pub(crate) mod testing;

pub use self::query::{Filter, Order, Query, Scalar, Table};
pub use self::sqlite::SqliteStore;

use anyhow::{Context, Result};
use r2d2::Pool as R2D2Pool;
use r2d2_sqlite::SqliteConnectionManager;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Connection Pool type
pub type Pool = R2D2Pool<SqliteConnectionManager>;

/// A row as returned by the store: column name to JSON value.
pub type Row = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown column '{column}' on table '{table}'")]
    UnknownColumn { table: &'static str, column: String },

    #[error("insert into '{0}' has no columns")]
    EmptyRow(&'static str),

    #[error("no row in '{table}' with {key} = '{value}'")]
    NotFound {
        table: &'static str,
        key: &'static str,
        value: String,
    },

    #[error("connection pool: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("decoding row: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("store task aborted: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Generic query/storage backend consumed by the dashboard, chat and intake.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    async fn select(&self, query: Query) -> Result<Vec<Row>, StoreError>;

    async fn count(&self, query: Query) -> Result<u64, StoreError>;

    async fn insert(&self, table: Table, rows: Vec<Row>) -> Result<usize, StoreError>;

    /// Update the row whose key column equals `key`. Returns rows changed.
    async fn update(&self, table: Table, key: &str, changes: Row) -> Result<usize, StoreError>;
}

/// Run `query` and decode each row into `T`.
pub async fn fetch<T: DeserializeOwned>(
    store: &dyn RecordStore,
    query: Query,
) -> Result<Vec<T>, StoreError> {
    store
        .select(query)
        .await?
        .into_iter()
        .map(|row| serde_json::from_value(serde_json::Value::Object(row)).map_err(StoreError::from))
        .collect()
}

/// Serialize `value` into a row for [`RecordStore::insert`].
pub fn to_row<T: serde::Serialize>(value: &T) -> Result<Row, StoreError> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(StoreError::Unavailable(format!(
            "expected an object row, got {other}"
        ))),
    }
}

/// Open (or create) the SQLite database and return a connection pool.
pub fn open_pool(path: &str) -> Result<Pool> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }

    let manager = SqliteConnectionManager::file(path).with_init(|c| {
        c.execute_batch(
            "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA temp_store = MEMORY;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
        )?;
        sqlite::register_functions(c)
    });

    let pool = R2D2Pool::new(manager).context("failed to build connection pool")?;

    // Run migrations on a single connection
    let conn = pool.get()?;
    schema::migrate(&conn)?;

    Ok(pool)
}
