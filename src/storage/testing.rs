//! Fixtures shared by unit tests.

use super::{open_pool, to_row, Query, RecordStore, Row, SqliteStore, StoreError, Table};
use crate::model::{Anomaly, MaintenanceWindow};

/// A fresh migrated database in a temp dir. Keep the dir alive for the test.
pub fn temp_store() -> (tempfile::TempDir, SqliteStore) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tams-test.db");
    let pool = open_pool(path.to_str().unwrap()).unwrap();
    (dir, SqliteStore::new(pool))
}

pub fn window(id: &str, start: &str, duration_days: f64) -> MaintenanceWindow {
    MaintenanceWindow {
        id: id.to_string(),
        start_date: start.parse().unwrap(),
        duration_days,
        status: Some("planned".to_string()),
        window_type: Some("arrêt programmé".to_string()),
        description: None,
    }
}

pub async fn insert_anomalies(store: &SqliteStore, records: &[Anomaly]) {
    let rows: Vec<Row> = records.iter().map(|a| to_row(a).unwrap()).collect();
    store.insert(Table::Anomalies, rows).await.unwrap();
}

pub async fn insert_windows(store: &SqliteStore, windows: &[MaintenanceWindow]) {
    let rows: Vec<Row> = windows.iter().map(|w| to_row(w).unwrap()).collect();
    store.insert(Table::MaintenanceWindows, rows).await.unwrap();
}

/// A store whose every call fails.
pub struct FailingStore;

#[async_trait::async_trait]
impl RecordStore for FailingStore {
    async fn select(&self, _query: Query) -> Result<Vec<Row>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn count(&self, _query: Query) -> Result<u64, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn insert(&self, _table: Table, _rows: Vec<Row>) -> Result<usize, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn update(&self, _table: Table, _key: &str, _changes: Row) -> Result<usize, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}
