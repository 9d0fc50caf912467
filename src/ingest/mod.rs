//! Anomaly intake: validate submitted records, score them, store them.

pub mod file;
pub mod scorer;

pub use self::file::parse_csv;
pub use self::scorer::{predict, Prediction};

use crate::model::Anomaly;
use crate::storage::{to_row, RecordStore, Row, StoreError, Table};
use chrono::{NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

const SOURCE_API: &str = "api";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("record {index}: {source}")]
    Record {
        index: usize,
        #[source]
        source: Box<IngestError>,
    },

    #[error("no anomalies provided")]
    EmptyBatch,

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<&'static str>),

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IngestError {
    /// Whether the caller sent bad input, as opposed to a store failure.
    pub fn is_invalid_input(&self) -> bool {
        !matches!(self, IngestError::Store(_))
    }
}

/// A submitted anomaly. The French field names of the intake form are
/// accepted as aliases.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnomalyInput {
    #[serde(default, alias = "num_equipement")]
    pub equipment_id: Option<String>,
    #[serde(default, alias = "systeme")]
    pub system: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "section_proprietaire")]
    pub service: Option<String>,
    #[serde(default, alias = "date_detection")]
    pub detected_on: Option<NaiveDate>,
}

fn required(value: &Option<String>, field: &'static str) -> Result<String, IngestError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(IngestError::MissingField(field))
}

impl AnomalyInput {
    /// Validate, score and build the record to store.
    pub fn into_anomaly(self) -> Result<Anomaly, IngestError> {
        let equipment_id = required(&self.equipment_id, "equipment_id")?;
        let system = required(&self.system, "system")?;
        let description = required(&self.description, "description")?;

        let prediction = predict(&description, &system);
        let mut anomaly = Anomaly::new(equipment_id, prediction.scores());
        if let Some(day) = self.detected_on.and_then(|d| d.and_hms_opt(0, 0, 0)) {
            anomaly.created_at = day.and_utc();
            anomaly.updated_at = anomaly.created_at;
        }
        anomaly.description = Some(description);
        anomaly.system_id = Some(system);
        anomaly.service = self
            .service
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        anomaly.source = Some(SOURCE_API.to_string());
        Ok(anomaly)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredAnomaly {
    pub anomaly_id: String,
    pub criticality: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredBatch {
    pub import_batch_id: String,
    pub total_stored: usize,
}

pub async fn store_single(
    store: &dyn RecordStore,
    input: AnomalyInput,
) -> Result<StoredAnomaly, IngestError> {
    let anomaly = input.into_anomaly()?;
    let criticality = crate::scoring::resolve(&anomaly.scores).sum();
    store.insert(Table::Anomalies, vec![to_row(&anomaly)?]).await?;
    info!(id = %anomaly.id, equipment = %anomaly.equipment_id, criticality, "anomaly stored");
    Ok(StoredAnomaly {
        anomaly_id: anomaly.id,
        criticality,
    })
}

/// Store every input under one import batch. Nothing is stored unless every
/// input validates.
///
/// The batch row is written first as `processing` and flipped to `completed`
/// once the anomalies are in, or to `failed` if their insert is rejected.
pub async fn store_batch(
    store: &dyn RecordStore,
    filename: &str,
    inputs: Vec<AnomalyInput>,
) -> Result<StoredBatch, IngestError> {
    if inputs.is_empty() {
        return Err(IngestError::EmptyBatch);
    }

    let batch_id = uuid::Uuid::new_v4().to_string();
    let mut rows = Vec::with_capacity(inputs.len());
    for (index, input) in inputs.into_iter().enumerate() {
        let mut anomaly = input.into_anomaly().map_err(|e| IngestError::Record {
            index,
            source: Box::new(e),
        })?;
        anomaly.import_batch_id = Some(batch_id.clone());
        rows.push(to_row(&anomaly)?);
    }

    let mut batch = Row::new();
    batch.insert("id".into(), json!(batch_id));
    batch.insert("filename".into(), json!(filename));
    batch.insert("total_records".into(), json!(rows.len()));
    batch.insert("status".into(), json!(BatchStatus::Processing));
    batch.insert(
        "created_at".into(),
        json!(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
    );
    store.insert(Table::ImportBatches, vec![batch]).await?;

    let total_stored = match store.insert(Table::Anomalies, rows).await {
        Ok(n) => n,
        Err(e) => {
            set_batch_status(store, &batch_id, BatchStatus::Failed).await;
            return Err(e.into());
        }
    };
    set_batch_status(store, &batch_id, BatchStatus::Completed).await;

    info!(batch = %batch_id, filename, total_stored, "anomaly batch stored");
    Ok(StoredBatch {
        import_batch_id: batch_id,
        total_stored,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Processing,
    Completed,
    Failed,
}

async fn set_batch_status(store: &dyn RecordStore, batch_id: &str, status: BatchStatus) {
    let mut changes = Row::new();
    changes.insert("status".into(), json!(status));
    if let Err(e) = store.update(Table::ImportBatches, batch_id, changes).await {
        warn!(batch = %batch_id, ?status, error = %e, "failed to update import batch status");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnomalyStatus;
    use crate::storage::testing::temp_store;
    use crate::storage::{fetch, Query, SqliteStore};

    /// Delegates to SQLite but refuses anomaly inserts.
    struct NoAnomalies(SqliteStore);

    #[async_trait::async_trait]
    impl RecordStore for NoAnomalies {
        async fn select(&self, query: Query) -> Result<Vec<Row>, StoreError> {
            self.0.select(query).await
        }

        async fn count(&self, query: Query) -> Result<u64, StoreError> {
            self.0.count(query).await
        }

        async fn insert(&self, table: Table, rows: Vec<Row>) -> Result<usize, StoreError> {
            if table == Table::Anomalies {
                return Err(StoreError::Unavailable("disk full".into()));
            }
            self.0.insert(table, rows).await
        }

        async fn update(&self, table: Table, key: &str, changes: Row) -> Result<usize, StoreError> {
            self.0.update(table, key, changes).await
        }
    }

    async fn batch_statuses(store: &SqliteStore) -> Vec<String> {
        store
            .select(Query::table(Table::ImportBatches).select(&["status"]))
            .await
            .unwrap()
            .into_iter()
            .map(|row| row["status"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    fn input(equipment: &str, system: &str, description: &str) -> AnomalyInput {
        AnomalyInput {
            equipment_id: Some(equipment.into()),
            system: Some(system.into()),
            description: Some(description.into()),
            ..AnomalyInput::default()
        }
    }

    #[test]
    fn test_missing_fields() {
        let err = input("P-1", "  ", "leak").into_anomaly().unwrap_err();
        assert!(matches!(err, IngestError::MissingField("system")));

        let err = AnomalyInput::default().into_anomaly().unwrap_err();
        assert!(matches!(err, IngestError::MissingField("equipment_id")));
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_french_aliases() {
        let parsed: AnomalyInput = serde_json::from_value(json!({
            "num_equipement": "EQ001",
            "systeme": "Hydraulic",
            "description": "Pressure drop detected in main valve",
            "date_detection": "2025-01-15",
            "section_proprietaire": "Maintenance",
        }))
        .unwrap();
        let a = parsed.into_anomaly().unwrap();
        assert_eq!(a.equipment_id, "EQ001");
        assert_eq!(a.service.as_deref(), Some("Maintenance"));
        assert_eq!(a.created_at.to_rfc3339(), "2025-01-15T00:00:00+00:00");
        assert_eq!(a.status, AnomalyStatus::New);
        assert_eq!(a.source.as_deref(), Some("api"));
        // pressure is critical, hydraulic bumps availability
        assert_eq!(a.scores, crate::model::ScoreSet::system(4.0, 5.0, 5.0));
    }

    #[tokio::test]
    async fn test_store_single() {
        let (_dir, store) = temp_store();
        let stored = store_single(&store, input(" P-7 ", "Mechanical", "steam leak"))
            .await
            .unwrap();
        assert_eq!(stored.criticality, 13.0);

        let rows: Vec<Anomaly> = fetch(&store, Query::table(Table::Anomalies)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, stored.anomaly_id);
        assert_eq!(rows[0].equipment_id, "P-7");
    }

    #[tokio::test]
    async fn test_store_batch_shares_batch_id() {
        let (_dir, store) = temp_store();
        let stored = store_batch(
            &store,
            "reports.json",
            vec![input("A-1", "Electrical", "overheat"), input("A-2", "Pneumatic", "check")],
        )
        .await
        .unwrap();
        assert_eq!(stored.total_stored, 2);

        let rows: Vec<Anomaly> = fetch(&store, Query::table(Table::Anomalies)).await.unwrap();
        assert!(rows
            .iter()
            .all(|a| a.import_batch_id.as_deref() == Some(stored.import_batch_id.as_str())));
        assert_eq!(batch_statuses(&store).await, vec!["completed"]);
    }

    #[tokio::test]
    async fn test_failed_anomaly_insert_marks_batch_failed() {
        let (_dir, store) = temp_store();
        let failing = NoAnomalies(store.clone());
        let err = store_batch(&failing, "reports.csv", vec![input("A-1", "Electrical", "overheat")])
            .await
            .unwrap_err();
        assert!(!err.is_invalid_input());
        assert_eq!(batch_statuses(&store).await, vec!["failed"]);
        assert_eq!(store.count(Query::table(Table::Anomalies)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_batch_rejected_as_a_whole() {
        let (_dir, store) = temp_store();
        let err = store_batch(&store, "x.json", vec![input("A-1", "x", "leak"), input("", "x", "leak")])
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Record { index: 1, .. }));
        assert_eq!(store.count(Query::table(Table::Anomalies)).await.unwrap(), 0);

        let err = store_batch(&store, "x.json", Vec::new()).await.unwrap_err();
        assert!(matches!(err, IngestError::EmptyBatch));
    }
}
