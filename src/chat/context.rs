//! Enrichment: small bounded store reads that ground chat replies in data.
//!
//! Each read is independent. A failed read is logged and left empty so the
//! reply degrades instead of failing.

use super::message::Triggers;
use crate::config::ChatConfig;
use crate::model::{AnomalyStatus, MaintenanceWindow, ScoreSet};
use crate::scoring::{criticality_of, CriticalityLevel, CriticalityPolicy};
use crate::storage::{fetch, Order, Query, RecordStore, StoreError, Table};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::warn;

/// Compact view of an anomaly handed to templates and echoed in the context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalySummary {
    pub id: String,
    pub equipment_id: String,
    pub status: AnomalyStatus,
    pub criticality: CriticalityLevel,
    pub service: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Columns fetched for a summary: identity, text, and what criticality needs.
#[derive(Debug, Deserialize)]
struct SummaryRow {
    id: String,
    equipment_id: String,
    status: AnomalyStatus,
    #[serde(default)]
    service: Option<String>,
    #[serde(default)]
    description: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(flatten)]
    scores: ScoreSet,
}

impl SummaryRow {
    fn summarize(self, policy: &CriticalityPolicy) -> AnomalySummary {
        AnomalySummary {
            criticality: criticality_of(&self.scores, policy),
            id: self.id,
            equipment_id: self.equipment_id,
            status: self.status,
            service: self.service,
            description: self.description,
            created_at: self.created_at,
        }
    }
}

fn summary_query() -> Query {
    let mut columns = vec!["id", "equipment_id", "status", "service", "description", "created_at"];
    columns.extend(ScoreSet::COLUMNS);
    Query::table(Table::Anomalies).select(&columns)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriticalOverview {
    /// All open critical anomalies, not just the ones listed.
    pub count: usize,
    pub anomalies: Vec<AnomalySummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyCounts {
    pub total: u64,
    pub open: u64,
}

/// Results of the enrichment reads. `None` means not requested or failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Enrichment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_anomalies: Option<Vec<AnomalySummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomaly_counts: Option<AnomalyCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critical: Option<CriticalOverview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipment_anomalies: Option<Vec<AnomalySummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_windows: Option<Vec<MaintenanceWindow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_results: Option<Vec<AnomalySummary>>,
}

async fn attempt<T, F>(what: &'static str, enabled: bool, fut: F) -> Option<T>
where
    F: Future<Output = Result<T, StoreError>>,
{
    if !enabled {
        return None;
    }
    match fut.await {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(enrichment = what, error = %e, "chat enrichment query failed");
            None
        }
    }
}

/// Run the reads requested by `triggers`, concurrently.
pub async fn enrich(
    store: &dyn RecordStore,
    triggers: &Triggers,
    cfg: &ChatConfig,
    policy: &CriticalityPolicy,
    today: NaiveDate,
) -> Enrichment {
    let limit = cfg.enrichment_limit;

    let (recent_anomalies, anomaly_counts, critical, equipment_anomalies, maintenance_windows, search_results) = tokio::join!(
        attempt("recent", triggers.anomaly, recent(store, limit, policy)),
        attempt("counts", triggers.anomaly, counts(store)),
        attempt("critical", triggers.critical, critical(store, limit, policy)),
        attempt(
            "equipment",
            triggers.equipment_id.is_some(),
            equipment(store, triggers.equipment_id.as_deref().unwrap_or_default(), limit, policy),
        ),
        attempt(
            "maintenance",
            triggers.maintenance,
            upcoming_windows(store, today, cfg.maintenance_limit),
        ),
        attempt(
            "search",
            triggers.search_term.is_some(),
            search(store, triggers.search_term.as_deref().unwrap_or_default(), limit, policy),
        ),
    );

    Enrichment {
        recent_anomalies,
        anomaly_counts,
        critical,
        equipment_anomalies,
        maintenance_windows,
        search_results,
    }
}

fn summarize(rows: Vec<SummaryRow>, policy: &CriticalityPolicy) -> Vec<AnomalySummary> {
    rows.into_iter().map(|r| r.summarize(policy)).collect()
}

async fn recent(
    store: &dyn RecordStore,
    limit: usize,
    policy: &CriticalityPolicy,
) -> Result<Vec<AnomalySummary>, StoreError> {
    let rows: Vec<SummaryRow> = fetch(
        store,
        summary_query()
            .order_by("created_at", Order::Desc)
            .limit(limit),
    )
    .await?;
    Ok(summarize(rows, policy))
}

async fn counts(store: &dyn RecordStore) -> Result<AnomalyCounts, StoreError> {
    let (total, open) = tokio::try_join!(
        store.count(Query::table(Table::Anomalies)),
        store.count(Query::table(Table::Anomalies).in_list("status", AnomalyStatus::OPEN)),
    )?;
    Ok(AnomalyCounts { total, open })
}

/// Criticality is derived, so every open anomaly's summary columns are
/// classified here and only the first `limit` critical ones are kept.
async fn critical(
    store: &dyn RecordStore,
    limit: usize,
    policy: &CriticalityPolicy,
) -> Result<CriticalOverview, StoreError> {
    let rows: Vec<SummaryRow> = fetch(
        store,
        summary_query()
            .in_list("status", AnomalyStatus::OPEN)
            .order_by("created_at", Order::Desc)
            .order_by("id", Order::Asc),
    )
    .await?;

    let critical: Vec<AnomalySummary> = summarize(rows, policy)
        .into_iter()
        .filter(|s| s.criticality == CriticalityLevel::Critical)
        .collect();
    let count = critical.len();

    Ok(CriticalOverview {
        count,
        anomalies: critical.into_iter().take(limit).collect(),
    })
}

async fn equipment(
    store: &dyn RecordStore,
    equipment_id: &str,
    limit: usize,
    policy: &CriticalityPolicy,
) -> Result<Vec<AnomalySummary>, StoreError> {
    let rows: Vec<SummaryRow> = fetch(
        store,
        summary_query()
            .ilike("equipment_id", equipment_id)
            .in_list("status", AnomalyStatus::OPEN)
            .order_by("created_at", Order::Desc)
            .limit(limit),
    )
    .await?;
    Ok(summarize(rows, policy))
}

async fn upcoming_windows(
    store: &dyn RecordStore,
    today: NaiveDate,
    limit: usize,
) -> Result<Vec<MaintenanceWindow>, StoreError> {
    fetch(
        store,
        Query::table(Table::MaintenanceWindows)
            .gte("start_date", today)
            .order_by("start_date", Order::Asc)
            .limit(limit),
    )
    .await
}

async fn search(
    store: &dyn RecordStore,
    term: &str,
    limit: usize,
    policy: &CriticalityPolicy,
) -> Result<Vec<AnomalySummary>, StoreError> {
    let rows: Vec<SummaryRow> = fetch(
        store,
        summary_query()
            .ilike("description", term)
            .order_by("created_at", Order::Desc)
            .limit(limit),
    )
    .await?;
    Ok(summarize(rows, policy))
}
