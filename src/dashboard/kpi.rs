//! KPI snapshot: counts, rates and estimates over the whole anomaly store.

use crate::config::KpiConfig;
use crate::model::{round2, AnomalyStatus, MaintenanceWindow, ScoreSet};
use crate::scoring::{criticality_of, CriticalityCounts, CriticalityPolicy};
use crate::storage::{fetch, Order, Query, RecordStore, StoreError, Table};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate shown on the dashboard header. Recomputed per request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiSnapshot {
    pub total_anomalies: u64,
    pub open_anomalies: u64,
    pub critical_anomalies: u64,
    pub criticality: CriticalityCounts,
    /// Percentage of anomalies treated or closed.
    pub treatment_rate: f64,
    /// Mean days from creation to last update over recently resolved anomalies.
    pub average_resolution_time: f64,
    /// Percentage of scheduled window capacity consumed, capped at 100.
    pub maintenance_utilization: f64,
    pub safety_incidents: u64,
    /// Estimated remediation cost, in millions.
    pub cost_impact: f64,
}

impl KpiSnapshot {
    /// The snapshot served when aggregation fails.
    pub fn zeroed() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolutionSample {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResolutionSample {
    /// Elapsed days, floored at zero against clock skew.
    pub fn days(&self) -> f64 {
        let secs = (self.updated_at - self.created_at).num_seconds();
        (secs as f64 / 86_400.0).max(0.0)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct HoursRow {
    estimated_hours: Option<f64>,
}

/// Raw results of the KPI queries.
#[derive(Debug, Clone, Default)]
pub struct KpiInputs {
    pub total: u64,
    pub open: u64,
    pub scores: Vec<ScoreSet>,
    pub resolved: u64,
    pub resolution_sample: Vec<ResolutionSample>,
    pub windows: Vec<MaintenanceWindow>,
    pub assigned: u64,
    pub estimated_hours: Vec<f64>,
}

/// Issue every KPI query concurrently. The first failure aborts the lot.
pub async fn gather(store: &dyn RecordStore, cfg: &KpiConfig) -> Result<KpiInputs, StoreError> {
    let anomalies = || Query::table(Table::Anomalies);

    let (total, open, scores, resolved, resolution_sample, windows, assigned, hours) = tokio::try_join!(
        store.count(anomalies()),
        store.count(anomalies().in_list("status", AnomalyStatus::OPEN)),
        fetch::<ScoreSet>(store, anomalies().select(&ScoreSet::COLUMNS)),
        store.count(anomalies().in_list("status", AnomalyStatus::RESOLVED)),
        fetch::<ResolutionSample>(
            store,
            anomalies()
                .select(&["created_at", "updated_at"])
                .in_list("status", AnomalyStatus::RESOLVED)
                .order_by("updated_at", Order::Desc)
                .limit(cfg.resolution_sample_size),
        ),
        fetch::<MaintenanceWindow>(store, Query::table(Table::MaintenanceWindows)),
        store.count(anomalies().not_null("maintenance_window_id")),
        fetch::<HoursRow>(
            store,
            anomalies()
                .select(&["estimated_hours"])
                .not_null("estimated_hours"),
        ),
    )?;

    Ok(KpiInputs {
        total,
        open,
        scores,
        resolved,
        resolution_sample,
        windows,
        assigned,
        estimated_hours: hours.into_iter().filter_map(|h| h.estimated_hours).collect(),
    })
}

/// Combine query results into a snapshot.
pub fn compute(inputs: &KpiInputs, policy: &CriticalityPolicy, cfg: &KpiConfig) -> KpiSnapshot {
    let criticality: CriticalityCounts = inputs
        .scores
        .iter()
        .map(|s| criticality_of(s, policy))
        .collect();

    KpiSnapshot {
        total_anomalies: inputs.total,
        open_anomalies: inputs.open,
        critical_anomalies: criticality.critical,
        criticality,
        treatment_rate: treatment_rate(inputs.resolved, inputs.total),
        average_resolution_time: average_resolution_days(&inputs.resolution_sample),
        maintenance_utilization: maintenance_utilization(&inputs.windows, inputs.assigned, cfg),
        safety_incidents: (criticality.critical as f64 * cfg.safety_incident_ratio).floor() as u64,
        cost_impact: cost_impact(&inputs.estimated_hours, cfg.hourly_cost_rate),
    }
}

pub fn treatment_rate(resolved: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(resolved as f64 / total as f64 * 100.0)
}

pub fn average_resolution_days(sample: &[ResolutionSample]) -> f64 {
    if sample.is_empty() {
        return 0.0;
    }
    let sum: f64 = sample.iter().map(ResolutionSample::days).sum();
    round2(sum / sample.len() as f64)
}

pub fn maintenance_utilization(windows: &[MaintenanceWindow], assigned: u64, cfg: &KpiConfig) -> f64 {
    let capacity: f64 = windows
        .iter()
        .map(|w| w.capacity_hours(cfg.hours_per_window_day))
        .sum();
    if windows.is_empty() || capacity <= 0.0 {
        return 0.0;
    }
    let consumed = assigned as f64 * cfg.hours_per_assigned_anomaly;
    round2((consumed / capacity * 100.0).min(100.0))
}

pub fn cost_impact(hours: &[f64], hourly_rate: f64) -> f64 {
    let total: f64 = hours.iter().sum();
    round2(total * hourly_rate / 1_000_000.0)
}
