use super::kpi::KpiSnapshot;
use crate::model::{round2, AnomalyStatus};
use crate::storage::{Query, RecordStore, StoreError, Table};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Percentage change of headline counts against the state `window` days ago.
///
/// Only total and open counts have history to compare against; the critical
/// and treatment-rate deltas stay at 0 until snapshots are retained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeStats {
    pub total_change: f64,
    pub open_change: f64,
    pub critical_change: f64,
    pub treatment_rate_change: f64,
}

impl ChangeStats {
    pub fn zeroed() -> Self {
        Self::default()
    }
}

/// Counts restricted to anomalies created before the cutoff.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PreviousCounts {
    pub total: u64,
    pub open: u64,
}

pub fn percent_change(current: u64, previous: u64) -> f64 {
    if previous == 0 {
        return 0.0;
    }
    round2((current as f64 - previous as f64) / previous as f64 * 100.0)
}

pub fn compute(current: &KpiSnapshot, previous: PreviousCounts) -> ChangeStats {
    ChangeStats {
        total_change: percent_change(current.total_anomalies, previous.total),
        open_change: percent_change(current.open_anomalies, previous.open),
        critical_change: 0.0,
        treatment_rate_change: 0.0,
    }
}

pub async fn fetch_previous(
    store: &dyn RecordStore,
    now: DateTime<Utc>,
    window_days: i64,
) -> Result<PreviousCounts, StoreError> {
    let cutoff = now - Duration::days(window_days);
    let older = || Query::table(Table::Anomalies).lt("created_at", cutoff);

    let (total, open) = tokio::try_join!(
        store.count(older()),
        store.count(older().in_list("status", AnomalyStatus::OPEN)),
    )?;
    Ok(PreviousCounts { total, open })
}
