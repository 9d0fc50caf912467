//! Dashboard aggregates: KPI snapshot, monthly chart, service distribution
//! and change statistics.
//!
//! Each aggregate has a fallible `try_*` form and an infallible form. The
//! infallible form is the only place store errors are swallowed: they are
//! logged and replaced by a zeroed (or empty) result.

pub mod changes;
pub mod chart;
pub mod kpi;
pub mod services;

pub use self::changes::ChangeStats;
pub use self::chart::MonthBucket;
pub use self::kpi::KpiSnapshot;
pub use self::services::ServiceShare;

use crate::config::DashboardConfig;
use crate::storage::{RecordStore, StoreError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

/// Dashboard service over an injected record store.
#[derive(Clone)]
pub struct Dashboard {
    store: Arc<dyn RecordStore>,
    config: Arc<DashboardConfig>,
}

impl Dashboard {
    pub fn new(store: Arc<dyn RecordStore>, config: Arc<DashboardConfig>) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub async fn try_kpis(&self) -> Result<KpiSnapshot, StoreError> {
        let inputs = kpi::gather(self.store.as_ref(), &self.config.kpi).await?;
        let snapshot = kpi::compute(&inputs, &self.config.scoring, &self.config.kpi);
        debug!(
            total = snapshot.total_anomalies,
            open = snapshot.open_anomalies,
            critical = snapshot.critical_anomalies,
            "KPI snapshot computed"
        );
        Ok(snapshot)
    }

    pub async fn kpis(&self) -> KpiSnapshot {
        self.try_kpis().await.unwrap_or_else(|e| {
            warn!(error = %e, "KPI aggregation failed, serving zeroed snapshot");
            KpiSnapshot::zeroed()
        })
    }

    pub async fn try_chart(&self, year: Option<i32>) -> Result<Vec<MonthBucket>, StoreError> {
        let rows = chart::fetch_rows(self.store.as_ref(), year).await?;
        Ok(chart::bucketize(&rows, &self.config.scoring))
    }

    /// Always twelve buckets, zero-filled on failure.
    pub async fn chart(&self, year: Option<i32>) -> Vec<MonthBucket> {
        self.try_chart(year).await.unwrap_or_else(|e| {
            warn!(error = %e, ?year, "chart aggregation failed, serving empty buckets");
            chart::empty_buckets()
        })
    }

    pub async fn try_services(&self) -> Result<Vec<ServiceShare>, StoreError> {
        let labels = services::fetch_labels(self.store.as_ref()).await?;
        Ok(services::distribute(labels))
    }

    pub async fn services(&self) -> Vec<ServiceShare> {
        self.try_services().await.unwrap_or_else(|e| {
            warn!(error = %e, "service distribution failed, serving empty list");
            Vec::new()
        })
    }

    pub async fn try_changes_at(
        &self,
        current: &KpiSnapshot,
        now: DateTime<Utc>,
    ) -> Result<ChangeStats, StoreError> {
        let previous =
            changes::fetch_previous(self.store.as_ref(), now, self.config.kpi.change_window_days)
                .await?;
        Ok(changes::compute(current, previous))
    }

    /// Change statistics relative to an already computed snapshot.
    pub async fn changes(&self, current: &KpiSnapshot) -> ChangeStats {
        self.try_changes_at(current, Utc::now())
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "change statistics failed, serving zeroes");
                ChangeStats::zeroed()
            })
    }
}
