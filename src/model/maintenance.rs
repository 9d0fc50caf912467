use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A planned maintenance window anomalies can be assigned to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    pub id: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub duration_days: f64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub window_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl MaintenanceWindow {
    /// Scheduled capacity of the window, in hours.
    pub fn capacity_hours(&self, hours_per_day: f64) -> f64 {
        self.duration_days.max(0.0) * hours_per_day
    }
}
