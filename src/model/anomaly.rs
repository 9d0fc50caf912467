use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyStatus {
    New,
    InProgress,
    Treated,
    Closed,
}

impl AnomalyStatus {
    /// Statuses counted as "open" on the dashboard.
    pub const OPEN: [AnomalyStatus; 2] = [AnomalyStatus::New, AnomalyStatus::InProgress];
    /// Statuses counted as resolved for treatment rate and resolution time.
    pub const RESOLVED: [AnomalyStatus; 2] = [AnomalyStatus::Treated, AnomalyStatus::Closed];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyStatus::New => "new",
            AnomalyStatus::InProgress => "in_progress",
            AnomalyStatus::Treated => "treated",
            AnomalyStatus::Closed => "closed",
        }
    }

    pub fn is_open(&self) -> bool {
        Self::OPEN.contains(self)
    }

    /// French label used in chat replies.
    pub fn label(&self) -> &'static str {
        match self {
            AnomalyStatus::New => "nouvelle",
            AnomalyStatus::InProgress => "en cours",
            AnomalyStatus::Treated => "traitée",
            AnomalyStatus::Closed => "clôturée",
        }
    }
}

impl std::fmt::Display for AnomalyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two parallel sub-score triples of a record plus the flag selecting
/// which one is authoritative.
///
/// Also used on its own as the projection fetched for criticality tallies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreSet {
    pub final_fiabilite_integrite: Option<f64>,
    pub final_disponibilite: Option<f64>,
    pub final_process_safety: Option<f64>,
    pub user_fiabilite_integrite: Option<f64>,
    pub user_disponibilite: Option<f64>,
    pub user_process_safety: Option<f64>,
    #[serde(deserialize_with = "super::flag")]
    pub use_user_scores: bool,
}

impl ScoreSet {
    /// Column names making up this projection.
    pub const COLUMNS: [&'static str; 7] = [
        "final_fiabilite_integrite",
        "final_disponibilite",
        "final_process_safety",
        "user_fiabilite_integrite",
        "user_disponibilite",
        "user_process_safety",
        "use_user_scores",
    ];

    /// System scores only, no override.
    pub fn system(fiabilite: f64, disponibilite: f64, process_safety: f64) -> Self {
        Self {
            final_fiabilite_integrite: Some(fiabilite),
            final_disponibilite: Some(disponibilite),
            final_process_safety: Some(process_safety),
            ..Self::default()
        }
    }
}

/// An anomaly as stored in the `anomalies` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    pub id: String,
    pub status: AnomalyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub equipment_id: String,
    #[serde(flatten)]
    pub scores: ScoreSet,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub maintenance_window_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub system_id: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub import_batch_id: Option<String>,
}

impl Anomaly {
    /// A fresh `new` record for equipment `equipment_id`, timestamped now.
    ///
    /// Timestamps are whole seconds so stored text sorts chronologically.
    pub fn new(equipment_id: impl Into<String>, scores: ScoreSet) -> Self {
        let now = Utc::now().trunc_subsecs(0);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            status: AnomalyStatus::New,
            created_at: now,
            updated_at: now,
            equipment_id: equipment_id.into(),
            scores,
            service: None,
            estimated_hours: None,
            maintenance_window_id: None,
            description: None,
            system_id: None,
            source: None,
            import_batch_id: None,
        }
    }
}
