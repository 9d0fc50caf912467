//! Record types read from and written to the anomaly store.

pub mod anomaly;
pub mod maintenance;

pub use self::anomaly::{Anomaly, AnomalyStatus, ScoreSet};
pub use self::maintenance::MaintenanceWindow;

use serde::{Deserialize, Deserializer};

/// Accept a boolean stored either as JSON `true`/`false` or as SQLite `0`/`1`.
pub(crate) fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(b)) => b,
        Some(Flag::Int(i)) => i != 0,
        None => false,
    })
}

/// Round to two decimals, the precision every dashboard figure is reported at.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
