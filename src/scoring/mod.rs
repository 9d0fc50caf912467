//! Score resolution and criticality classification.

pub mod criticality;
pub mod resolver;

pub use self::criticality::{CriticalityCounts, CriticalityLevel, CriticalityPolicy};
pub use self::resolver::{resolve, ResolvedScores};

use crate::model::ScoreSet;

/// Resolve a record's scores and classify them in one step.
pub fn criticality_of(scores: &ScoreSet, policy: &CriticalityPolicy) -> CriticalityLevel {
    policy.classify(resolve(scores).sum())
}
