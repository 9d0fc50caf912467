//! Criticality levels derived from summed sub-scores.
//!
//! Thresholds are policy, not code: they come from the `[scoring]` section of
//! the configuration and default to the 3..=15 scale produced at intake.

use serde::{Deserialize, Serialize};

/// Ordinal severity of an anomaly. Never stored; always recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriticalityLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl CriticalityLevel {
    pub const ALL: [CriticalityLevel; 4] = [
        CriticalityLevel::Low,
        CriticalityLevel::Medium,
        CriticalityLevel::High,
        CriticalityLevel::Critical,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CriticalityLevel::Low => "faible",
            CriticalityLevel::Medium => "moyenne",
            CriticalityLevel::High => "élevée",
            CriticalityLevel::Critical => "critique",
        }
    }
}

/// Threshold policy mapping a score sum to a level.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CriticalityPolicy {
    /// Minimum sum classified as medium.
    pub medium_from: f64,
    /// Minimum sum classified as high.
    pub high_from: f64,
    /// Minimum sum classified as critical.
    pub critical_from: f64,
}

impl Default for CriticalityPolicy {
    fn default() -> Self {
        Self {
            medium_from: 6.0,
            high_from: 9.0,
            critical_from: 12.0,
        }
    }
}

impl CriticalityPolicy {
    /// Total over every `f64`: anything not reaching a threshold (NaN included)
    /// is `Low`.
    pub fn classify(&self, sum: f64) -> CriticalityLevel {
        if sum >= self.critical_from {
            CriticalityLevel::Critical
        } else if sum >= self.high_from {
            CriticalityLevel::High
        } else if sum >= self.medium_from {
            CriticalityLevel::Medium
        } else {
            CriticalityLevel::Low
        }
    }
}

/// Per-level tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalityCounts {
    pub low: u64,
    pub medium: u64,
    pub high: u64,
    pub critical: u64,
}

impl CriticalityCounts {
    pub fn record(&mut self, level: CriticalityLevel) {
        match level {
            CriticalityLevel::Low => self.low += 1,
            CriticalityLevel::Medium => self.medium += 1,
            CriticalityLevel::High => self.high += 1,
            CriticalityLevel::Critical => self.critical += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.low + self.medium + self.high + self.critical
    }
}

impl FromIterator<CriticalityLevel> for CriticalityCounts {
    fn from_iter<I: IntoIterator<Item = CriticalityLevel>>(iter: I) -> Self {
        let mut counts = Self::default();
        for level in iter {
            counts.record(level);
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let p = CriticalityPolicy::default();
        assert_eq!(p.classify(3.0), CriticalityLevel::Low);
        assert_eq!(p.classify(5.99), CriticalityLevel::Low);
        assert_eq!(p.classify(6.0), CriticalityLevel::Medium);
        assert_eq!(p.classify(9.0), CriticalityLevel::High);
        assert_eq!(p.classify(11.5), CriticalityLevel::High);
        assert_eq!(p.classify(12.0), CriticalityLevel::Critical);
        assert_eq!(p.classify(15.0), CriticalityLevel::Critical);
    }

    #[test]
    fn test_classify_is_total() {
        let p = CriticalityPolicy::default();
        let samples = [
            f64::NEG_INFINITY,
            -1e300,
            -1.0,
            0.0,
            f64::MIN_POSITIVE,
            7.5,
            1e300,
            f64::INFINITY,
            f64::NAN,
        ];
        for s in samples {
            let level = p.classify(s);
            assert!(CriticalityLevel::ALL.contains(&level));
        }
        assert_eq!(p.classify(f64::NAN), CriticalityLevel::Low);
        assert_eq!(p.classify(f64::INFINITY), CriticalityLevel::Critical);
    }

    #[test]
    fn test_custom_policy() {
        let p = CriticalityPolicy {
            medium_from: 4.0,
            high_from: 8.0,
            critical_from: 10.0,
        };
        assert_eq!(p.classify(4.0), CriticalityLevel::Medium);
        assert_eq!(p.classify(10.0), CriticalityLevel::Critical);
    }

    #[test]
    fn test_counts_from_iter() {
        let counts: CriticalityCounts = [
            CriticalityLevel::Critical,
            CriticalityLevel::Low,
            CriticalityLevel::Critical,
        ]
        .into_iter()
        .collect();
        assert_eq!(counts.critical, 2);
        assert_eq!(counts.low, 1);
        assert_eq!(counts.total(), 3);
    }
}
