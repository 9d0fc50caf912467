//! Keyword scorer for incoming anomalies.
//!
//! Produces the three system sub-scores (1 to 5 each) from the description
//! and the affected system. Bands are checked from most to least severe and
//! the first hit wins.

use crate::model::ScoreSet;

const CRITICAL_KEYWORDS: &[&str] = &[
    "failure", "broken", "leak", "fire", "explosion", "pressure", "overheat", "fuite", "panne",
    "incendie", "surchauffe",
];
const MEDIUM_KEYWORDS: &[&str] = &["wear", "drift", "irregularities", "drop", "issue", "usure"];
const LOW_KEYWORDS: &[&str] = &["calibration", "maintenance", "check", "étalonnage"];

const MAX_SCORE: u8 = 5;

/// Scores as integers, before they are stored as reals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prediction {
    pub fiabilite_integrite: u8,
    pub disponibilite: u8,
    pub process_safety: u8,
}

impl Prediction {
    pub fn criticality(&self) -> u8 {
        self.fiabilite_integrite + self.disponibilite + self.process_safety
    }

    pub fn scores(&self) -> ScoreSet {
        ScoreSet::system(
            f64::from(self.fiabilite_integrite),
            f64::from(self.disponibilite),
            f64::from(self.process_safety),
        )
    }
}

pub fn predict(description: &str, system: &str) -> Prediction {
    let description = description.to_lowercase();
    let hit = |words: &[&str]| words.iter().any(|w| description.contains(w));

    let (f, d, p) = if hit(CRITICAL_KEYWORDS) {
        (4, 4, 5)
    } else if hit(MEDIUM_KEYWORDS) {
        (3, 3, 3)
    } else if hit(LOW_KEYWORDS) {
        (2, 2, 2)
    } else {
        (3, 3, 3)
    };
    let mut prediction = Prediction {
        fiabilite_integrite: f,
        disponibilite: d,
        process_safety: p,
    };

    let system = system.to_lowercase();
    if system.contains("electri") || system.contains("électri") {
        prediction.process_safety = (prediction.process_safety + 1).min(MAX_SCORE);
    } else if system.contains("hydraul") || system.contains("pneumat") {
        prediction.disponibilite = (prediction.disponibilite + 1).min(MAX_SCORE);
    }
    prediction
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(p: Prediction) -> (u8, u8, u8) {
        (p.fiabilite_integrite, p.disponibilite, p.process_safety)
    }

    #[test]
    fn test_leak_is_critical_band() {
        let p = predict("Oil LEAK on main seal", "Mechanical");
        assert_eq!(triple(p), (4, 4, 5));
        assert_eq!(p.criticality(), 13);
    }

    #[test]
    fn test_bands_in_order() {
        assert_eq!(triple(predict("pressure drop and wear", "")), (4, 4, 5));
        assert_eq!(triple(predict("usure du roulement", "")), (3, 3, 3));
        assert_eq!(triple(predict("Étalonnage capteur", "")), (2, 2, 2));
        assert_eq!(triple(predict("bruit inhabituel", "")), (3, 3, 3));
    }

    #[test]
    fn test_system_adjustment_is_capped() {
        assert_eq!(triple(predict("fuite", "Electrical")), (4, 4, 5));
        assert_eq!(triple(predict("calibration", "Électrique")), (2, 2, 3));
        assert_eq!(triple(predict("fire", "Hydraulic")), (4, 5, 5));
        assert_eq!(triple(predict("check", "pneumatic line")), (2, 3, 2));
    }

    #[test]
    fn test_scores_are_system_scores() {
        let s = predict("leak", "").scores();
        assert_eq!(s.final_process_safety, Some(5.0));
        assert!(!s.use_user_scores);
        assert_eq!(s.user_process_safety, None);
    }
}
