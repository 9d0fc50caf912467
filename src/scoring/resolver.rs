use crate::model::ScoreSet;
use serde::Serialize;

/// The authoritative sub-scores of a record, absent values resolved to 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ResolvedScores {
    pub fiabilite_integrite: f64,
    pub disponibilite: f64,
    pub process_safety: f64,
}

impl ResolvedScores {
    pub fn sum(&self) -> f64 {
        self.fiabilite_integrite + self.disponibilite + self.process_safety
    }
}

/// Pick between the system triple and the user-override triple.
///
/// With `use_user_scores` set, each sub-score prefers the override, then the
/// system value, then 0. Without it the override is ignored entirely.
pub fn resolve(scores: &ScoreSet) -> ResolvedScores {
    let pick = |user: Option<f64>, system: Option<f64>| -> f64 {
        if scores.use_user_scores {
            user.or(system).unwrap_or(0.0)
        } else {
            system.unwrap_or(0.0)
        }
    };

    ResolvedScores {
        fiabilite_integrite: pick(
            scores.user_fiabilite_integrite,
            scores.final_fiabilite_integrite,
        ),
        disponibilite: pick(scores.user_disponibilite, scores.final_disponibilite),
        process_safety: pick(scores.user_process_safety, scores.final_process_safety),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overridden(flag: bool) -> ScoreSet {
        ScoreSet {
            final_fiabilite_integrite: Some(2.0),
            final_disponibilite: Some(3.0),
            final_process_safety: None,
            user_fiabilite_integrite: Some(5.0),
            user_disponibilite: None,
            user_process_safety: Some(4.0),
            use_user_scores: flag,
        }
    }

    #[test]
    fn test_flag_off_ignores_overrides() {
        let r = resolve(&overridden(false));
        assert_eq!(r.fiabilite_integrite, 2.0);
        assert_eq!(r.disponibilite, 3.0);
        assert_eq!(r.process_safety, 0.0);
    }

    #[test]
    fn test_flag_on_prefers_override_then_system() {
        let r = resolve(&overridden(true));
        assert_eq!(r.fiabilite_integrite, 5.0);
        // no override: falls back to the system value
        assert_eq!(r.disponibilite, 3.0);
        // system value absent, override present
        assert_eq!(r.process_safety, 4.0);
        assert_eq!(r.sum(), 12.0);
    }

    #[test]
    fn test_everything_absent_is_zero() {
        for flag in [false, true] {
            let s = ScoreSet {
                use_user_scores: flag,
                ..ScoreSet::default()
            };
            assert_eq!(resolve(&s), ResolvedScores::default());
        }
    }

    #[test]
    fn test_flag_off_ignores_overrides_for_many_inputs() {
        for a in 0..=5 {
            for b in 0..=5 {
                let s = ScoreSet {
                    final_fiabilite_integrite: Some(a as f64),
                    final_disponibilite: Some(b as f64),
                    final_process_safety: Some(1.0),
                    user_fiabilite_integrite: Some(99.0),
                    user_disponibilite: Some(99.0),
                    user_process_safety: Some(99.0),
                    use_user_scores: false,
                };
                assert_eq!(resolve(&s).sum(), (a + b + 1) as f64);
            }
        }
    }
}
