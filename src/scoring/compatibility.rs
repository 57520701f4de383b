//! Compatibility scorer trait and the weighted default strategy
//!
//! Only the skill sub-score is derived from player data today. Availability
//! and historical preference are constant placeholders supplied by the
//! strategy, so a richer scorer can replace them without touching pairing.

use crate::types::UserProfile;
use crate::utils::skill_difference;
use serde::{Deserialize, Serialize};

/// Criteria controlling how compatibility is weighted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingCriteria {
    /// +/- range for skill matching
    pub skill_level_range: f64,
    /// Minutes of tolerance for time matching
    pub time_slot_tolerance_minutes: u32,
    /// Weight for historical preferences
    pub preference_weight: f64,
    /// Weight for player availability
    pub availability_weight: f64,
    /// Weight for skill compatibility
    pub skill_weight: f64,
}

impl Default for MatchingCriteria {
    fn default() -> Self {
        Self {
            skill_level_range: 0.5,
            time_slot_tolerance_minutes: 30,
            preference_weight: 0.3,
            availability_weight: 0.4,
            skill_weight: 0.3,
        }
    }
}

/// Trait for scoring how well two players fit together
pub trait CompatibilityScorer: Send + Sync {
    /// Score a pair of players; always within [0.0, 1.0]
    fn score(&self, a: &UserProfile, b: &UserProfile, criteria: &MatchingCriteria) -> f64;

    /// Strategy name for logs
    fn name(&self) -> &'static str;

    /// Get current configuration as JSON
    fn config(&self) -> serde_json::Value;
}

/// Skill similarity with constant availability and preference sub-scores
#[derive(Debug, Clone)]
pub struct WeightedCompatibilityScorer {
    availability_score: f64,
    preference_score: f64,
}

impl WeightedCompatibilityScorer {
    pub fn new(availability_score: f64, preference_score: f64) -> Self {
        Self {
            availability_score: availability_score.clamp(0.0, 1.0),
            preference_score: preference_score.clamp(0.0, 1.0),
        }
    }

    /// Skill sub-score: 1.0 for identical skills, falling linearly to 0.0 at the range edge
    pub fn skill_score(&self, a: &UserProfile, b: &UserProfile, criteria: &MatchingCriteria) -> f64 {
        let diff = skill_difference(a.skill_level, b.skill_level);
        (1.0 - diff / criteria.skill_level_range).max(0.0)
    }
}

impl Default for WeightedCompatibilityScorer {
    fn default() -> Self {
        Self::new(0.8, 0.7)
    }
}

impl CompatibilityScorer for WeightedCompatibilityScorer {
    fn score(&self, a: &UserProfile, b: &UserProfile, criteria: &MatchingCriteria) -> f64 {
        let skill_score = self.skill_score(a, b, criteria);

        let total = skill_score * criteria.skill_weight
            + self.availability_score * criteria.availability_weight
            + self.preference_score * criteria.preference_weight;

        total.clamp(0.0, 1.0)
    }

    fn name(&self) -> &'static str {
        "weighted"
    }

    fn config(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "weighted",
            "availability_score": self.availability_score,
            "preference_score": self.preference_score
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn player(skill_level: f64) -> UserProfile {
        UserProfile {
            id: Uuid::new_v4(),
            name: format!("player-{}", skill_level),
            skill_level,
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_identical_skill_scores_ceiling() {
        let scorer = WeightedCompatibilityScorer::default();
        let criteria = MatchingCriteria::default();

        let score = scorer.score(&player(4.0), &player(4.0), &criteria);
        assert_close(score, 0.83);
    }

    #[test]
    fn test_known_pair_score() {
        let scorer = WeightedCompatibilityScorer::default();
        let criteria = MatchingCriteria::default();

        // 0.3 * 0.2 + 0.4 * 0.8 + 0.3 * 0.7
        let score = scorer.score(&player(4.0), &player(3.6), &criteria);
        assert_close(score, 0.59);
    }

    #[test]
    fn test_mismatched_skill_hits_floor() {
        let scorer = WeightedCompatibilityScorer::default();
        let criteria = MatchingCriteria::default();

        assert_close(scorer.score(&player(5.0), &player(4.5), &criteria), 0.53);
        assert_close(scorer.score(&player(6.5), &player(2.0), &criteria), 0.53);
    }

    #[test]
    fn test_score_is_symmetric() {
        let scorer = WeightedCompatibilityScorer::default();
        let criteria = MatchingCriteria::default();

        let a = player(3.5);
        let b = player(3.8);
        assert_close(
            scorer.score(&a, &b, &criteria),
            scorer.score(&b, &a, &criteria),
        );
    }

    #[test]
    fn test_custom_placeholders() {
        let scorer = WeightedCompatibilityScorer::new(1.0, 1.0);
        let criteria = MatchingCriteria::default();

        assert_close(scorer.score(&player(4.0), &player(4.0), &criteria), 1.0);
        assert_eq!(scorer.config()["availability_score"], 1.0);
    }

    proptest! {
        #[test]
        fn prop_score_within_unit_interval(a in 1.0f64..7.0, b in 1.0f64..7.0) {
            let scorer = WeightedCompatibilityScorer::default();
            let score = scorer.score(&player(a), &player(b), &MatchingCriteria::default());
            prop_assert!((0.0..=1.0).contains(&score));
        }

        #[test]
        fn prop_score_non_increasing_in_skill_gap(
            base in 1.0f64..7.0,
            gap in 0.0f64..3.0,
            extra in 0.0f64..3.0,
        ) {
            let scorer = WeightedCompatibilityScorer::default();
            let criteria = MatchingCriteria::default();
            let near = scorer.score(&player(base), &player(base + gap), &criteria);
            let far = scorer.score(&player(base), &player(base + gap + extra), &criteria);
            prop_assert!(far <= near + 1e-12);
        }
    }
}
