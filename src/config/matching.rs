//! Matching engine configuration

use crate::scoring::MatchingCriteria;
use serde::{Deserialize, Serialize};

/// Matching-specific settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingSettings {
    /// +/- skill range within which pairs earn a skill score
    pub skill_level_range: f64,
    /// Weight for skill compatibility
    pub skill_weight: f64,
    /// Weight for availability compatibility
    pub availability_weight: f64,
    /// Weight for historical preference compatibility
    pub preference_weight: f64,
    /// Constant availability sub-score used by the weighted scorer
    pub availability_score: f64,
    /// Constant preference sub-score used by the weighted scorer
    pub preference_score: f64,
    /// Minutes of tolerance for time matching (carried, not scored)
    pub time_slot_tolerance_minutes: u32,
    /// Player count at which a join dispatches a matching pass
    pub auto_trigger_threshold: usize,
    /// Priority given to a user with no alternative sessions
    pub max_priority: u32,
    /// Accept joins into sessions that are no longer pending
    pub allow_join_after_matching: bool,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            skill_level_range: 0.5,
            skill_weight: 0.3,
            availability_weight: 0.4,
            preference_weight: 0.3,
            availability_score: 0.8,
            preference_score: 0.7,
            time_slot_tolerance_minutes: 30,
            auto_trigger_threshold: 2,
            max_priority: 10,
            allow_join_after_matching: true,
        }
    }
}

impl MatchingSettings {
    /// Scoring criteria derived from these settings
    pub fn criteria(&self) -> MatchingCriteria {
        MatchingCriteria {
            skill_level_range: self.skill_level_range,
            time_slot_tolerance_minutes: self.time_slot_tolerance_minutes,
            preference_weight: self.preference_weight,
            availability_weight: self.availability_weight,
            skill_weight: self.skill_weight,
        }
    }
}
