//! Utility functions for the matching engine

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new unique record ID (sessions, players, pairings, feedback)
pub fn generate_id() -> Uuid {
    Uuid::new_v4()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Calculate the absolute difference between two skill ratings
pub fn skill_difference(skill1: f64, skill2: f64) -> f64 {
    (skill1 - skill2).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_unique_ids() {
        let id1 = generate_id();
        let id2 = generate_id();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_skill_difference() {
        assert_eq!(skill_difference(4.5, 3.5), 1.0);
        assert_eq!(skill_difference(3.5, 4.5), 1.0);
        assert_eq!(skill_difference(4.0, 4.0), 0.0);
    }
}
