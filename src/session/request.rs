//! Resolution of calendar-style session requests
//!
//! Clients describe a session as a date plus an optional wall-clock start and
//! duration. Missing or zero fields fall back to the defaults below; the
//! resulting times are interpreted as UTC.

use crate::error::{MatchError, Result};
use crate::types::{GameType, MatchingRequest, NewMatchSession, UserProfile};
use chrono::{Duration, NaiveDate, NaiveTime};

pub const DEFAULT_START_TIME: &str = "17:00";
pub const DEFAULT_DURATION_MINUTES: u32 = 60;
pub const DEFAULT_GAME_TYPE: GameType = GameType::Singles;

/// Turn a request into session parameters, filling defaults from `creator`
pub fn resolve_matching_request(
    request: &MatchingRequest,
    creator: &UserProfile,
) -> Result<NewMatchSession> {
    let date = NaiveDate::parse_from_str(request.date.trim(), "%Y-%m-%d")
        .map_err(|_| MatchError::invalid_input("Invalid date format. Use YYYY-MM-DD"))?;

    let start = match request.start_time.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => DEFAULT_START_TIME,
    };
    let start = NaiveTime::parse_from_str(start, "%H:%M")
        .map_err(|_| MatchError::invalid_input("Invalid start time format. Use HH:MM"))?;

    let duration = match request.duration {
        Some(minutes) if minutes > 0 => minutes,
        _ => DEFAULT_DURATION_MINUTES,
    };

    let game_type = match request.game_type.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => s.parse::<GameType>()?,
        _ => DEFAULT_GAME_TYPE,
    };

    let skill_level = match request.skill_level {
        Some(level) if level != 0.0 => level,
        _ => creator.skill_level,
    };
    if !skill_level.is_finite() || skill_level < 0.0 {
        return Err(MatchError::invalid_input(format!(
            "skill level must be a non-negative number, got {}",
            skill_level
        )));
    }

    let start_time = date.and_time(start).and_utc();
    let end_time = start_time + Duration::minutes(i64::from(duration));

    Ok(NewMatchSession {
        court_id: request.court_id,
        start_time,
        end_time,
        game_type,
        skill_level,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn create_test_creator() -> UserProfile {
        UserProfile {
            id: Uuid::new_v4(),
            name: "creator".to_string(),
            skill_level: 3.5,
        }
    }

    fn create_test_request(date: &str) -> MatchingRequest {
        MatchingRequest {
            court_id: Uuid::new_v4(),
            date: date.to_string(),
            start_time: None,
            duration: None,
            game_type: None,
            skill_level: None,
        }
    }

    #[test]
    fn test_defaults_applied() {
        let creator = create_test_creator();
        let request = create_test_request("2030-06-15");

        let resolved = resolve_matching_request(&request, &creator).unwrap();

        assert_eq!(
            resolved.start_time,
            Utc.with_ymd_and_hms(2030, 6, 15, 17, 0, 0).unwrap()
        );
        assert_eq!(
            resolved.end_time,
            Utc.with_ymd_and_hms(2030, 6, 15, 18, 0, 0).unwrap()
        );
        assert_eq!(resolved.game_type, GameType::Singles);
        assert_eq!(resolved.skill_level, 3.5);
        assert_eq!(resolved.court_id, request.court_id);
    }

    #[test]
    fn test_explicit_values() {
        let creator = create_test_creator();
        let request = MatchingRequest {
            start_time: Some("09:30".to_string()),
            duration: Some(90),
            game_type: Some("Doubles".to_string()),
            skill_level: Some(4.5),
            ..create_test_request("2030-01-02")
        };

        let resolved = resolve_matching_request(&request, &creator).unwrap();

        assert_eq!(
            resolved.start_time,
            Utc.with_ymd_and_hms(2030, 1, 2, 9, 30, 0).unwrap()
        );
        assert_eq!(
            resolved.end_time,
            Utc.with_ymd_and_hms(2030, 1, 2, 11, 0, 0).unwrap()
        );
        assert_eq!(resolved.game_type, GameType::Doubles);
        assert_eq!(resolved.skill_level, 4.5);
    }

    #[test]
    fn test_zero_values_fall_back() {
        let creator = create_test_creator();
        let request = MatchingRequest {
            duration: Some(0),
            skill_level: Some(0.0),
            game_type: Some(String::new()),
            ..create_test_request("2030-01-02")
        };

        let resolved = resolve_matching_request(&request, &creator).unwrap();
        assert_eq!(resolved.end_time - resolved.start_time, Duration::minutes(60));
        assert_eq!(resolved.skill_level, creator.skill_level);
        assert_eq!(resolved.game_type, GameType::Singles);
    }

    #[test]
    fn test_invalid_inputs() {
        let creator = create_test_creator();

        let bad_date = create_test_request("15/06/2030");
        assert!(matches!(
            resolve_matching_request(&bad_date, &creator),
            Err(MatchError::InvalidInput { .. })
        ));

        let bad_time = MatchingRequest {
            start_time: Some("5pm".to_string()),
            ..create_test_request("2030-06-15")
        };
        assert!(matches!(
            resolve_matching_request(&bad_time, &creator),
            Err(MatchError::InvalidInput { .. })
        ));

        let bad_game = MatchingRequest {
            game_type: Some("Mixed".to_string()),
            ..create_test_request("2030-06-15")
        };
        assert!(matches!(
            resolve_matching_request(&bad_game, &creator),
            Err(MatchError::InvalidInput { .. })
        ));

        let bad_skill = MatchingRequest {
            skill_level: Some(-1.0),
            ..create_test_request("2030-06-15")
        };
        assert!(matches!(
            resolve_matching_request(&bad_skill, &creator),
            Err(MatchError::InvalidInput { .. })
        ));
    }
}
