//! Feedback validation
//!
//! The player rating is mandatory and must be 1..=5. Court rating and match
//! quality are optional; a submitted 0 is treated the same as omitted.

use crate::error::{MatchError, Result};
use crate::types::{FeedbackSubmission, PlayerFeedback};
use crate::utils::{current_timestamp, generate_id};

const RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

/// A submission that passed validation, with optional ratings normalised
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedFeedback(FeedbackSubmission);

impl ValidatedFeedback {
    pub fn validate(mut submission: FeedbackSubmission) -> Result<Self> {
        if !RATING_RANGE.contains(&submission.rating) {
            return Err(MatchError::invalid_input("Rating must be between 1 and 5"));
        }

        submission.court_rating = optional_rating(submission.court_rating, "Court rating")?;
        submission.match_quality = optional_rating(submission.match_quality, "Match quality")?;

        Ok(Self(submission))
    }

    pub fn submission(&self) -> &FeedbackSubmission {
        &self.0
    }

    /// Build a new record. The store keeps the original id and timestamp on overwrite.
    pub fn into_record(self) -> PlayerFeedback {
        let submission = self.0;
        PlayerFeedback {
            id: generate_id(),
            pairing_id: submission.pairing_id,
            from_user_id: submission.from_user_id,
            to_user_id: submission.to_user_id,
            rating: submission.rating,
            comments: submission.comments,
            court_rating: submission.court_rating,
            court_comments: submission.court_comments,
            match_quality: submission.match_quality,
            created_at: current_timestamp(),
        }
    }
}

fn optional_rating(value: Option<u8>, field: &str) -> Result<Option<u8>> {
    match value {
        None | Some(0) => Ok(None),
        Some(rating) if RATING_RANGE.contains(&rating) => Ok(Some(rating)),
        Some(_) => Err(MatchError::invalid_input(format!(
            "{} must be between 1 and 5",
            field
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn create_test_submission(rating: u8) -> FeedbackSubmission {
        FeedbackSubmission {
            pairing_id: Uuid::new_v4(),
            from_user_id: Uuid::new_v4(),
            to_user_id: Uuid::new_v4(),
            rating,
            court_rating: None,
            match_quality: None,
            comments: None,
            court_comments: None,
        }
    }

    #[test]
    fn test_rating_bounds() {
        for rating in 1..=5 {
            assert!(ValidatedFeedback::validate(create_test_submission(rating)).is_ok());
        }
        for rating in [0, 6, 255] {
            assert!(matches!(
                ValidatedFeedback::validate(create_test_submission(rating)),
                Err(MatchError::InvalidInput { .. })
            ));
        }
    }

    #[test]
    fn test_zero_optional_ratings_mean_absent() {
        let submission = FeedbackSubmission {
            court_rating: Some(0),
            match_quality: Some(0),
            ..create_test_submission(4)
        };

        let validated = ValidatedFeedback::validate(submission).unwrap();
        assert_eq!(validated.submission().court_rating, None);
        assert_eq!(validated.submission().match_quality, None);
    }

    #[test]
    fn test_optional_ratings_out_of_range() {
        let court = FeedbackSubmission {
            court_rating: Some(6),
            ..create_test_submission(4)
        };
        let err = ValidatedFeedback::validate(court).unwrap_err();
        assert_eq!(err, MatchError::invalid_input("Court rating must be between 1 and 5"));

        let quality = FeedbackSubmission {
            match_quality: Some(9),
            ..create_test_submission(4)
        };
        assert!(ValidatedFeedback::validate(quality).is_err());
    }

    #[test]
    fn test_into_record_copies_fields() {
        let submission = FeedbackSubmission {
            court_rating: Some(3),
            comments: Some("good match".to_string()),
            ..create_test_submission(5)
        };
        let record = ValidatedFeedback::validate(submission.clone())
            .unwrap()
            .into_record();

        assert_eq!(record.pairing_id, submission.pairing_id);
        assert_eq!(record.rating, 5);
        assert_eq!(record.court_rating, Some(3));
        assert_eq!(record.comments.as_deref(), Some("good match"));
    }
}
