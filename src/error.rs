//! Error types for the matching engine
//!
//! Engine operations return the typed [`MatchError`] so callers (an HTTP layer,
//! the simulator, tests) can map each failure class to their own responses.

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, MatchError>;

/// Failure classes surfaced by the matching engine
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatchError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {reason}")]
    Conflict { reason: String },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Not enough players for matching in session {session_id}: {player_count}")]
    NotEnoughPlayers {
        session_id: String,
        player_count: usize,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl MatchError {
    pub fn session_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "Match session",
            id: id.to_string(),
        }
    }

    pub fn pairing_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "Player pairing",
            id: id.to_string(),
        }
    }

    pub fn user_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "User",
            id: id.to_string(),
        }
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }

    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Short label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            MatchError::NotFound { .. } => "not_found",
            MatchError::Conflict { .. } => "conflict",
            MatchError::InvalidInput { .. } => "invalid_input",
            MatchError::NotEnoughPlayers { .. } => "not_enough_players",
            MatchError::Internal { .. } => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = MatchError::session_not_found("abc");
        assert_eq!(err.to_string(), "Match session not found: abc");

        let err = MatchError::conflict("session is full");
        assert_eq!(err.to_string(), "Conflict: session is full");
        assert_eq!(err.kind(), "conflict");
    }
}
