//! Common types used throughout the matching engine

use crate::error::MatchError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for users (players)
pub type UserId = Uuid;

/// Unique identifier for courts
pub type CourtId = Uuid;

/// Unique identifier for match sessions
pub type SessionId = Uuid;

/// Unique identifier for player pairings
pub type PairingId = Uuid;

/// Unique identifier for feedback records
pub type FeedbackId = Uuid;

/// Kind of game a session is scheduled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameType {
    Singles,
    Doubles,
}

impl GameType {
    /// Capacity of a session of this game type
    pub fn max_players(&self) -> usize {
        match self {
            GameType::Singles => 2,
            GameType::Doubles => 4,
        }
    }

    /// Lowercase label used for metrics
    pub fn as_label(&self) -> &'static str {
        match self {
            GameType::Singles => "singles",
            GameType::Doubles => "doubles",
        }
    }
}

impl std::fmt::Display for GameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameType::Singles => write!(f, "Singles"),
            GameType::Doubles => write!(f, "Doubles"),
        }
    }
}

impl FromStr for GameType {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "singles" => Ok(GameType::Singles),
            "doubles" => Ok(GameType::Doubles),
            other => Err(MatchError::invalid_input(format!(
                "unsupported game type: {}",
                other
            ))),
        }
    }
}

/// Lifecycle status shared by sessions and pairings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchingStatus {
    Pending,
    Matched,
    Confirmed,
    Cancelled,
    Completed,
}

impl MatchingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchingStatus::Cancelled | MatchingStatus::Completed)
    }

    /// Whether an explicit status update may move from `self` to `next`.
    ///
    /// Pending -> Matched is deliberately absent: only a matching pass may
    /// perform it.
    pub fn can_transition_to(&self, next: MatchingStatus) -> bool {
        use MatchingStatus::*;
        matches!(
            (self, next),
            (Pending, Cancelled)
                | (Matched, Confirmed)
                | (Matched, Cancelled)
                | (Confirmed, Completed)
                | (Confirmed, Cancelled)
        )
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            MatchingStatus::Pending => "pending",
            MatchingStatus::Matched => "matched",
            MatchingStatus::Confirmed => "confirmed",
            MatchingStatus::Cancelled => "cancelled",
            MatchingStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for MatchingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_label())
    }
}

/// A court/time slot accepting player joins
///
/// Serializes with a `max_players` field; it is ignored when deserializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "MatchSessionRecord")]
pub struct MatchSession {
    pub id: SessionId,
    pub court_id: CourtId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub game_type: GameType,
    /// Target NTRP skill level
    pub skill_level: f64,
    pub status: MatchingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MatchSession {
    /// Create a pending session; capacity follows the game type
    pub fn new(id: SessionId, spec: NewMatchSession, now: DateTime<Utc>) -> Self {
        Self {
            id,
            court_id: spec.court_id,
            start_time: spec.start_time,
            end_time: spec.end_time,
            game_type: spec.game_type,
            skill_level: spec.skill_level,
            status: MatchingStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Derived from the game type; never stored independently
    pub fn max_players(&self) -> usize {
        self.game_type.max_players()
    }
}

#[derive(Serialize)]
struct MatchSessionRecord {
    id: SessionId,
    court_id: CourtId,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    game_type: GameType,
    max_players: usize,
    skill_level: f64,
    status: MatchingStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MatchSession> for MatchSessionRecord {
    fn from(session: MatchSession) -> Self {
        Self {
            max_players: session.max_players(),
            id: session.id,
            court_id: session.court_id,
            start_time: session.start_time,
            end_time: session.end_time,
            game_type: session.game_type,
            skill_level: session.skill_level,
            status: session.status,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

/// Parameters for creating a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMatchSession {
    pub court_id: CourtId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub game_type: GameType,
    pub skill_level: f64,
}

/// A user admitted into a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPlayer {
    pub id: Uuid,
    pub session_id: SessionId,
    pub user_id: UserId,
    pub joined_at: DateTime<Utc>,
    /// Reserved; always 0.0 for now
    pub preference_score: f64,
    /// 0..=10, higher for users with fewer alternative sessions
    pub priority: u32,
}

/// A generated grouping of two (singles) or four (doubles) players
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerPairing {
    pub id: PairingId,
    pub session_id: SessionId,
    pub player1_id: UserId,
    pub player2_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player3_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player4_id: Option<UserId>,
    pub compatibility_score: f64,
    pub status: MatchingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlayerPairing {
    /// All occupied player slots in slot order
    pub fn player_ids(&self) -> Vec<UserId> {
        [
            Some(self.player1_id),
            Some(self.player2_id),
            self.player3_id,
            self.player4_id,
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn includes(&self, user_id: UserId) -> bool {
        self.player_ids().contains(&user_id)
    }
}

/// Post-match feedback from one player about another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerFeedback {
    pub id: FeedbackId,
    pub pairing_id: PairingId,
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub rating: u8,
    pub comments: Option<String>,
    pub court_rating: Option<u8>,
    pub court_comments: Option<String>,
    pub match_quality: Option<u8>,
    pub created_at: DateTime<Utc>,
}

/// Feedback as submitted by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSubmission {
    pub pairing_id: PairingId,
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub rating: u8,
    #[serde(default)]
    pub court_rating: Option<u8>,
    #[serde(default)]
    pub match_quality: Option<u8>,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub court_comments: Option<String>,
}

/// The view of a user the engine needs from the user directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    /// NTRP skill rating
    pub skill_level: f64,
}

/// A session together with its players and pairings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSessionDetails {
    pub session: MatchSession,
    pub players: Vec<MatchPlayer>,
    pub pairings: Vec<PlayerPairing>,
    /// Directory profiles for every player and pairing slot that resolved
    #[serde(default)]
    pub profiles: HashMap<UserId, UserProfile>,
}

/// Optional filters for listing joinable sessions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AvailableSessionFilter {
    pub court_id: Option<CourtId>,
    pub game_type: Option<GameType>,
}

/// Session creation request in the client's calendar terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingRequest {
    pub court_id: CourtId,
    /// YYYY-MM-DD
    pub date: String,
    /// HH:MM, defaults to 17:00
    #[serde(default)]
    pub start_time: Option<String>,
    /// Minutes, defaults to 60
    #[serde(default)]
    pub duration: Option<u32>,
    /// "Singles" or "Doubles", defaults to Singles
    #[serde(default)]
    pub game_type: Option<String>,
    /// Defaults to the creator's own skill level
    #[serde(default)]
    pub skill_level: Option<f64>,
}

/// Per-user matching summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMatchingStats {
    pub available_sessions: usize,
    pub total_matches: usize,
    pub average_rating: Option<f64>,
}

/// Event emitted when a player joins a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerJoinedSession {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub priority: u32,
    pub player_count: usize,
    pub max_players: usize,
    pub timestamp: DateTime<Utc>,
}

/// Event emitted when a matching pass commits pairings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMatched {
    pub session_id: SessionId,
    pub game_type: GameType,
    pub pairings: Vec<PlayerPairing>,
    pub timestamp: DateTime<Utc>,
}

/// Event emitted when a background matching pass fails
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingFailed {
    pub session_id: SessionId,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

/// Event emitted on an explicit status change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatusChanged {
    pub session_id: SessionId,
    pub from: MatchingStatus,
    pub to: MatchingStatus,
    pub timestamp: DateTime<Utc>,
}

/// Union type for all outbound events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MatchingEvent {
    PlayerJoinedSession(PlayerJoinedSession),
    SessionMatched(SessionMatched),
    MatchingFailed(MatchingFailed),
    SessionStatusChanged(SessionStatusChanged),
}

impl MatchingEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            MatchingEvent::PlayerJoinedSession(_) => "PlayerJoinedSession",
            MatchingEvent::SessionMatched(_) => "SessionMatched",
            MatchingEvent::MatchingFailed(_) => "MatchingFailed",
            MatchingEvent::SessionStatusChanged(_) => "SessionStatusChanged",
        }
    }
}
