//! Persistence interface for sessions, players, pairings and feedback
//!
//! Every engine component talks to storage through [`SessionStore`]. Each
//! method is linearizable on its own; [`SessionStore::insert_player`] and
//! [`SessionStore::commit_matching`] additionally perform their checks and
//! writes as one unit so concurrent callers cannot interleave them.

pub mod memory;

pub use memory::InMemorySessionStore;

use crate::error::Result;
use crate::types::{
    AvailableSessionFilter, MatchPlayer, MatchSession, MatchingStatus, PairingId, PlayerFeedback,
    PlayerPairing, SessionId, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rules applied atomically when admitting a player
#[derive(Debug, Clone, Copy, Default)]
pub struct AdmissionRule {
    /// Reject the join unless the session is still pending
    pub require_pending: bool,
}

/// Result of attempting to persist a matching pass
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// Status flipped Pending -> Matched and pairings were written
    Committed,
    /// The session had already left Pending; nothing was written
    StatusMismatch { current: MatchingStatus },
}

/// Row counts for health and metrics reporting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    pub sessions: usize,
    pub pending_sessions: usize,
    pub matched_sessions: usize,
    pub players: usize,
    pub pairings: usize,
    pub feedback: usize,
}

/// Trait for session storage operations
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a newly created session
    async fn create_session(&self, session: MatchSession) -> Result<()>;

    /// Get a session by ID
    async fn get_session(&self, session_id: SessionId) -> Result<Option<MatchSession>>;

    /// Admit a player after checking existence, status rule, capacity and
    /// duplicates under one write. Returns the session's new player count.
    async fn insert_player(&self, player: MatchPlayer, rule: AdmissionRule) -> Result<usize>;

    /// Players of a session, priority descending then earliest join first
    async fn get_players(&self, session_id: SessionId) -> Result<Vec<MatchPlayer>>;

    /// Pairings of a session, best compatibility first
    async fn get_pairings(&self, session_id: SessionId) -> Result<Vec<PlayerPairing>>;

    /// Get a single pairing by ID
    async fn get_pairing(&self, pairing_id: PairingId) -> Result<Option<PlayerPairing>>;

    /// Pairings that include the given user
    async fn get_pairings_for_user(&self, user_id: UserId) -> Result<Vec<PlayerPairing>>;

    /// Compare-and-swap the session from Pending to Matched and insert the
    /// pairings in the same write. Nothing is written when the swap fails.
    async fn commit_matching(
        &self,
        session_id: SessionId,
        pairings: Vec<PlayerPairing>,
    ) -> Result<CommitOutcome>;

    /// Compare-and-swap the session status and mirror it onto its pairings.
    /// Returns false when the current status is not `expected`.
    async fn update_session_status(
        &self,
        session_id: SessionId,
        expected: MatchingStatus,
        next: MatchingStatus,
    ) -> Result<bool>;

    /// Pending, not full, starting after `now`, and not yet joined by the user;
    /// ordered by start time
    async fn list_available_sessions(
        &self,
        user_id: UserId,
        filter: &AvailableSessionFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<MatchSession>>;

    /// Number of open sessions the user could join besides `excluding`
    async fn count_open_sessions_for(
        &self,
        user_id: UserId,
        excluding: Option<SessionId>,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let sessions = self
            .list_available_sessions(user_id, &AvailableSessionFilter::default(), now)
            .await?;
        Ok(sessions
            .iter()
            .filter(|session| Some(session.id) != excluding)
            .count())
    }

    /// Insert or overwrite feedback keyed by (pairing, from, to). Returns the stored row.
    async fn upsert_feedback(&self, feedback: PlayerFeedback) -> Result<PlayerFeedback>;

    /// All feedback recorded for a pairing
    async fn get_feedback_for_pairing(&self, pairing_id: PairingId)
        -> Result<Vec<PlayerFeedback>>;

    /// All feedback received by a user
    async fn get_feedback_received(&self, user_id: UserId) -> Result<Vec<PlayerFeedback>>;

    /// Current row counts
    async fn stats(&self) -> Result<StoreStats>;
}
