//! In-memory session store
//!
//! All tables live behind a single `RwLock`, which makes admission and the
//! matching commit trivially atomic with respect to each other.

use crate::error::{MatchError, Result};
use crate::store::{AdmissionRule, CommitOutcome, SessionStore, StoreStats};
use crate::types::{
    AvailableSessionFilter, MatchPlayer, MatchSession, MatchingStatus, PairingId, PlayerFeedback,
    PlayerPairing, SessionId, UserId,
};
use crate::utils::current_timestamp;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

type FeedbackKey = (PairingId, UserId, UserId);

#[derive(Debug, Default)]
struct Tables {
    sessions: HashMap<SessionId, MatchSession>,
    players: HashMap<SessionId, Vec<MatchPlayer>>,
    pairings: HashMap<SessionId, Vec<PlayerPairing>>,
    feedback: HashMap<FeedbackKey, PlayerFeedback>,
}

impl Tables {
    fn player_count(&self, session_id: &SessionId) -> usize {
        self.players.get(session_id).map_or(0, Vec::len)
    }

    fn has_player(&self, session_id: &SessionId, user_id: UserId) -> bool {
        self.players
            .get(session_id)
            .is_some_and(|players| players.iter().any(|p| p.user_id == user_id))
    }

    fn all_pairings(&self) -> impl Iterator<Item = &PlayerPairing> {
        self.pairings.values().flatten()
    }
}

/// In-memory session store implementation
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    tables: RwLock<Tables>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| MatchError::internal("Failed to acquire session store read lock"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| MatchError::internal("Failed to acquire session store write lock"))
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_session(&self, session: MatchSession) -> Result<()> {
        let mut tables = self.write()?;
        if tables.sessions.contains_key(&session.id) {
            return Err(MatchError::conflict(format!(
                "session {} already exists",
                session.id
            )));
        }
        tables.players.insert(session.id, Vec::new());
        tables.sessions.insert(session.id, session);
        Ok(())
    }

    async fn get_session(&self, session_id: SessionId) -> Result<Option<MatchSession>> {
        Ok(self.read()?.sessions.get(&session_id).cloned())
    }

    async fn insert_player(&self, player: MatchPlayer, rule: AdmissionRule) -> Result<usize> {
        let mut tables = self.write()?;

        let session = tables
            .sessions
            .get(&player.session_id)
            .ok_or_else(|| MatchError::session_not_found(player.session_id))?;

        if rule.require_pending && session.status != MatchingStatus::Pending {
            return Err(MatchError::conflict(format!(
                "match session is {} and no longer accepts players",
                session.status
            )));
        }

        let max_players = session.max_players();
        if tables.player_count(&player.session_id) >= max_players {
            return Err(MatchError::conflict("match session is full"));
        }

        if tables.has_player(&player.session_id, player.user_id) {
            return Err(MatchError::conflict("user already in match session"));
        }

        let players = tables.players.entry(player.session_id).or_default();
        players.push(player);
        Ok(players.len())
    }

    async fn get_players(&self, session_id: SessionId) -> Result<Vec<MatchPlayer>> {
        let mut players = self
            .read()?
            .players
            .get(&session_id)
            .cloned()
            .unwrap_or_default();
        players.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.joined_at.cmp(&b.joined_at))
        });
        Ok(players)
    }

    async fn get_pairings(&self, session_id: SessionId) -> Result<Vec<PlayerPairing>> {
        let mut pairings = self
            .read()?
            .pairings
            .get(&session_id)
            .cloned()
            .unwrap_or_default();
        pairings.sort_by(|a, b| b.compatibility_score.total_cmp(&a.compatibility_score));
        Ok(pairings)
    }

    async fn get_pairing(&self, pairing_id: PairingId) -> Result<Option<PlayerPairing>> {
        Ok(self
            .read()?
            .all_pairings()
            .find(|p| p.id == pairing_id)
            .cloned())
    }

    async fn get_pairings_for_user(&self, user_id: UserId) -> Result<Vec<PlayerPairing>> {
        Ok(self
            .read()?
            .all_pairings()
            .filter(|p| p.includes(user_id))
            .cloned()
            .collect())
    }

    async fn commit_matching(
        &self,
        session_id: SessionId,
        pairings: Vec<PlayerPairing>,
    ) -> Result<CommitOutcome> {
        let mut tables = self.write()?;

        let session = tables
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| MatchError::session_not_found(session_id))?;

        if session.status != MatchingStatus::Pending {
            return Ok(CommitOutcome::StatusMismatch {
                current: session.status,
            });
        }

        session.status = MatchingStatus::Matched;
        session.updated_at = current_timestamp();

        tables
            .pairings
            .entry(session_id)
            .or_default()
            .extend(pairings);

        Ok(CommitOutcome::Committed)
    }

    async fn update_session_status(
        &self,
        session_id: SessionId,
        expected: MatchingStatus,
        next: MatchingStatus,
    ) -> Result<bool> {
        let mut tables = self.write()?;
        let now = current_timestamp();

        let session = tables
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| MatchError::session_not_found(session_id))?;

        if session.status != expected {
            return Ok(false);
        }

        session.status = next;
        session.updated_at = now;

        if let Some(pairings) = tables.pairings.get_mut(&session_id) {
            for pairing in pairings.iter_mut() {
                pairing.status = next;
                pairing.updated_at = now;
            }
        }

        Ok(true)
    }

    async fn list_available_sessions(
        &self,
        user_id: UserId,
        filter: &AvailableSessionFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<MatchSession>> {
        let tables = self.read()?;

        let mut sessions: Vec<MatchSession> = tables
            .sessions
            .values()
            .filter(|session| {
                session.status == MatchingStatus::Pending
                    && session.start_time > now
                    && tables.player_count(&session.id) < session.max_players()
                    && !tables.has_player(&session.id, user_id)
                    && filter.court_id.map_or(true, |id| session.court_id == id)
                    && filter.game_type.map_or(true, |gt| session.game_type == gt)
            })
            .cloned()
            .collect();

        sessions.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(sessions)
    }

    async fn upsert_feedback(&self, feedback: PlayerFeedback) -> Result<PlayerFeedback> {
        let mut tables = self.write()?;
        let key = (
            feedback.pairing_id,
            feedback.from_user_id,
            feedback.to_user_id,
        );

        let stored = match tables.feedback.get_mut(&key) {
            Some(existing) => {
                existing.rating = feedback.rating;
                existing.comments = feedback.comments;
                existing.court_rating = feedback.court_rating;
                existing.court_comments = feedback.court_comments;
                existing.match_quality = feedback.match_quality;
                existing.clone()
            }
            None => {
                tables.feedback.insert(key, feedback.clone());
                feedback
            }
        };

        Ok(stored)
    }

    async fn get_feedback_for_pairing(
        &self,
        pairing_id: PairingId,
    ) -> Result<Vec<PlayerFeedback>> {
        let mut feedback: Vec<PlayerFeedback> = self
            .read()?
            .feedback
            .values()
            .filter(|f| f.pairing_id == pairing_id)
            .cloned()
            .collect();
        feedback.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(feedback)
    }

    async fn get_feedback_received(&self, user_id: UserId) -> Result<Vec<PlayerFeedback>> {
        Ok(self
            .read()?
            .feedback
            .values()
            .filter(|f| f.to_user_id == user_id)
            .cloned()
            .collect())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let tables = self.read()?;
        let count_status = |status: MatchingStatus| {
            tables
                .sessions
                .values()
                .filter(|s| s.status == status)
                .count()
        };

        Ok(StoreStats {
            sessions: tables.sessions.len(),
            pending_sessions: count_status(MatchingStatus::Pending),
            matched_sessions: count_status(MatchingStatus::Matched),
            players: tables.players.values().map(Vec::len).sum(),
            pairings: tables.all_pairings().count(),
            feedback: tables.feedback.len(),
        })
    }
}
