//! Matching pass orchestration
//!
//! A pass loads a pending session and its players, resolves their profiles,
//! generates pairings and commits them. The commit flips Pending -> Matched
//! and writes the pairings in one store call, so concurrent passes over the
//! same session persist at most one set of pairings.

use crate::directory::UserDirectory;
use crate::error::{MatchError, Result};
use crate::events::EventPublisher;
use crate::metrics::MetricsCollector;
use crate::pairing::PairingGenerator;
use crate::session::report_publish;
use crate::store::{CommitOutcome, SessionStore};
use crate::types::{
    MatchPlayer, MatchSession, MatchingStatus, PlayerPairing, SessionId, SessionMatched,
    UserProfile,
};
use crate::utils::current_timestamp;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Result of a matching pass
#[derive(Debug, Clone, PartialEq)]
pub enum MatchingOutcome {
    /// Pairings were persisted and the session is now Matched
    Committed { pairings: Vec<PlayerPairing> },
    /// The session had already left Pending; nothing was written
    AlreadyMatched,
    /// No complete grouping could be formed; the session stays Pending
    NoPairings,
}

impl MatchingOutcome {
    pub fn as_label(&self) -> &'static str {
        match self {
            MatchingOutcome::Committed { .. } => "committed",
            MatchingOutcome::AlreadyMatched => "already_matched",
            MatchingOutcome::NoPairings => "no_pairings",
        }
    }

    pub fn pairings(&self) -> &[PlayerPairing] {
        match self {
            MatchingOutcome::Committed { pairings } => pairings,
            _ => &[],
        }
    }
}

/// Counters for matching passes
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrchestratorStats {
    pub passes: u64,
    pub committed: u64,
    pub already_matched: u64,
    pub no_pairings: u64,
    pub errors: u64,
    pub pairings_created: u64,
    pub players_excluded: u64,
}

/// Runs matching passes against the store
pub struct MatchOrchestrator {
    store: Arc<dyn SessionStore>,
    directory: Arc<dyn UserDirectory>,
    generator: PairingGenerator,
    event_publisher: Arc<dyn EventPublisher>,
    metrics_collector: Arc<MetricsCollector>,
    stats: RwLock<OrchestratorStats>,
}

impl MatchOrchestrator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        directory: Arc<dyn UserDirectory>,
        generator: PairingGenerator,
        event_publisher: Arc<dyn EventPublisher>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            store,
            directory,
            generator,
            event_publisher,
            metrics_collector,
            stats: RwLock::new(OrchestratorStats::default()),
        }
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics_collector
    }

    pub fn event_publisher(&self) -> &Arc<dyn EventPublisher> {
        &self.event_publisher
    }

    /// Run one matching pass. Idempotent: once a session has left Pending
    /// every further call returns [`MatchingOutcome::AlreadyMatched`].
    pub async fn trigger_matching(&self, session_id: SessionId) -> Result<MatchingOutcome> {
        let timer = self.metrics_collector.start_timer();

        let result = self.run_pass(session_id).await;

        let label = match &result {
            Ok(outcome) => outcome.as_label(),
            Err(e) => e.kind(),
        };
        self.metrics_collector
            .record_matching_pass(label, timer.stop());
        self.update_stats(&result)?;

        result
    }

    /// Snapshot of pass counters
    pub fn stats(&self) -> Result<OrchestratorStats> {
        self.stats
            .read()
            .map(|stats| stats.clone())
            .map_err(|_| MatchError::internal("Failed to acquire matching stats lock"))
    }

    async fn run_pass(&self, session_id: SessionId) -> Result<MatchingOutcome> {
        let session = self
            .store
            .get_session(session_id)
            .await?
            .ok_or_else(|| MatchError::session_not_found(session_id))?;

        if session.status != MatchingStatus::Pending {
            debug!(
                "Session {} is {}, skipping matching pass",
                session_id, session.status
            );
            return Ok(MatchingOutcome::AlreadyMatched);
        }

        let players = self.store.get_players(session_id).await?;
        if players.len() < 2 {
            return Err(MatchError::NotEnoughPlayers {
                session_id: session_id.to_string(),
                player_count: players.len(),
            });
        }

        let profiles = self.resolve_profiles(&session, &players).await;

        let pairings = self.generator.generate(&session, profiles);
        if pairings.is_empty() {
            info!(
                "No {} pairings could be formed for session {} from {} player(s); leaving it pending",
                session.game_type,
                session_id,
                players.len()
            );
            return Ok(MatchingOutcome::NoPairings);
        }

        match self
            .store
            .commit_matching(session_id, pairings.clone())
            .await?
        {
            CommitOutcome::Committed => {
                self.on_committed(&session, &pairings).await;
                Ok(MatchingOutcome::Committed { pairings })
            }
            CommitOutcome::StatusMismatch { current } => {
                debug!(
                    "Session {} moved to {} during the pass; discarding {} pairing(s)",
                    session_id,
                    current,
                    pairings.len()
                );
                Ok(MatchingOutcome::AlreadyMatched)
            }
        }
    }

    /// Players whose profile cannot be resolved are left out of the pass
    async fn resolve_profiles(
        &self,
        session: &MatchSession,
        players: &[MatchPlayer],
    ) -> Vec<UserProfile> {
        let mut profiles = Vec::with_capacity(players.len());
        let mut excluded = 0;

        for player in players {
            match self.directory.get_user(player.user_id).await {
                Ok(Some(profile)) => profiles.push(profile),
                Ok(None) => {
                    warn!(
                        "User {} in session {} not found in directory; excluding from matching",
                        player.user_id, session.id
                    );
                    excluded += 1;
                }
                Err(e) => {
                    warn!(
                        "Failed to look up user {} for session {}: {}; excluding from matching",
                        player.user_id, session.id, e
                    );
                    excluded += 1;
                }
            }
        }

        if excluded > 0 {
            self.metrics_collector.record_excluded_players(excluded);
            if let Ok(mut stats) = self.stats.write() {
                stats.players_excluded += excluded as u64;
            }
        }

        profiles
    }

    async fn on_committed(&self, session: &MatchSession, pairings: &[PlayerPairing]) {
        info!(
            "Session {} matched - game_type: {}, pairings: {}, best_score: {:.2}",
            session.id,
            session.game_type,
            pairings.len(),
            pairings
                .iter()
                .map(|p| p.compatibility_score)
                .fold(0.0, f64::max)
        );

        self.metrics_collector
            .record_status_transition(MatchingStatus::Pending, MatchingStatus::Matched);
        self.metrics_collector
            .record_pairings(session.game_type, pairings);

        let event = SessionMatched {
            session_id: session.id,
            game_type: session.game_type,
            pairings: pairings.to_vec(),
            timestamp: current_timestamp(),
        };
        let result = self.event_publisher.publish_session_matched(event).await;
        report_publish(&self.metrics_collector, "SessionMatched", result);
    }

    fn update_stats(&self, result: &Result<MatchingOutcome>) -> Result<()> {
        let mut stats = self
            .stats
            .write()
            .map_err(|_| MatchError::internal("Failed to acquire matching stats lock"))?;

        stats.passes += 1;
        match result {
            Ok(MatchingOutcome::Committed { pairings }) => {
                stats.committed += 1;
                stats.pairings_created += pairings.len() as u64;
            }
            Ok(MatchingOutcome::AlreadyMatched) => stats.already_matched += 1,
            Ok(MatchingOutcome::NoPairings) => stats.no_pairings += 1,
            Err(_) => stats.errors += 1,
        }

        Ok(())
    }
}
