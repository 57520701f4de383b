//! Session manager implementation
//!
//! This module provides the SessionManager that exposes every engine
//! operation: session creation, joins, matching, status updates, feedback
//! and per-user statistics.

use crate::config::MatchingSettings;
use crate::directory::UserDirectory;
use crate::error::{MatchError, Result};
use crate::events::EventPublisher;
use crate::metrics::MetricsCollector;
use crate::pairing::PairingGenerator;
use crate::scoring::{CompatibilityScorer, WeightedCompatibilityScorer};
use crate::session::admission::PlayerAdmission;
use crate::session::dispatcher::{MatchingDispatcher, MatchingWorker};
use crate::session::feedback::ValidatedFeedback;
use crate::session::orchestrator::{MatchOrchestrator, MatchingOutcome, OrchestratorStats};
use crate::session::report_publish;
use crate::session::request::resolve_matching_request;
use crate::store::{SessionStore, StoreStats};
use crate::types::{
    AvailableSessionFilter, FeedbackSubmission, MatchPlayer, MatchSession, MatchSessionDetails,
    MatchingRequest, MatchingStatus, NewMatchSession, PairingId, PlayerFeedback,
    PlayerJoinedSession, SessionId, SessionStatusChanged, UserId, UserMatchingStats, UserProfile,
};
use crate::utils::{current_timestamp, generate_id};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Counters maintained by the manager itself
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
struct ManagerCounters {
    sessions_created: u64,
    players_joined: u64,
    joins_rejected: u64,
    matching_dispatched: u64,
    status_updates: u64,
    feedback_submitted: u64,
}

/// Statistics about session manager operations
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionManagerStats {
    /// Total sessions created through the manager
    pub sessions_created: u64,
    /// Total successful joins (including creators)
    pub players_joined: u64,
    /// Joins rejected for any reason
    pub joins_rejected: u64,
    /// Background matching passes queued
    pub matching_dispatched: u64,
    /// Explicit status changes applied
    pub status_updates: u64,
    /// Feedback submissions accepted
    pub feedback_submitted: u64,
    /// Matching pass counters
    pub matching: OrchestratorStats,
    /// Current store row counts
    pub store: StoreStats,
}

/// The main session manager
#[derive(Clone)]
pub struct SessionManager {
    /// Persistence for sessions, players, pairings and feedback
    store: Arc<dyn SessionStore>,
    /// External user lookups
    directory: Arc<dyn UserDirectory>,
    /// Outbound events
    event_publisher: Arc<dyn EventPublisher>,
    /// Runs matching passes, shared with the worker
    orchestrator: Arc<MatchOrchestrator>,
    /// Queues background matching passes
    dispatcher: MatchingDispatcher,
    /// Player admission
    admission: PlayerAdmission,
    /// Matching configuration
    settings: MatchingSettings,
    /// Metrics collector for recording performance data
    metrics_collector: Arc<MetricsCollector>,
    /// Manager statistics
    counters: Arc<RwLock<ManagerCounters>>,
}

impl SessionManager {
    /// Create a manager with the weighted scorer built from `settings`.
    ///
    /// The returned worker must be spawned for auto-triggered matching to run.
    pub fn new(
        store: Arc<dyn SessionStore>,
        directory: Arc<dyn UserDirectory>,
        event_publisher: Arc<dyn EventPublisher>,
        settings: MatchingSettings,
        metrics_collector: Arc<MetricsCollector>,
    ) -> (Self, MatchingWorker) {
        let scorer = Arc::new(WeightedCompatibilityScorer::new(
            settings.availability_score,
            settings.preference_score,
        ));
        Self::with_scorer(
            store,
            directory,
            event_publisher,
            scorer,
            settings,
            metrics_collector,
        )
    }

    /// Create a manager with a custom compatibility scorer
    pub fn with_scorer(
        store: Arc<dyn SessionStore>,
        directory: Arc<dyn UserDirectory>,
        event_publisher: Arc<dyn EventPublisher>,
        scorer: Arc<dyn CompatibilityScorer>,
        settings: MatchingSettings,
        metrics_collector: Arc<MetricsCollector>,
    ) -> (Self, MatchingWorker) {
        let generator = PairingGenerator::new(scorer, settings.criteria());
        let orchestrator = Arc::new(MatchOrchestrator::new(
            store.clone(),
            directory.clone(),
            generator,
            event_publisher.clone(),
            metrics_collector.clone(),
        ));

        let (dispatcher, receiver) = MatchingDispatcher::channel();
        let worker = MatchingWorker::new(orchestrator.clone(), receiver);

        let admission = PlayerAdmission::new(
            store.clone(),
            settings.max_priority,
            settings.allow_join_after_matching,
        );

        let manager = Self {
            store,
            directory,
            event_publisher,
            orchestrator,
            dispatcher,
            admission,
            settings,
            metrics_collector,
            counters: Arc::new(RwLock::new(ManagerCounters::default())),
        };

        (manager, worker)
    }

    pub fn settings(&self) -> &MatchingSettings {
        &self.settings
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics_collector.clone()
    }

    /// Whether the background worker can still receive tasks
    pub fn worker_connected(&self) -> bool {
        !self.dispatcher.is_closed()
    }

    /// Create a pending session and auto-join its creator
    pub async fn create_session(
        &self,
        creator_id: UserId,
        spec: NewMatchSession,
    ) -> Result<MatchSessionDetails> {
        self.require_user(creator_id).await?;
        self.create_for_creator(creator_id, spec).await
    }

    /// Create a session from a calendar-style request, defaults filled from the creator
    pub async fn create_session_from_request(
        &self,
        creator_id: UserId,
        request: MatchingRequest,
    ) -> Result<MatchSessionDetails> {
        let creator = self.require_user(creator_id).await?;
        let spec = resolve_matching_request(&request, &creator)?;
        self.create_for_creator(creator_id, spec).await
    }

    /// Join a user to a session, dispatching a matching pass once the
    /// session reaches the auto-trigger threshold
    pub async fn join_session(&self, session_id: SessionId, user_id: UserId) -> Result<MatchPlayer> {
        let timer = self.metrics_collector.start_timer();

        info!("Processing join - user: {}, session: {}", user_id, session_id);

        let result = self.admit_player(session_id, user_id).await;

        match &result {
            Ok(player) => {
                self.metrics_collector
                    .record_join("admitted", Some(player.priority), timer.stop());
                self.bump(|c| c.players_joined += 1)?;
            }
            Err(e) => {
                info!(
                    "Join rejected - user: {}, session: {}, reason: {}",
                    user_id, session_id, e
                );
                self.metrics_collector
                    .record_join(e.kind(), None, timer.stop());
                self.bump(|c| c.joins_rejected += 1)?;
            }
        }

        result
    }

    /// A session with its players, pairings and the profiles behind them
    pub async fn get_session(&self, session_id: SessionId) -> Result<MatchSessionDetails> {
        let session = self.load_session(session_id).await?;
        let players = self.store.get_players(session_id).await?;
        let pairings = self.store.get_pairings(session_id).await?;

        let user_ids = players
            .iter()
            .map(|p| p.user_id)
            .chain(pairings.iter().flat_map(|p| p.player_ids()));
        let profiles = self.lookup_profiles(user_ids).await;

        Ok(MatchSessionDetails {
            session,
            players,
            pairings,
            profiles,
        })
    }

    /// Sessions the user could still join, soonest first
    pub async fn available_sessions(
        &self,
        user_id: UserId,
        filter: AvailableSessionFilter,
    ) -> Result<Vec<MatchSession>> {
        self.store
            .list_available_sessions(user_id, &filter, current_timestamp())
            .await
    }

    /// Run a matching pass now. Calling it again after a commit is a no-op.
    pub async fn trigger_matching(&self, session_id: SessionId) -> Result<MatchingOutcome> {
        self.orchestrator.trigger_matching(session_id).await
    }

    /// Record feedback about a player in a pairing; resubmission overwrites
    pub async fn submit_feedback(&self, submission: FeedbackSubmission) -> Result<PlayerFeedback> {
        let validated = ValidatedFeedback::validate(submission)?;
        let pairing_id = validated.submission().pairing_id;

        self.store
            .get_pairing(pairing_id)
            .await?
            .ok_or_else(|| MatchError::pairing_not_found(pairing_id))?;

        let stored = self.store.upsert_feedback(validated.into_record()).await?;

        debug!(
            "Feedback stored - pairing: {}, from: {}, to: {}, rating: {}",
            stored.pairing_id, stored.from_user_id, stored.to_user_id, stored.rating
        );
        self.metrics_collector.record_feedback_submitted();
        self.bump(|c| c.feedback_submitted += 1)?;

        Ok(stored)
    }

    /// All feedback recorded for a pairing
    pub async fn feedback_for_pairing(&self, pairing_id: PairingId) -> Result<Vec<PlayerFeedback>> {
        self.store
            .get_pairing(pairing_id)
            .await?
            .ok_or_else(|| MatchError::pairing_not_found(pairing_id))?;

        self.store.get_feedback_for_pairing(pairing_id).await
    }

    /// Apply an explicit status change. Pending -> Matched is reserved for
    /// matching passes; the same status again is a no-op.
    pub async fn update_session_status(
        &self,
        session_id: SessionId,
        status: MatchingStatus,
    ) -> Result<MatchSession> {
        let session = self.load_session(session_id).await?;
        let current = session.status;

        if current == status {
            debug!("Session {} already {}, nothing to do", session_id, status);
            return Ok(session);
        }

        if !current.can_transition_to(status) {
            return Err(MatchError::conflict(format!(
                "cannot change session status from {} to {}",
                current, status
            )));
        }

        let applied = self
            .store
            .update_session_status(session_id, current, status)
            .await?;
        if !applied {
            return Err(MatchError::conflict(format!(
                "session {} changed status concurrently",
                session_id
            )));
        }

        info!("Session {} status changed: {} -> {}", session_id, current, status);
        self.metrics_collector.record_status_transition(current, status);
        self.bump(|c| c.status_updates += 1)?;

        let event = SessionStatusChanged {
            session_id,
            from: current,
            to: status,
            timestamp: current_timestamp(),
        };
        let result = self.event_publisher.publish_status_changed(event).await;
        report_publish(&self.metrics_collector, "SessionStatusChanged", result);

        self.load_session(session_id).await
    }

    /// Per-user summary: joinable sessions, pairings played, mean rating received
    pub async fn matching_stats(&self, user_id: UserId) -> Result<UserMatchingStats> {
        let available_sessions = self
            .store
            .list_available_sessions(user_id, &AvailableSessionFilter::default(), current_timestamp())
            .await?
            .len();

        let total_matches = self.store.get_pairings_for_user(user_id).await?.len();

        let received = self.store.get_feedback_received(user_id).await?;
        let average_rating = if received.is_empty() {
            None
        } else {
            let total: f64 = received.iter().map(|f| f64::from(f.rating)).sum();
            Some(total / received.len() as f64)
        };

        Ok(UserMatchingStats {
            available_sessions,
            total_matches,
            average_rating,
        })
    }

    /// Aggregated counters for observability
    pub async fn stats(&self) -> Result<SessionManagerStats> {
        let counters = self
            .counters
            .read()
            .map_err(|_| MatchError::internal("Failed to acquire stats lock"))?
            .clone();
        let matching = self.orchestrator.stats()?;
        let store = self.store.stats().await?;

        Ok(SessionManagerStats {
            sessions_created: counters.sessions_created,
            players_joined: counters.players_joined,
            joins_rejected: counters.joins_rejected,
            matching_dispatched: counters.matching_dispatched,
            status_updates: counters.status_updates,
            feedback_submitted: counters.feedback_submitted,
            matching,
            store,
        })
    }

    async fn create_for_creator(
        &self,
        creator_id: UserId,
        spec: NewMatchSession,
    ) -> Result<MatchSessionDetails> {
        if spec.end_time <= spec.start_time {
            return Err(MatchError::invalid_input(
                "session end time must be after its start time",
            ));
        }
        if !spec.skill_level.is_finite() || spec.skill_level < 0.0 {
            return Err(MatchError::invalid_input(
                "skill level must be a non-negative number",
            ));
        }

        let session = MatchSession::new(generate_id(), spec, current_timestamp());
        let session_id = session.id;

        info!(
            "Creating {} session {} - court: {}, start: {}, skill: {:.1}, capacity: {}",
            session.game_type,
            session_id,
            session.court_id,
            session.start_time,
            session.skill_level,
            session.max_players()
        );

        let game_type = session.game_type;
        self.store.create_session(session).await?;
        self.metrics_collector.record_session_created(game_type);
        self.bump(|c| c.sessions_created += 1)?;

        self.join_session(session_id, creator_id).await?;

        self.get_session(session_id).await
    }

    async fn admit_player(&self, session_id: SessionId, user_id: UserId) -> Result<MatchPlayer> {
        let session = self.load_session(session_id).await?;

        let (player, player_count) = self.admission.admit(session_id, user_id).await?;

        info!(
            "Player joined session {} - user: {}, priority: {}, players: {}/{}",
            session_id,
            user_id,
            player.priority,
            player_count,
            session.max_players()
        );

        if player_count >= self.settings.auto_trigger_threshold
            && self.dispatcher.dispatch(session_id)
        {
            self.bump(|c| c.matching_dispatched += 1)?;
        }

        let event = PlayerJoinedSession {
            session_id,
            user_id,
            priority: player.priority,
            player_count,
            max_players: session.max_players(),
            timestamp: current_timestamp(),
        };
        let result = self.event_publisher.publish_player_joined(event).await;
        report_publish(&self.metrics_collector, "PlayerJoinedSession", result);

        Ok(player)
    }

    async fn load_session(&self, session_id: SessionId) -> Result<MatchSession> {
        self.store
            .get_session(session_id)
            .await?
            .ok_or_else(|| MatchError::session_not_found(session_id))
    }

    async fn require_user(&self, user_id: UserId) -> Result<UserProfile> {
        match self.directory.get_user(user_id).await {
            Ok(Some(profile)) => Ok(profile),
            Ok(None) => Err(MatchError::user_not_found(user_id)),
            Err(e) => {
                warn!("User lookup failed for {}: {}", user_id, e);
                Err(e)
            }
        }
    }

    /// Unknown users and failed lookups are left out
    async fn lookup_profiles(
        &self,
        user_ids: impl Iterator<Item = UserId>,
    ) -> HashMap<UserId, UserProfile> {
        let mut profiles = HashMap::new();
        for user_id in user_ids {
            if profiles.contains_key(&user_id) {
                continue;
            }
            match self.directory.get_user(user_id).await {
                Ok(Some(profile)) => {
                    profiles.insert(user_id, profile);
                }
                Ok(None) => debug!("No profile for user {}", user_id),
                Err(e) => warn!("Profile lookup failed for {}: {}", user_id, e),
            }
        }
        profiles
    }

    fn bump(&self, update: impl FnOnce(&mut ManagerCounters)) -> Result<()> {
        let mut counters = self
            .counters
            .write()
            .map_err(|_| MatchError::internal("Failed to acquire stats lock"))?;
        update(&mut counters);
        Ok(())
    }
}
