//! Test fixtures and mock implementations for integration testing

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Duration;
use court_matcher::config::MatchingSettings;
use court_matcher::error::{MatchError, Result};
use court_matcher::events::{EventPublisher, RecordingEventPublisher};
use court_matcher::metrics::MetricsCollector;
use court_matcher::session::{MatchingWorker, SessionManager};
use court_matcher::types::{
    GameType, MatchSessionDetails, MatchingFailed, MatchingStatus, NewMatchSession,
    PlayerJoinedSession, SessionId, SessionMatched, SessionStatusChanged, UserId, UserProfile,
};
use court_matcher::utils::{current_timestamp, generate_id};
use court_matcher::{InMemorySessionStore, InMemoryUserDirectory};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Publisher whose every call fails, for checking delivery is best-effort
#[derive(Debug, Default)]
pub struct FailingEventPublisher {
    attempts: AtomicUsize,
}

impl FailingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn fail(&self) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(MatchError::internal("event bus unavailable"))
    }
}

#[async_trait]
impl EventPublisher for FailingEventPublisher {
    async fn publish_player_joined(&self, _event: PlayerJoinedSession) -> Result<()> {
        self.fail()
    }

    async fn publish_session_matched(&self, _event: SessionMatched) -> Result<()> {
        self.fail()
    }

    async fn publish_matching_failed(&self, _event: MatchingFailed) -> Result<()> {
        self.fail()
    }

    async fn publish_status_changed(&self, _event: SessionStatusChanged) -> Result<()> {
        self.fail()
    }
}

/// A complete engine over in-memory adapters
pub struct TestSystem {
    pub manager: SessionManager,
    pub store: Arc<InMemorySessionStore>,
    pub directory: Arc<InMemoryUserDirectory>,
    pub publisher: Arc<RecordingEventPublisher>,
    pub metrics: Arc<MetricsCollector>,
    pub worker: Option<MatchingWorker>,
}

impl TestSystem {
    pub fn new() -> Self {
        Self::with_settings(MatchingSettings::default())
    }

    pub fn with_settings(settings: MatchingSettings) -> Self {
        let store = Arc::new(InMemorySessionStore::new());
        let directory = Arc::new(InMemoryUserDirectory::new());
        let publisher = Arc::new(RecordingEventPublisher::new());
        let metrics = Arc::new(MetricsCollector::new().expect("Failed to create collector"));

        let (manager, worker) = SessionManager::new(
            store.clone(),
            directory.clone(),
            publisher.clone(),
            settings,
            metrics.clone(),
        );

        Self {
            manager,
            store,
            directory,
            publisher,
            metrics,
            worker: Some(worker),
        }
    }

    /// Spawn the background worker; auto-triggered passes only run after this
    pub fn start_worker(&mut self) -> tokio::task::JoinHandle<()> {
        self.worker
            .take()
            .expect("worker already started")
            .spawn()
    }

    pub fn add_user(&self, name: &str, skill_level: f64) -> UserId {
        let id = generate_id();
        self.directory
            .upsert_user(UserProfile {
                id,
                name: name.to_string(),
                skill_level,
            })
            .expect("Failed to add user");
        id
    }

    pub fn add_users(&self, skills: &[f64]) -> Vec<UserId> {
        skills
            .iter()
            .enumerate()
            .map(|(i, skill)| self.add_user(&format!("player-{}", i + 1), *skill))
            .collect()
    }

    pub async fn create_session(
        &self,
        creator: UserId,
        game_type: GameType,
        days_ahead: i64,
    ) -> MatchSessionDetails {
        self.manager
            .create_session(creator, session_spec(game_type, 4.0, days_ahead))
            .await
            .expect("Failed to create session")
    }

    /// Poll until the session leaves Pending or the attempts run out
    pub async fn wait_for_status(
        &self,
        session_id: SessionId,
        status: MatchingStatus,
    ) -> MatchSessionDetails {
        for _ in 0..100 {
            let details = self.manager.get_session(session_id).await.unwrap();
            if details.session.status == status {
                return details;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("session {} never reached {}", session_id, status);
    }
}

pub fn session_spec(game_type: GameType, skill_level: f64, days_ahead: i64) -> NewMatchSession {
    let start_time = current_timestamp() + Duration::days(days_ahead);
    NewMatchSession {
        court_id: generate_id(),
        start_time,
        end_time: start_time + Duration::hours(1),
        game_type,
        skill_level,
    }
}
