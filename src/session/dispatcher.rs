//! Background matching dispatch
//!
//! Joins that reach the auto-trigger threshold push a [`MatchingTask`] onto an
//! unbounded channel and return immediately. A single [`MatchingWorker`]
//! drains the channel and runs each pass through the orchestrator. Failures
//! never reach the joining caller: they are logged, counted and published as
//! `MatchingFailed` events.

use crate::session::orchestrator::{MatchOrchestrator, MatchingOutcome};
use crate::session::report_publish;
use crate::types::{MatchingFailed, SessionId};
use crate::utils::current_timestamp;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// A request to run a matching pass for one session
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingTask {
    pub session_id: SessionId,
    pub requested_at: DateTime<Utc>,
}

/// Sending half of the matching channel
#[derive(Debug, Clone)]
pub struct MatchingDispatcher {
    sender: mpsc::UnboundedSender<MatchingTask>,
}

impl MatchingDispatcher {
    /// Create a dispatcher and the receiver its worker will drain
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<MatchingTask>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Queue a pass. Never blocks; returns false when the worker is gone.
    pub fn dispatch(&self, session_id: SessionId) -> bool {
        let task = MatchingTask {
            session_id,
            requested_at: current_timestamp(),
        };

        match self.sender.send(task) {
            Ok(()) => {
                debug!("Dispatched matching pass for session {}", session_id);
                true
            }
            Err(_) => {
                warn!(
                    "Matching worker is not running; dropped matching pass for session {}",
                    session_id
                );
                false
            }
        }
    }

    /// Whether the worker side of the channel has gone away
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Drains matching tasks and runs them one at a time
pub struct MatchingWorker {
    orchestrator: Arc<MatchOrchestrator>,
    receiver: mpsc::UnboundedReceiver<MatchingTask>,
}

impl MatchingWorker {
    pub fn new(
        orchestrator: Arc<MatchOrchestrator>,
        receiver: mpsc::UnboundedReceiver<MatchingTask>,
    ) -> Self {
        Self {
            orchestrator,
            receiver,
        }
    }

    /// Run on the current runtime until every dispatcher is dropped
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run until a shutdown signal arrives, then finish the tasks already queued
    pub fn spawn_until(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run_until(shutdown))
    }

    pub async fn run(mut self) {
        info!("Matching worker started");

        while let Some(task) = self.receiver.recv().await {
            self.process(task).await;
        }

        info!("Matching worker stopped");
    }

    pub async fn run_until(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!("Matching worker started");

        loop {
            tokio::select! {
                task = self.receiver.recv() => match task {
                    Some(task) => self.process(task).await,
                    None => break,
                },
                _ = shutdown.recv() => {
                    info!("Matching worker shutdown signal received");
                    self.receiver.close();
                    while let Some(task) = self.receiver.recv().await {
                        self.process(task).await;
                    }
                    break;
                }
            }
        }

        info!("Matching worker stopped");
    }

    async fn process(&self, task: MatchingTask) {
        let session_id = task.session_id;
        let queued_for = current_timestamp() - task.requested_at;

        match self.orchestrator.trigger_matching(session_id).await {
            Ok(MatchingOutcome::Committed { pairings }) => {
                info!(
                    "Background matching committed {} pairing(s) for session {} (queued {}ms)",
                    pairings.len(),
                    session_id,
                    queued_for.num_milliseconds()
                );
            }
            Ok(outcome) => {
                debug!(
                    "Background matching for session {} finished: {}",
                    session_id,
                    outcome.as_label()
                );
            }
            Err(e) => {
                error!("Background matching failed for session {}: {}", session_id, e);

                let metrics = self.orchestrator.metrics();
                metrics.record_matching_failure(e.kind());

                let event = MatchingFailed {
                    session_id,
                    reason: e.to_string(),
                    timestamp: current_timestamp(),
                };
                let result = self
                    .orchestrator
                    .event_publisher()
                    .publish_matching_failed(event)
                    .await;
                report_publish(metrics, "MatchingFailed", result);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryUserDirectory;
    use crate::events::RecordingEventPublisher;
    use crate::metrics::MetricsCollector;
    use crate::pairing::PairingGenerator;
    use crate::scoring::{MatchingCriteria, WeightedCompatibilityScorer};
    use crate::store::{AdmissionRule, InMemorySessionStore, SessionStore};
    use crate::types::{GameType, MatchPlayer, MatchSession, MatchingStatus, NewMatchSession};
    use crate::utils::generate_id;
    use chrono::Duration;

    fn create_test_orchestrator(
        store: Arc<InMemorySessionStore>,
        publisher: Arc<RecordingEventPublisher>,
    ) -> Arc<MatchOrchestrator> {
        Arc::new(MatchOrchestrator::new(
            store,
            Arc::new(InMemoryUserDirectory::new()),
            PairingGenerator::new(
                Arc::new(WeightedCompatibilityScorer::default()),
                MatchingCriteria::default(),
            ),
            publisher,
            Arc::new(MetricsCollector::new().unwrap()),
        ))
    }

    #[test]
    fn test_dispatch_after_worker_dropped() {
        let (dispatcher, receiver) = MatchingDispatcher::channel();
        assert!(!dispatcher.is_closed());
        assert!(dispatcher.dispatch(generate_id()));

        drop(receiver);
        assert!(dispatcher.is_closed());
        assert!(!dispatcher.dispatch(generate_id()));
    }

    #[tokio::test]
    async fn test_worker_drains_queue_on_shutdown() {
        let store = Arc::new(InMemorySessionStore::new());
        let publisher = Arc::new(RecordingEventPublisher::new());
        let orchestrator = create_test_orchestrator(store, publisher.clone());

        let (dispatcher, receiver) = MatchingDispatcher::channel();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        for _ in 0..3 {
            dispatcher.dispatch(generate_id());
        }
        shutdown_tx.send(()).unwrap();

        let handle = MatchingWorker::new(orchestrator.clone(), receiver).spawn_until(shutdown_rx);
        handle.await.unwrap();

        // Every queued pass ran even though the dispatcher is still alive
        assert_eq!(orchestrator.stats().unwrap().passes, 3);
        assert_eq!(publisher.count("MatchingFailed"), 3);
        assert!(dispatcher.is_closed());
    }

    #[tokio::test]
    async fn test_worker_publishes_failures() {
        let store = Arc::new(InMemorySessionStore::new());
        let publisher = Arc::new(RecordingEventPublisher::new());
        let orchestrator = create_test_orchestrator(store.clone(), publisher.clone());

        let now = current_timestamp();
        let session = MatchSession::new(
            generate_id(),
            NewMatchSession {
                court_id: generate_id(),
                start_time: now + Duration::days(1),
                end_time: now + Duration::days(1) + Duration::hours(1),
                game_type: GameType::Singles,
                skill_level: 4.0,
            },
            now,
        );
        let session_id = session.id;
        store.create_session(session).await.unwrap();
        store
            .insert_player(
                MatchPlayer {
                    id: generate_id(),
                    session_id,
                    user_id: generate_id(),
                    joined_at: now,
                    preference_score: 0.0,
                    priority: 10,
                },
                AdmissionRule::default(),
            )
            .await
            .unwrap();

        let (dispatcher, receiver) = MatchingDispatcher::channel();
        let handle = MatchingWorker::new(orchestrator.clone(), receiver).spawn();

        dispatcher.dispatch(session_id);
        dispatcher.dispatch(generate_id());
        drop(dispatcher);
        handle.await.unwrap();

        // One player is not enough, and the second session does not exist
        assert_eq!(publisher.count("MatchingFailed"), 2);
        assert_eq!(
            orchestrator
                .metrics()
                .matching()
                .failures_total
                .with_label_values(&["not_enough_players"])
                .get(),
            1
        );
        let session = store.get_session(session_id).await.unwrap().unwrap();
        assert_eq!(session.status, MatchingStatus::Pending);
    }
}
