//! Outbound matching events
//!
//! The engine announces joins, committed matchings, failed background passes
//! and status changes through [`EventPublisher`]. Delivery is best-effort:
//! callers log publish failures and carry on.

use crate::error::{MatchError, Result};
use crate::types::{
    MatchingEvent, MatchingFailed, PlayerJoinedSession, SessionMatched, SessionStatusChanged,
};
use async_trait::async_trait;
use std::sync::Mutex;
use tracing::info;

/// Trait for publishing matching events
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a PlayerJoinedSession event
    async fn publish_player_joined(&self, event: PlayerJoinedSession) -> Result<()>;

    /// Publish a SessionMatched event
    async fn publish_session_matched(&self, event: SessionMatched) -> Result<()>;

    /// Publish a MatchingFailed event
    async fn publish_matching_failed(&self, event: MatchingFailed) -> Result<()>;

    /// Publish a SessionStatusChanged event
    async fn publish_status_changed(&self, event: SessionStatusChanged) -> Result<()>;
}

/// Publisher that writes every event to the log as JSON
#[derive(Debug, Default)]
pub struct TracingEventPublisher;

impl TracingEventPublisher {
    pub fn new() -> Self {
        Self
    }

    fn emit(&self, event: MatchingEvent) -> Result<()> {
        let payload = serde_json::to_string(&event).map_err(|e| {
            MatchError::internal(format!("Failed to serialize {}: {}", event.event_type(), e))
        })?;
        info!(event_type = event.event_type(), "{}", payload);
        Ok(())
    }
}

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish_player_joined(&self, event: PlayerJoinedSession) -> Result<()> {
        self.emit(MatchingEvent::PlayerJoinedSession(event))
    }

    async fn publish_session_matched(&self, event: SessionMatched) -> Result<()> {
        self.emit(MatchingEvent::SessionMatched(event))
    }

    async fn publish_matching_failed(&self, event: MatchingFailed) -> Result<()> {
        self.emit(MatchingEvent::MatchingFailed(event))
    }

    async fn publish_status_changed(&self, event: SessionStatusChanged) -> Result<()> {
        self.emit(MatchingEvent::SessionStatusChanged(event))
    }
}

/// Publisher that keeps every event in memory, for tests and the simulator
#[derive(Debug, Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<MatchingEvent>>,
}

impl RecordingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events in publish order
    pub fn events(&self) -> Vec<MatchingEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Event type names in publish order
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events().iter().map(MatchingEvent::event_type).collect()
    }

    /// Number of recorded events with the given type name
    pub fn count(&self, event_type: &str) -> usize {
        self.event_types()
            .into_iter()
            .filter(|t| *t == event_type)
            .count()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }

    fn record(&self, event: MatchingEvent) -> Result<()> {
        let mut events = self
            .events
            .lock()
            .map_err(|_| MatchError::internal("Failed to acquire recorded events lock"))?;
        events.push(event);
        Ok(())
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish_player_joined(&self, event: PlayerJoinedSession) -> Result<()> {
        self.record(MatchingEvent::PlayerJoinedSession(event))
    }

    async fn publish_session_matched(&self, event: SessionMatched) -> Result<()> {
        self.record(MatchingEvent::SessionMatched(event))
    }

    async fn publish_matching_failed(&self, event: MatchingFailed) -> Result<()> {
        self.record(MatchingEvent::MatchingFailed(event))
    }

    async fn publish_status_changed(&self, event: SessionStatusChanged) -> Result<()> {
        self.record(MatchingEvent::SessionStatusChanged(event))
    }
}
