//! Session management for the matching engine
//!
//! [`SessionManager`] is the entry point for every engine operation. It admits
//! players, dispatches matching passes to a [`MatchingWorker`], and drives the
//! session lifecycle. The pass itself lives in [`MatchOrchestrator`] so the
//! worker can run it without holding the manager.

pub mod admission;
pub mod dispatcher;
pub mod feedback;
pub mod manager;
pub mod orchestrator;
pub mod request;

pub use admission::{calculate_priority, PlayerAdmission};
pub use dispatcher::{MatchingDispatcher, MatchingTask, MatchingWorker};
pub use feedback::ValidatedFeedback;
pub use manager::{SessionManager, SessionManagerStats};
pub use orchestrator::{MatchOrchestrator, MatchingOutcome, OrchestratorStats};
pub use request::resolve_matching_request;

use crate::error::Result;
use crate::metrics::MetricsCollector;
use tracing::warn;

/// Events are best-effort: a failed publish is logged and counted, never returned
pub(crate) fn report_publish(metrics: &MetricsCollector, event_type: &str, result: Result<()>) {
    match result {
        Ok(()) => metrics.record_event_published(event_type, true),
        Err(e) => {
            warn!("Failed to publish {} event: {}", event_type, e);
            metrics.record_event_published(event_type, false);
        }
    }
}
