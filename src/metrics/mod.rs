//! Metrics and monitoring for the court-matcher service
//!
//! This module provides Prometheus metrics collection and the HTTP server
//! exposing health probes, metrics and engine statistics.

pub mod collector;
pub mod health;

pub use collector::{
    MatchingMetrics, MetricsCollector, MetricsTimer, PerformanceMetrics, PlayerMetrics,
    ServiceMetrics, SessionMetrics,
};
pub use health::{HealthServer, HealthServerConfig};

use crate::service::health::{HealthCheck, HealthStatus};
use crate::service::AppState;
use std::sync::Arc;
use tracing::{debug, warn};

/// The HTTP endpoints together with the collector they export
#[derive(Clone)]
pub struct MetricsService {
    collector: Arc<MetricsCollector>,
    health_server: Arc<HealthServer>,
}

impl MetricsService {
    pub fn new(collector: Arc<MetricsCollector>, health_server: Arc<HealthServer>) -> Self {
        Self {
            collector,
            health_server,
        }
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    /// Serve the health endpoints until [`MetricsService::stop`] is called
    pub async fn start(&self) -> anyhow::Result<()> {
        self.health_server.start().await
    }

    pub async fn stop(&self) -> anyhow::Result<()> {
        self.health_server.stop().await
    }

    /// Refresh the sampled gauges: uptime, store row counts and health
    pub async fn refresh(&self, state: Arc<AppState>) {
        self.collector
            .service()
            .uptime_seconds
            .set(state.uptime().as_secs() as i64);

        match state.store().stats().await {
            Ok(stats) => {
                debug!(
                    "Updating metrics - sessions: {}, pending: {}, pairings: {}",
                    stats.sessions, stats.pending_sessions, stats.pairings
                );
                self.collector.update_from_store_stats(&stats);
            }
            Err(e) => warn!("Failed to get store stats for metrics update: {}", e),
        }

        match HealthCheck::check(state).await {
            Ok(health) => {
                self.collector.update_health_status(health.status.as_gauge());
                for check in &health.checks {
                    self.collector
                        .update_component_health(&check.name, check.status == HealthStatus::Healthy);
                }
            }
            Err(e) => warn!("Health check failed during metrics refresh: {}", e),
        }
    }
}
