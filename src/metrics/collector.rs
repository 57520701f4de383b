//! Metrics collection using Prometheus
//!
//! All metric names carry the `court_matcher_` prefix and are registered on a
//! private registry owned by the collector.

use crate::store::StoreStats;
use crate::types::{GameType, MatchingStatus, PlayerPairing};
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the matching engine
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Session lifecycle metrics
    session_metrics: SessionMetrics,

    /// Player admission metrics
    player_metrics: PlayerMetrics,

    /// Matching pass metrics
    matching_metrics: MatchingMetrics,

    /// Performance metrics
    performance_metrics: PerformanceMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Component health status
    pub component_health: IntGaugeVec,

    /// Outbound events by type and publish status
    pub events_published_total: IntCounterVec,
}

/// Session lifecycle metrics
#[derive(Clone)]
pub struct SessionMetrics {
    /// Sessions created by game type
    pub sessions_created_total: IntCounterVec,

    /// Explicit and matching-driven status transitions
    pub status_transitions_total: IntCounterVec,

    /// Sessions currently pending
    pub pending_sessions: IntGauge,

    /// Feedback records submitted (including overwrites)
    pub feedback_submitted_total: IntCounter,
}

/// Player admission metrics
#[derive(Clone)]
pub struct PlayerMetrics {
    /// Join attempts by outcome
    pub joins_total: IntCounterVec,

    /// Priority assigned to admitted players
    pub priority_distribution: Histogram,
}

/// Matching pass metrics
#[derive(Clone)]
pub struct MatchingMetrics {
    /// Matching passes by outcome
    pub passes_total: IntCounterVec,

    /// Pairings committed by game type
    pub pairings_created_total: IntCounterVec,

    /// Compatibility score of committed pairings
    pub compatibility_score: Histogram,

    /// Background matching passes that failed, by error kind
    pub failures_total: IntCounterVec,

    /// Players left out of a pass because their profile could not be resolved
    pub players_excluded_total: IntCounter,
}

/// Performance metrics
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// Join processing time
    pub join_duration: Histogram,

    /// Matching pass processing time
    pub matching_duration: Histogram,
}

impl MetricsCollector {
    /// Create a new metrics collector with its own registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let session_metrics = SessionMetrics::new(&registry)?;
        let player_metrics = PlayerMetrics::new(&registry)?;
        let matching_metrics = MatchingMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            session_metrics,
            player_metrics,
            matching_metrics,
            performance_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    pub fn session(&self) -> &SessionMetrics {
        &self.session_metrics
    }

    pub fn player(&self) -> &PlayerMetrics {
        &self.player_metrics
    }

    pub fn matching(&self) -> &MatchingMetrics {
        &self.matching_metrics
    }

    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Refresh gauges from a store snapshot
    pub fn update_from_store_stats(&self, stats: &StoreStats) {
        self.session_metrics
            .pending_sessions
            .set(stats.pending_sessions as i64);
    }

    /// Record a session being created
    pub fn record_session_created(&self, game_type: GameType) {
        self.session_metrics
            .sessions_created_total
            .with_label_values(&[game_type.as_label()])
            .inc();
        self.session_metrics.pending_sessions.inc();
    }

    /// Record a session status transition
    pub fn record_status_transition(&self, from: MatchingStatus, to: MatchingStatus) {
        self.session_metrics
            .status_transitions_total
            .with_label_values(&[from.as_label(), to.as_label()])
            .inc();

        if from == MatchingStatus::Pending && to != MatchingStatus::Pending {
            self.session_metrics.pending_sessions.dec();
        }
    }

    /// Record a join attempt. `priority` is only present for admitted players.
    pub fn record_join(&self, outcome: &str, priority: Option<u32>, duration: Duration) {
        self.player_metrics
            .joins_total
            .with_label_values(&[outcome])
            .inc();

        if let Some(priority) = priority {
            self.player_metrics
                .priority_distribution
                .observe(priority as f64);
        }

        self.performance_metrics
            .join_duration
            .observe(duration.as_secs_f64());
    }

    /// Record the outcome of a matching pass
    pub fn record_matching_pass(&self, outcome: &str, duration: Duration) {
        self.matching_metrics
            .passes_total
            .with_label_values(&[outcome])
            .inc();

        self.performance_metrics
            .matching_duration
            .observe(duration.as_secs_f64());
    }

    /// Record committed pairings
    pub fn record_pairings(&self, game_type: GameType, pairings: &[PlayerPairing]) {
        self.matching_metrics
            .pairings_created_total
            .with_label_values(&[game_type.as_label()])
            .inc_by(pairings.len() as u64);

        for pairing in pairings {
            self.matching_metrics
                .compatibility_score
                .observe(pairing.compatibility_score);
        }
    }

    /// Record a failed background matching pass
    pub fn record_matching_failure(&self, kind: &str) {
        self.matching_metrics
            .failures_total
            .with_label_values(&[kind])
            .inc();
    }

    /// Record players excluded from a pass
    pub fn record_excluded_players(&self, count: usize) {
        self.matching_metrics
            .players_excluded_total
            .inc_by(count as u64);
    }

    pub fn record_feedback_submitted(&self) {
        self.session_metrics.feedback_submitted_total.inc();
    }

    /// Record an outbound event publish attempt
    pub fn record_event_published(&self, event_type: &str, success: bool) {
        let status = if success { "success" } else { "error" };
        self.service_metrics
            .events_published_total
            .with_label_values(&[event_type, status])
            .inc();
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    /// Update component health
    pub fn update_component_health(&self, component: &str, healthy: bool) {
        let status = if healthy { 1 } else { 0 };
        self.service_metrics
            .component_health
            .with_label_values(&[component])
            .set(status);
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds =
            IntGauge::new("court_matcher_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let health_status = IntGauge::new(
            "court_matcher_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let component_health = IntGaugeVec::new(
            Opts::new("court_matcher_component_health", "Component health status"),
            &["component"],
        )?;
        registry.register(Box::new(component_health.clone()))?;

        let events_published_total = IntCounterVec::new(
            Opts::new(
                "court_matcher_events_published_total",
                "Outbound events published",
            ),
            &["event_type", "status"],
        )?;
        registry.register(Box::new(events_published_total.clone()))?;

        Ok(Self {
            uptime_seconds,
            health_status,
            component_health,
            events_published_total,
        })
    }
}

impl SessionMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let sessions_created_total = IntCounterVec::new(
            Opts::new(
                "court_matcher_sessions_created_total",
                "Total match sessions created",
            ),
            &["game_type"],
        )?;
        registry.register(Box::new(sessions_created_total.clone()))?;

        let status_transitions_total = IntCounterVec::new(
            Opts::new(
                "court_matcher_status_transitions_total",
                "Session status transitions",
            ),
            &["from", "to"],
        )?;
        registry.register(Box::new(status_transitions_total.clone()))?;

        let pending_sessions = IntGauge::new(
            "court_matcher_pending_sessions",
            "Match sessions currently pending",
        )?;
        registry.register(Box::new(pending_sessions.clone()))?;

        let feedback_submitted_total = IntCounter::new(
            "court_matcher_feedback_submitted_total",
            "Feedback records submitted",
        )?;
        registry.register(Box::new(feedback_submitted_total.clone()))?;

        Ok(Self {
            sessions_created_total,
            status_transitions_total,
            pending_sessions,
            feedback_submitted_total,
        })
    }
}

impl PlayerMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let joins_total = IntCounterVec::new(
            Opts::new("court_matcher_joins_total", "Session join attempts"),
            &["outcome"],
        )?;
        registry.register(Box::new(joins_total.clone()))?;

        let priority_distribution = Histogram::with_opts(
            HistogramOpts::new(
                "court_matcher_player_priority",
                "Priority assigned to admitted players",
            )
            .buckets(vec![0.0, 2.0, 4.0, 6.0, 8.0, 9.0, 10.0]),
        )?;
        registry.register(Box::new(priority_distribution.clone()))?;

        Ok(Self {
            joins_total,
            priority_distribution,
        })
    }
}

impl MatchingMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let passes_total = IntCounterVec::new(
            Opts::new("court_matcher_matching_passes_total", "Matching passes run"),
            &["outcome"],
        )?;
        registry.register(Box::new(passes_total.clone()))?;

        let pairings_created_total = IntCounterVec::new(
            Opts::new(
                "court_matcher_pairings_created_total",
                "Pairings committed",
            ),
            &["game_type"],
        )?;
        registry.register(Box::new(pairings_created_total.clone()))?;

        let compatibility_score = Histogram::with_opts(
            HistogramOpts::new(
                "court_matcher_compatibility_score",
                "Compatibility score of committed pairings",
            )
            .buckets(vec![0.5, 0.55, 0.6, 0.65, 0.7, 0.75, 0.8, 0.85, 0.9, 1.0]),
        )?;
        registry.register(Box::new(compatibility_score.clone()))?;

        let failures_total = IntCounterVec::new(
            Opts::new(
                "court_matcher_matching_failures_total",
                "Background matching passes that failed",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(failures_total.clone()))?;

        let players_excluded_total = IntCounter::new(
            "court_matcher_players_excluded_total",
            "Players excluded from a matching pass",
        )?;
        registry.register(Box::new(players_excluded_total.clone()))?;

        Ok(Self {
            passes_total,
            pairings_created_total,
            compatibility_score,
            failures_total,
            players_excluded_total,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let join_duration = Histogram::with_opts(
            HistogramOpts::new(
                "court_matcher_join_duration_seconds",
                "Join processing time",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
        )?;
        registry.register(Box::new(join_duration.clone()))?;

        let matching_duration = Histogram::with_opts(
            HistogramOpts::new(
                "court_matcher_matching_duration_seconds",
                "Matching pass processing time",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )?;
        registry.register(Box::new(matching_duration.clone()))?;

        Ok(Self {
            join_duration,
            matching_duration,
        })
    }
}
