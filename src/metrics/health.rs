//! Health check endpoints and Prometheus metrics server
//!
//! This module serves health probes, Prometheus metrics and engine statistics
//! for the court-matcher service using Axum.

use crate::metrics::collector::MetricsCollector;
use crate::service::app::AppState;
use crate::service::health::{HealthCheck, HealthStatus};
use crate::utils::current_timestamp;
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

const SERVICE_NAME: &str = "court-matcher";

/// Health server configuration
#[derive(Debug, Clone)]
pub struct HealthServerConfig {
    /// Port to bind the health server to
    pub port: u16,
    /// Host to bind to (typically "0.0.0.0" for all interfaces)
    pub host: String,
}

impl Default for HealthServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
        }
    }
}

/// Shared state for the health server
#[derive(Clone)]
pub struct HealthServerState {
    pub metrics_collector: Arc<MetricsCollector>,
    pub app_state: Option<Arc<AppState>>,
}

/// Health server that provides HTTP endpoints for monitoring
pub struct HealthServer {
    config: HealthServerConfig,
    state: HealthServerState,
    shutdown_tx: broadcast::Sender<()>,
}

impl HealthServer {
    /// Create a new health server
    pub fn new(config: HealthServerConfig, metrics_collector: Arc<MetricsCollector>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            state: HealthServerState {
                metrics_collector,
                app_state: None,
            },
            shutdown_tx,
        }
    }

    /// Set the application state for health checks
    pub fn with_app_state(mut self, app_state: Arc<AppState>) -> Self {
        self.state.app_state = Some(app_state);
        self
    }

    /// Serve until [`HealthServer::stop`] is called
    pub async fn start(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .with_context(|| {
                format!(
                    "Invalid health server address {}:{}",
                    self.config.host, self.config.port
                )
            })?;

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind health server to {}", addr))?;
        info!("Health server listening on http://{}", addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                if shutdown_rx.recv().await.is_err() {
                    debug!("Health server shutdown channel closed");
                }
            })
            .await
            .context("Health server terminated")?;

        info!("Health server stopped");
        Ok(())
    }

    /// The Axum router with all health endpoints
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(root_handler))
            .route("/health", get(health_handler))
            .route("/ready", get(ready_handler))
            .route("/alive", get(alive_handler))
            .route("/metrics", get(metrics_handler))
            .route("/stats", get(stats_handler))
            .with_state(self.state.clone())
    }

    /// Stop the health server
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping health server...");

        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("Failed to send shutdown signal to health server: {}", e);
        }

        Ok(())
    }
}

/// Root endpoint handler - shows service information
async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/health",
            "/ready",
            "/alive",
            "/metrics",
            "/stats"
        ]
    }))
}

fn status_body(status: &str) -> serde_json::Value {
    json!({
        "status": status,
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION")
    })
}

/// Run the full engine check, or describe why it could not run
async fn engine_health(state: &HealthServerState) -> std::result::Result<HealthCheck, String> {
    let app_state = state
        .app_state
        .clone()
        .ok_or_else(|| "Service not initialized".to_string())?;

    HealthCheck::check(app_state).await.map_err(|e| {
        error!("Health check failed: {}", e);
        "Failed to get service health".to_string()
    })
}

/// Lightweight health check endpoint handler
async fn health_handler(State(state): State<HealthServerState>) -> impl IntoResponse {
    debug!("Health check requested");

    match engine_health(&state).await {
        Ok(health) => {
            let code = match health.status {
                HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
                HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
            };
            (code, Json(status_body(&health.status.to_string())))
        }
        Err(reason) => {
            let mut body = status_body("unhealthy");
            body["error"] = json!(reason);
            (StatusCode::SERVICE_UNAVAILABLE, Json(body))
        }
    }
}

/// Kubernetes-style probes served as plain text
#[derive(Debug, Clone, Copy)]
enum Probe {
    Readiness,
    Liveness,
}

impl Probe {
    fn passed(self) -> &'static str {
        match self {
            Probe::Readiness => "Ready",
            Probe::Liveness => "Alive",
        }
    }

    fn failed(self) -> &'static str {
        match self {
            Probe::Readiness => "Not ready",
            Probe::Liveness => "Not alive",
        }
    }

    async fn run(self, state: &HealthServerState) -> (StatusCode, &'static str) {
        let Some(app_state) = state.app_state.clone() else {
            return (StatusCode::SERVICE_UNAVAILABLE, "Service not initialized");
        };

        let result = match self {
            Probe::Readiness => HealthCheck::readiness_check(app_state).await,
            Probe::Liveness => HealthCheck::liveness_check(app_state).await,
        };

        match result {
            Ok(HealthStatus::Healthy) => (StatusCode::OK, self.passed()),
            // Joins still work without the worker; only auto-matching stops
            Ok(HealthStatus::Degraded) => (StatusCode::OK, "Degraded but ready"),
            Ok(HealthStatus::Unhealthy) => (StatusCode::SERVICE_UNAVAILABLE, self.failed()),
            Err(e) => {
                error!("{:?} probe failed: {}", self, e);
                (StatusCode::SERVICE_UNAVAILABLE, self.failed())
            }
        }
    }
}

async fn ready_handler(State(state): State<HealthServerState>) -> impl IntoResponse {
    debug!("Readiness probe requested");
    Probe::Readiness.run(&state).await
}

async fn alive_handler(State(state): State<HealthServerState>) -> impl IntoResponse {
    debug!("Liveness probe requested");
    Probe::Liveness.run(&state).await
}

/// Prometheus metrics endpoint handler
async fn metrics_handler(State(state): State<HealthServerState>) -> Response {
    debug!("Metrics endpoint requested");

    match encode_metrics(&state.metrics_collector) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, TextEncoder::new().format_type().to_string())],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to encode metrics".to_string(),
            )
                .into_response()
        }
    }
}

/// Engine counters, store row counts and component checks as JSON
async fn stats_handler(State(state): State<HealthServerState>) -> impl IntoResponse {
    debug!("Stats endpoint requested");

    match engine_health(&state).await {
        Ok(health) => (
            StatusCode::OK,
            Json(json!({
                "service": {
                    "name": health.service,
                    "version": health.version,
                    "status": health.status,
                    "uptime_seconds": health.uptime_seconds
                },
                "engine": health.stats,
                "components": health.checks,
                "timestamp": health.timestamp
            })),
        ),
        Err(reason) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "service": { "name": SERVICE_NAME, "status": "error" },
                "error": reason,
                "timestamp": current_timestamp()
            })),
        ),
    }
}

/// Render the collector's registry in the Prometheus text format
pub fn encode_metrics(metrics_collector: &MetricsCollector) -> Result<String> {
    let metric_families = metrics_collector.registry().gather();
    TextEncoder::new()
        .encode_to_string(&metric_families)
        .context("Failed to encode metrics")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::types::GameType;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt; // for oneshot

    fn create_test_router(app_state: Option<Arc<AppState>>) -> Router {
        let collector = match &app_state {
            Some(state) => state.metrics_collector(),
            None => Arc::new(MetricsCollector::new().expect("Failed to create collector")),
        };
        let mut server = HealthServer::new(HealthServerConfig::default(), collector);
        if let Some(state) = app_state {
            server = server.with_app_state(state);
        }
        server.router()
    }

    async fn get_status(app: Router, uri: &str) -> StatusCode {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_root_endpoint() {
        assert_eq!(get_status(create_test_router(None), "/").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let collector = Arc::new(MetricsCollector::new().expect("Failed to create collector"));
        collector.record_session_created(GameType::Doubles);
        collector.update_health_status(2);

        let app = HealthServer::new(HealthServerConfig::default(), collector).router();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get("content-type").unwrap();
        assert!(content_type.to_str().unwrap().contains("text/plain"));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("court_matcher_sessions_created_total"));
    }

    #[tokio::test]
    async fn test_endpoints_without_app_state() {
        let app = create_test_router(None);

        for uri in ["/health", "/ready", "/alive", "/stats"] {
            assert_eq!(
                get_status(app.clone(), uri).await,
                StatusCode::SERVICE_UNAVAILABLE,
                "{} should be unavailable",
                uri
            );
        }
    }

    #[tokio::test]
    async fn test_endpoints_with_running_state() {
        let (state, _worker) = AppState::in_memory(AppConfig::default()).unwrap();
        let state = Arc::new(state);
        let app = create_test_router(Some(state.clone()));

        assert_eq!(
            get_status(app.clone(), "/alive").await,
            StatusCode::SERVICE_UNAVAILABLE
        );

        state.set_running(true).await;
        for uri in ["/health", "/ready", "/alive", "/stats"] {
            assert_eq!(get_status(app.clone(), uri).await, StatusCode::OK, "{}", uri);
        }

        let response = app
            .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["service"]["status"], "healthy");
        assert_eq!(json["engine"]["store"]["sessions"], 0);
    }

    #[tokio::test]
    async fn test_404_handling() {
        assert_eq!(
            get_status(create_test_router(None), "/nonexistent").await,
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_encode_metrics() {
        let collector = MetricsCollector::new().expect("Failed to create collector");
        collector.update_health_status(1);
        let text = encode_metrics(&collector).unwrap();
        assert!(text.contains("court_matcher_health_status 1"));
    }
}
