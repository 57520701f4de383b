//! Main application state and service coordination
//!
//! [`AppState`] holds the engine components shared with the health server.
//! [`MatcherService`] owns the runtime pieces around it: the matching worker,
//! the health/metrics server and background maintenance tasks.

use crate::config::AppConfig;
use crate::directory::{InMemoryUserDirectory, UserDirectory};
use crate::events::{EventPublisher, TracingEventPublisher};
use crate::metrics::health::HealthServerConfig;
use crate::metrics::{HealthServer, MetricsCollector, MetricsService};
use crate::session::{MatchingWorker, SessionManager};
use crate::store::{InMemorySessionStore, SessionStore};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Engine components shared between the service and its health endpoints
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Session persistence
    store: Arc<dyn SessionStore>,

    /// User profile lookups
    directory: Arc<dyn UserDirectory>,

    /// Engine entry point
    manager: SessionManager,

    /// Prometheus metrics
    metrics_collector: Arc<MetricsCollector>,

    /// Service status
    is_running: RwLock<bool>,

    started_at: Instant,
}

impl AppState {
    /// Wire the engine over the given adapters. The worker must be spawned by the caller.
    pub fn new(
        config: AppConfig,
        store: Arc<dyn SessionStore>,
        directory: Arc<dyn UserDirectory>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Result<(Self, MatchingWorker), ServiceError> {
        let metrics_collector =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let (manager, worker) = SessionManager::new(
            store.clone(),
            directory.clone(),
            event_publisher,
            config.matching.clone(),
            metrics_collector.clone(),
        );

        let state = Self {
            config,
            store,
            directory,
            manager,
            metrics_collector,
            is_running: RwLock::new(false),
            started_at: Instant::now(),
        };

        Ok((state, worker))
    }

    /// In-memory store and directory with events written to the log
    pub fn in_memory(config: AppConfig) -> Result<(Self, MatchingWorker), ServiceError> {
        Self::new(
            config,
            Arc::new(InMemorySessionStore::new()),
            Arc::new(InMemoryUserDirectory::new()),
            Arc::new(TracingEventPublisher::new()),
        )
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn SessionStore> {
        self.store.clone()
    }

    pub fn directory(&self) -> Arc<dyn UserDirectory> {
        self.directory.clone()
    }

    /// Get the session manager for engine operations
    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    pub fn metrics_collector(&self) -> Arc<MetricsCollector> {
        self.metrics_collector.clone()
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub async fn set_running(&self, running: bool) {
        *self.is_running.write().await = running;
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Running service: engine state plus worker, health server and maintenance tasks
pub struct MatcherService {
    state: Arc<AppState>,

    /// Taken when the worker is spawned
    worker: Option<MatchingWorker>,

    worker_handle: Option<JoinHandle<()>>,

    /// Metrics service for monitoring and health checks
    metrics_service: Arc<MetricsService>,

    /// Background task handles
    background_tasks: Vec<JoinHandle<()>>,

    shutdown_tx: broadcast::Sender<()>,
}

impl MatcherService {
    /// Initialize the service with in-memory adapters
    pub fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing court-matcher service");
        info!(
            "Configuration: service={}, health_port={}, auto_trigger_threshold={}",
            config.service.name, config.service.health_port, config.matching.auto_trigger_threshold
        );

        let (state, worker) = AppState::in_memory(config)?;
        Ok(Self::from_state(state, worker))
    }

    /// Build the service around an already wired state
    pub fn from_state(state: AppState, worker: MatchingWorker) -> Self {
        let state = Arc::new(state);

        let health_config = HealthServerConfig {
            port: state.config().service.health_port,
            host: "0.0.0.0".to_string(),
        };
        let health_server = Arc::new(
            HealthServer::new(health_config, state.metrics_collector()).with_app_state(state.clone()),
        );
        let metrics_service = Arc::new(MetricsService::new(
            state.metrics_collector(),
            health_server,
        ));

        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            state,
            worker: Some(worker),
            worker_handle: None,
            metrics_service,
            background_tasks: Vec::new(),
            shutdown_tx,
        }
    }

    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Get metrics service
    pub fn metrics_service(&self) -> Arc<MetricsService> {
        self.metrics_service.clone()
    }

    /// Start the worker, the health server and background tasks
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting court-matcher service");

        self.state.set_running(true).await;

        self.start_metrics_service().await?;
        self.start_matching_worker()?;
        self.start_background_tasks();

        info!("Court-matcher service started successfully");
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of court-matcher service");

        self.state.set_running(false).await;

        if self.shutdown_tx.send(()).is_err() {
            debug!("No shutdown listeners registered");
        }

        if let Some(handle) = self.worker_handle.take() {
            let timeout = self.state.config().shutdown_timeout();
            match tokio::time::timeout(timeout, handle).await {
                Ok(Ok(())) => info!("Matching worker drained and stopped"),
                Ok(Err(e)) => warn!("Matching worker task failed: {}", e),
                Err(_) => warn!(
                    "Matching worker did not stop within {}s; abandoning queued passes",
                    timeout.as_secs()
                ),
            }
        }

        self.stop_background_tasks().await;

        info!("Stopping metrics service...");
        if let Err(e) = self.metrics_service.stop().await {
            warn!("Failed to stop metrics service: {}", e);
        } else {
            info!("Metrics service stopped");
        }

        let final_stats =
            self.state
                .manager()
                .stats()
                .await
                .map_err(|e| ServiceError::BackgroundTask {
                    message: format!("Failed to get final stats: {}", e),
                })?;

        info!("Final service statistics: {:?}", final_stats);
        info!("Court-matcher service shutdown completed");

        Ok(())
    }

    async fn start_metrics_service(&mut self) -> Result<(), ServiceError> {
        info!("Starting metrics and health endpoints");

        let metrics_service = self.metrics_service.clone();
        let port = self.state.config().service.health_port;

        let metrics_handle = tokio::spawn(async move {
            if let Err(e) = metrics_service.start().await {
                error!("Metrics service failed: {}", e);
            } else {
                info!("Metrics service task completed");
            }
        });

        self.background_tasks.push(metrics_handle);

        // Give the server a moment to bind
        tokio::time::sleep(Duration::from_millis(100)).await;

        info!("Metrics service started on port {}", port);
        Ok(())
    }

    fn start_matching_worker(&mut self) -> Result<(), ServiceError> {
        let worker = self
            .worker
            .take()
            .ok_or_else(|| ServiceError::Initialization {
                message: "Matching worker already started".to_string(),
            })?;

        self.worker_handle = Some(worker.spawn_until(self.shutdown_tx.subscribe()));
        Ok(())
    }

    /// Start background maintenance tasks
    fn start_background_tasks(&mut self) {
        let interval_duration = self.state.config().stats_interval();
        info!(
            "Starting statistics refresh task ({}s interval)...",
            interval_duration.as_secs()
        );

        let state = self.state.clone();
        let metrics_service = self.metrics_service.clone();
        let stats_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(interval_duration);
            info!("Statistics refresh task started");

            while state.is_running().await {
                interval.tick().await;
                metrics_service.refresh(state.clone()).await;
            }

            info!("Statistics refresh task stopped");
        });

        self.background_tasks.push(stats_task);
        info!("{} background tasks running", self.background_tasks.len());
    }

    /// Stop all background tasks
    async fn stop_background_tasks(&mut self) {
        let task_count = self.background_tasks.len();
        if task_count == 0 {
            info!("No background tasks to stop");
            return;
        }

        info!("Stopping {} background tasks...", task_count);

        for (i, task) in self.background_tasks.drain(..).enumerate() {
            debug!("Aborting background task {}/{}", i + 1, task_count);
            task.abort();
        }

        info!("All {} background tasks stopped", task_count);
    }
}
