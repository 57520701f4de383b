//! Service layer for the court-matcher service
//!
//! This module contains the shared application state, service coordination,
//! and background task management for the service binary.

pub mod app;
pub mod health;

pub use app::{AppState, MatcherService, ServiceError};
pub use health::{HealthCheck, HealthStatus};
