//! Configuration management for the court-matcher service
//!
//! This module handles configuration loading from environment variables and
//! TOML files, validation, and default values for the matching engine.

pub mod app;
pub mod matching;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, ServiceSettings};
pub use matching::MatchingSettings;
