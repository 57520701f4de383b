//! Main application configuration
//!
//! This module defines the primary configuration structures for the court-matcher
//! service, including environment variable and TOML file loading and validation.

use crate::config::matching::MatchingSettings;
use crate::types::GameType;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub matching: MatchingSettings,
}

/// Service-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Port for health check and metrics endpoints
    pub health_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
    /// Interval for refreshing gauges from engine statistics
    pub stats_interval_seconds: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "court-matcher".to_string(),
            log_level: "info".to_string(),
            health_port: 8080,
            shutdown_timeout_seconds: 30,
            stats_interval_seconds: 30,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, target: &mut T) -> Result<()> {
    if let Ok(value) = env::var(key) {
        *target = value
            .parse()
            .map_err(|_| anyhow!("Invalid {} value: {}", key, value))?;
    }
    Ok(())
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file; environment variables still override it
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Parse a TOML document; missing sections and keys take their defaults
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        parse_env("HEALTH_PORT", &mut self.service.health_port)?;
        parse_env(
            "SHUTDOWN_TIMEOUT_SECONDS",
            &mut self.service.shutdown_timeout_seconds,
        )?;
        parse_env(
            "STATS_INTERVAL_SECONDS",
            &mut self.service.stats_interval_seconds,
        )?;

        // Matching settings
        parse_env("SKILL_LEVEL_RANGE", &mut self.matching.skill_level_range)?;
        parse_env("SKILL_WEIGHT", &mut self.matching.skill_weight)?;
        parse_env("AVAILABILITY_WEIGHT", &mut self.matching.availability_weight)?;
        parse_env("PREFERENCE_WEIGHT", &mut self.matching.preference_weight)?;
        parse_env(
            "AUTO_TRIGGER_THRESHOLD",
            &mut self.matching.auto_trigger_threshold,
        )?;
        parse_env("MAX_PRIORITY", &mut self.matching.max_priority)?;
        parse_env(
            "ALLOW_JOIN_AFTER_MATCHING",
            &mut self.matching.allow_join_after_matching,
        )?;

        Ok(())
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Get statistics refresh interval as Duration
    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.service.stats_interval_seconds)
    }
}

/// Player priorities are reported on a 0..=10 scale
const MAX_PRIORITY_CEILING: u32 = 10;

fn validate_unit_interval(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(anyhow!("{} must be within [0, 1], got {}", name, value));
    }
    Ok(())
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.health_port == 0 {
        return Err(anyhow!("Health port cannot be 0"));
    }
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }
    if config.service.stats_interval_seconds == 0 {
        return Err(anyhow!("Stats interval must be greater than 0"));
    }

    // Validate matching settings
    let matching = &config.matching;
    if !(matching.skill_level_range.is_finite() && matching.skill_level_range > 0.0) {
        return Err(anyhow!(
            "Skill level range must be a positive number, got {}",
            matching.skill_level_range
        ));
    }
    validate_unit_interval("Skill weight", matching.skill_weight)?;
    validate_unit_interval("Availability weight", matching.availability_weight)?;
    validate_unit_interval("Preference weight", matching.preference_weight)?;
    validate_unit_interval("Availability score", matching.availability_score)?;
    validate_unit_interval("Preference score", matching.preference_score)?;

    let weight_sum =
        matching.skill_weight + matching.availability_weight + matching.preference_weight;
    if weight_sum > 1.0 + 1e-9 {
        return Err(anyhow!(
            "Scoring weights must sum to at most 1.0, got {:.3}",
            weight_sum
        ));
    }

    let largest_session = GameType::Doubles.max_players();
    if !(2..=largest_session).contains(&matching.auto_trigger_threshold) {
        return Err(anyhow!(
            "Auto trigger threshold must be between 2 and {}, got {}",
            largest_session,
            matching.auto_trigger_threshold
        ));
    }

    if matching.max_priority > MAX_PRIORITY_CEILING {
        return Err(anyhow!(
            "Max priority must be at most {}, got {}",
            MAX_PRIORITY_CEILING,
            matching.max_priority
        ));
    }

    Ok(())
}
