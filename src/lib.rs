//! Court Matcher - Player matching engine for tennis court sessions
//!
//! This crate groups players who join a court/time slot into singles or
//! doubles pairings by skill compatibility, with priority for players who
//! have few other options, background auto-triggered matching and
//! post-match feedback.

pub mod config;
pub mod directory;
pub mod error;
pub mod events;
pub mod metrics;
pub mod pairing;
pub mod scoring;
pub mod service;
pub mod session;
pub mod store;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{MatchError, Result};
pub use types::*;

// Re-export key components
pub use directory::{InMemoryUserDirectory, UserDirectory};
pub use events::{EventPublisher, TracingEventPublisher};
pub use session::{MatchingOutcome, SessionManager};
pub use store::{InMemorySessionStore, SessionStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
