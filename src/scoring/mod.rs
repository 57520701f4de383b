//! Player compatibility scoring
//!
//! This module scores how well two players fit together for a match. The
//! pairing generator depends only on the [`CompatibilityScorer`] trait.

pub mod compatibility;

// Re-export commonly used types
pub use compatibility::{CompatibilityScorer, MatchingCriteria, WeightedCompatibilityScorer};
