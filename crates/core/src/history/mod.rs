//! Historical pattern analysis.
//!
//! Mines confirmed transaction lines along three axes (same partner, same
//! product, same category) and turns cost-center usage into confidence-scored
//! statistical suggestions. History is advisory: failures degrade to an empty
//! or partial bundle, never to an error.

mod analyzer;
mod digest;
mod stats;
mod types;

pub use analyzer::HistoryAnalyzer;
pub use digest::format_for_prompt;
pub use stats::{pattern_confidence, statistical_recommendations, usage_reason};
pub use types::*;

/// Default number of history lines fetched per axis.
pub const DEFAULT_HISTORICAL_LIMIT: usize = 20;

/// Default number of statistical suggestions returned.
pub const DEFAULT_STATISTICAL_LIMIT: usize = 3;

/// Share of confidence driven by how often a cost-center was used.
pub const FREQUENCY_WEIGHT: f64 = 0.7;

/// Share of confidence driven by how often it was already auto-assigned.
pub const CONSISTENCY_WEIGHT: f64 = 0.3;

/// Usage count at which the frequency contribution saturates.
pub const FREQUENCY_SATURATION: usize = 10;
