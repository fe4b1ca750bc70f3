//! Data-driven product recommendations.
//!
//! Two selection strategies over precomputed reference tables: apriori
//! co-purchase associations (ranked by confidence with category diversity)
//! and aggregate popularity (ranked by transaction count, optionally
//! filtered by category). Both tables load once at startup and are never
//! mutated.

mod engine;
mod tables;

pub use engine::RecommendationEngine;
pub use tables::{AprioriCandidate, AprioriTable, PopularityRow, PopularityTable};

/// Default number of recommendations to return.
pub const DEFAULT_TOP_K: usize = 5;

/// Maximum selections per category, enforced for diversity.
pub const MAX_PER_CATEGORY: usize = 2;
