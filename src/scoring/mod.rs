//! Scoring components: flag weights, per-user roll-up, threshold filter

pub mod aggregator;
pub mod filter;
pub mod scorer;

pub use aggregator::UserAggregator;
pub use filter::{clamp_threshold, filter_by_score, max_score};
pub use scorer::{RuleScorer, WeightTable};
