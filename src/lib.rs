//! Fraud Rules Pipeline Library
//!
//! Batch scoring of transaction uploads with a fixed set of heuristic rules:
//! per-transaction flags, weighted scores and per-user risk profiles.

pub mod config;
pub mod error;
pub mod export;
pub mod feature_extractor;
pub mod loader;
pub mod pipeline;
pub mod scoring;
pub mod summary;
pub mod types;

pub use config::AppConfig;
pub use error::{InputError, PipelineError};
pub use export::CsvExporter;
pub use feature_extractor::FeatureExtractor;
pub use loader::TransactionLoader;
pub use pipeline::{PipelineReport, RulePipeline};
pub use scoring::{RuleScorer, UserAggregator, WeightTable};
pub use summary::DashboardSummary;
pub use types::{
    ActiveFlags, Column, Flag, FlagSet, ScoredTransaction, Transaction, TransactionTable,
    UserRiskProfile,
};
