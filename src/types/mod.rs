//! Type definitions for the rule pipeline

pub mod flags;
pub mod report;
pub mod transaction;

pub use flags::{ActiveFlags, Flag, FlagSet};
pub use report::{ScoredTransaction, UserRiskProfile};
pub use transaction::{Column, Transaction, TransactionTable};
