//! Pipeline output records

use crate::types::flags::{Flag, FlagSet};
use crate::types::transaction::Transaction;
use serde::{Deserialize, Serialize};

/// A transaction with its derived flags and weighted score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,

    #[serde(rename = "Flags")]
    pub flags: FlagSet,

    #[serde(rename = "TransactionScore")]
    pub score: u32,
}

impl ScoredTransaction {
    pub fn transaction_id(&self) -> &str {
        &self.transaction.transaction_id
    }

    pub fn user_id(&self) -> &str {
        &self.transaction.user_id
    }

    /// Names of the rules that fired, for display
    pub fn triggered_rules(&self) -> Vec<&'static str> {
        self.flags.raised().map(|f: Flag| f.name()).collect()
    }
}

/// Per-user roll-up of transaction scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRiskProfile {
    #[serde(rename = "UserID")]
    pub user_id: String,

    #[serde(rename = "TotalScore")]
    pub total_score: u32,

    #[serde(rename = "TransactionCount")]
    pub transaction_count: usize,

    #[serde(rename = "AvgScorePerTransaction")]
    pub avg_score_per_transaction: f64,

    #[serde(rename = "FlaggedUser")]
    pub flagged_user: bool,
}
