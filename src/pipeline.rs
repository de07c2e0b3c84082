//! Rule pipeline: flag derivation, scoring and per-user aggregation

use crate::config::AppConfig;
use crate::error::PipelineError;
use crate::feature_extractor::FeatureExtractor;
use crate::loader::TransactionLoader;
use crate::scoring::{filter_by_score, max_score, RuleScorer, UserAggregator, WeightTable};
use crate::types::flags::ActiveFlags;
use crate::types::report::{ScoredTransaction, UserRiskProfile};
use crate::types::transaction::TransactionTable;
use serde::Serialize;
use std::io::Read;
use tracing::{debug, info};

/// Everything one run produces
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    /// Scored transactions in input order
    pub transactions: Vec<ScoredTransaction>,
    /// One profile per user, ordered by user id
    pub users: Vec<UserRiskProfile>,
    /// Flags that took part in scoring
    pub active_flags: ActiveFlags,
}

impl PipelineReport {
    /// Transactions at or above `min_score`, highest score first
    pub fn filtered(&self, min_score: u32) -> Vec<&ScoredTransaction> {
        filter_by_score(&self.transactions, min_score)
    }

    pub fn max_score(&self) -> u32 {
        max_score(&self.transactions)
    }

    pub fn user(&self, user_id: &str) -> Option<&UserRiskProfile> {
        self.users.iter().find(|u| u.user_id == user_id)
    }

    pub fn transaction(&self, transaction_id: &str) -> Option<&ScoredTransaction> {
        self.transactions
            .iter()
            .find(|tx| tx.transaction_id() == transaction_id)
    }
}

/// Single-pass batch pipeline over one transaction table.
pub struct RulePipeline {
    extractor: FeatureExtractor,
    scorer: RuleScorer,
    aggregator: UserAggregator,
}

impl RulePipeline {
    /// Create a pipeline from configuration
    pub fn new(config: &AppConfig) -> Result<Self, PipelineError> {
        config.validate()?;

        let weights = WeightTable::from_names(&config.scoring.weights);
        info!(
            weighted_flags = weights.iter().count(),
            blacklisted_merchants = config.rules.blacklisted_merchants.len(),
            flagged_user_score = config.scoring.flagged_user_score,
            "Rule pipeline initialized"
        );

        Ok(Self::with_components(
            FeatureExtractor::new(&config.rules),
            RuleScorer::new(weights),
            UserAggregator::new(config.scoring.flagged_user_score),
        ))
    }

    /// Assemble from explicit components, e.g. an alternative weight table
    pub fn with_components(
        extractor: FeatureExtractor,
        scorer: RuleScorer,
        aggregator: UserAggregator,
    ) -> Self {
        Self {
            extractor,
            scorer,
            aggregator,
        }
    }

    /// Score one table
    pub fn run(&self, table: &TransactionTable) -> Result<PipelineReport, PipelineError> {
        let active_flags = self.extractor.active_flags(table);
        let flag_sets = self.extractor.extract(table, &active_flags);

        let transactions: Vec<ScoredTransaction> = table
            .transactions()
            .iter()
            .zip(flag_sets)
            .map(|(tx, flags)| {
                let score = self.scorer.score(&flags);
                debug!(
                    transaction_id = %tx.transaction_id,
                    user_id = %tx.user_id,
                    score = score,
                    "Transaction scored"
                );
                ScoredTransaction {
                    transaction: tx.clone(),
                    flags,
                    score,
                }
            })
            .collect();

        let users = self.aggregator.aggregate(&transactions)?;

        info!(
            transactions = transactions.len(),
            users = users.len(),
            active_flags = active_flags.len(),
            max_score = max_score(&transactions),
            "Scoring complete"
        );

        Ok(PipelineReport {
            transactions,
            users,
            active_flags,
        })
    }

    /// Load CSV from a reader and score it
    pub fn analyze_csv<R: Read>(&self, reader: R) -> Result<PipelineReport, PipelineError> {
        let table = TransactionLoader::load(reader)?;
        self.run(&table)
    }

    pub fn scorer(&self) -> &RuleScorer {
        &self.scorer
    }

    pub fn aggregator(&self) -> &UserAggregator {
        &self.aggregator
    }
}

impl Default for RulePipeline {
    fn default() -> Self {
        Self::with_components(
            FeatureExtractor::default(),
            RuleScorer::default(),
            UserAggregator::default(),
        )
    }
}
