//! Per-user aggregation of transaction scores

use crate::error::PipelineError;
use crate::types::report::{ScoredTransaction, UserRiskProfile};
use std::collections::BTreeMap;

/// Rolls transaction scores up into one risk profile per user.
pub struct UserAggregator {
    /// Total score at which a user is flagged
    flagged_user_score: u32,
}

impl UserAggregator {
    pub fn new(flagged_user_score: u32) -> Self {
        Self { flagged_user_score }
    }

    /// Aggregate scored transactions by user.
    ///
    /// Returns one profile per distinct user, ordered by user id.
    pub fn aggregate(
        &self,
        transactions: &[ScoredTransaction],
    ) -> Result<Vec<UserRiskProfile>, PipelineError> {
        let mut totals: BTreeMap<&str, (u32, usize)> = BTreeMap::new();
        for tx in transactions {
            let entry = totals.entry(tx.user_id()).or_insert((0, 0));
            entry.0 = entry.0.saturating_add(tx.score);
            entry.1 += 1;
        }

        totals
            .into_iter()
            .map(|(user_id, (total_score, count))| self.profile(user_id, total_score, count))
            .collect()
    }

    fn profile(
        &self,
        user_id: &str,
        total_score: u32,
        transaction_count: usize,
    ) -> Result<UserRiskProfile, PipelineError> {
        if transaction_count == 0 {
            return Err(PipelineError::EmptyUserGroup {
                user_id: user_id.to_string(),
            });
        }

        Ok(UserRiskProfile {
            user_id: user_id.to_string(),
            total_score,
            transaction_count,
            avg_score_per_transaction: total_score as f64 / transaction_count as f64,
            flagged_user: total_score >= self.flagged_user_score,
        })
    }

    pub fn flagged_user_score(&self) -> u32 {
        self.flagged_user_score
    }

    /// Order profiles by descending total score; ties keep their current order.
    pub fn rank(profiles: &[UserRiskProfile]) -> Vec<&UserRiskProfile> {
        let mut ranked: Vec<&UserRiskProfile> = profiles.iter().collect();
        ranked.sort_by(|a, b| b.total_score.cmp(&a.total_score));
        ranked
    }

    /// Number of flagged users.
    pub fn flagged_count(profiles: &[UserRiskProfile]) -> usize {
        profiles.iter().filter(|p| p.flagged_user).count()
    }
}

impl Default for UserAggregator {
    fn default() -> Self {
        Self::new(5)
    }
}
