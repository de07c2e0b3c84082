//! Dashboard summary of a scored upload

use crate::pipeline::PipelineReport;
use crate::scoring::UserAggregator;
use crate::types::flags::Flag;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Headline figures for one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_transactions: usize,
    /// Transactions at or above the flagged-transaction score
    pub flagged_transactions: usize,
    pub flagged_transaction_score: u32,
    pub total_users: usize,
    pub flagged_users: usize,
    pub max_score: u32,
    /// Transaction count per score value
    pub score_distribution: BTreeMap<u32, usize>,
    /// How often each computed flag fired
    pub flag_counts: BTreeMap<Flag, usize>,
    /// Flags left out of scoring
    pub omitted_flags: Vec<Flag>,
}

impl DashboardSummary {
    pub fn from_report(report: &PipelineReport, flagged_transaction_score: u32) -> Self {
        let mut score_distribution = BTreeMap::new();
        let mut flag_counts: BTreeMap<Flag, usize> =
            report.active_flags.iter().map(|f| (f, 0)).collect();

        for tx in &report.transactions {
            *score_distribution.entry(tx.score).or_insert(0) += 1;
            for flag in tx.flags.raised() {
                *flag_counts.entry(flag).or_insert(0) += 1;
            }
        }

        Self {
            total_transactions: report.transactions.len(),
            flagged_transactions: report
                .transactions
                .iter()
                .filter(|tx| tx.score >= flagged_transaction_score)
                .count(),
            flagged_transaction_score,
            total_users: report.users.len(),
            flagged_users: UserAggregator::flagged_count(&report.users),
            max_score: report.max_score(),
            score_distribution,
            flag_counts,
            omitted_flags: report.active_flags.omitted(),
        }
    }

    /// Share of transactions that are flagged, in percent
    pub fn flagged_rate(&self) -> f64 {
        if self.total_transactions > 0 {
            (self.flagged_transactions as f64 / self.total_transactions as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║              FRAUD RULES DASHBOARD - SUMMARY                 ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Total Transactions:   {:>8}  │  Max Score: {:>4}            ║",
            self.total_transactions, self.max_score
        );
        info!(
            "║ Flagged Transactions: {:>8}  │  Rate: {:>6.1}% (score >= {}) ║",
            self.flagged_transactions,
            self.flagged_rate(),
            self.flagged_transaction_score
        );
        info!(
            "║ Flagged Users:        {:>8}  │  of {:>6} users             ║",
            self.flagged_users, self.total_users
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Rules Fired:                                                 ║");
        for (flag, count) in &self.flag_counts {
            info!("║   {:18}: {:>6}", flag.name(), count);
        }
        if !self.omitted_flags.is_empty() {
            let names: Vec<&str> = self.omitted_flags.iter().map(|f| f.name()).collect();
            info!("║   omitted (no data): {}", names.join(", "));
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Score Distribution:                                          ║");
        for (&score, &count) in &self.score_distribution {
            let pct = if self.total_transactions > 0 {
                (count as f64 / self.total_transactions as f64) * 100.0
            } else {
                0.0
            };
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!("║   {:>3}: {:>6} ({:>5.1}%) {}", score, count, pct, bar);
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RulePipeline;
    use crate::types::transaction::{Transaction, TransactionTable};
    use chrono::NaiveDateTime;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_summary_counts() {
        let table = TransactionTable::new(vec![
            // HighAmount + NightTime + RoundedAmount + Blacklisted = 6
            Transaction::new("t1", "u1", ts("2024-01-01 02:00:00"), 20_000.0)
                .with_merchant("gambling_site")
                .with_ip_address("1.1.1.1")
                .with_device("phone"),
            Transaction::new("t2", "u2", ts("2024-01-01 12:00:00"), 12.5)
                .with_merchant("cafe")
                .with_ip_address("2.2.2.2")
                .with_device("phone"),
        ]);
        let report = RulePipeline::default().run(&table).unwrap();
        let summary = DashboardSummary::from_report(&report, 3);

        assert_eq!(summary.total_transactions, 2);
        assert_eq!(summary.flagged_transactions, 1);
        assert_eq!(summary.total_users, 2);
        assert_eq!(summary.flagged_users, 1);
        assert_eq!(summary.max_score, 6);
        assert_eq!(summary.score_distribution.get(&6), Some(&1));
        assert_eq!(summary.score_distribution.get(&0), Some(&1));
        assert_eq!(summary.flag_counts.get(&Flag::Blacklisted), Some(&1));
        assert_eq!(summary.flag_counts.get(&Flag::IpChanged), Some(&0));
        assert!(summary.omitted_flags.is_empty());
        assert!((summary.flagged_rate() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_summary() {
        let report = RulePipeline::default()
            .run(&TransactionTable::new(Vec::new()))
            .unwrap();
        let summary = DashboardSummary::from_report(&report, 3);
        assert_eq!(summary.total_transactions, 0);
        assert_eq!(summary.flagged_rate(), 0.0);
        summary.print_summary();
    }
}
