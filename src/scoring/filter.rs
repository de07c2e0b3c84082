//! Minimum-score filtering of scored transactions

use crate::types::report::ScoredTransaction;
use tracing::info;

/// Rows with `score >= min_score`, highest score first.
///
/// The sort is stable, so rows with equal scores keep their input order.
pub fn filter_by_score(rows: &[ScoredTransaction], min_score: u32) -> Vec<&ScoredTransaction> {
    let mut filtered: Vec<&ScoredTransaction> =
        rows.iter().filter(|tx| tx.score >= min_score).collect();
    filtered.sort_by(|a, b| b.score.cmp(&a.score));
    filtered
}

/// Highest transaction score in the set, 0 when empty
pub fn max_score(rows: &[ScoredTransaction]) -> u32 {
    rows.iter().map(|tx| tx.score).max().unwrap_or(0)
}

/// Clamp a requested threshold into `[0, max observed score]`.
pub fn clamp_threshold(requested: u32, rows: &[ScoredTransaction]) -> u32 {
    let max = max_score(rows);
    if requested > max {
        info!(
            requested = requested,
            max_score = max,
            "Minimum score above highest observed score, clamping"
        );
        max
    } else {
        requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::flags::FlagSet;
    use crate::types::transaction::Transaction;
    use chrono::NaiveDate;

    fn rows(scores: &[u32]) -> Vec<ScoredTransaction> {
        let at = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        scores
            .iter()
            .enumerate()
            .map(|(i, &score)| ScoredTransaction {
                transaction: Transaction::new(format!("t{}", i + 1), "u1", at, 1.0),
                flags: FlagSet::new(),
                score,
            })
            .collect()
    }

    fn ids(filtered: &[&ScoredTransaction]) -> Vec<String> {
        filtered
            .iter()
            .map(|tx| tx.transaction_id().to_string())
            .collect()
    }

    #[test]
    fn test_zero_threshold_returns_all_sorted_stable() {
        let data = rows(&[1, 3, 0, 3, 1]);
        let filtered = filter_by_score(&data, 0);
        assert_eq!(ids(&filtered), vec!["t2", "t4", "t1", "t5", "t3"]);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let data = rows(&[1, 3, 2, 5]);
        let filtered = filter_by_score(&data, 3);
        assert_eq!(ids(&filtered), vec!["t4", "t2"]);
        assert!(filtered.iter().all(|tx| tx.score >= 3));
    }

    #[test]
    fn test_raising_threshold_never_grows_result() {
        let data = rows(&[0, 4, 2, 2, 1, 6, 3]);
        let mut previous = usize::MAX;
        for min in 0..=8 {
            let len = filter_by_score(&data, min).len();
            assert!(len <= previous);
            previous = len;
        }
        assert_eq!(previous, 0);
    }

    #[test]
    fn test_clamp_threshold() {
        let data = rows(&[1, 4]);
        assert_eq!(max_score(&data), 4);
        assert_eq!(clamp_threshold(3, &data), 3);
        assert_eq!(clamp_threshold(9, &data), 4);
        assert_eq!(clamp_threshold(2, &[]), 0);
    }
}
