//! Rule flag derivation for transaction tables.
//!
//! Each transaction gets up to seven boolean flags. Four of them look only at
//! the row itself; three compare it against the same user's previous
//! transaction, found by sorting each user's rows by timestamp.

use crate::config::RulesConfig;
use crate::types::flags::{ActiveFlags, Flag, FlagSet};
use crate::types::transaction::{Transaction, TransactionTable};
use chrono::Timelike;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Derives rule flags from raw transaction fields and each user's previous transaction.
pub struct FeatureExtractor {
    high_amount_threshold: f64,
    night_end_hour: u32,
    rapid_window_minutes: f64,
    /// Rounding unit in integer cents
    rounded_unit_cents: i64,
    blacklist: HashSet<String>,
}

impl FeatureExtractor {
    /// Create an extractor from rule configuration.
    pub fn new(rules: &RulesConfig) -> Self {
        Self {
            high_amount_threshold: rules.high_amount_threshold,
            night_end_hour: rules.night_end_hour,
            rapid_window_minutes: rules.rapid_window_minutes,
            rounded_unit_cents: to_cents(rules.rounded_amount_unit),
            blacklist: rules.blacklisted_merchants.iter().cloned().collect(),
        }
    }

    /// Flags that can be computed for this table.
    ///
    /// A flag whose source column is missing from the header, or empty in every
    /// row, is left out.
    pub fn active_flags(&self, table: &TransactionTable) -> ActiveFlags {
        let active = ActiveFlags::from_flags(
            Flag::ALL
                .into_iter()
                .filter(|flag| table.has_values(flag.source_column())),
        );

        for flag in active.omitted() {
            warn!(
                flag = %flag,
                column = %flag.source_column(),
                "Source column missing or empty, flag omitted from scoring"
            );
        }

        active
    }

    /// Extract flags for every transaction.
    ///
    /// Returns one flag set per row, in input order. Only flags in `active`
    /// are present in each set.
    pub fn extract(&self, table: &TransactionTable, active: &ActiveFlags) -> Vec<FlagSet> {
        let rows = table.transactions();
        let predecessors = previous_transactions(rows);

        rows.iter()
            .zip(&predecessors)
            .map(|(tx, prev)| {
                let prev = prev.map(|i| &rows[i]);
                let mut flags = FlagSet::new();
                for flag in active.iter() {
                    flags.set(flag, self.evaluate(flag, tx, prev));
                }
                flags
            })
            .collect()
    }

    fn evaluate(&self, flag: Flag, tx: &Transaction, prev: Option<&Transaction>) -> bool {
        match flag {
            Flag::HighAmount => tx.amount > self.high_amount_threshold,
            Flag::NightTime => tx.timestamp.hour() < self.night_end_hour,
            Flag::RapidTransactions => prev.is_some_and(|p| {
                let minutes = (tx.timestamp - p.timestamp).num_milliseconds() as f64 / 60_000.0;
                minutes < self.rapid_window_minutes
            }),
            Flag::Blacklisted => tx
                .merchant
                .as_deref()
                .is_some_and(|m| self.blacklist.contains(m)),
            Flag::RoundedAmount => {
                tx.amount.is_finite()
                    && to_cents(tx.amount)
                        .checked_rem(self.rounded_unit_cents)
                        .is_some_and(|r| r == 0)
            }
            Flag::IpChanged => changed(
                prev.and_then(|p| p.ip_address.as_deref()),
                tx.ip_address.as_deref(),
            ),
            Flag::DeviceChanged => changed(
                prev.and_then(|p| p.device.as_deref()),
                tx.device.as_deref(),
            ),
        }
    }

    /// Check a merchant name against the denylist.
    pub fn is_blacklisted(&self, merchant: &str) -> bool {
        self.blacklist.contains(merchant)
    }

    /// Get the number of flags this extractor knows.
    pub fn flag_count(&self) -> usize {
        Flag::ALL.len()
    }

    /// Get flag names in output column order.
    pub fn flag_names(&self) -> Vec<&'static str> {
        Flag::ALL.iter().map(|f| f.name()).collect()
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(&RulesConfig::default())
    }
}

/// A change needs a known previous value; a missing current value differs from it.
fn changed(previous: Option<&str>, current: Option<&str>) -> bool {
    previous.is_some_and(|p| current != Some(p))
}

/// Amount as integer cents, so 2999.9999999 and 3000.0 compare equal.
fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Index of each row's previous transaction for the same user.
///
/// Rows are grouped by user and each group is stably sorted by timestamp, so
/// rows with equal timestamps keep their input order. The first row of each
/// group has no predecessor.
fn previous_transactions(rows: &[Transaction]) -> Vec<Option<usize>> {
    let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, tx) in rows.iter().enumerate() {
        groups.entry(tx.user_id.as_str()).or_default().push(i);
    }

    let mut predecessors = vec![None; rows.len()];
    for indices in groups.values_mut() {
        indices.sort_by_key(|&i| rows[i].timestamp);
        for pair in indices.windows(2) {
            predecessors[pair[1]] = Some(pair[0]);
        }
    }

    debug!(rows = rows.len(), users = groups.len(), "Resolved previous transactions");
    predecessors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::transaction::Column;
    use chrono::NaiveDateTime;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn tx(id: &str, user: &str, at: &str, amount: f64) -> Transaction {
        Transaction::new(id, user, ts(at), amount)
            .with_merchant("grocery")
            .with_ip_address("10.0.0.1")
            .with_device("phone")
    }

    fn extract(rows: Vec<Transaction>) -> Vec<FlagSet> {
        let extractor = FeatureExtractor::default();
        let table = TransactionTable::new(rows);
        let active = extractor.active_flags(&table);
        extractor.extract(&table, &active)
    }

    #[test]
    fn test_row_level_flags() {
        let flags = extract(vec![
            tx("t1", "u1", "2024-01-01 03:00:00", 15_000.0).with_merchant("gambling_site"),
            tx("t2", "u2", "2024-01-01 12:00:00", 10_000.0),
            tx("t3", "u3", "2024-01-01 06:00:00", 2_999.999_999_9),
        ]);

        assert_eq!(flags[0].get(Flag::HighAmount), Some(true));
        assert_eq!(flags[0].get(Flag::NightTime), Some(true));
        assert_eq!(flags[0].get(Flag::Blacklisted), Some(true));
        assert_eq!(flags[0].get(Flag::RoundedAmount), Some(true));

        // strictly greater than the threshold
        assert_eq!(flags[1].get(Flag::HighAmount), Some(false));
        assert_eq!(flags[1].get(Flag::RoundedAmount), Some(true));
        assert_eq!(flags[1].get(Flag::Blacklisted), Some(false));

        assert_eq!(flags[2].get(Flag::NightTime), Some(false));
        assert_eq!(flags[2].get(Flag::RoundedAmount), Some(true));
    }

    #[test]
    fn test_rounded_amount_rejects_fractions() {
        let flags = extract(vec![
            tx("t1", "u1", "2024-01-01 12:00:00", 1_000.5),
            tx("t2", "u2", "2024-01-01 12:00:00", 999.0),
        ]);
        assert_eq!(flags[0].get(Flag::RoundedAmount), Some(false));
        assert_eq!(flags[1].get(Flag::RoundedAmount), Some(false));
    }

    #[test]
    fn test_blacklist_is_exact_match() {
        let extractor = FeatureExtractor::default();
        assert!(extractor.is_blacklisted("shady_merchant"));
        assert!(!extractor.is_blacklisted("Shady_Merchant"));
        assert!(!extractor.is_blacklisted(" shady_merchant"));
    }

    #[test]
    fn test_first_transaction_has_no_sequence_flags() {
        let flags = extract(vec![tx("t1", "u1", "2024-01-01 12:00:00", 50.0)]);
        assert_eq!(flags[0].get(Flag::RapidTransactions), Some(false));
        assert_eq!(flags[0].get(Flag::IpChanged), Some(false));
        assert_eq!(flags[0].get(Flag::DeviceChanged), Some(false));
    }

    #[test]
    fn test_predecessor_uses_timestamp_order_not_input_order() {
        // later row listed first
        let flags = extract(vec![
            tx("t2", "u1", "2024-01-01 12:05:00", 50.0).with_ip_address("10.0.0.2"),
            tx("t1", "u1", "2024-01-01 12:00:00", 50.0),
        ]);

        assert_eq!(flags[1].get(Flag::RapidTransactions), Some(false));
        assert_eq!(flags[1].get(Flag::IpChanged), Some(false));
        assert_eq!(flags[0].get(Flag::RapidTransactions), Some(true));
        assert_eq!(flags[0].get(Flag::IpChanged), Some(true));
        assert_eq!(flags[0].get(Flag::DeviceChanged), Some(false));
    }

    #[test]
    fn test_equal_timestamps_keep_input_order() {
        let flags = extract(vec![
            tx("t1", "u1", "2024-01-01 12:00:00", 50.0),
            tx("t2", "u1", "2024-01-01 12:00:00", 50.0).with_device("laptop"),
        ]);
        assert_eq!(flags[0].get(Flag::DeviceChanged), Some(false));
        assert_eq!(flags[1].get(Flag::DeviceChanged), Some(true));
        assert_eq!(flags[1].get(Flag::RapidTransactions), Some(true));
    }

    #[test]
    fn test_rapid_window_is_strict() {
        let flags = extract(vec![
            tx("t1", "u1", "2024-01-01 12:00:00", 50.0),
            tx("t2", "u1", "2024-01-01 12:10:00", 50.0),
            tx("t3", "u1", "2024-01-01 12:19:59", 50.0),
        ]);
        assert_eq!(flags[1].get(Flag::RapidTransactions), Some(false));
        assert_eq!(flags[2].get(Flag::RapidTransactions), Some(true));
    }

    #[test]
    fn test_users_do_not_share_history() {
        let flags = extract(vec![
            tx("t1", "u1", "2024-01-01 12:00:00", 50.0),
            tx("t2", "u2", "2024-01-01 12:01:00", 50.0).with_ip_address("10.9.9.9"),
        ]);
        assert_eq!(flags[1].get(Flag::RapidTransactions), Some(false));
        assert_eq!(flags[1].get(Flag::IpChanged), Some(false));
    }

    #[test]
    fn test_missing_current_value_counts_as_change() {
        let mut second = tx("t2", "u1", "2024-01-01 13:00:00", 50.0);
        second.ip_address = None;
        let mut third = tx("t3", "u1", "2024-01-01 14:00:00", 50.0);
        third.ip_address = None;

        let flags = extract(vec![tx("t1", "u1", "2024-01-01 12:00:00", 50.0), second, third]);
        assert_eq!(flags[1].get(Flag::IpChanged), Some(true));
        assert_eq!(flags[2].get(Flag::IpChanged), Some(false));
    }

    #[test]
    fn test_missing_previous_value_is_not_a_change() {
        let mut first = tx("t1", "u1", "2024-01-01 12:00:00", 50.0);
        first.ip_address = None;
        let mut second = tx("t2", "u1", "2024-01-01 13:00:00", 50.0).with_ip_address("1.1.1.1");
        second.device = None;
        let third = tx("t3", "u1", "2024-01-01 14:00:00", 50.0)
            .with_ip_address("1.1.1.1")
            .with_device("laptop");

        let flags = extract(vec![first, second, third]);
        assert_eq!(flags[1].get(Flag::IpChanged), Some(false));
        assert_eq!(flags[1].get(Flag::DeviceChanged), Some(true));
        assert_eq!(flags[2].get(Flag::IpChanged), Some(false));
        assert_eq!(flags[2].get(Flag::DeviceChanged), Some(false));
    }

    #[test]
    fn test_missing_column_omits_flag() {
        let extractor = FeatureExtractor::default();
        let table = TransactionTable::new(vec![tx("t1", "u1", "2024-01-01 12:00:00", 50.0)])
            .without_column(Column::Device);

        let active = extractor.active_flags(&table);
        assert_eq!(active.omitted(), vec![Flag::DeviceChanged]);

        let flags = extractor.extract(&table, &active);
        assert_eq!(flags[0].get(Flag::DeviceChanged), None);
        assert_eq!(flags[0].computed().count(), 6);
    }

    #[test]
    fn test_custom_rules() {
        let rules = RulesConfig {
            high_amount_threshold: 100.0,
            night_end_hour: 0,
            rapid_window_minutes: 1.0,
            rounded_amount_unit: 0.5,
            blacklisted_merchants: vec!["grocery".to_string()],
        };
        let extractor = FeatureExtractor::new(&rules);
        let table = TransactionTable::new(vec![tx("t1", "u1", "2024-01-01 00:30:00", 100.5)]);
        let flags = extractor.extract(&table, &extractor.active_flags(&table));

        assert_eq!(flags[0].get(Flag::HighAmount), Some(true));
        assert_eq!(flags[0].get(Flag::NightTime), Some(false));
        assert_eq!(flags[0].get(Flag::RoundedAmount), Some(true));
        assert_eq!(flags[0].get(Flag::Blacklisted), Some(true));
    }

    #[test]
    fn test_sub_cent_rounding_unit_never_matches() {
        let rules = RulesConfig {
            rounded_amount_unit: 0.001,
            ..RulesConfig::default()
        };
        let extractor = FeatureExtractor::new(&rules);
        let table = TransactionTable::new(vec![tx("t1", "u1", "2024-01-01 12:00:00", 3_000.0)]);
        let flags = extractor.extract(&table, &extractor.active_flags(&table));
        assert_eq!(flags[0].get(Flag::RoundedAmount), Some(false));
    }

    #[test]
    fn test_flag_count() {
        let extractor = FeatureExtractor::default();
        assert_eq!(extractor.flag_count(), 7);
        assert_eq!(extractor.flag_names()[5], "IPChanged");
    }
}
