//! Transaction records and the in-memory transaction table

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Timestamp layouts accepted besides RFC 3339, tried in order.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

/// Layout used when timestamps are written back out.
pub const TIMESTAMP_OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Input columns, in table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Column {
    #[serde(rename = "TransactionID")]
    TransactionId,
    #[serde(rename = "UserID")]
    UserId,
    Timestamp,
    Amount,
    Merchant,
    #[serde(rename = "IPAddress")]
    IpAddress,
    Device,
    Location,
}

impl Column {
    pub const ALL: [Column; 8] = [
        Column::TransactionId,
        Column::UserId,
        Column::Timestamp,
        Column::Amount,
        Column::Merchant,
        Column::IpAddress,
        Column::Device,
        Column::Location,
    ];

    /// Columns without which a run cannot start
    pub const REQUIRED: [Column; 4] = [
        Column::TransactionId,
        Column::UserId,
        Column::Timestamp,
        Column::Amount,
    ];

    /// CSV header name
    pub fn header(&self) -> &'static str {
        match self {
            Column::TransactionId => "TransactionID",
            Column::UserId => "UserID",
            Column::Timestamp => "Timestamp",
            Column::Amount => "Amount",
            Column::Merchant => "Merchant",
            Column::IpAddress => "IPAddress",
            Column::Device => "Device",
            Column::Location => "Location",
        }
    }

    pub fn is_required(&self) -> bool {
        Self::REQUIRED.contains(self)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// One loaded transaction. Never mutated by the pipeline; derived data lives
/// alongside it in [`crate::types::report::ScoredTransaction`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "TransactionID")]
    pub transaction_id: String,

    /// Grouping key for predecessor lookup and aggregation
    #[serde(rename = "UserID")]
    pub user_id: String,

    #[serde(rename = "Timestamp")]
    pub timestamp: NaiveDateTime,

    #[serde(rename = "Amount")]
    pub amount: f64,

    #[serde(rename = "Merchant")]
    pub merchant: Option<String>,

    #[serde(rename = "IPAddress")]
    pub ip_address: Option<String>,

    #[serde(rename = "Device")]
    pub device: Option<String>,

    /// Display only, never scored
    #[serde(rename = "Location")]
    pub location: Option<String>,
}

impl Transaction {
    /// Create a transaction with the required fields; optional fields start empty.
    pub fn new(
        transaction_id: impl Into<String>,
        user_id: impl Into<String>,
        timestamp: NaiveDateTime,
        amount: f64,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            user_id: user_id.into(),
            timestamp,
            amount,
            merchant: None,
            ip_address: None,
            device: None,
            location: None,
        }
    }

    pub fn with_merchant(mut self, merchant: impl Into<String>) -> Self {
        self.merchant = Some(merchant.into());
        self
    }

    pub fn with_ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Value of an optional passthrough column
    pub fn optional_field(&self, column: Column) -> Option<&str> {
        match column {
            Column::Merchant => self.merchant.as_deref(),
            Column::IpAddress => self.ip_address.as_deref(),
            Column::Device => self.device.as_deref(),
            Column::Location => self.location.as_deref(),
            _ => None,
        }
    }
}

/// Parse a Timestamp cell into a naive wall-clock date-time.
///
/// RFC 3339 values keep the wall-clock time as written; the offset is dropped.
/// A bare date means midnight.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    for format in TIMESTAMP_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// All transactions of one upload plus the set of columns the upload carried.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransactionTable {
    transactions: Vec<Transaction>,
    columns: BTreeSet<Column>,
}

impl TransactionTable {
    /// Table built in code; every column counts as present.
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self {
            transactions,
            columns: Column::ALL.into_iter().collect(),
        }
    }

    /// Table with an explicit column set, as produced by the CSV loader
    pub fn with_columns(transactions: Vec<Transaction>, columns: BTreeSet<Column>) -> Self {
        Self {
            transactions,
            columns,
        }
    }

    /// Mark a column as absent from the source document
    pub fn without_column(mut self, column: Column) -> Self {
        self.columns.remove(&column);
        self
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    /// Present columns in table order
    pub fn columns(&self) -> impl Iterator<Item = Column> + '_ {
        self.columns.iter().copied()
    }

    /// True when the column is in the header and at least one row has a non-empty value
    pub fn has_values(&self, column: Column) -> bool {
        if !self.has_column(column) {
            return false;
        }
        if column.is_required() {
            return true;
        }
        self.transactions
            .iter()
            .any(|tx| tx.optional_field(column).is_some_and(|v| !v.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = ts("2024-03-01 09:15:00");
        assert_eq!(parse_timestamp("2024-03-01 09:15:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T09:15:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01 09:15"), Some(expected));
        assert_eq!(parse_timestamp("2024/03/01 09:15:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T09:15:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp(" 2024-03-01 09:15:00 "), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01"), Some(ts("2024-03-01 00:00:00")));
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp("not a date"), None);
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("2024-13-01 00:00:00"), None);
    }

    #[test]
    fn test_has_values_detects_all_empty_column() {
        let rows = vec![
            Transaction::new("t1", "u1", ts("2024-01-01 10:00:00"), 10.0).with_device(""),
            Transaction::new("t2", "u1", ts("2024-01-01 11:00:00"), 10.0),
        ];
        let table = TransactionTable::new(rows);

        assert!(table.has_values(Column::Amount));
        assert!(!table.has_values(Column::Device));
        assert!(!table.has_values(Column::Merchant));
    }

    #[test]
    fn test_without_column() {
        let table = TransactionTable::new(vec![
            Transaction::new("t1", "u1", ts("2024-01-01 10:00:00"), 10.0).with_merchant("shop"),
        ])
        .without_column(Column::Merchant);

        assert!(!table.has_column(Column::Merchant));
        assert!(!table.has_values(Column::Merchant));
        assert_eq!(table.columns().count(), 7);
    }
}
