//! CSV loader for transaction uploads

use crate::error::InputError;
use crate::types::transaction::{parse_timestamp, Column, Transaction, TransactionTable};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Row shape as it appears in the CSV. Optional columns may be absent from
/// the header entirely; empty cells come through as `None`.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "TransactionID")]
    transaction_id: String,
    #[serde(rename = "UserID")]
    user_id: String,
    #[serde(rename = "Timestamp")]
    timestamp: String,
    #[serde(rename = "Amount")]
    amount: f64,
    #[serde(rename = "Merchant", default)]
    merchant: Option<String>,
    #[serde(rename = "IPAddress", default)]
    ip_address: Option<String>,
    #[serde(rename = "Device", default)]
    device: Option<String>,
    #[serde(rename = "Location", default)]
    location: Option<String>,
}

/// Loads a transaction table from CSV.
pub struct TransactionLoader;

impl TransactionLoader {
    /// Load a CSV file from disk
    pub fn load_path<P: AsRef<Path>>(path: P) -> Result<TransactionTable, InputError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        info!(path = %path.display(), "Loading transactions");
        Self::load(file)
    }

    /// Load from any reader.
    ///
    /// Fails on a missing required column, a malformed record, a non-numeric
    /// Amount or an unparseable Timestamp. No rows are returned on failure.
    pub fn load<R: Read>(reader: R) -> Result<TransactionTable, InputError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let columns: BTreeSet<Column> = Column::ALL
            .into_iter()
            .filter(|c| headers.iter().any(|h| h == c.header()))
            .collect();

        let missing: Vec<&'static str> = Column::REQUIRED
            .into_iter()
            .filter(|c| !columns.contains(c))
            .map(|c| c.header())
            .collect();
        if !missing.is_empty() {
            return Err(InputError::MissingColumns { columns: missing });
        }

        let mut transactions = Vec::new();
        for (i, record) in reader.deserialize::<CsvRow>().enumerate() {
            let row = record?;
            let timestamp =
                parse_timestamp(&row.timestamp).ok_or_else(|| InputError::InvalidTimestamp {
                    row: i + 1,
                    value: row.timestamp.clone(),
                })?;

            transactions.push(Transaction {
                transaction_id: row.transaction_id,
                user_id: row.user_id,
                timestamp,
                amount: row.amount,
                merchant: row.merchant,
                ip_address: row.ip_address,
                device: row.device,
                location: row.location,
            });
        }

        debug!(
            rows = transactions.len(),
            columns = ?columns,
            "Parsed transaction table"
        );

        Ok(TransactionTable::with_columns(transactions, columns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "TransactionID,UserID,Timestamp,Amount,Merchant,IPAddress,Device,Location";

    #[test]
    fn test_load_full_table() {
        let csv = format!(
            "{HEADER}\n\
             T1,1,2024-01-01 10:00:00,15000,shop,1.1.1.1,phone,Paris\n\
             T2,1,2024-01-01 10:02:00,500.25,,2.2.2.2,phone,\n"
        );

        let table = TransactionLoader::load(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.columns().count(), 8);

        let second = &table.transactions()[1];
        assert_eq!(second.transaction_id, "T2");
        assert_eq!(second.user_id, "1");
        assert_eq!(second.amount, 500.25);
        assert_eq!(second.merchant, None);
        assert_eq!(second.ip_address.as_deref(), Some("2.2.2.2"));
        assert_eq!(second.location, None);
    }

    #[test]
    fn test_optional_columns_may_be_absent() {
        let csv = "Amount,UserID,TransactionID,Timestamp\n\
                   100,u1,T1,2024-01-01T08:00:00\n";

        let table = TransactionLoader::load(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 1);
        assert!(!table.has_column(Column::Merchant));
        assert!(!table.has_column(Column::Device));
        assert_eq!(table.transactions()[0].merchant, None);
    }

    #[test]
    fn test_missing_required_columns() {
        let csv = "TransactionID,Amount,Merchant\nT1,10,shop\n";

        match TransactionLoader::load(csv.as_bytes()) {
            Err(InputError::MissingColumns { columns }) => {
                assert_eq!(columns, vec!["UserID", "Timestamp"]);
            }
            other => panic!("expected missing columns, got {other:?}"),
        }
    }

    #[test]
    fn test_header_names_are_exact() {
        let csv = "transactionid,UserID,Timestamp,Amount\nT1,u1,2024-01-01,1\n";
        assert!(matches!(
            TransactionLoader::load(csv.as_bytes()),
            Err(InputError::MissingColumns { .. })
        ));
    }

    #[test]
    fn test_unparseable_timestamp() {
        let csv = format!("{HEADER}\nT1,1,2024-01-01 10:00:00,1,a,b,c,d\nT2,1,soon,1,a,b,c,d\n");

        match TransactionLoader::load(csv.as_bytes()) {
            Err(InputError::InvalidTimestamp { row, value }) => {
                assert_eq!(row, 2);
                assert_eq!(value, "soon");
            }
            other => panic!("expected timestamp error, got {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_amount() {
        let csv = format!("{HEADER}\nT1,1,2024-01-01 10:00:00,lots,a,b,c,d\n");
        assert!(matches!(
            TransactionLoader::load(csv.as_bytes()),
            Err(InputError::Csv(_))
        ));
    }

    #[test]
    fn test_ragged_record() {
        let csv = format!("{HEADER}\nT1,1,2024-01-01 10:00:00\n");
        assert!(matches!(
            TransactionLoader::load(csv.as_bytes()),
            Err(InputError::Csv(_))
        ));
    }

    #[test]
    fn test_header_only() {
        let table = TransactionLoader::load(format!("{HEADER}\n").as_bytes()).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_empty_document() {
        assert!(matches!(
            TransactionLoader::load("".as_bytes()),
            Err(InputError::MissingColumns { .. })
        ));
    }

    #[test]
    fn test_load_path_missing_file() {
        assert!(matches!(
            TransactionLoader::load_path("/nonexistent/transactions.csv"),
            Err(InputError::Io(_))
        ));
    }
}
