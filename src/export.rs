//! CSV export of the filtered transaction table and the user risk table

use crate::types::flags::Flag;
use crate::types::report::{ScoredTransaction, UserRiskProfile};
use crate::types::transaction::{Column, TIMESTAMP_OUTPUT_FORMAT};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes pipeline tables as UTF-8 CSV with a header row
#[derive(Debug, Clone)]
pub struct CsvExporter {
    /// Input columns carried into the export, in table order
    columns: Vec<Column>,
}

impl CsvExporter {
    /// Exporter for the given input columns; required columns are always written.
    pub fn new(columns: impl IntoIterator<Item = Column>) -> Self {
        let mut columns: Vec<Column> = columns
            .into_iter()
            .chain(Column::REQUIRED)
            .collect();
        columns.sort();
        columns.dedup();
        Self { columns }
    }

    /// Header row: input columns, the seven flags, then TransactionScore
    pub fn transaction_header(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .map(|c| c.header())
            .chain(Flag::ALL.iter().map(|f| f.name()))
            .chain(std::iter::once("TransactionScore"))
            .collect()
    }

    /// Write transactions in the given order
    pub fn write_transactions<W: Write>(
        &self,
        writer: W,
        rows: &[&ScoredTransaction],
    ) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(self.transaction_header())?;

        for row in rows {
            let tx = &row.transaction;
            let mut record: Vec<String> = self
                .columns
                .iter()
                .map(|column| match column {
                    Column::TransactionId => tx.transaction_id.clone(),
                    Column::UserId => tx.user_id.clone(),
                    Column::Timestamp => tx.timestamp.format(TIMESTAMP_OUTPUT_FORMAT).to_string(),
                    Column::Amount => tx.amount.to_string(),
                    other => tx.optional_field(*other).unwrap_or_default().to_string(),
                })
                .collect();

            // not computed -> empty cell
            record.extend(Flag::ALL.iter().map(|&flag| match row.flags.get(flag) {
                Some(value) => value.to_string(),
                None => String::new(),
            }));
            record.push(row.score.to_string());

            csv.write_record(&record)?;
        }

        csv.flush()?;
        Ok(())
    }

    /// Write the user risk table. The header comes from the record's field names,
    /// so an empty table writes nothing.
    pub fn write_users<W: Write>(&self, writer: W, users: &[&UserRiskProfile]) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        for user in users {
            csv.serialize(user)?;
        }
        csv.flush()?;
        Ok(())
    }

    /// Export transactions to `target`. A directory target gets `file_name` appended.
    pub fn export_transactions(
        &self,
        target: &Path,
        file_name: &str,
        rows: &[&ScoredTransaction],
    ) -> Result<PathBuf> {
        let path = resolve_target(target, file_name);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create export file {}", path.display()))?;
        self.write_transactions(file, rows)?;

        info!(path = %path.display(), rows = rows.len(), "Exported transactions");
        Ok(path)
    }

    /// Export the user risk table to `path`
    pub fn export_users(&self, path: &Path, users: &[&UserRiskProfile]) -> Result<PathBuf> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create export file {}", path.display()))?;
        self.write_users(file, users)?;

        info!(path = %path.display(), users = users.len(), "Exported user risk scores");
        Ok(path.to_path_buf())
    }
}

fn resolve_target(target: &Path, file_name: &str) -> PathBuf {
    if target.is_dir() {
        target.join(file_name)
    } else {
        target.to_path_buf()
    }
}
