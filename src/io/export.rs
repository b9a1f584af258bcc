use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::ExpenseService;
use crate::domain::{Expense, format_cents};

/// Column layout shared by CSV export and import.
pub const CSV_HEADER: [&str; 4] = ["id", "date", "name", "value"];

/// Database snapshot for JSON export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub expenses: Vec<Expense>,
}

/// Exporter for writing the expense list to various formats
pub struct Exporter<'a> {
    service: &'a ExpenseService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a ExpenseService) -> Self {
        Self { service }
    }

    /// Export expenses to CSV, newest first, with full RFC 3339 dates.
    /// Returns the number of rows written.
    pub async fn export_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let expenses = self.service.list().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(CSV_HEADER)?;

        for expense in &expenses {
            csv_writer.write_record([
                expense.id.to_string(),
                expense.date.to_rfc3339_opts(SecondsFormat::AutoSi, true),
                expense.name.clone(),
                format_cents(expense.value),
            ])?;
        }

        csv_writer.flush()?;
        Ok(expenses.len())
    }

    /// Export a full JSON snapshot. Returns the number of expenses written.
    pub async fn export_json<W: Write>(&self, mut writer: W) -> Result<usize> {
        let snapshot = ExpenseSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            expenses: self.service.list().await?,
        };

        serde_json::to_writer_pretty(&mut writer, &snapshot)?;
        writeln!(writer)?;
        Ok(snapshot.expenses.len())
    }
}
