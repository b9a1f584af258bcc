use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::io::Read;
use uuid::Uuid;

use crate::application::ExpenseService;
use crate::domain::{Cents, Expense, parse_cents, parse_date};

/// Result of an import operation
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportError>,
}

/// Problem with a single input row
#[derive(Debug, Clone)]
pub struct ImportError {
    pub line: usize,
    pub error: String,
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub dry_run: bool,
    /// Skip rows already in the store: same `id`, or for rows without an
    /// `id`, same date, name and value.
    pub skip_duplicates: bool,
}

/// Importer for loading CSV rows (`id,date,name,value`) into the store.
///
/// A row keeps its `id` unless that ID is already taken, in which case it
/// gets a fresh one. Valid rows are written in a single transaction, so a
/// failed import leaves the store untouched.
pub struct Importer<'a> {
    service: &'a ExpenseService,
}

/// Content identity for rows that carry no ID.
type RowKey = (DateTime<Utc>, String, Cents);

impl<'a> Importer<'a> {
    pub fn new(service: &'a ExpenseService) -> Self {
        Self { service }
    }

    pub async fn import_csv<R: Read>(
        &self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let stored = self.service.list().await?;
        let mut known_ids: HashSet<Uuid> = stored.iter().map(|e| e.id).collect();
        let mut known_rows: HashSet<RowKey> = stored
            .into_iter()
            .map(|e| (e.date, e.name, e.value))
            .collect();

        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut result = ImportResult::default();
        let mut pending = Vec::new();

        for (index, record) in csv_reader.records().enumerate() {
            let line = index + 2; // header is line 1

            let row = match record
                .map_err(|e| format!("CSV parse error: {}", e))
                .and_then(|r| parse_row(&r))
            {
                Ok(row) => row,
                Err(error) => {
                    result.errors.push(ImportError { line, error });
                    continue;
                }
            };

            let key: RowKey = (row.date, row.name.clone(), row.value);
            let duplicate = match row.id {
                Some(id) => known_ids.contains(&id),
                None => known_rows.contains(&key),
            };
            if duplicate && options.skip_duplicates {
                result.skipped += 1;
                continue;
            }

            let mut expense = Expense::new(row.name, row.date, row.value);
            if let Some(id) = row.id.filter(|id| !known_ids.contains(id)) {
                expense = expense.with_id(id);
            }

            known_ids.insert(expense.id);
            known_rows.insert(key);
            pending.push(expense);
        }

        result.imported = pending.len();
        if !options.dry_run {
            self.service.insert_batch(pending).await?;
        }

        Ok(result)
    }
}

struct ParsedRow {
    id: Option<Uuid>,
    name: String,
    date: DateTime<Utc>,
    value: Cents,
}

fn parse_row(record: &csv::StringRecord) -> Result<ParsedRow, String> {
    let id_str = record.get(0).unwrap_or("").trim();
    let date_str = record.get(1).unwrap_or("").trim();
    let name = record.get(2).unwrap_or("").to_string();
    let value_str = record.get(3).unwrap_or("").trim();

    let id = if id_str.is_empty() {
        None
    } else {
        Some(Uuid::parse_str(id_str).map_err(|e| format!("invalid id '{}': {}", id_str, e))?)
    };

    if value_str.is_empty() {
        return Err("missing value".to_string());
    }
    let value =
        parse_cents(value_str).map_err(|e| format!("invalid value '{}': {}", value_str, e))?;
    if value < 0 {
        return Err(format!("negative value '{}'", value_str));
    }
    let date =
        parse_date(date_str).map_err(|e| format!("invalid date '{}': {}", date_str, e))?;

    Ok(ParsedRow {
        id,
        name,
        date,
        value,
    })
}
