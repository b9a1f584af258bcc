// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use spendbook::application::{ExpenseService, StoreEvent};
use spendbook::domain::{Cents, Expense};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(ExpenseService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = ExpenseService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// Insert an expense that must be committed.
pub async fn add(
    service: &ExpenseService,
    name: &str,
    date: &str,
    value: Cents,
) -> Result<Expense> {
    let expense = service
        .insert(name, parse_date(date), Some(value))
        .await?
        .expect("expense with a value is committed");
    Ok(expense)
}

/// Names in listing order.
pub fn names(expenses: &[Expense]) -> Vec<&str> {
    expenses.iter().map(|e| e.name.as_str()).collect()
}

/// Subscribe a recorder and return the shared event log.
pub fn record_events(service: &mut ExpenseService) -> Arc<Mutex<Vec<StoreEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    service.subscribe(move |event: &StoreEvent| {
        sink.lock().unwrap().push(event.clone());
    });
    events
}
