use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::domain::{Cents, Expense, ExpenseId};

use super::MIGRATION_001_INITIAL;

const EXPENSE_COLUMNS: &str = "id, sequence, name, date, value_cents, created_at, updated_at";

/// Listing order: newest date first, insertion order among equal dates.
const EXPENSE_ORDER: &str = "ORDER BY date DESC, sequence ASC";

/// Repository for persisting and querying expenses.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations. Safe to call on an already migrated database.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Save a new expense. Assigns the next sequence number and truncates
    /// timestamps to the precision the database keeps.
    pub async fn save_expense(&self, expense: &mut Expense) -> Result<()> {
        self.save_expenses(std::slice::from_mut(expense)).await
    }

    /// Save several new expenses in one transaction: either all are
    /// stored or none are.
    pub async fn save_expenses(&self, expenses: &mut [Expense]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        for expense in expenses.iter_mut() {
            Self::insert_expense(&mut *tx, expense).await?;
        }

        tx.commit().await.context("Failed to commit expenses")?;
        Ok(())
    }

    async fn insert_expense(conn: &mut SqliteConnection, expense: &mut Expense) -> Result<()> {
        let row = sqlx::query(
            r#"
            UPDATE sequence_counter
            SET value = value + 1
            WHERE name = 'expense_sequence'
            RETURNING value
            "#,
        )
        .fetch_one(&mut *conn)
        .await
        .context("Failed to get next sequence number")?;

        expense.sequence = row.get("value");
        normalize_timestamps(expense);

        sqlx::query(
            r#"
            INSERT INTO expenses (id, sequence, name, date, value_cents, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(expense.id.to_string())
        .bind(expense.sequence)
        .bind(&expense.name)
        .bind(db_time(expense.date))
        .bind(expense.value)
        .bind(db_time(expense.created_at))
        .bind(db_time(expense.updated_at))
        .execute(&mut *conn)
        .await
        .context("Failed to save expense")?;

        Ok(())
    }

    /// Overwrite the mutable fields of an existing expense.
    /// Returns false if no row has that ID.
    pub async fn update_expense(&self, expense: &mut Expense) -> Result<bool> {
        normalize_timestamps(expense);

        let result = sqlx::query(
            r#"
            UPDATE expenses
            SET name = ?, date = ?, value_cents = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&expense.name)
        .bind(db_time(expense.date))
        .bind(expense.value)
        .bind(db_time(expense.updated_at))
        .bind(expense.id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update expense")?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every expense whose ID is in `ids`, in a single transaction.
    /// Returns the IDs that were actually removed, in the order given.
    pub async fn delete_expenses(&self, ids: &[ExpenseId]) -> Result<Vec<ExpenseId>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let mut removed = Vec::new();
        for id in ids {
            if removed.contains(id) {
                continue;
            }
            let result = sqlx::query("DELETE FROM expenses WHERE id = ?")
                .bind(id.to_string())
                .execute(&mut *tx)
                .await
                .context("Failed to delete expense")?;
            if result.rows_affected() > 0 {
                removed.push(*id);
            }
        }

        tx.commit().await.context("Failed to commit deletion")?;
        Ok(removed)
    }

    /// Get an expense by ID.
    pub async fn get_expense(&self, id: ExpenseId) -> Result<Option<Expense>> {
        let query = format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = ?");
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch expense")?;

        row.as_ref().map(Self::row_to_expense).transpose()
    }

    /// List all expenses, newest first.
    pub async fn list_expenses(&self) -> Result<Vec<Expense>> {
        let query = format!("SELECT {EXPENSE_COLUMNS} FROM expenses {EXPENSE_ORDER}");
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list expenses")?;

        rows.iter().map(Self::row_to_expense).collect()
    }

    /// List expenses with optional filters, newest first.
    pub async fn list_expenses_filtered(
        &self,
        min_value: Option<Cents>,
        max_value: Option<Cents>,
        from_date: Option<DateTime<Utc>>,
        to_date: Option<DateTime<Utc>>,
        name_contains: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Expense>> {
        let mut query = format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE 1=1");

        // Collect string bindings first so they live long enough
        let from_date_str = from_date.map(db_time);
        let to_date_str = to_date.map(db_time);
        let name_pattern = name_contains.map(like_pattern);

        if min_value.is_some() {
            query.push_str(" AND value_cents >= ?");
        }
        if max_value.is_some() {
            query.push_str(" AND value_cents <= ?");
        }
        if from_date_str.is_some() {
            query.push_str(" AND date >= ?");
        }
        if to_date_str.is_some() {
            query.push_str(" AND date <= ?");
        }
        if name_pattern.is_some() {
            query.push_str(" AND name LIKE ? ESCAPE '\\'");
        }

        query.push(' ');
        query.push_str(EXPENSE_ORDER);

        if let Some(lim) = limit {
            query.push_str(&format!(" LIMIT {}", lim));
        }

        let mut sql_query = sqlx::query(&query);
        if let Some(min) = min_value {
            sql_query = sql_query.bind(min);
        }
        if let Some(max) = max_value {
            sql_query = sql_query.bind(max);
        }
        if let Some(ref fd) = from_date_str {
            sql_query = sql_query.bind(fd);
        }
        if let Some(ref td) = to_date_str {
            sql_query = sql_query.bind(td);
        }
        if let Some(ref pattern) = name_pattern {
            sql_query = sql_query.bind(pattern);
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list filtered expenses")?;

        rows.iter().map(Self::row_to_expense).collect()
    }

    /// Number of stored expenses.
    pub async fn count_expenses(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM expenses")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count expenses")?;
        Ok(row.get("count"))
    }

    fn row_to_expense(row: &sqlx::sqlite::SqliteRow) -> Result<Expense> {
        let id_str: String = row.get("id");
        let date_str: String = row.get("date");
        let created_at_str: String = row.get("created_at");
        let updated_at_str: String = row.get("updated_at");

        Ok(Expense {
            id: Uuid::parse_str(&id_str).context("Invalid expense ID")?,
            sequence: row.get("sequence"),
            name: row.get("name"),
            date: parse_db_time(&date_str).context("Invalid date timestamp")?,
            value: row.get("value_cents"),
            created_at: parse_db_time(&created_at_str).context("Invalid created_at timestamp")?,
            updated_at: parse_db_time(&updated_at_str).context("Invalid updated_at timestamp")?,
        })
    }
}

/// Fixed-width RFC 3339 so that string order matches time order.
fn db_time(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_db_time(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

fn normalize_timestamps(expense: &mut Expense) {
    expense.date = expense.date.trunc_subsecs(6);
    expense.created_at = expense.created_at.trunc_subsecs(6);
    expense.updated_at = expense.updated_at.trunc_subsecs(6);
}

fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
