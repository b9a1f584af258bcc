use thiserror::Error;

use crate::domain::ExpenseId;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Expense not found: {0}")]
    ExpenseNotFound(ExpenseId),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
