use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Cents;

pub type ExpenseId = Uuid;

/// A single recorded outlay. Only committed expenses exist as this type;
/// in-progress input lives in [`super::ExpenseDraft`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    /// Insertion order, assigned by the repository. Breaks ties between equal dates.
    pub sequence: i64,
    pub name: String,
    /// When the money was spent
    pub date: DateTime<Utc>,
    /// Amount spent, in cents
    pub value: Cents,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    /// Create a new expense. Sequence number must be assigned by the repository.
    pub fn new(name: impl Into<String>, date: DateTime<Utc>, value: Cents) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            sequence: 0,
            name: name.into(),
            date,
            value,
            created_at: now,
            updated_at: now,
        }
    }

    /// Keep a known ID, e.g. one carried over from an export.
    pub fn with_id(mut self, id: ExpenseId) -> Self {
        self.id = id;
        self
    }

    /// Apply a partial update in place. Returns true if any field changed.
    pub fn apply(&mut self, update: &ExpenseUpdate) -> bool {
        let mut changed = false;
        if let Some(name) = &update.name {
            if *name != self.name {
                self.name = name.clone();
                changed = true;
            }
        }
        if let Some(date) = update.date {
            if date != self.date {
                self.date = date;
                changed = true;
            }
        }
        if let Some(value) = update.value {
            if value != self.value {
                self.value = value;
                changed = true;
            }
        }
        if changed {
            self.updated_at = Utc::now();
        }
        changed
    }
}

/// Fields to change on an existing expense. `None` leaves a field as is.
///
/// There is no way to clear `value`: a committed expense always has one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseUpdate {
    pub name: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub value: Option<Cents>,
}

impl ExpenseUpdate {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    pub fn value(mut self, value: Cents) -> Self {
        self.value = Some(value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.date.is_none() && self.value.is_none()
    }
}
