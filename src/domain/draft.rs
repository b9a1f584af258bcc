use chrono::{DateTime, Utc};

use super::{Cents, Expense, ExpenseId, ExpenseUpdate};

/// Editable, uncommitted expense fields.
///
/// A draft is either fresh (`origin` is `None`) and becomes a new expense on
/// commit, or loaded from an existing expense and commits as an update to it.
/// Dropping a draft discards it. Nothing here touches the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseDraft {
    pub name: String,
    pub date: DateTime<Utc>,
    pub value: Option<Cents>,
    origin: Option<ExpenseId>,
}

impl Default for ExpenseDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpenseDraft {
    /// Blank draft dated now, with no value yet.
    pub fn new() -> Self {
        Self {
            name: String::new(),
            date: Utc::now(),
            value: None,
            origin: None,
        }
    }

    /// Copy an expense's fields into a draft for editing.
    pub fn load(expense: &Expense) -> Self {
        Self {
            name: expense.name.clone(),
            date: expense.date,
            value: Some(expense.value),
            origin: Some(expense.id),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    pub fn with_value(mut self, value: Cents) -> Self {
        self.value = Some(value);
        self
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_date(&mut self, date: DateTime<Utc>) {
        self.date = date;
    }

    pub fn set_value(&mut self, value: Cents) {
        self.value = Some(value);
    }

    pub fn clear_value(&mut self) {
        self.value = None;
    }

    /// The expense this draft was loaded from, if any.
    pub fn origin(&self) -> Option<ExpenseId> {
        self.origin
    }

    pub fn is_savable(&self) -> bool {
        self.value.is_some()
    }

    /// Fields that differ from `current`.
    pub fn changes(&self, current: &Expense) -> ExpenseUpdate {
        ExpenseUpdate {
            name: (self.name != current.name).then(|| self.name.clone()),
            date: (self.date != current.date).then_some(self.date),
            value: self.value.filter(|v| *v != current.value),
        }
    }
}
