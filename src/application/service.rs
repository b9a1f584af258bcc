use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::domain::{
    Cents, Expense, ExpenseDraft, ExpenseId, ExpenseUpdate, checked_total, is_storable_date,
};
use crate::storage::Repository;

use super::{AppError, ExpenseObserver, Observers, StoreEvent, SubscriptionId};

/// Application service owning the expense store.
/// This is the primary interface for any client (CLI, tests, a future UI).
pub struct ExpenseService {
    repo: Repository,
    observers: Observers,
}

/// Filter for querying expenses. Results keep the newest-first order.
#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    pub min_value: Option<Cents>,
    pub max_value: Option<Cents>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub name_contains: Option<String>,
    pub limit: Option<usize>,
}

impl ExpenseService {
    /// Create a new expense service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            observers: Observers::default(),
        }
    }

    /// Create (if needed) and migrate the database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        info!("event=db_init module=service status=ok");
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        debug!("event=db_connect module=service status=ok");
        Ok(Self::new(repo))
    }

    // ========================
    // Change notification
    // ========================

    /// Register a listener called after every committed mutation.
    pub fn subscribe(&mut self, observer: impl ExpenseObserver + 'static) -> SubscriptionId {
        let id = self.observers.add(Box::new(observer));
        debug!(
            "event=subscribe module=service listeners={}",
            self.observers.len()
        );
        id
    }

    /// Remove a listener. Returns false if it was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.remove(id)
    }

    fn emit(&self, event: StoreEvent) {
        debug!(
            "event=store_change module=service kind={} listeners={}",
            event.as_str(),
            self.observers.len()
        );
        self.observers.notify(&event);
    }

    // ========================
    // Queries
    // ========================

    /// All expenses, newest date first. Empty when nothing is stored.
    pub async fn list(&self) -> Result<Vec<Expense>, AppError> {
        Ok(self.repo.list_expenses().await?)
    }

    /// Expenses matching `filter`, newest date first.
    pub async fn list_filtered(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>, AppError> {
        let expenses = self
            .repo
            .list_expenses_filtered(
                filter.min_value,
                filter.max_value,
                filter.from_date,
                filter.to_date,
                filter.name_contains.as_deref(),
                filter.limit,
            )
            .await?;
        Ok(expenses)
    }

    /// Sum of the values of the filtered listing.
    pub async fn total(&self, filter: &ExpenseFilter) -> Result<Cents, AppError> {
        let expenses = self.list_filtered(filter).await?;
        checked_total(expenses.iter().map(|e| e.value))
            .ok_or_else(|| AppError::InvalidAmount("total overflows".to_string()))
    }

    pub async fn get(&self, id: ExpenseId) -> Result<Expense, AppError> {
        self.repo
            .get_expense(id)
            .await?
            .ok_or(AppError::ExpenseNotFound(id))
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        Ok(self.repo.count_expenses().await?)
    }

    /// True when there is nothing to list (the empty state).
    pub async fn is_empty(&self) -> Result<bool, AppError> {
        Ok(self.count().await? == 0)
    }

    // ========================
    // Mutations
    // ========================

    /// Record a new expense.
    ///
    /// Without a value nothing is written and `Ok(None)` is returned; the
    /// caller keeps whatever input it had.
    pub async fn insert(
        &self,
        name: impl Into<String>,
        date: DateTime<Utc>,
        value: Option<Cents>,
    ) -> Result<Option<Expense>, AppError> {
        let Some(value) = value else {
            debug!("event=insert module=service status=rejected reason=missing_value");
            return Ok(None);
        };

        check_date(date)?;

        let mut expense = Expense::new(name, date, value);
        self.repo.save_expense(&mut expense).await?;
        info!(
            "event=insert module=service status=ok id={} sequence={}",
            expense.id, expense.sequence
        );

        self.emit(StoreEvent::Inserted(expense.id));
        Ok(Some(expense))
    }

    /// Change some fields of an existing expense, leaving the rest alone.
    pub async fn update(&self, id: ExpenseId, update: ExpenseUpdate) -> Result<Expense, AppError> {
        if let Some(date) = update.date {
            check_date(date)?;
        }
        let mut expense = self.get(id).await?;

        if !expense.apply(&update) {
            debug!("event=update module=service status=unchanged id={}", id);
            return Ok(expense);
        }

        if !self.repo.update_expense(&mut expense).await? {
            // Removed between the read and the write.
            return Err(AppError::ExpenseNotFound(id));
        }
        info!("event=update module=service status=ok id={}", id);

        self.emit(StoreEvent::Updated(id));
        Ok(expense)
    }

    /// Store already built expenses in one transaction, keeping their IDs.
    /// Nothing is written if any date is out of range or any write fails.
    pub async fn insert_batch(
        &self,
        mut expenses: Vec<Expense>,
    ) -> Result<Vec<Expense>, AppError> {
        for expense in &expenses {
            check_date(expense.date)?;
        }
        if expenses.is_empty() {
            return Ok(expenses);
        }

        self.repo.save_expenses(&mut expenses).await?;
        info!(
            "event=insert_batch module=service status=ok count={}",
            expenses.len()
        );

        for expense in &expenses {
            self.emit(StoreEvent::Inserted(expense.id));
        }
        Ok(expenses)
    }

    /// Delete every expense in `ids`. Unknown IDs are ignored.
    /// Returns how many expenses were removed.
    pub async fn delete(&self, ids: &[ExpenseId]) -> Result<usize, AppError> {
        let removed = self.repo.delete_expenses(ids).await?;
        info!(
            "event=delete module=service status=ok requested={} removed={}",
            ids.len(),
            removed.len()
        );

        let count = removed.len();
        if count > 0 {
            self.emit(StoreEvent::Deleted(removed));
        }
        Ok(count)
    }

    // ========================
    // Drafts
    // ========================

    /// Load an existing expense into a draft for editing.
    pub async fn edit(&self, id: ExpenseId) -> Result<ExpenseDraft, AppError> {
        Ok(ExpenseDraft::load(&self.get(id).await?))
    }

    /// Commit a draft: a fresh draft is inserted, a loaded one updates the
    /// expense it came from. A draft without a value is rejected with
    /// `Ok(None)` and nothing is written.
    pub async fn commit_draft(&self, draft: ExpenseDraft) -> Result<Option<Expense>, AppError> {
        if !draft.is_savable() {
            debug!("event=commit_draft module=service status=rejected reason=missing_value");
            return Ok(None);
        }

        match draft.origin() {
            None => self.insert(draft.name, draft.date, draft.value).await,
            Some(id) => {
                let current = self.get(id).await?;
                let changes = draft.changes(&current);
                self.update(id, changes).await.map(Some)
            }
        }
    }
}

fn check_date(date: DateTime<Utc>) -> Result<(), AppError> {
    if is_storable_date(date) {
        Ok(())
    } else {
        debug!("event=date_check module=service status=rejected reason=out_of_range");
        Err(AppError::InvalidDate(date.to_rfc3339()))
    }
}
