use crate::domain::ExpenseId;

/// A committed change to the expense store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Inserted(ExpenseId),
    Updated(ExpenseId),
    /// Only the IDs that were actually removed.
    Deleted(Vec<ExpenseId>),
}

impl StoreEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreEvent::Inserted(_) => "inserted",
            StoreEvent::Updated(_) => "updated",
            StoreEvent::Deleted(_) => "deleted",
        }
    }
}

/// Listener notified after each committed mutation. Listeners re-query the
/// service for fresh data; the event only says what changed.
pub trait ExpenseObserver: Send + Sync {
    fn on_change(&self, event: &StoreEvent);
}

impl<F> ExpenseObserver for F
where
    F: Fn(&StoreEvent) + Send + Sync,
{
    fn on_change(&self, event: &StoreEvent) {
        self(event)
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Ordered set of listeners.
#[derive(Default)]
pub(crate) struct Observers {
    next_id: u64,
    entries: Vec<(SubscriptionId, Box<dyn ExpenseObserver>)>,
}

impl Observers {
    pub(crate) fn add(&mut self, observer: Box<dyn ExpenseObserver>) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.entries.push((id, observer));
        id
    }

    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Call every listener in subscription order.
    pub(crate) fn notify(&self, event: &StoreEvent) {
        for (_, observer) in &self.entries {
            observer.on_change(event);
        }
    }
}
