//! Synchronous observer registration.
//!
//! Observers are stored as `Rc<F>` so that [`Observers::snapshot`] can hand out
//! the current registrations while the registry itself stays free to change.
//! Handlers may therefore subscribe, unsubscribe, or trigger further
//! notifications while being notified.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct Observers<F: ?Sized> {
    entries: RefCell<Vec<(SubscriptionId, Rc<F>)>>,
    /// May be shared with other registries so ids stay unique across them
    next_id: Rc<Cell<u64>>,
}

impl<F: ?Sized> Default for Observers<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> Observers<F> {
    pub fn new() -> Self {
        Observers {
            entries: RefCell::new(Vec::new()),
            next_id: Rc::new(Cell::new(0)),
        }
    }

    /// An empty registry whose ids never collide with those of `other`.
    pub fn sharing_ids_with<G: ?Sized>(other: &Observers<G>) -> Self {
        Observers {
            entries: RefCell::new(Vec::new()),
            next_id: Rc::clone(&other.next_id),
        }
    }

    pub fn subscribe(&self, observer: Rc<F>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.entries.borrow_mut().push((id, observer));
        id
    }

    /// Returns true if the subscription existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        entries.len() != before
    }

    /// Current observers in subscription order.
    pub fn snapshot(&self) -> Vec<Rc<F>> {
        self.entries.borrow().iter().map(|(_, o)| Rc::clone(o)).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl<F: ?Sized> std::fmt::Debug for Observers<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers").field("len", &self.len()).finish()
    }
}
