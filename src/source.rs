//! Item sources.
//!
//! A collection view reads its items from an [`ItemSource`]. Sources that can
//! report their own mutations (like [`ObservableList`]) let a bound view stay in
//! sync incrementally; static sources are only re-read on refresh.

use crate::change::SourceChange;
use crate::error::{Result, ViewError};
use crate::observer::{Observers, SubscriptionId};
use crate::value::ItemRef;
use std::cell::RefCell;
use std::rc::Rc;

pub type SourceObserver = dyn Fn(&SourceChange);

pub trait ItemSource {
    /// Current items in source order.
    fn snapshot(&self) -> Vec<ItemRef>;

    /// Registers for change notifications. Returns None if the source never changes.
    fn subscribe(&self, _observer: Rc<SourceObserver>) -> Option<SubscriptionId> {
        None
    }

    fn unsubscribe(&self, _id: SubscriptionId) {}
}

impl ItemSource for Vec<ItemRef> {
    fn snapshot(&self) -> Vec<ItemRef> {
        self.clone()
    }
}

/// A list that notifies observers after every mutation.
///
/// All methods take `&self`; the list releases its internal borrow before
/// notifying, so observers are free to read it (or mutate it again).
///
/// # Examples
///
/// ```
/// use livegroup::{ItemRef, ItemSource, ObservableList, SourceChange};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let list = ObservableList::new();
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let log = Rc::clone(&seen);
/// list.subscribe(Rc::new(move |change: &SourceChange| {
///     log.borrow_mut().push(change.name());
/// }));
///
/// list.push(ItemRef::value("a"));
/// list.clear();
/// assert_eq!(*seen.borrow(), vec!["add", "reset"]);
/// ```
#[derive(Debug, Default)]
pub struct ObservableList {
    items: RefCell<Vec<ItemRef>>,
    observers: Observers<SourceObserver>,
}

impl ObservableList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<ItemRef>) -> Self {
        ObservableList {
            items: RefCell::new(items),
            observers: Observers::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<ItemRef> {
        self.items.borrow().get(index).cloned()
    }

    pub fn items(&self) -> Vec<ItemRef> {
        self.items.borrow().clone()
    }

    pub fn index_of(&self, item: &ItemRef) -> Option<usize> {
        self.items.borrow().iter().position(|i| i == item)
    }

    pub fn push(&self, item: ItemRef) {
        let index = {
            let mut items = self.items.borrow_mut();
            items.push(item.clone());
            items.len() - 1
        };
        self.notify(&SourceChange::Add {
            item,
            index: Some(index),
        });
    }

    pub fn insert(&self, index: usize, item: ItemRef) -> Result<()> {
        {
            let mut items = self.items.borrow_mut();
            if index > items.len() {
                return Err(ViewError::IndexOutOfRange {
                    index,
                    len: items.len(),
                });
            }
            items.insert(index, item.clone());
        }
        self.notify(&SourceChange::Add {
            item,
            index: Some(index),
        });
        Ok(())
    }

    /// Appends every item, one Add notification per item.
    pub fn extend<I: IntoIterator<Item = ItemRef>>(&self, items: I) {
        for item in items {
            self.push(item);
        }
    }

    /// Removes the item by identity. Returns false if it wasn't in the list.
    pub fn remove(&self, item: &ItemRef) -> bool {
        match self.index_of(item) {
            Some(index) => self.remove_at(index).is_ok(),
            None => false,
        }
    }

    pub fn remove_at(&self, index: usize) -> Result<ItemRef> {
        let item = {
            let mut items = self.items.borrow_mut();
            if index >= items.len() {
                return Err(ViewError::IndexOutOfRange {
                    index,
                    len: items.len(),
                });
            }
            items.remove(index)
        };
        self.notify(&SourceChange::Remove {
            item: item.clone(),
            index: Some(index),
        });
        Ok(item)
    }

    /// Removes every item matching the predicate, one Remove notification per item.
    pub fn remove_all<P: Fn(&ItemRef) -> bool>(&self, predicate: P) -> usize {
        let doomed: Vec<ItemRef> = self
            .items
            .borrow()
            .iter()
            .filter(|i| predicate(i))
            .cloned()
            .collect();
        doomed.iter().filter(|item| self.remove(item)).count()
    }

    /// Replaces the item at `index`, returning the old one.
    pub fn set(&self, index: usize, item: ItemRef) -> Result<ItemRef> {
        let old = {
            let mut items = self.items.borrow_mut();
            let len = items.len();
            let slot = items
                .get_mut(index)
                .ok_or(ViewError::IndexOutOfRange { index, len })?;
            std::mem::replace(slot, item.clone())
        };
        self.notify(&SourceChange::Replace {
            old: old.clone(),
            new: item,
            index,
        });
        Ok(old)
    }

    pub fn move_item(&self, old_index: usize, new_index: usize) -> Result<()> {
        let item = {
            let mut items = self.items.borrow_mut();
            let len = items.len();
            if old_index >= len {
                return Err(ViewError::IndexOutOfRange {
                    index: old_index,
                    len,
                });
            }
            if new_index >= len {
                return Err(ViewError::IndexOutOfRange {
                    index: new_index,
                    len,
                });
            }
            let item = items.remove(old_index);
            items.insert(new_index, item.clone());
            item
        };
        self.notify(&SourceChange::Move {
            item,
            old_index,
            new_index,
        });
        Ok(())
    }

    pub fn clear(&self) {
        self.items.borrow_mut().clear();
        self.notify(&SourceChange::Reset);
    }

    /// Swaps the whole content and sends a single Reset.
    pub fn reset(&self, items: Vec<ItemRef>) {
        *self.items.borrow_mut() = items;
        self.notify(&SourceChange::Reset);
    }

    fn notify(&self, change: &SourceChange) {
        for observer in self.observers.snapshot() {
            observer(change);
        }
    }
}

impl ItemSource for ObservableList {
    fn snapshot(&self) -> Vec<ItemRef> {
        self.items()
    }

    fn subscribe(&self, observer: Rc<SourceObserver>) -> Option<SubscriptionId> {
        Some(self.observers.subscribe(observer))
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.observers.unsubscribe(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording(list: &ObservableList) -> Rc<RefCell<Vec<SourceChange>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        list.subscribe(Rc::new(move |c: &SourceChange| sink.borrow_mut().push(c.clone())));
        log
    }

    #[test]
    fn test_push_and_insert_report_indices() {
        let list = ObservableList::new();
        let log = recording(&list);
        let a = ItemRef::value("a");
        let b = ItemRef::value("b");

        list.push(a.clone());
        list.insert(0, b.clone()).unwrap();

        assert_eq!(list.items(), vec![b, a]);
        let log = log.borrow();
        assert!(matches!(log[0], SourceChange::Add { index: Some(0), .. }));
        assert!(matches!(log[1], SourceChange::Add { index: Some(0), .. }));
    }

    #[test]
    fn test_remove_by_identity() {
        let a = ItemRef::value("x");
        let b = ItemRef::value("x");
        let list = ObservableList::from_items(vec![a.clone(), b.clone()]);
        let log = recording(&list);

        assert!(list.remove(&b));
        assert!(!list.remove(&b));
        assert_eq!(list.items(), vec![a]);
        assert!(matches!(log.borrow()[0], SourceChange::Remove { index: Some(1), .. }));
    }

    #[test]
    fn test_out_of_range() {
        let list = ObservableList::new();
        assert!(matches!(
            list.insert(2, ItemRef::value("a")),
            Err(ViewError::IndexOutOfRange { index: 2, len: 0 })
        ));
        assert!(list.remove_at(0).is_err());
        assert!(list.set(0, ItemRef::value("a")).is_err());
    }

    #[test]
    fn test_set_and_move() {
        let a = ItemRef::value("a");
        let b = ItemRef::value("b");
        let c = ItemRef::value("c");
        let list = ObservableList::from_items(vec![a.clone(), b.clone()]);
        let log = recording(&list);

        let old = list.set(1, c.clone()).unwrap();
        assert_eq!(old, b);
        list.move_item(1, 0).unwrap();
        assert_eq!(list.items(), vec![c, a]);

        let log = log.borrow();
        assert!(matches!(log[0], SourceChange::Replace { index: 1, .. }));
        assert!(matches!(
            log[1],
            SourceChange::Move {
                old_index: 1,
                new_index: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_remove_all() {
        let list = ObservableList::from_items(vec![
            ItemRef::value(1),
            ItemRef::value(2),
            ItemRef::value(3),
        ]);
        let removed = list.remove_all(|i| i.self_value().as_i32().map_or(false, |v| v % 2 == 1));
        assert_eq!(removed, 2);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_observer_can_read_during_notification() {
        let list = Rc::new(ObservableList::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let reader = Rc::clone(&list);
        let sink = Rc::clone(&seen);
        list.subscribe(Rc::new(move |_c: &SourceChange| {
            sink.borrow_mut().push(reader.len());
        }));

        list.push(ItemRef::value("a"));
        list.push(ItemRef::value("b"));
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }
}
