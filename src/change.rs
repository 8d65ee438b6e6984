//! Change notifications flowing into and out of a collection view.
//!
//! A source reports mutations as [`SourceChange`] events in source coordinates.
//! The view translates each one into zero or more [`ViewChange`] events in view
//! (leaf) coordinates, followed by [`ViewProperty`] notifications for derived
//! properties that changed as a result.
//!
//! # Change Types
//!
//! - `Add`: an item appeared at an index
//! - `Remove`: an item disappeared from an index
//! - `Replace`: an item was swapped for another in place
//! - `Move`: an item changed position
//! - `Reset`: anything may have changed, consumers must rebuild

use crate::value::ItemRef;

/// A mutation reported by an observable source.
#[derive(Debug, Clone)]
pub enum SourceChange {
    /// `index` is None when the source doesn't know (or doesn't report) the position.
    Add { item: ItemRef, index: Option<usize> },
    Remove { item: ItemRef, index: Option<usize> },
    Replace {
        old: ItemRef,
        new: ItemRef,
        index: usize,
    },
    Move {
        item: ItemRef,
        old_index: usize,
        new_index: usize,
    },
    Reset,
}

impl SourceChange {
    pub fn name(&self) -> &'static str {
        match self {
            SourceChange::Add { .. } => "add",
            SourceChange::Remove { .. } => "remove",
            SourceChange::Replace { .. } => "replace",
            SourceChange::Move { .. } => "move",
            SourceChange::Reset => "reset",
        }
    }
}

/// A structural change to the view, in view coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewChange {
    Add { item: ItemRef, index: usize },
    Remove { item: ItemRef, index: usize },
    Replace {
        old: ItemRef,
        new: ItemRef,
        index: usize,
    },
    Move {
        item: ItemRef,
        old_index: usize,
        new_index: usize,
    },
    Reset,
}

impl ViewChange {
    /// The view index this change is anchored at (the destination for moves).
    pub fn index(&self) -> Option<usize> {
        match self {
            ViewChange::Add { index, .. } => Some(*index),
            ViewChange::Remove { index, .. } => Some(*index),
            ViewChange::Replace { index, .. } => Some(*index),
            ViewChange::Move { new_index, .. } => Some(*new_index),
            ViewChange::Reset => None,
        }
    }

    /// True if the change alters the number of items in the view.
    pub fn changes_count(&self) -> bool {
        !matches!(self, ViewChange::Replace { .. })
    }
}

/// Derived view properties that announce their own changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewProperty {
    Count,
    IsGrouping,
}

impl ViewProperty {
    pub fn name(&self) -> &'static str {
        match self {
            ViewProperty::Count => "Count",
            ViewProperty::IsGrouping => "IsGrouping",
        }
    }
}

/// Helper to renumber index-keyed bookkeeping after an insert or a delete.
///
/// When `count` slots are inserted at `at`, every index >= `at` moves up by
/// `count`. When `count` slots are removed at `at`, indices inside the range
/// disappear and indices after it move down by `count`.
pub struct IndexAdjuster;

impl IndexAdjuster {
    pub fn adjust_for_insert(index: usize, at: usize, count: usize) -> usize {
        if index >= at {
            index + count
        } else {
            index
        }
    }

    /// Returns None if the index was inside the removed range.
    pub fn adjust_for_delete(index: usize, at: usize, count: usize) -> Option<usize> {
        if index < at {
            Some(index)
        } else if index < at + count {
            None
        } else {
            Some(index - count)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_change_index() {
        let item = ItemRef::value("a");
        assert_eq!(
            ViewChange::Add {
                item: item.clone(),
                index: 3
            }
            .index(),
            Some(3)
        );
        assert_eq!(
            ViewChange::Move {
                item,
                old_index: 1,
                new_index: 4
            }
            .index(),
            Some(4)
        );
        assert_eq!(ViewChange::Reset.index(), None);
    }

    #[test]
    fn test_replace_does_not_change_count() {
        let a = ItemRef::value("a");
        let b = ItemRef::value("b");
        assert!(!ViewChange::Replace {
            old: a.clone(),
            new: b,
            index: 0
        }
        .changes_count());
        assert!(ViewChange::Remove { item: a, index: 0 }.changes_count());
        assert!(ViewChange::Reset.changes_count());
    }

    #[test]
    fn test_index_adjuster_insert() {
        assert_eq!(IndexAdjuster::adjust_for_insert(5, 3, 1), 6);
        assert_eq!(IndexAdjuster::adjust_for_insert(3, 3, 2), 5);
        assert_eq!(IndexAdjuster::adjust_for_insert(2, 3, 1), 2);
    }

    #[test]
    fn test_index_adjuster_delete() {
        assert_eq!(IndexAdjuster::adjust_for_delete(5, 3, 1), Some(4));
        assert_eq!(IndexAdjuster::adjust_for_delete(3, 3, 1), None);
        assert_eq!(IndexAdjuster::adjust_for_delete(4, 3, 2), None);
        assert_eq!(IndexAdjuster::adjust_for_delete(2, 3, 2), Some(2));
        assert_eq!(IndexAdjuster::adjust_for_delete(7, 3, 2), Some(5));
    }
}
