//! Comparers used to order items and to position new items in a view.
//!
//! - [`CultureSensitiveComparer`]: null-first value comparer with string collation
//! - [`MergedComparer`]: lexicographic composition of sort descriptions
//! - [`ListComparer`]: orders items by their position in a reference list

use crate::error::Result;
use crate::sort::SortDescription;
use crate::storage::ItemStore;
use crate::value::{ItemRef, Value};
use std::cell::Cell;
use std::cmp::Ordering;
use std::rc::Rc;

/// Orders two items; used by the group tree to position new subgroups.
pub trait ItemComparer {
    fn compare(&self, x: &ItemRef, y: &ItemRef) -> Result<Ordering>;

    /// Called before a new insertion scan. Stateful comparers rewind here.
    fn reset(&self) {}
}

/// String collation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Culture {
    /// Case-insensitive order, with lowercase before uppercase on ties.
    #[default]
    Invariant,
    IgnoreCase,
    /// Code point order.
    Ordinal,
}

impl Culture {
    pub fn compare_str(self, a: &str, b: &str) -> Ordering {
        match self {
            Culture::Ordinal => a.cmp(b),
            Culture::IgnoreCase => fold(a).cmp(&fold(b)),
            Culture::Invariant => fold(a)
                .cmp(&fold(b))
                .then_with(|| case_rank(a).cmp(case_rank(b)))
                .then_with(|| a.cmp(b)),
        }
    }
}

fn fold(s: &str) -> String {
    s.to_lowercase()
}

fn case_rank(s: &str) -> impl Iterator<Item = u8> + '_ {
    s.chars().map(|c| if c.is_uppercase() { 1 } else { 0 })
}

/// Null-first comparer that collates strings by culture and orders every
/// other value naturally.
#[derive(Debug, Clone, Copy, Default)]
pub struct CultureSensitiveComparer {
    culture: Culture,
}

impl CultureSensitiveComparer {
    pub fn new(culture: Culture) -> Self {
        CultureSensitiveComparer { culture }
    }

    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        match (a, b) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::String(x), Value::String(y)) => self.culture.compare_str(x, y),
            _ => a.natural_cmp(b),
        }
    }
}

/// Combines several sort descriptions into one total order: description 0
/// decides first, ties fall through to description 1, and so on.
#[derive(Debug, Clone, Default)]
pub struct MergedComparer {
    descriptions: Vec<Rc<SortDescription>>,
}

impl MergedComparer {
    pub fn new(descriptions: Vec<Rc<SortDescription>>) -> Self {
        MergedComparer { descriptions }
    }

    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty()
    }

    pub fn compare(&self, x: &ItemRef, y: &ItemRef) -> Result<Ordering> {
        for description in &self.descriptions {
            let ordering = description.compare(x, y)?;
            if ordering != Ordering::Equal {
                return Ok(ordering);
            }
        }
        Ok(Ordering::Equal)
    }

    /// Binary search for the position of `item` in a list sorted by this
    /// comparer. Items comparing equal to existing ones go after them.
    pub fn find_insert_index(&self, item: &ItemRef, list: &dyn ItemStore) -> Result<usize> {
        let mut low = 0;
        let mut high = list.len();
        while low < high {
            let mid = low + (high - low) / 2;
            let probe = match list.get(mid) {
                Some(probe) => probe,
                None => break,
            };
            if self.compare(item, probe)? == Ordering::Less {
                high = mid;
            } else {
                low = mid + 1;
            }
        }
        Ok(low)
    }
}

impl ItemComparer for MergedComparer {
    fn compare(&self, x: &ItemRef, y: &ItemRef) -> Result<Ordering> {
        MergedComparer::compare(self, x, y)
    }
}

/// Orders items by their position in a reference list.
///
/// The comparer keeps a forward-only cursor, so it is only valid for a scan
/// that holds the first argument fixed and passes second arguments in
/// increasing list order. An item not found ahead of the cursor sorts after
/// everything.
#[derive(Debug)]
pub struct ListComparer<'a> {
    list: &'a dyn ItemStore,
    cursor: Cell<usize>,
}

impl<'a> ListComparer<'a> {
    pub fn new(list: &'a dyn ItemStore) -> Self {
        ListComparer {
            list,
            cursor: Cell::new(0),
        }
    }

    fn compare_positions(&self, x: &ItemRef, y: &ItemRef) -> Ordering {
        if x == y {
            return Ordering::Equal;
        }
        let mut index = self.cursor.get();
        while let Some(probe) = self.list.get(index) {
            if probe == x {
                self.cursor.set(index);
                return Ordering::Less;
            }
            if probe == y {
                self.cursor.set(index);
                return Ordering::Greater;
            }
            index += 1;
        }
        self.cursor.set(index);
        Ordering::Greater
    }
}

impl ItemComparer for ListComparer<'_> {
    fn compare(&self, x: &ItemRef, y: &ItemRef) -> Result<Ordering> {
        Ok(self.compare_positions(x, y))
    }

    fn reset(&self) {
        self.cursor.set(0);
    }
}
