//! Sort descriptions.
//!
//! A [`SortDescription`] orders items either by a property path or by an
//! explicit comparator, ascending or descending. Once attached to a view a
//! description is sealed: its direction can no longer change, since the view's
//! internal order was computed from it.
//!
//! # Examples
//!
//! ```
//! use livegroup::{SortDescription, SortDirection};
//!
//! let by_name = SortDescription::from_property("SecondName", SortDirection::Descending).unwrap();
//! assert_eq!(by_name.direction(), SortDirection::Descending);
//! assert!(!by_name.is_sealed());
//! ```

use crate::comparer::{Culture, CultureSensitiveComparer};
use crate::error::{Result, ViewError};
use crate::property::PropertyPath;
use crate::value::{ItemRef, ValueKind};
use std::cell::Cell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

pub type ItemComparator = Rc<dyn Fn(&ItemRef, &ItemRef) -> Ordering>;

pub enum SortRule {
    /// Compares the values at a property path. The value kind is taken from the
    /// first non-null value seen and decides whether string collation applies.
    Property {
        path: PropertyPath,
        culture: Culture,
        resolved_kind: Cell<Option<ValueKind>>,
    },
    Comparer(ItemComparator),
}

pub struct SortDescription {
    direction: Cell<SortDirection>,
    sealed: Cell<bool>,
    rule: SortRule,
}

impl SortDescription {
    pub fn from_property(path: &str, direction: SortDirection) -> Result<Rc<Self>> {
        Self::from_property_with_culture(path, direction, Culture::default())
    }

    pub fn from_property_with_culture(
        path: &str,
        direction: SortDirection,
        culture: Culture,
    ) -> Result<Rc<Self>> {
        Ok(Rc::new(SortDescription {
            direction: Cell::new(direction),
            sealed: Cell::new(false),
            rule: SortRule::Property {
                path: PropertyPath::parse(path)?,
                culture,
                resolved_kind: Cell::new(None),
            },
        }))
    }

    pub fn from_comparer<F>(comparer: F, direction: SortDirection) -> Rc<Self>
    where
        F: Fn(&ItemRef, &ItemRef) -> Ordering + 'static,
    {
        Rc::new(SortDescription {
            direction: Cell::new(direction),
            sealed: Cell::new(false),
            rule: SortRule::Comparer(Rc::new(comparer)),
        })
    }

    pub fn direction(&self) -> SortDirection {
        self.direction.get()
    }

    pub fn set_direction(&self, direction: SortDirection) -> Result<()> {
        if self.sealed.get() {
            return Err(ViewError::Sealed);
        }
        self.direction.set(direction);
        Ok(())
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.get()
    }

    pub(crate) fn seal(&self) {
        self.sealed.set(true);
    }

    pub fn rule(&self) -> &SortRule {
        &self.rule
    }

    /// The property path, for property-based descriptions.
    pub fn property_path(&self) -> Option<&str> {
        match &self.rule {
            SortRule::Property { path, .. } => Some(path.as_str()),
            SortRule::Comparer(_) => None,
        }
    }

    /// The value kind cached from the first non-null property value compared.
    pub fn resolved_kind(&self) -> Option<ValueKind> {
        match &self.rule {
            SortRule::Property { resolved_kind, .. } => resolved_kind.get(),
            SortRule::Comparer(_) => None,
        }
    }

    pub fn compare(&self, x: &ItemRef, y: &ItemRef) -> Result<Ordering> {
        let ordering = match &self.rule {
            SortRule::Property {
                path,
                culture,
                resolved_kind,
            } => {
                let a = path.resolve(x)?;
                let b = path.resolve(y)?;
                if resolved_kind.get().is_none() {
                    resolved_kind.set(a.kind().or_else(|| b.kind()));
                }
                match resolved_kind.get() {
                    Some(ValueKind::String) => CultureSensitiveComparer::new(*culture).compare(&a, &b),
                    _ => a.natural_cmp(&b),
                }
            }
            SortRule::Comparer(comparer) => comparer(x, y),
        };
        Ok(self.direction.get().apply(ordering))
    }
}

impl fmt::Debug for SortDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = match &self.rule {
            SortRule::Property { path, .. } => format!("property '{}'", path.as_str()),
            SortRule::Comparer(_) => "comparer".to_string(),
        };
        f.debug_struct("SortDescription")
            .field("rule", &rule)
            .field("direction", &self.direction.get())
            .field("sealed", &self.sealed.get())
            .finish()
    }
}

/// Sorts items by the given descriptions, stopping at the first resolution error.
pub(crate) fn sort_items(items: &mut [ItemRef], descriptions: &[Rc<SortDescription>]) -> Result<()> {
    let mut failure: Option<ViewError> = None;
    items.sort_by(|a, b| {
        if failure.is_some() {
            return Ordering::Equal;
        }
        for description in descriptions {
            match description.compare(a, b) {
                Ok(Ordering::Equal) => continue,
                Ok(ordering) => return ordering,
                Err(e) => {
                    failure = Some(e);
                    return Ordering::Equal;
                }
            }
        }
        Ordering::Equal
    });
    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
