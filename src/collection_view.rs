//! Collection View - Sorted, Grouped Live View over an Item Source
//!
//! A [`CollectionView`] mirrors a source collection into its own internal list,
//! keeps that list ordered by its sort descriptions, divides it into groups by
//! its group descriptions, and re-announces every source change as view
//! changes in view (leaf) coordinates.
//!
//! # Incremental Updates
//!
//! Single adds, removes, replaces and moves are patched into the internal list
//! and the group tree. A source reset, any description change, or an explicit
//! [`CollectionView::refresh`] rebuilds everything and emits a single
//! [`ViewChange::Reset`].
//!
//! # Examples
//!
//! ```
//! use livegroup::{CollectionView, GroupDescription, ItemRef, ObservableList, ViewOptions};
//! use std::rc::Rc;
//!
//! let source = Rc::new(ObservableList::new());
//! for name in ["pear", "plum", "apple"] {
//!     source.push(ItemRef::value(name));
//! }
//!
//! let view = CollectionView::bind(&source, ViewOptions::default()).unwrap();
//! view.borrow_mut()
//!     .add_group_description(GroupDescription::by_selector(|item, _level| {
//!         let first = item.self_value().to_string().chars().next().unwrap_or(' ');
//!         Ok(livegroup::GroupKey::Single(first.to_string().into()))
//!     }))
//!     .unwrap();
//!
//! source.push(ItemRef::value("peach"));
//!
//! let view = view.borrow();
//! assert_eq!(view.len(), 4);
//! assert_eq!(view.tree().snapshot().group_keys(), vec!["p", "a"]);
//! ```

use crate::change::{SourceChange, ViewChange, ViewProperty};
use crate::comparer::{ListComparer, MergedComparer};
use crate::error::{Result, ViewError};
use crate::group::GroupDescription;
use crate::group_tree::{GroupBySelector, GroupId, GroupRef, GroupTree};
use crate::observer::{Observers, SubscriptionId};
use crate::sort::{sort_items, SortDescription};
use crate::source::{ItemSource, SourceObserver};
use crate::storage::{ItemStore, ViewOptions};
use crate::value::{ItemRef, Value};
use log::{debug, trace, warn};
use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::fmt;
use std::rc::{Rc, Weak};

pub type ViewObserver = dyn Fn(&CollectionView, &ViewChange);
pub type PropertyObserver = dyn Fn(&CollectionView, &ViewProperty);

pub struct CollectionView {
    source: Weak<dyn ItemSource>,
    options: ViewOptions,
    /// Internal list: source order, or sort order when sorting
    list: Box<dyn ItemStore>,
    tree: GroupTree,
    sort_descriptions: Vec<Rc<SortDescription>>,
    is_grouping: bool,
    observers: Observers<ViewObserver>,
    property_observers: Observers<PropertyObserver>,
    subscription: Option<SubscriptionId>,
    /// Set when a source change arrived while this view was busy
    pending_refresh: Rc<Cell<bool>>,
}

impl CollectionView {
    /// Create an unbound view over `source` with default options.
    ///
    /// The view holds only a weak reference to the source and does not follow
    /// its changes; use [`CollectionView::bind`] for a live view, or feed
    /// changes through [`CollectionView::handle_source_change`].
    pub fn new<S: ItemSource + 'static>(source: &Rc<S>) -> Result<Self> {
        Self::with_options(source, ViewOptions::default())
    }

    pub fn with_options<S: ItemSource + 'static>(source: &Rc<S>, options: ViewOptions) -> Result<Self> {
        let source: Rc<dyn ItemSource> = source.clone();
        Self::from_weak(Rc::downgrade(&source), options)
    }

    /// Fails with [`ViewError::MissingSource`] if the source is already gone.
    pub fn from_weak(source: Weak<dyn ItemSource>, options: ViewOptions) -> Result<Self> {
        let items = source.upgrade().ok_or(ViewError::MissingSource)?.snapshot();

        let mut list = options.storage.create_store();
        list.replace_all(items);

        let mut tree = GroupTree::new();
        tree.initialize();

        let observers = Observers::new();
        let property_observers = Observers::sharing_ids_with(&observers);

        Ok(CollectionView {
            source,
            options,
            list,
            tree,
            sort_descriptions: Vec::new(),
            is_grouping: false,
            observers,
            property_observers,
            subscription: None,
            pending_refresh: Rc::new(Cell::new(false)),
        })
    }

    /// Create a view that follows `source` for as long as the view lives.
    ///
    /// Changes arriving while the view is already handling one (for instance
    /// from a view observer that mutates the source) are not merged: the view
    /// refreshes once the outer change has been handled.
    pub fn bind<S: ItemSource + 'static>(source: &Rc<S>, options: ViewOptions) -> Result<Rc<RefCell<Self>>> {
        let view = Rc::new(RefCell::new(Self::with_options(source, options)?));

        let weak = Rc::downgrade(&view);
        let pending = Rc::clone(&view.borrow().pending_refresh);
        let observer: Rc<SourceObserver> =
            Rc::new(move |change: &SourceChange| Self::dispatch(&weak, &pending, change));

        let subscription = source.subscribe(observer);
        view.borrow_mut().subscription = subscription;
        Ok(view)
    }

    fn dispatch(view: &Weak<RefCell<CollectionView>>, pending: &Cell<bool>, change: &SourceChange) {
        let view = match view.upgrade() {
            Some(view) => view,
            None => return,
        };
        let mut this = match view.try_borrow_mut() {
            Ok(this) => this,
            Err(_) => {
                debug!("source {} arrived while the view was busy, deferring a refresh", change.name());
                pending.set(true);
                return;
            }
        };

        if let Err(e) = this.handle_source_change(change) {
            warn!("failed to apply source {}: {}", change.name(), e);
        }
        while pending.replace(false) {
            debug!("running deferred refresh");
            if let Err(e) = this.refresh() {
                warn!("deferred refresh failed: {}", e);
            }
        }
    }

    // ---- read access ----

    /// Returns the number of items in the view
    pub fn len(&self) -> usize {
        if self.is_grouping {
            self.tree.root().item_count()
        } else {
            self.list.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Item at a view index (leaf order when grouping)
    pub fn get(&self, index: usize) -> Option<&ItemRef> {
        if self.is_grouping {
            self.tree.leaf_at(index)
        } else {
            self.list.get(index)
        }
    }

    pub fn index_of(&self, item: &ItemRef) -> Option<usize> {
        if self.is_grouping {
            self.tree.leaf_index_of(item)
        } else {
            self.list.index_of(item)
        }
    }

    pub fn contains(&self, item: &ItemRef) -> bool {
        self.index_of(item).is_some()
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = &ItemRef> + '_> {
        if self.is_grouping {
            Box::new(self.tree.leaves(self.tree.root_id()))
        } else {
            self.list.iter()
        }
    }

    /// The internal list in view order, ignoring grouping.
    pub fn internal_list(&self) -> &dyn ItemStore {
        &*self.list
    }

    pub fn is_grouping(&self) -> bool {
        self.is_grouping
    }

    /// Root group, when grouping.
    pub fn groups(&self) -> Option<GroupRef<'_>> {
        if self.is_grouping {
            Some(self.tree.root())
        } else {
            None
        }
    }

    pub fn tree(&self) -> &GroupTree {
        &self.tree
    }

    pub fn source(&self) -> Option<Rc<dyn ItemSource>> {
        self.source.upgrade()
    }

    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    // ---- read-only list surface ----

    pub fn add(&mut self, _item: ItemRef) -> Result<()> {
        Err(ViewError::ReadOnly { operation: "add" })
    }

    pub fn insert(&mut self, _index: usize, _item: ItemRef) -> Result<()> {
        Err(ViewError::ReadOnly { operation: "insert" })
    }

    pub fn remove(&mut self, _item: &ItemRef) -> Result<bool> {
        Err(ViewError::ReadOnly { operation: "remove" })
    }

    pub fn remove_at(&mut self, _index: usize) -> Result<ItemRef> {
        Err(ViewError::ReadOnly {
            operation: "remove_at",
        })
    }

    pub fn clear(&mut self) -> Result<()> {
        Err(ViewError::ReadOnly { operation: "clear" })
    }

    pub fn set(&mut self, _index: usize, _item: ItemRef) -> Result<ItemRef> {
        Err(ViewError::ReadOnly { operation: "set" })
    }

    // ---- descriptions ----

    pub fn sort_descriptions(&self) -> &[Rc<SortDescription>] {
        &self.sort_descriptions
    }

    pub fn add_sort_description(&mut self, description: Rc<SortDescription>) -> Result<()> {
        let index = self.sort_descriptions.len();
        self.insert_sort_description(index, description)
    }

    pub fn insert_sort_description(&mut self, index: usize, description: Rc<SortDescription>) -> Result<()> {
        if index > self.sort_descriptions.len() {
            return Err(ViewError::IndexOutOfRange {
                index,
                len: self.sort_descriptions.len(),
            });
        }
        description.seal();
        self.sort_descriptions.insert(index, description);
        self.refresh()
    }

    pub fn remove_sort_description(&mut self, index: usize) -> Result<Rc<SortDescription>> {
        if index >= self.sort_descriptions.len() {
            return Err(ViewError::IndexOutOfRange {
                index,
                len: self.sort_descriptions.len(),
            });
        }
        let removed = self.sort_descriptions.remove(index);
        self.refresh()?;
        Ok(removed)
    }

    pub fn clear_sort_descriptions(&mut self) -> Result<()> {
        self.sort_descriptions.clear();
        self.refresh()
    }

    pub fn group_descriptions(&self) -> &[Rc<GroupDescription>] {
        self.tree.descriptions()
    }

    pub fn add_group_description(&mut self, description: impl Into<Rc<GroupDescription>>) -> Result<()> {
        let index = self.tree.descriptions().len();
        self.insert_group_description(index, description)
    }

    pub fn insert_group_description(
        &mut self,
        index: usize,
        description: impl Into<Rc<GroupDescription>>,
    ) -> Result<()> {
        let len = self.tree.descriptions().len();
        if index > len {
            return Err(ViewError::IndexOutOfRange { index, len });
        }
        self.tree.descriptions_mut().insert(index, description.into());
        self.refresh()
    }

    pub fn remove_group_description(&mut self, index: usize) -> Result<Rc<GroupDescription>> {
        let len = self.tree.descriptions().len();
        if index >= len {
            return Err(ViewError::IndexOutOfRange { index, len });
        }
        let removed = self.tree.descriptions_mut().remove(index);
        self.refresh()?;
        Ok(removed)
    }

    pub fn clear_group_descriptions(&mut self) -> Result<()> {
        self.tree.descriptions_mut().clear();
        self.refresh()
    }

    /// Installs a selector consulted before the group description list.
    /// It receives a group's key (None for the root) and the group's level.
    pub fn set_group_by_selector<F>(&mut self, selector: F) -> Result<()>
    where
        F: Fn(Option<&Value>, usize) -> Option<Rc<GroupDescription>> + 'static,
    {
        let selector: GroupBySelector = Rc::new(selector);
        self.tree.set_selector(Some(selector));
        self.refresh()
    }

    pub fn clear_group_by_selector(&mut self) -> Result<()> {
        self.tree.set_selector(None);
        self.refresh()
    }

    // ---- observation ----

    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&CollectionView, &ViewChange) + 'static,
    {
        self.observers.subscribe(Rc::new(observer))
    }

    pub fn subscribe_property<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&CollectionView, &ViewProperty) + 'static,
    {
        self.property_observers.subscribe(Rc::new(observer))
    }

    /// Removes a change or property subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id) || self.property_observers.unsubscribe(id)
    }

    fn notify(&self, change: ViewChange) {
        for observer in self.observers.snapshot() {
            observer(self, &change);
        }
    }

    fn notify_property(&self, property: ViewProperty) {
        for observer in self.property_observers.snapshot() {
            observer(self, &property);
        }
    }

    // ---- refresh ----

    /// Rebuild the internal list and the group tree from the source.
    ///
    /// Emits a single Reset followed by Count, plus IsGrouping if grouping
    /// was switched on or off.
    pub fn refresh(&mut self) -> Result<()> {
        let source = self.source.upgrade().ok_or(ViewError::MissingSource)?;
        let mut items = source.snapshot();

        for description in &self.sort_descriptions {
            description.seal();
        }
        if !self.sort_descriptions.is_empty() {
            sort_items(&mut items, &self.sort_descriptions)?;
        }

        self.list.replace_all(items);
        self.tree.initialize();
        let was_grouping = self.is_grouping;
        self.is_grouping = self.tree.is_grouping();

        let mut outcome = Ok(());
        if self.is_grouping {
            for item in self.list.iter() {
                if let Err(e) = self.tree.add_to_subgroups(item, true, None) {
                    outcome = Err(e);
                    break;
                }
            }
            if outcome.is_err() {
                // keep list and tree consistent
                self.list.replace_all(Vec::new());
                self.tree.initialize();
            }
        }

        debug!(
            "refreshed view: {} items, {} sort descriptions, grouping {}",
            self.len(),
            self.sort_descriptions.len(),
            self.is_grouping
        );

        self.notify(ViewChange::Reset);
        self.notify_property(ViewProperty::Count);
        if was_grouping != self.is_grouping {
            self.notify_property(ViewProperty::IsGrouping);
        }
        outcome
    }

    // ---- incremental updates ----

    /// Apply a change reported by the source.
    pub fn handle_source_change(&mut self, change: &SourceChange) -> Result<()> {
        match change {
            SourceChange::Add { item, index } => self.process_add(item, *index),
            SourceChange::Remove { item, index } => self.process_remove(item, *index),
            SourceChange::Replace { old, new, index } => self.process_replace(old, new, *index),
            SourceChange::Move {
                item,
                old_index,
                new_index,
            } => self.process_move(item, *old_index, *new_index),
            SourceChange::Reset => self.refresh(),
        }
    }

    fn process_add(&mut self, item: &ItemRef, index: Option<usize>) -> Result<()> {
        let position = self.insert_position(item, index)?;
        let placements = self.place(item, position)?;

        trace!("added item at {:?}", placements);
        for index in placements {
            self.notify(ViewChange::Add {
                item: item.clone(),
                index,
            });
        }
        self.notify_property(ViewProperty::Count);
        Ok(())
    }

    fn process_remove(&mut self, item: &ItemRef, index: Option<usize>) -> Result<()> {
        let position = match self.locate(item, index) {
            Some(position) => position,
            None => {
                warn!("removed item {:?} is not in the view", item);
                return Ok(());
            }
        };

        match self.unplace(item, position) {
            Ok(removed) => {
                trace!("removed item from {:?}", removed);
                for index in removed {
                    self.notify(ViewChange::Remove {
                        item: item.clone(),
                        index,
                    });
                }
            }
            Err(e) => {
                // the item is gone from the view, but its placements couldn't
                // be reported one by one
                warn!("could not resolve groups of removed item: {}", e);
                self.notify(ViewChange::Reset);
            }
        }
        self.notify_property(ViewProperty::Count);
        Ok(())
    }

    fn process_replace(&mut self, old: &ItemRef, new: &ItemRef, index: usize) -> Result<()> {
        let position = match self.locate(old, Some(index)) {
            Some(position) => position,
            None => {
                warn!("replaced item {:?} is not in the view, adding the new one", old);
                return self.process_add(new, Some(index));
            }
        };

        let old_group = self.group_of(old);

        let removed = match self.unplace(old, position) {
            Ok(removed) => removed,
            Err(e) => {
                warn!("could not resolve groups of replaced item: {}", e);
                let placed = self
                    .insert_position(new, Some(position))
                    .and_then(|target| self.place(new, target));
                self.notify(ViewChange::Reset);
                self.notify_property(ViewProperty::Count);
                return placed.map(|_| ());
            }
        };

        let placed = self
            .insert_position(new, Some(position))
            .and_then(|target| self.place(new, target));
        let placed = match placed {
            Ok(placed) => placed,
            Err(e) => {
                for index in removed {
                    self.notify(ViewChange::Remove {
                        item: old.clone(),
                        index,
                    });
                }
                self.notify_property(ViewProperty::Count);
                return Err(e);
            }
        };

        let same_group = match placed.first() {
            Some(&index) => self.still_in_group(old_group, index),
            None => !self.is_grouping,
        };

        if removed.len() == 1 && placed.len() == 1 && removed[0] == placed[0] && same_group {
            self.notify(ViewChange::Replace {
                old: old.clone(),
                new: new.clone(),
                index: placed[0],
            });
        } else {
            for index in removed {
                self.notify(ViewChange::Remove {
                    item: old.clone(),
                    index,
                });
            }
            for index in placed {
                self.notify(ViewChange::Add {
                    item: new.clone(),
                    index,
                });
            }
        }
        Ok(())
    }

    fn process_move(&mut self, item: &ItemRef, old_index: usize, new_index: usize) -> Result<()> {
        if !self.sort_descriptions.is_empty() {
            trace!("ignoring move in a sorted view");
            return Ok(());
        }

        let position = match self.locate(item, Some(old_index)) {
            Some(position) => position,
            None => {
                warn!("moved item {:?} is not in the view", item);
                return Ok(());
            }
        };

        let old_group = self.group_of(item);
        let unplaced = self.unplace(item, position);
        let target = new_index.min(self.list.len());

        let removed = match unplaced {
            Ok(removed) => removed,
            Err(e) => {
                warn!("could not resolve groups of moved item: {}", e);
                let placed = self.place(item, target);
                self.notify(ViewChange::Reset);
                self.notify_property(ViewProperty::Count);
                return placed.map(|_| ());
            }
        };

        let placed = match self.place(item, target) {
            Ok(placed) => placed,
            Err(e) => {
                warn!("could not place moved item: {}", e);
                for index in removed {
                    self.notify(ViewChange::Remove {
                        item: item.clone(),
                        index,
                    });
                }
                self.notify_property(ViewProperty::Count);
                return Err(e);
            }
        };

        match (removed.as_slice(), placed.as_slice()) {
            ([from], [to]) if from == to && self.still_in_group(old_group, *to) => return Ok(()),
            ([from], [to]) if from != to => self.notify(ViewChange::Move {
                item: item.clone(),
                old_index: *from,
                new_index: *to,
            }),
            _ => {
                for &index in &removed {
                    self.notify(ViewChange::Remove {
                        item: item.clone(),
                        index,
                    });
                }
                for &index in &placed {
                    self.notify(ViewChange::Add {
                        item: item.clone(),
                        index,
                    });
                }
            }
        }
        self.notify_property(ViewProperty::Count);
        Ok(())
    }

    /// Group holding the first placement of `item`, when grouping.
    fn group_of(&self, item: &ItemRef) -> Option<GroupId> {
        if self.is_grouping {
            self.tree.find_group_containing(item).map(|(group, _)| group)
        } else {
            None
        }
    }

    /// Whether the leaf at `index` still sits in `old_group`. A group that was
    /// emptied and then rebuilt for the same key has a new id and fails this.
    fn still_in_group(&self, old_group: Option<GroupId>, index: usize) -> bool {
        if !self.is_grouping {
            return true;
        }
        match old_group {
            Some(old_group) => {
                self.tree.contains(old_group)
                    && self.tree.locate_leaf(index).map(|(group, _)| group) == Some(old_group)
            }
            None => false,
        }
    }

    /// Internal list position for a new item.
    fn insert_position(&self, item: &ItemRef, hint: Option<usize>) -> Result<usize> {
        let len = self.list.len();
        if self.sort_descriptions.is_empty() {
            return Ok(hint.filter(|&i| i <= len).unwrap_or(len));
        }

        let comparer = MergedComparer::new(self.sort_descriptions.clone());
        if let Some(hint) = hint.filter(|&i| i <= len) {
            let after_previous = match hint.checked_sub(1).and_then(|i| self.list.get(i)) {
                Some(previous) => comparer.compare(previous, item)? != Ordering::Greater,
                None => true,
            };
            let before_next = match self.list.get(hint) {
                Some(next) => comparer.compare(item, next)? != Ordering::Greater,
                None => true,
            };
            if after_previous && before_next {
                return Ok(hint);
            }
        }
        comparer.find_insert_index(item, &*self.list)
    }

    /// Inserts into the internal list and the group tree. Returns the view
    /// index of each placement.
    fn place(&mut self, item: &ItemRef, position: usize) -> Result<Vec<usize>> {
        self.list.insert(position, item.clone())?;
        if !self.is_grouping {
            return Ok(vec![position]);
        }

        let comparer = ListComparer::new(&*self.list);
        match self.tree.add_to_subgroups(item, false, Some(&comparer)) {
            // report several placements by final position, ascending, so each
            // index is valid once the previous ones have been applied
            Ok(placements) if placements.len() > 1 => Ok(self.leaf_positions(item)),
            Ok(placements) => Ok(placements),
            Err(e) => {
                self.tree.remove_by_exhaustive_search(item);
                self.list.remove(position)?;
                Err(e)
            }
        }
    }

    /// Removes from the group tree and the internal list. Returns the view
    /// index of each removed placement, each captured right before its removal.
    fn unplace(&mut self, item: &ItemRef, position: usize) -> Result<Vec<usize>> {
        self.list.remove(position)?;
        if !self.is_grouping {
            return Ok(vec![position]);
        }

        let initial = self.leaf_positions(item);
        match self.tree.remove_from_subgroups(item) {
            Ok((mut removed, missing)) => {
                if missing {
                    warn!("item {:?} was missing from its groups, searching the whole tree", item);
                    removed.extend(self.tree.remove_by_exhaustive_search(item));
                }
                // several placements are reported by initial position, descending
                if removed.len() > 1 && removed.len() == initial.len() {
                    removed = initial.into_iter().rev().collect();
                }
                Ok(removed)
            }
            Err(e) => {
                self.tree.remove_by_exhaustive_search(item);
                Err(e)
            }
        }
    }

    /// Every view index holding `item`, ascending.
    fn leaf_positions(&self, item: &ItemRef) -> Vec<usize> {
        self.tree
            .leaves(self.tree.root_id())
            .enumerate()
            .filter(|(_, leaf)| *leaf == item)
            .map(|(index, _)| index)
            .collect()
    }

    /// Internal list position of an item, trying the reported index first.
    fn locate(&self, item: &ItemRef, hint: Option<usize>) -> Option<usize> {
        hint.filter(|&i| self.list.get(i) == Some(item))
            .or_else(|| self.list.index_of(item))
    }
}

impl Drop for CollectionView {
    fn drop(&mut self) {
        if let (Some(id), Some(source)) = (self.subscription, self.source.upgrade()) {
            source.unsubscribe(id);
        }
    }
}

impl fmt::Debug for CollectionView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionView")
            .field("len", &self.len())
            .field("storage", &self.options.storage)
            .field("sort_descriptions", &self.sort_descriptions)
            .field("tree", &self.tree)
            .field("bound", &self.subscription.is_some())
            .finish()
    }
}
