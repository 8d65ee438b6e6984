//! Container Sync - Applying View Changes to a Panel
//!
//! Keeps an [`ItemContainerGenerator`] and a [`Panel`] in step with a
//! [`CollectionView`]. Each [`ViewChange`] is applied against the view as it
//! is after the change, so view indices can be mapped to their group and local
//! position through the view's group tree.
//!
//! When the view is grouped, group items (headers plus nested panels) are
//! created on demand along the path to each added item, and removed once they
//! hold no item containers and their group has left the tree. Explicit groups
//! are created up front and never removed.

use crate::collection_view::CollectionView;
use crate::change::ViewChange;
use crate::error::{Result, ViewError};
use crate::generator::{ContainerFactory, GroupHeader, ItemContainerGenerator};
use crate::group_tree::{Child, GroupId, GroupTree};
use crate::panel::{GroupItem, GroupStyles, Panel, PanelChild};
use crate::value::{ItemRef, Value};
use log::{trace, warn};

pub struct ContainerSync<'a, F: ContainerFactory> {
    generator: &'a mut ItemContainerGenerator<F>,
    panel: &'a mut Panel<F::Container>,
    styles: &'a GroupStyles,
}

impl<'a, F: ContainerFactory> ContainerSync<'a, F> {
    pub fn new(
        generator: &'a mut ItemContainerGenerator<F>,
        panel: &'a mut Panel<F::Container>,
        styles: &'a GroupStyles,
    ) -> Self {
        ContainerSync {
            generator,
            panel,
            styles,
        }
    }

    /// Applies one change, then asks the factory to re-measure.
    pub fn apply(&mut self, view: &CollectionView, change: &ViewChange) -> Result<()> {
        trace!("syncing containers for {:?}", change);
        let result = match change {
            ViewChange::Add { item, index } => self.add(view, item, *index),
            ViewChange::Remove { index, .. } => {
                self.remove(view, *index);
                Ok(())
            }
            ViewChange::Replace { new, index, .. } => {
                self.replace(new, *index);
                Ok(())
            }
            ViewChange::Move {
                item,
                old_index,
                new_index,
            } => {
                self.remove(view, *old_index);
                self.add(view, item, *new_index)
            }
            ViewChange::Reset => self.reset(view),
        };
        self.generator.invalidate_measure();
        result
    }

    fn add(&mut self, view: &CollectionView, item: &ItemRef, index: usize) -> Result<()> {
        if index < self.generator.end_index() {
            self.generator.insert_space(index, 1);
        }
        let container = self.generator.materialize(index, item).container.clone();

        if !view.is_grouping() {
            self.panel.insert(index, PanelChild::Container(container));
            return Ok(());
        }

        let tree = view.tree();
        let (group, local) = tree.locate_leaf(index).ok_or(ViewError::IndexOutOfRange {
            index,
            len: view.len(),
        })?;

        let mut panel: &mut Panel<F::Container> = &mut *self.panel;
        for id in tree.path_to(group) {
            let position = match panel.group_position(id) {
                Some(position) => position,
                None => {
                    let child = build_group_item(&mut *self.generator, self.styles, tree, id);
                    let at = tree.index_in_parent(id).unwrap_or(0);
                    panel.insert(at, PanelChild::Group(child))
                }
            };
            panel = match panel.group_panel_mut(position) {
                Some(nested) => nested,
                None => {
                    return Err(ViewError::IndexOutOfRange {
                        index,
                        len: view.len(),
                    })
                }
            };
        }
        panel.insert(local, PanelChild::Container(container));
        Ok(())
    }

    fn remove(&mut self, view: &CollectionView, index: usize) {
        let removed = self.generator.remove_range(index, 1);
        if removed.is_empty() {
            warn!("no container at index {} to remove", index);
            return;
        }

        let tree = view.tree();
        let mut released = Vec::new();
        for info in removed {
            // the panel holds one container per view index, in view order
            let found = if view.is_grouping() {
                self.panel
                    .remove_container_at(index, &|group| !tree.contains(group), &mut released)
                    .is_some()
            } else {
                self.panel.remove(index).is_some()
            };
            if !found {
                warn!("container for index {} was not in the panel", index);
            }
            self.generator.recycle(info.container);
        }
        for header in released {
            self.generator.recycle(header);
        }
    }

    fn replace(&mut self, new: &ItemRef, index: usize) {
        let old = self.generator.dematerialize(index);
        let container = self.generator.materialize(index, new).container.clone();
        match old {
            Some(old) => {
                if let Err(container) = self.panel.replace_container_at(index, container) {
                    warn!("replaced container at {} was not in the panel", index);
                    self.panel.insert(index, PanelChild::Container(container));
                }
                self.generator.recycle(old.container);
            }
            None => {
                warn!("no container at index {} to replace", index);
                self.panel.insert(index, PanelChild::Container(container));
            }
        }
    }

    fn reset(&mut self, view: &CollectionView) -> Result<()> {
        let released = self.panel.clear();
        for info in self.generator.clear() {
            if !released.contains(&info.container) {
                self.generator.recycle(info.container);
            }
        }
        for container in released {
            self.generator.recycle(container);
        }

        if view.is_grouping() {
            let tree = view.tree();
            let explicit = explicit_children(&mut *self.generator, self.styles, tree, tree.root_id());
            for child in explicit {
                self.panel.push(PanelChild::Group(child));
            }
        }

        let items: Vec<ItemRef> = view.iter().cloned().collect();
        for (index, item) in items.iter().enumerate() {
            self.add(view, item, index)?;
        }
        Ok(())
    }
}

/// A new group item for `group`, with every explicit subgroup below it
/// already in place.
fn build_group_item<F: ContainerFactory>(
    generator: &mut ItemContainerGenerator<F>,
    styles: &GroupStyles,
    tree: &GroupTree,
    group: GroupId,
) -> GroupItem<F::Container> {
    let (key, level, item_count) = match tree.group(group) {
        Some(g) => (g.key().clone(), g.level(), g.item_count()),
        None => (Value::Null, 0, 0),
    };
    let depth = level.saturating_sub(1);
    let header = GroupHeader {
        text: styles.header_text(depth, &key, item_count),
        container_style: styles.for_depth(depth).and_then(|s| s.container_style.clone()),
        key: key.clone(),
        level,
        item_count,
    };
    let container = generator.create_header(&header);

    let mut panel = Panel::new();
    for child in explicit_children(generator, styles, tree, group) {
        panel.push(PanelChild::Group(child));
    }
    GroupItem {
        group,
        key,
        level,
        header: container,
        panel,
    }
}

fn explicit_children<F: ContainerFactory>(
    generator: &mut ItemContainerGenerator<F>,
    styles: &GroupStyles,
    tree: &GroupTree,
    group: GroupId,
) -> Vec<GroupItem<F::Container>> {
    let explicit: Vec<GroupId> = match tree.group(group) {
        Some(g) => g
            .children()
            .iter()
            .filter_map(|c| match c {
                Child::Group(id) if tree.group(*id).map_or(false, |s| s.is_explicit()) => Some(*id),
                _ => None,
            })
            .collect(),
        None => Vec::new(),
    };
    explicit
        .into_iter()
        .map(|id| build_group_item(generator, styles, tree, id))
        .collect()
}
