//! Group Tree - Hierarchical Grouping for Collection Views
//!
//! The tree divides a flat item sequence into nested groups, one level per
//! group description. Nodes live in a `slotmap` arena: parents are referenced
//! by [`GroupId`], and a removed group's id stops resolving, so stale ids held
//! elsewhere (e.g. by container headers) are detectable with
//! [`GroupTree::contains`].
//!
//! # Counts
//!
//! Each node tracks two counts, adjusted on the node and all its ancestors:
//! - `item_count`: leaf descendants
//! - `full_count`: leaf descendants plus descendant group nodes
//!
//! # Ordering
//!
//! When items are added one at a time, a comparer positions new leaves and new
//! subgroups among their siblings. A subgroup is represented by its seed item
//! (its first leaf). Explicit groups always stay first, in declared order.
//! During a bulk load (`loading == true`) items arrive already in view order
//! and everything is appended.

use crate::comparer::ItemComparer;
use crate::error::Result;
use crate::group::{GroupDescription, GroupKey};
use crate::value::{ItemRef, Value};
use log::trace;
use slotmap::SlotMap;
use std::fmt;
use std::rc::Rc;

slotmap::new_key_type! {
    /// Identifier of a group node. Ids of removed groups never resolve again.
    pub struct GroupId;
}

/// Key of the root group.
pub const ROOT_KEY: &str = "Root";

/// Chooses the group description for a group at a level. Receives the
/// group's key (None for the root).
pub type GroupBySelector = Rc<dyn Fn(Option<&Value>, usize) -> Option<Rc<GroupDescription>>>;

#[derive(Debug, Clone)]
pub enum Child {
    Leaf(ItemRef),
    Group(GroupId),
}

#[derive(Debug)]
struct GroupNode {
    key: Value,
    parent: Option<GroupId>,
    children: Vec<Child>,
    item_count: usize,
    full_count: usize,
    group_by: Option<Rc<GroupDescription>>,
    explicit: bool,
    level: usize,
}

impl GroupNode {
    fn new(key: Value, parent: Option<GroupId>, level: usize, explicit: bool) -> Self {
        GroupNode {
            key,
            parent,
            children: Vec::new(),
            item_count: 0,
            full_count: 0,
            group_by: None,
            explicit,
            level,
        }
    }
}

pub struct GroupTree {
    nodes: SlotMap<GroupId, GroupNode>,
    root: GroupId,
    descriptions: Vec<Rc<GroupDescription>>,
    selector: Option<GroupBySelector>,
}

impl Default for GroupTree {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupTree {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(GroupNode::new(Value::from(ROOT_KEY), None, 0, false));
        GroupTree {
            nodes,
            root,
            descriptions: Vec::new(),
            selector: None,
        }
    }

    pub fn descriptions(&self) -> &[Rc<GroupDescription>] {
        &self.descriptions
    }

    pub(crate) fn descriptions_mut(&mut self) -> &mut Vec<Rc<GroupDescription>> {
        &mut self.descriptions
    }

    pub fn selector(&self) -> Option<&GroupBySelector> {
        self.selector.as_ref()
    }

    pub(crate) fn set_selector(&mut self, selector: Option<GroupBySelector>) {
        self.selector = selector;
    }

    /// True when the root has a group description.
    pub fn is_grouping(&self) -> bool {
        self.nodes[self.root].group_by.is_some()
    }

    /// Drops every group and leaf, then rebuilds the root from the current
    /// descriptions, pre-creating explicit groups at every level.
    pub fn initialize(&mut self) {
        self.nodes.clear();
        self.root = self
            .nodes
            .insert(GroupNode::new(Value::from(ROOT_KEY), None, 0, false));
        self.initialize_group(self.root);
    }

    fn description_for(&self, key: Option<&Value>, level: usize) -> Option<Rc<GroupDescription>> {
        if let Some(selector) = &self.selector {
            if let Some(description) = selector(key, level) {
                return Some(description);
            }
        }
        self.descriptions.get(level).cloned()
    }

    fn initialize_group(&mut self, group: GroupId) {
        let (key, level) = {
            let node = &self.nodes[group];
            let key = if node.parent.is_some() {
                Some(node.key.clone())
            } else {
                None
            };
            (key, node.level)
        };

        let group_by = self.description_for(key.as_ref(), level);
        self.nodes[group].group_by = group_by.clone();

        if let Some(description) = group_by {
            for name in description.group_keys() {
                let child = self
                    .nodes
                    .insert(GroupNode::new(name.clone(), Some(group), level + 1, true));
                self.initialize_group(child);
                self.nodes[group].children.push(Child::Group(child));
                self.change_counts(group, false, 1);
            }
        }
    }

    // ---- counts ----

    /// Adjusts counts on `group` and every ancestor.
    fn change_counts(&mut self, group: GroupId, leaf: bool, delta: isize) {
        let mut current = Some(group);
        while let Some(id) = current {
            let node = &mut self.nodes[id];
            node.full_count = (node.full_count as isize + delta) as usize;
            if leaf {
                node.item_count = (node.item_count as isize + delta) as usize;
            }
            current = node.parent;
        }
    }

    fn weight(&self, child: &Child) -> usize {
        match child {
            Child::Leaf(_) => 1,
            Child::Group(id) => self.nodes.get(*id).map_or(0, |n| n.item_count),
        }
    }

    // ---- insertion ----

    /// Places `item` in every group it belongs to.
    ///
    /// When `loading`, new leaves and groups are appended. Otherwise they are
    /// positioned with `comparer` (appended if there is none) and the flat leaf
    /// index of each placement is returned in placement order.
    pub fn add_to_subgroups(
        &mut self,
        item: &ItemRef,
        loading: bool,
        comparer: Option<&dyn ItemComparer>,
    ) -> Result<Vec<usize>> {
        let mut placed = Vec::new();
        self.add_to_group(self.root, item, loading, comparer, &mut placed)?;
        Ok(placed)
    }

    fn add_to_group(
        &mut self,
        group: GroupId,
        item: &ItemRef,
        loading: bool,
        comparer: Option<&dyn ItemComparer>,
        placed: &mut Vec<usize>,
    ) -> Result<()> {
        let (level, group_by) = {
            let node = &self.nodes[group];
            (node.level, node.group_by.clone())
        };
        let key = match &group_by {
            Some(description) => description.group_key(item, level)?,
            None => GroupKey::NoGrouping,
        };

        match key {
            GroupKey::NoGrouping => {
                let local = if loading {
                    self.nodes[group].children.len()
                } else {
                    self.find_index(group, item, comparer)?
                };
                self.nodes[group].children.insert(local, Child::Leaf(item.clone()));
                self.change_counts(group, true, 1);
                if !loading {
                    placed.push(self.leaf_index_from(group, local));
                }
                Ok(())
            }
            GroupKey::Single(key) => self.add_to_subgroup(group, item, key, loading, comparer, placed),
            GroupKey::Multiple(keys) => {
                for key in keys {
                    self.add_to_subgroup(group, item, key, loading, comparer, placed)?;
                }
                Ok(())
            }
        }
    }

    fn add_to_subgroup(
        &mut self,
        group: GroupId,
        item: &ItemRef,
        key: Value,
        loading: bool,
        comparer: Option<&dyn ItemComparer>,
        placed: &mut Vec<usize>,
    ) -> Result<()> {
        if let Some(existing) = self.find_subgroup(group, &key) {
            return self.add_to_group(existing, item, loading, comparer, placed);
        }

        let level = self.nodes[group].level;
        trace!("creating group {} at level {}", key, level + 1);
        let subgroup = self
            .nodes
            .insert(GroupNode::new(key, Some(group), level + 1, false));
        self.initialize_group(subgroup);

        let position = if loading {
            self.nodes[group].children.len()
        } else {
            match self.find_index(group, item, comparer) {
                Ok(position) => position,
                Err(e) => {
                    self.discard_detached(subgroup);
                    return Err(e);
                }
            }
        };
        self.nodes[group].children.insert(position, Child::Group(subgroup));
        self.change_counts(group, false, 1);

        let result = self.add_to_group(subgroup, item, loading, comparer, placed);
        if result.is_err() {
            self.prune(subgroup);
        }
        result
    }

    /// First subgroup of `group` whose key matches `key`.
    fn find_subgroup(&self, group: GroupId, key: &Value) -> Option<GroupId> {
        let node = &self.nodes[group];
        let description = node.group_by.as_ref()?;
        node.children.iter().find_map(|child| match child {
            Child::Group(id) if description.keys_match(&self.nodes[*id].key, key) => Some(*id),
            _ => None,
        })
    }

    /// Position for a new child of `group` represented by `seed`: before the
    /// first sibling whose seed compares greater, never inside the explicit
    /// prefix.
    fn find_index(
        &self,
        group: GroupId,
        seed: &ItemRef,
        comparer: Option<&dyn ItemComparer>,
    ) -> Result<usize> {
        let children = &self.nodes[group].children;
        let comparer = match comparer {
            Some(comparer) => comparer,
            None => return Ok(children.len()),
        };

        let start = children
            .iter()
            .take_while(|c| matches!(c, Child::Group(id) if self.nodes[*id].explicit))
            .count();

        comparer.reset();
        for (index, child) in children.iter().enumerate().skip(start) {
            let sibling_seed = match child {
                Child::Leaf(item) => Some(item),
                Child::Group(id) => self.seed_of(*id),
            };
            if let Some(sibling_seed) = sibling_seed {
                if comparer.compare(seed, sibling_seed)? == std::cmp::Ordering::Less {
                    return Ok(index);
                }
            }
        }
        Ok(children.len())
    }

    /// First leaf of a group by depth-first probe. Unset for empty groups and
    /// for groups carrying explicit subgroups.
    fn seed_of(&self, group: GroupId) -> Option<&ItemRef> {
        let mut current = group;
        loop {
            let node = &self.nodes[current];
            let has_explicit = node
                .group_by
                .as_ref()
                .map_or(false, |d| !d.group_keys().is_empty());
            if has_explicit {
                return None;
            }
            match node.children.first()? {
                Child::Leaf(item) => return Some(item),
                Child::Group(id) => current = *id,
            }
        }
    }

    // ---- removal ----

    /// Removes `item` from every group it should be in, according to its
    /// current keys. Returns the flat leaf index of each removed placement
    /// (captured right before that removal) and whether the item was missing
    /// from a group it should have been in.
    pub fn remove_from_subgroups(&mut self, item: &ItemRef) -> Result<(Vec<usize>, bool)> {
        let mut removed = Vec::new();
        let missing = self.remove_from_group(self.root, item, &mut removed)?;
        Ok((removed, missing))
    }

    fn remove_from_group(&mut self, group: GroupId, item: &ItemRef, removed: &mut Vec<usize>) -> Result<bool> {
        let (level, group_by) = {
            let node = &self.nodes[group];
            (node.level, node.group_by.clone())
        };
        let key = match &group_by {
            Some(description) => description.group_key(item, level)?,
            None => GroupKey::NoGrouping,
        };

        match key {
            GroupKey::NoGrouping => {
                let local = self.nodes[group]
                    .children
                    .iter()
                    .position(|c| matches!(c, Child::Leaf(i) if i == item));
                match local {
                    Some(local) => {
                        removed.push(self.leaf_index_from(group, local));
                        self.remove_leaf(group, local);
                        Ok(false)
                    }
                    None => Ok(true),
                }
            }
            GroupKey::Single(key) => self.remove_from_subgroup(group, item, &key, removed),
            GroupKey::Multiple(keys) => {
                let mut missing = false;
                for key in keys {
                    // the group may have been pruned by an earlier key
                    if !self.nodes.contains_key(group) {
                        missing = true;
                        continue;
                    }
                    missing |= self.remove_from_subgroup(group, item, &key, removed)?;
                }
                Ok(missing)
            }
        }
    }

    fn remove_from_subgroup(
        &mut self,
        group: GroupId,
        item: &ItemRef,
        key: &Value,
        removed: &mut Vec<usize>,
    ) -> Result<bool> {
        match self.find_subgroup(group, key) {
            Some(subgroup) => self.remove_from_group(subgroup, item, removed),
            None => Ok(true),
        }
    }

    /// Removes every placement of `item`, wherever it is. Used when the item's
    /// keys no longer lead to where it was placed.
    pub fn remove_by_exhaustive_search(&mut self, item: &ItemRef) -> Vec<usize> {
        let mut removed = Vec::new();
        while let Some((group, local)) = self.find_group_containing(item) {
            removed.push(self.leaf_index_from(group, local));
            self.remove_leaf(group, local);
        }
        removed
    }

    fn remove_leaf(&mut self, group: GroupId, local: usize) {
        self.nodes[group].children.remove(local);
        self.change_counts(group, true, -1);
        self.prune(group);
    }

    /// Removes `group` and then its ancestors while they are empty, non-explicit
    /// and not the root.
    fn prune(&mut self, group: GroupId) {
        let mut current = group;
        loop {
            let (parent, removable, full_count) = match self.nodes.get(current) {
                Some(node) => (node.parent, node.item_count == 0 && !node.explicit, node.full_count),
                None => return,
            };
            let parent = match parent {
                Some(parent) if removable => parent,
                _ => return,
            };

            trace!("removing empty group {}", self.nodes[current].key);
            self.nodes[parent]
                .children
                .retain(|c| !matches!(c, Child::Group(id) if *id == current));
            self.change_counts(parent, false, -(full_count as isize + 1));
            self.remove_subtree(current);
            current = parent;
        }
    }

    /// Removes a group that was created but never attached to its parent.
    fn discard_detached(&mut self, group: GroupId) {
        let full_count = self.nodes[group].full_count;
        if let Some(parent) = self.nodes[group].parent {
            // explicit children already counted on the ancestors
            self.change_counts(parent, false, -(full_count as isize));
        }
        self.remove_subtree(group);
    }

    fn remove_subtree(&mut self, group: GroupId) {
        if let Some(node) = self.nodes.remove(group) {
            for child in node.children {
                if let Child::Group(id) = child {
                    self.remove_subtree(id);
                }
            }
        }
    }

    // ---- indexing ----

    /// Flat leaf index of the child at `local` in `group`.
    pub fn leaf_index_from(&self, group: GroupId, local: usize) -> usize {
        let mut result = 0;
        let mut current = group;
        let mut limit = local;
        loop {
            let node = &self.nodes[current];
            result += node
                .children
                .iter()
                .take(limit)
                .map(|c| self.weight(c))
                .sum::<usize>();
            match node.parent {
                Some(parent) => {
                    limit = self.index_in_parent(current).unwrap_or(0);
                    current = parent;
                }
                None => return result,
            }
        }
    }

    /// Flat leaf index of the first placement of `item`.
    pub fn leaf_index_of(&self, item: &ItemRef) -> Option<usize> {
        self.find_group_containing(item)
            .map(|(group, local)| self.leaf_index_from(group, local))
    }

    /// Group and local child index of the leaf at a flat index.
    pub fn locate_leaf(&self, index: usize) -> Option<(GroupId, usize)> {
        let mut group = self.root;
        let mut remaining = index;
        if remaining >= self.nodes[group].item_count {
            return None;
        }
        'descend: loop {
            for (local, child) in self.nodes[group].children.iter().enumerate() {
                match child {
                    Child::Leaf(_) if remaining == 0 => return Some((group, local)),
                    Child::Leaf(_) => remaining -= 1,
                    Child::Group(id) => {
                        let count = self.nodes[*id].item_count;
                        if remaining < count {
                            group = *id;
                            continue 'descend;
                        }
                        remaining -= count;
                    }
                }
            }
            return None;
        }
    }

    /// The leaf at a flat index.
    pub fn leaf_at(&self, index: usize) -> Option<&ItemRef> {
        let (group, local) = self.locate_leaf(index)?;
        match &self.nodes[group].children[local] {
            Child::Leaf(item) => Some(item),
            Child::Group(_) => None,
        }
    }

    /// Depth-first leaves under `group`, in stored order.
    pub fn leaves(&self, group: GroupId) -> Leaves<'_> {
        let stack = if self.nodes.contains_key(group) {
            vec![(group, 0)]
        } else {
            Vec::new()
        };
        Leaves { tree: self, stack }
    }

    // ---- queries ----

    pub fn root_id(&self) -> GroupId {
        self.root
    }

    pub fn root(&self) -> GroupRef<'_> {
        GroupRef {
            tree: self,
            id: self.root,
        }
    }

    pub fn group(&self, id: GroupId) -> Option<GroupRef<'_>> {
        self.nodes.get(id).map(|_| GroupRef { tree: self, id })
    }

    pub fn contains(&self, id: GroupId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn parent(&self, id: GroupId) -> Option<GroupId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    /// Groups from the root's child down to `id`. Empty for the root.
    pub fn path_to(&self, id: GroupId) -> Vec<GroupId> {
        let mut path = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            path.push(current);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Position of a group among its parent's children.
    pub fn index_in_parent(&self, id: GroupId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.nodes[parent]
            .children
            .iter()
            .position(|c| matches!(c, Child::Group(g) if *g == id))
    }

    /// Group holding the first placement of `item`, with the local index.
    pub fn find_group_containing(&self, item: &ItemRef) -> Option<(GroupId, usize)> {
        let mut stack = vec![self.root];
        while let Some(group) = stack.pop() {
            let children = &self.nodes[group].children;
            for (local, child) in children.iter().enumerate() {
                if let Child::Leaf(leaf) = child {
                    if leaf == item {
                        return Some((group, local));
                    }
                }
            }
            // push in reverse so the first subgroup is searched first
            for child in children.iter().rev() {
                if let Child::Group(id) = child {
                    stack.push(*id);
                }
            }
        }
        None
    }

    /// Every explicit group, depth first.
    pub fn explicit_groups(&self) -> Vec<GroupId> {
        let mut found = Vec::new();
        self.collect_explicit(self.root, &mut found);
        found
    }

    fn collect_explicit(&self, group: GroupId, found: &mut Vec<GroupId>) {
        for child in &self.nodes[group].children {
            if let Child::Group(id) = child {
                if self.nodes[*id].explicit {
                    found.push(*id);
                }
                self.collect_explicit(*id, found);
            }
        }
    }
}

impl fmt::Debug for GroupTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupTree")
            .field("groups", &self.nodes.len())
            .field("items", &self.nodes[self.root].item_count)
            .field("descriptions", &self.descriptions)
            .field("selector", &self.selector.is_some())
            .finish()
    }
}

/// Read-only handle to a group in a tree.
#[derive(Clone, Copy)]
pub struct GroupRef<'a> {
    tree: &'a GroupTree,
    id: GroupId,
}

impl<'a> GroupRef<'a> {
    fn node(&self) -> &'a GroupNode {
        &self.tree.nodes[self.id]
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn key(&self) -> &'a Value {
        &self.node().key
    }

    pub fn level(&self) -> usize {
        self.node().level
    }

    pub fn item_count(&self) -> usize {
        self.node().item_count
    }

    pub fn full_count(&self) -> usize {
        self.node().full_count
    }

    pub fn is_explicit(&self) -> bool {
        self.node().explicit
    }

    /// True when the group's children are leaves rather than subgroups.
    pub fn is_bottom_level(&self) -> bool {
        self.node().group_by.is_none()
    }

    pub fn group_by(&self) -> Option<&'a Rc<GroupDescription>> {
        self.node().group_by.as_ref()
    }

    pub fn parent(&self) -> Option<GroupRef<'a>> {
        self.node().parent.map(|id| GroupRef { tree: self.tree, id })
    }

    pub fn children(&self) -> &'a [Child] {
        &self.node().children
    }

    pub fn subgroups(&self) -> impl Iterator<Item = GroupRef<'a>> + 'a {
        let tree = self.tree;
        self.node().children.iter().filter_map(move |c| match c {
            Child::Group(id) => Some(GroupRef { tree, id: *id }),
            Child::Leaf(_) => None,
        })
    }

    pub fn leaves(&self) -> Leaves<'a> {
        self.tree.leaves(self.id)
    }
}

impl fmt::Debug for GroupRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("key", self.key())
            .field("level", &self.level())
            .field("item_count", &self.item_count())
            .field("explicit", &self.is_explicit())
            .finish()
    }
}

/// Lazy depth-first leaf traversal.
pub struct Leaves<'a> {
    tree: &'a GroupTree,
    stack: Vec<(GroupId, usize)>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = &'a ItemRef;

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        loop {
            let (group, cursor) = self.stack.last_mut()?;
            let children = &tree.nodes[*group].children;
            match children.get(*cursor) {
                None => {
                    self.stack.pop();
                }
                Some(child) => {
                    *cursor += 1;
                    match child {
                        Child::Leaf(item) => return Some(item),
                        Child::Group(id) => self.stack.push((*id, 0)),
                    }
                }
            }
        }
    }
}
