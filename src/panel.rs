//! Panels and group styles.
//!
//! A [`Panel`] is the ordered child list of a items control: item containers
//! and, when the view is grouped, [`GroupItem`]s that carry a header container
//! and a nested panel of their own.

use crate::group_tree::GroupId;
use crate::value::Value;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub enum PanelChild<C> {
    Container(C),
    Group(GroupItem<C>),
}

/// Visual counterpart of a group: a header plus a panel for its children.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupItem<C> {
    pub group: GroupId,
    pub key: Value,
    pub level: usize,
    pub header: C,
    pub panel: Panel<C>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel<C> {
    children: Vec<PanelChild<C>>,
}

impl<C> Default for Panel<C> {
    fn default() -> Self {
        Panel {
            children: Vec::new(),
        }
    }
}

impl<C: Clone + PartialEq> Panel<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn children(&self) -> &[PanelChild<C>] {
        &self.children
    }

    pub fn get(&self, index: usize) -> Option<&PanelChild<C>> {
        self.children.get(index)
    }

    /// Inserts at `index`, clamped to the end.
    pub fn insert(&mut self, index: usize, child: PanelChild<C>) -> usize {
        let index = index.min(self.children.len());
        self.children.insert(index, child);
        index
    }

    pub fn push(&mut self, child: PanelChild<C>) {
        self.children.push(child);
    }

    pub fn remove(&mut self, index: usize) -> Option<PanelChild<C>> {
        if index < self.children.len() {
            Some(self.children.remove(index))
        } else {
            None
        }
    }

    /// Removes every child, returning all containers (item containers and
    /// headers) depth first.
    pub fn clear(&mut self) -> Vec<C> {
        let mut released = Vec::new();
        for child in self.children.drain(..) {
            release(child, &mut released);
        }
        released
    }

    pub fn group_position(&self, group: GroupId) -> Option<usize> {
        self.children
            .iter()
            .position(|c| matches!(c, PanelChild::Group(g) if g.group == group))
    }

    pub fn group_panel_mut(&mut self, index: usize) -> Option<&mut Panel<C>> {
        match self.children.get_mut(index) {
            Some(PanelChild::Group(item)) => Some(&mut item.panel),
            _ => None,
        }
    }

    /// Finds a group item anywhere below this panel.
    pub fn find_group(&self, group: GroupId) -> Option<&GroupItem<C>> {
        self.children.iter().find_map(|c| match c {
            PanelChild::Group(g) if g.group == group => Some(g),
            PanelChild::Group(g) => g.panel.find_group(group),
            PanelChild::Container(_) => None,
        })
    }

    /// Item containers (not headers), depth first.
    pub fn containers(&self) -> Vec<&C> {
        let mut found = Vec::new();
        self.collect_containers(&mut found);
        found
    }

    fn collect_containers<'a>(&'a self, found: &mut Vec<&'a C>) {
        for child in &self.children {
            match child {
                PanelChild::Container(c) => found.push(c),
                PanelChild::Group(g) => g.panel.collect_containers(found),
            }
        }
    }

    /// Number of item containers below this panel.
    pub fn container_count(&self) -> usize {
        self.children
            .iter()
            .map(|c| match c {
                PanelChild::Container(_) => 1,
                PanelChild::Group(g) => g.panel.container_count(),
            })
            .sum()
    }

    /// Removes the `ordinal`-th item container, counting depth first and
    /// skipping headers. On the way back up, group items left without item
    /// containers are removed too when `prune` says their group is gone; their
    /// headers go to `released`.
    ///
    /// Containers are found by position, so equal containers are fine.
    pub fn remove_container_at<P>(&mut self, ordinal: usize, prune: &P, released: &mut Vec<C>) -> Option<C>
    where
        P: Fn(GroupId) -> bool,
    {
        let mut remaining = ordinal;
        for index in 0..self.children.len() {
            let count = match &self.children[index] {
                PanelChild::Container(_) => 1,
                PanelChild::Group(g) => g.panel.container_count(),
            };
            if remaining >= count {
                remaining -= count;
                continue;
            }

            if matches!(self.children[index], PanelChild::Container(_)) {
                return match self.children.remove(index) {
                    PanelChild::Container(c) => Some(c),
                    PanelChild::Group(_) => None,
                };
            }

            let (removed, empty_and_gone) = match &mut self.children[index] {
                PanelChild::Group(g) => {
                    let removed = g.panel.remove_container_at(remaining, prune, released);
                    let gone = removed.is_some() && g.panel.container_count() == 0 && prune(g.group);
                    (removed, gone)
                }
                PanelChild::Container(_) => (None, false),
            };
            if empty_and_gone {
                release(self.children.remove(index), released);
            }
            return removed;
        }
        None
    }

    /// Swaps the `ordinal`-th item container for `new`, returning the old one.
    pub fn replace_container_at(&mut self, ordinal: usize, new: C) -> std::result::Result<C, C> {
        let mut remaining = ordinal;
        for child in self.children.iter_mut() {
            match child {
                PanelChild::Container(c) if remaining == 0 => return Ok(std::mem::replace(c, new)),
                PanelChild::Container(_) => remaining -= 1,
                PanelChild::Group(g) => {
                    let count = g.panel.container_count();
                    if remaining < count {
                        return g.panel.replace_container_at(remaining, new);
                    }
                    remaining -= count;
                }
            }
        }
        Err(new)
    }
}

fn release<C>(child: PanelChild<C>, released: &mut Vec<C>) {
    match child {
        PanelChild::Container(c) => released.push(c),
        PanelChild::Group(g) => {
            released.push(g.header);
            for nested in g.panel.children {
                release(nested, released);
            }
        }
    }
}

pub type HeaderTemplate = Rc<dyn Fn(&Value, usize) -> String>;

/// Presentation settings for the groups at one level.
#[derive(Clone, Default)]
pub struct GroupStyle {
    /// Receives the group key and its item count.
    pub header_template: Option<HeaderTemplate>,
    pub container_style: Option<String>,
}

impl GroupStyle {
    pub fn with_header_template<F>(template: F) -> Self
    where
        F: Fn(&Value, usize) -> String + 'static,
    {
        GroupStyle {
            header_template: Some(Rc::new(template)),
            container_style: None,
        }
    }

    pub fn header_text(&self, key: &Value, item_count: usize) -> String {
        match &self.header_template {
            Some(template) => template(key, item_count),
            None => key.to_string(),
        }
    }
}

impl fmt::Debug for GroupStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupStyle")
            .field("header_template", &self.header_template.is_some())
            .field("container_style", &self.container_style)
            .finish()
    }
}

/// Group styles by depth (0 for top-level groups). Deeper levels reuse the
/// last style.
#[derive(Debug, Clone, Default)]
pub struct GroupStyles(Vec<GroupStyle>);

impl GroupStyles {
    pub fn new(styles: Vec<GroupStyle>) -> Self {
        GroupStyles(styles)
    }

    pub fn push(&mut self, style: GroupStyle) {
        self.0.push(style);
    }

    pub fn for_depth(&self, depth: usize) -> Option<&GroupStyle> {
        self.0.get(depth).or_else(|| self.0.last())
    }

    pub fn header_text(&self, depth: usize, key: &Value, item_count: usize) -> String {
        match self.for_depth(depth) {
            Some(style) => style.header_text(key, item_count),
            None => key.to_string(),
        }
    }
}
