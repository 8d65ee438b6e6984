//! Serializable dump of a group tree, for debugging and tests.

use crate::group_tree::{Child, GroupRef, GroupTree};
use crate::value::{ItemRef, Value};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct GroupSnapshot {
    pub key: Value,
    pub level: usize,
    pub explicit: bool,
    pub item_count: usize,
    pub full_count: usize,
    /// Direct leaf children, in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<ItemRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupSnapshot>,
}

impl GroupSnapshot {
    pub fn of(group: GroupRef<'_>) -> Self {
        let mut items = Vec::new();
        let mut groups = Vec::new();
        for child in group.children() {
            match child {
                Child::Leaf(item) => items.push(item.clone()),
                Child::Group(_) => {}
            }
        }
        for subgroup in group.subgroups() {
            groups.push(GroupSnapshot::of(subgroup));
        }
        GroupSnapshot {
            key: group.key().clone(),
            level: group.level(),
            explicit: group.is_explicit(),
            item_count: group.item_count(),
            full_count: group.full_count(),
            items,
            groups,
        }
    }

    /// Keys of the direct subgroups, as display text.
    pub fn group_keys(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.key.to_string()).collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl GroupTree {
    pub fn snapshot(&self) -> GroupSnapshot {
        GroupSnapshot::of(self.root())
    }
}
