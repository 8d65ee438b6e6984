//! Group descriptions.
//!
//! A [`GroupDescription`] maps an item to the key(s) of the group(s) it
//! belongs to at one nesting level. It can also declare explicit group keys:
//! groups that exist (and appear first, in declared order) even while empty.
//!
//! # Examples
//!
//! ```
//! use livegroup::{GroupDescription, GroupKey, ItemRef, Value};
//! use std::collections::HashMap;
//!
//! let by_company = GroupDescription::by_property("Company")
//!     .unwrap()
//!     .with_group_keys(vec![Value::from("Empty Company")]);
//!
//! let mut row = HashMap::new();
//! row.insert("Company".to_string(), Value::from("Acme"));
//! let key = by_company.group_key(&ItemRef::new(row), 0).unwrap();
//! assert_eq!(key, GroupKey::Single(Value::from("Acme")));
//! assert_eq!(by_company.group_keys(), &[Value::from("Empty Company")]);
//! ```

use crate::error::Result;
use crate::property::PropertyPath;
use crate::value::{ItemRef, Value};
use std::fmt;
use std::rc::Rc;

/// Group membership of an item at one level.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupKey {
    Single(Value),
    /// The item belongs to one group per key.
    Multiple(Vec<Value>),
    /// The item is a direct leaf of the current group.
    NoGrouping,
}

pub type KeySelector = Rc<dyn Fn(&ItemRef, usize) -> Result<GroupKey>>;

pub enum GroupKeyRule {
    /// Key is the value at a property path. A list value yields one key per
    /// element; a null value falls back to the item itself.
    Property(PropertyPath),
    /// Key is computed by a user function receiving the item and the level.
    Selector(KeySelector),
}

/// How a group's key is matched against an item's key.
#[derive(Clone, Default)]
pub enum KeyMatch {
    #[default]
    Exact,
    /// Strings match case-insensitively, other values exactly.
    IgnoreCase,
    /// `(group_key, item_key) -> bool`
    Custom(Rc<dyn Fn(&Value, &Value) -> bool>),
}

impl fmt::Debug for KeyMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyMatch::Exact => f.write_str("Exact"),
            KeyMatch::IgnoreCase => f.write_str("IgnoreCase"),
            KeyMatch::Custom(_) => f.write_str("Custom"),
        }
    }
}

pub struct GroupDescription {
    rule: GroupKeyRule,
    group_keys: Vec<Value>,
    key_match: KeyMatch,
}

impl GroupDescription {
    pub fn by_property(path: &str) -> Result<Self> {
        Ok(GroupDescription {
            rule: GroupKeyRule::Property(PropertyPath::parse(path)?),
            group_keys: Vec::new(),
            key_match: KeyMatch::default(),
        })
    }

    pub fn by_selector<F>(selector: F) -> Self
    where
        F: Fn(&ItemRef, usize) -> Result<GroupKey> + 'static,
    {
        GroupDescription {
            rule: GroupKeyRule::Selector(Rc::new(selector)),
            group_keys: Vec::new(),
            key_match: KeyMatch::default(),
        }
    }

    /// Declares explicit groups, created in this order ahead of any other group.
    pub fn with_group_keys(mut self, keys: Vec<Value>) -> Self {
        self.group_keys = keys;
        self
    }

    pub fn with_key_match(mut self, key_match: KeyMatch) -> Self {
        self.key_match = key_match;
        self
    }

    pub fn rule(&self) -> &GroupKeyRule {
        &self.rule
    }

    pub fn group_keys(&self) -> &[Value] {
        &self.group_keys
    }

    pub fn property_path(&self) -> Option<&str> {
        match &self.rule {
            GroupKeyRule::Property(path) => Some(path.as_str()),
            GroupKeyRule::Selector(_) => None,
        }
    }

    pub fn group_key(&self, item: &ItemRef, level: usize) -> Result<GroupKey> {
        match &self.rule {
            GroupKeyRule::Property(path) => Ok(match path.resolve(item)? {
                Value::List(keys) => GroupKey::Multiple(keys),
                Value::Null => GroupKey::Single(item.self_value()),
                key => GroupKey::Single(key),
            }),
            GroupKeyRule::Selector(selector) => selector(item, level),
        }
    }

    pub fn keys_match(&self, group_key: &Value, item_key: &Value) -> bool {
        match &self.key_match {
            KeyMatch::Exact => group_key == item_key,
            KeyMatch::IgnoreCase => match (group_key, item_key) {
                (Value::String(a), Value::String(b)) => a.to_lowercase() == b.to_lowercase(),
                _ => group_key == item_key,
            },
            KeyMatch::Custom(matcher) => matcher(group_key, item_key),
        }
    }
}

impl fmt::Debug for GroupDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = match &self.rule {
            GroupKeyRule::Property(path) => format!("property '{}'", path.as_str()),
            GroupKeyRule::Selector(_) => "selector".to_string(),
        };
        f.debug_struct("GroupDescription")
            .field("rule", &rule)
            .field("group_keys", &self.group_keys)
            .field("key_match", &self.key_match)
            .finish()
    }
}
