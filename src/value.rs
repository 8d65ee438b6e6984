//! Item model.
//!
//! Items handed to a view are opaque: the view only ever asks them for named
//! property values. A [`Record`] exposes those values, an [`ItemRef`] is the
//! shared handle the view stores, and [`Value`] is the dynamically typed value
//! returned for a property.
//!
//! # Examples
//!
//! ```
//! use livegroup::{ItemRef, Value};
//! use std::collections::HashMap;
//!
//! let mut row = HashMap::new();
//! row.insert("company".to_string(), Value::from("Acme"));
//! row.insert("age".to_string(), Value::Int32(42));
//!
//! let item = ItemRef::new(row);
//! assert_eq!(item.property("company").unwrap().as_string(), Some("Acme"));
//!
//! // Handles compare by identity, not by content.
//! let twin = item.clone();
//! assert_eq!(item, twin);
//! ```

use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::rc::Rc;

/// Anything a view can hold.
pub trait Record: fmt::Debug {
    /// Returns the value of the named property, or None if the record has no such property.
    fn property(&self, name: &str) -> Option<Value>;

    /// The record as a plain value, used when an item is grouped or sorted by itself.
    fn as_value(&self) -> Option<Value> {
        None
    }
}

impl Record for HashMap<String, Value> {
    fn property(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl Record for Value {
    fn property(&self, name: &str) -> Option<Value> {
        match self {
            Value::Record(inner) => inner.property(name),
            _ => None,
        }
    }

    fn as_value(&self) -> Option<Value> {
        Some(self.clone())
    }
}

/// Shared, identity-compared handle to an item.
///
/// Two handles are equal only if they point at the same allocation, so the same
/// content pushed twice into a source is two distinct items.
#[derive(Clone)]
pub struct ItemRef(Rc<dyn Record>);

impl ItemRef {
    pub fn new<R: Record + 'static>(record: R) -> Self {
        ItemRef(Rc::new(record))
    }

    /// Wraps a plain value as an item (useful for lists of strings or numbers).
    pub fn value(value: impl Into<Value>) -> Self {
        ItemRef(Rc::new(value.into()))
    }

    pub fn from_rc(record: Rc<dyn Record>) -> Self {
        ItemRef(record)
    }

    /// The value used when this item stands for itself.
    pub fn self_value(&self) -> Value {
        self.0.as_value().unwrap_or_else(|| Value::Record(self.clone()))
    }

    pub fn ptr_eq(&self, other: &ItemRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl Deref for ItemRef {
    type Target = dyn Record;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl PartialEq for ItemRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ItemRef {}

impl Hash for ItemRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Serialize for ItemRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.as_value() {
            Some(value) => value.serialize(serializer),
            None => serializer.serialize_str(&format!("{:?}", self.0)),
        }
    }
}

/// Kinds of non-null values, cached by property sort descriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    Bool,
    Record,
    List,
}

impl ValueKind {
    /// Fixed rank used to order values of different kinds deterministically.
    fn rank(self) -> u8 {
        match self {
            ValueKind::Bool => 0,
            ValueKind::Int32 => 1,
            ValueKind::Int64 => 2,
            ValueKind::Float32 => 3,
            ValueKind::Float64 => 4,
            ValueKind::String => 5,
            ValueKind::List => 6,
            ValueKind::Record => 7,
        }
    }
}

/// Dynamically typed property value.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    Bool(bool),
    /// A nested record, the target of dotted property paths.
    Record(ItemRef),
    /// A collection of values; as a group key it places the item in several groups.
    List(Vec<Value>),
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Int32(_) => Some(ValueKind::Int32),
            Value::Int64(_) => Some(ValueKind::Int64),
            Value::Float32(_) => Some(ValueKind::Float32),
            Value::Float64(_) => Some(ValueKind::Float64),
            Value::String(_) => Some(ValueKind::String),
            Value::Bool(_) => Some(ValueKind::Bool),
            Value::Record(_) => Some(ValueKind::Record),
            Value::List(_) => Some(ValueKind::List),
            Value::Null => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&ItemRef> {
        match self {
            Value::Record(v) => Some(v),
            _ => None,
        }
    }

    /// Natural ordering: null first, same kinds by value, mixed kinds by kind rank.
    pub fn natural_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Int32(a), Value::Int32(b)) => a.cmp(b),
            (Value::Int64(a), Value::Int64(b)) => a.cmp(b),
            (Value::Float32(a), Value::Float32(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Value::Float64(a), Value::Float64(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let cmp = x.natural_cmp(y);
                    if cmp != Ordering::Equal {
                        return cmp;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::Record(a), Value::Record(b)) => match (a.as_value(), b.as_value()) {
                (Some(x), Some(y)) => x.natural_cmp(&y),
                _ => Ordering::Equal,
            },
            (a, b) => {
                // both non-null here
                let ra = a.kind().map(ValueKind::rank).unwrap_or(0);
                let rb = b.kind().map(ValueKind::rank).unwrap_or(0);
                ra.cmp(&rb)
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => a == b,
            (Value::Float64(a), Value::Float64(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Null, Value::Null) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::String(v) => f.write_str(v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Record(r) => match r.as_value() {
                Some(v) => v.fmt(f),
                None => write!(f, "{:?}", r),
            },
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Null => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<ItemRef> for Value {
    fn from(v: ItemRef) -> Self {
        Value::Record(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}
