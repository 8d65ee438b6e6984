//! Dotted property paths.
//!
//! A path such as `"Address.City"` is resolved segment by segment: every
//! intermediate value must be a nested [`Value::Record`]. A null intermediate
//! value resolves the whole path to null; a missing property is an error that
//! propagates to whoever asked (sorting, grouping, refresh).

use crate::error::{Result, ViewError};
use crate::value::{ItemRef, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPath {
    raw: String,
    segments: Vec<String>,
}

impl PropertyPath {
    /// Parses a dotted path. An empty path designates the item itself.
    pub fn parse(path: &str) -> Result<Self> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Ok(PropertyPath {
                raw: String::new(),
                segments: Vec::new(),
            });
        }

        let segments: Vec<String> = trimmed.split('.').map(|s| s.trim().to_string()).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(ViewError::InvalidPropertyPath(path.to_string()));
        }

        Ok(PropertyPath {
            raw: trimmed.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// True when the path designates the item itself.
    pub fn is_self(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn resolve(&self, item: &ItemRef) -> Result<Value> {
        if self.is_self() {
            return Ok(item.self_value());
        }

        let mut current = item.clone();
        let last = self.segments.len() - 1;

        for (i, segment) in self.segments.iter().enumerate() {
            let value = current.property(segment).ok_or_else(|| ViewError::PropertyNotFound {
                path: self.raw.clone(),
                segment: segment.clone(),
            })?;

            if i == last {
                return Ok(value);
            }

            current = match value {
                Value::Record(next) => next,
                Value::Null => return Ok(Value::Null),
                _ => {
                    return Err(ViewError::PropertyNotFound {
                        path: self.raw.clone(),
                        segment: self.segments[i + 1].clone(),
                    })
                }
            };
        }

        // segments is non-empty, so the loop always returns
        Ok(Value::Null)
    }
}
