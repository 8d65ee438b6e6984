//! Error type shared by every view, comparer and container operation.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewError {
    /// The source collection is gone (never existed, or was dropped before a refresh).
    #[error("source collection is not available")]
    MissingSource,

    /// The view only mirrors its source; list mutation must go through the source.
    #[error("collection view is read-only: '{operation}' is not supported")]
    ReadOnly { operation: &'static str },

    #[error("property '{segment}' not found while resolving path '{path}'")]
    PropertyNotFound { path: String, segment: String },

    #[error("invalid property path '{0}'")]
    InvalidPropertyPath(String),

    /// A sort description was changed after being attached to a view.
    #[error("sort description is sealed and can't be changed")]
    Sealed,

    #[error("index {index} out of range [0, {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("unknown storage hint: '{0}'. Use 'fast_reads' or 'fast_updates'")]
    UnknownStorageHint(String),

    #[error("invalid view options: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ViewError>;
