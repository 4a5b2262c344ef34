use thiserror::Error;

/// Errors surfaced by `ChainedHashMap` accessors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapError {
    /// `at` was asked for a key with no live entry.
    #[error("key not found")]
    KeyNotFound,
}
