//! Domain error model.

use thiserror::Error;

/// A value that failed to parse into a domain identifier.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed uuid-backed identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Not a usable partition (schema) name.
    #[error("invalid partition: {0}")]
    InvalidPartition(String),
}

impl DomainError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn invalid_partition(msg: impl Into<String>) -> Self {
        Self::InvalidPartition(msg.into())
    }
}
