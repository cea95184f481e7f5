// src/error.rs
//! Application error types with structured error handling.
//!
//! Tree construction failures are fatal to the calling stage, since a
//! malformed hierarchy invalidates every association derived from it.
//! Fetch failures are task-local and only surface here when a batch runs
//! in fail-fast mode.

use crate::fetch::FetchError;
use crate::types::CategoryId;
use thiserror::Error;

/// Malformed category tree input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructureError {
    #[error("Category '{id}' references unknown parent '{parent_id}'")]
    UnknownParent { id: CategoryId, parent_id: CategoryId },

    #[error("Category id '{0}' appears more than once")]
    DuplicateId(CategoryId),

    #[error("Category id '{0}' is reserved for the root sentinel")]
    ReservedId(CategoryId),

    #[error("Tree document root must be the sentinel '{expected}', found '{found}'")]
    InvalidRoot { expected: String, found: CategoryId },

    #[error("Node '{id}' declares parent {declared:?} but is nested under '{actual}'")]
    ParentMismatch {
        id: CategoryId,
        declared: Option<CategoryId>,
        actual: CategoryId,
    },

    #[error("Invalid category entry: {0}")]
    InvalidEntry(#[from] crate::types::ValidationError),
}

/// Main crate error type.
#[derive(Error, Debug)]
pub enum HarvestError {
    #[error(transparent)]
    Structure(#[from] StructureError),

    #[error("Batch aborted by task '{key}' after {attempts} attempt(s): {source}")]
    BatchAborted {
        key: String,
        attempts: u32,
        #[source]
        source: FetchError,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Malformed tree document: {0}")]
    MalformedDocument(#[from] serde_json::Error),

    #[error("Filesystem IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {message}")]
    InternalError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

// Allow converting from anyhow::Error, preserving the message
impl From<anyhow::Error> for HarvestError {
    fn from(err: anyhow::Error) -> Self {
        HarvestError::InternalError {
            message: err.to_string(),
            source: None,
        }
    }
}

impl From<tokio::task::JoinError> for HarvestError {
    fn from(err: tokio::task::JoinError) -> Self {
        HarvestError::InternalError {
            message: format!(
                "Fetch worker task failed with join error: {}. This may indicate a panic in a fetch operation.",
                err
            ),
            source: Some(Box::new(err)),
        }
    }
}

/// Result type alias for convenience
pub type Result<T, E = HarvestError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structure_error_messages() {
        let err = StructureError::UnknownParent {
            id: CategoryId::from(5u64),
            parent_id: CategoryId::from(9u64),
        };
        assert_eq!(
            err.to_string(),
            "Category '5' references unknown parent '9'"
        );

        let err = StructureError::DuplicateId(CategoryId::from(3u64));
        assert_eq!(err.to_string(), "Category id '3' appears more than once");
    }

    #[test]
    fn batch_aborted_keeps_source() {
        use std::error::Error as _;

        let err = HarvestError::BatchAborted {
            key: "post-17".to_string(),
            attempts: 1,
            source: FetchError::NotFound {
                resource: "post-17".to_string(),
            },
        };
        assert!(err.to_string().contains("post-17"));
        assert!(err.source().is_some());
    }
}
