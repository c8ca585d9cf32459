//! Error types.
//!
//! Most cache and state operations are total and never return these; they
//! show up at the storage boundary, when parsing snapshots, and when
//! validating dotted paths.

use thiserror::Error;

/// Failure reported by a [`Storage`](crate::Storage) backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage document is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Errors surfaced by [`CacheManager`](crate::CacheManager).
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("invalid cache snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Errors surfaced by [`StateManager`](crate::StateManager) and [`Path`](crate::Path).
#[derive(Debug, Error)]
pub enum StateError {
    #[error("invalid state path {0:?}: paths must be non-empty dot-separated segments")]
    InvalidPath(String),

    #[error("no persisted state for {0:?}")]
    NotPersisted(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("persisted state is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_path_message() {
        let err = StateError::InvalidPath("a..b".to_string());
        assert_eq!(
            err.to_string(),
            "invalid state path \"a..b\": paths must be non-empty dot-separated segments"
        );
    }

    #[test]
    fn test_storage_error_converts_into_state_error() {
        let err: StateError = StorageError::Backend("quota exceeded".to_string()).into();
        assert_eq!(err.to_string(), "storage backend error: quota exceeded");
    }
}
