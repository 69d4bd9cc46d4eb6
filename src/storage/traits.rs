//! Storage trait definitions

use crate::graph::{Node, NodeRecord};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("source unavailable: {}: {source}", .path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt store {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StorageError {
    /// True when the store file simply does not exist yet
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::SourceUnavailable { source, .. }
                if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A flat collection of knowledge nodes, read and written whole.
///
/// Implementations do no interpretation beyond serialization; legacy
/// records come back as-is and are migrated by the caller.
pub trait NodeStore: Send + Sync {
    /// Read the full collection in stored order
    fn load(&self) -> StorageResult<Vec<NodeRecord>>;

    /// Replace the full collection
    fn save(&self, nodes: &[Node]) -> StorageResult<()>;

    /// Human-readable location for diagnostics
    fn describe(&self) -> String;

    /// Load, treating a store that does not exist yet as empty.
    /// A store that exists but cannot be parsed is still an error.
    fn load_or_empty(&self) -> StorageResult<Vec<NodeRecord>> {
        match self.load() {
            Err(e) if e.is_not_found() => {
                tracing::info!(store = %self.describe(), "store not found, starting empty");
                Ok(Vec::new())
            }
            other => other,
        }
    }
}
