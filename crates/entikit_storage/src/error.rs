//! Error types for storage operations.

use crate::backend::DocumentId;
use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The addressed document does not exist.
    #[error("document {id} not found in collection '{collection}'")]
    NotFound {
        /// Collection that was searched.
        collection: String,
        /// The missing document.
        id: DocumentId,
    },

    /// The journal file is corrupted.
    #[error("journal corrupted at offset {offset}: {message}")]
    Corrupted {
        /// Byte offset of the bad frame.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// Another process holds the store lock.
    #[error("store locked: another process has exclusive access")]
    Locked,

    /// A name does not fit the journal frame format.
    #[error("invalid name '{name}': {reason}")]
    InvalidName {
        /// The rejected collection or group name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}

impl StorageError {
    /// Creates a not-found error.
    pub fn not_found(collection: impl Into<String>, id: DocumentId) -> Self {
        Self::NotFound {
            collection: collection.into(),
            id,
        }
    }

    /// Creates a corruption error.
    pub fn corrupted(offset: u64, message: impl Into<String>) -> Self {
        Self::Corrupted {
            offset,
            message: message.into(),
        }
    }
}
