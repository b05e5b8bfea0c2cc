//! Document store trait definition.

use crate::error::StorageResult;
use std::fmt;

/// Identifier assigned by a store when a document is inserted.
///
/// Identifiers are:
/// - Assigned by the store, never by callers
/// - Immutable once assigned
/// - Strictly increasing in insertion order within one store
/// - Never reused, even after the document is removed
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId(u64);

impl DocumentId {
    /// Creates an identifier from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentId({})", self.0)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<DocumentId> for u64 {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

/// A document store for EntiKit.
///
/// Stores are **opaque byte stores** partitioned into named collections.
/// Every document may carry any number of named *groups*: secondary byte
/// payloads addressed by `(collection, id, group)` whose lifetime is bound
/// to the owning document. EntiKit owns all payload interpretation.
///
/// # Invariants
///
/// - `insert` assigns a fresh id greater than every id previously assigned
/// - `scan` yields documents in insertion order
/// - `remove` drops the document together with all of its groups
/// - Group writes against a missing document fail with `NotFound`
/// - Each call either applies fully or not at all
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For tests and ephemeral data
/// - [`super::FileStore`] - Journal-backed persistent storage
pub trait DocumentStore: Send + Sync {
    /// Inserts a new document and returns its assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be made durable.
    fn insert(&self, collection: &str, payload: &[u8]) -> StorageResult<DocumentId>;

    /// Reads a document payload.
    ///
    /// Returns `None` if the document does not exist.
    fn get(&self, collection: &str, id: DocumentId) -> StorageResult<Option<Vec<u8>>>;

    /// Replaces the payload of an existing document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the document does not exist.
    fn replace(&self, collection: &str, id: DocumentId, payload: &[u8]) -> StorageResult<()>;

    /// Removes a document and all of its groups.
    ///
    /// Returns `false` if there was nothing to remove.
    fn remove(&self, collection: &str, id: DocumentId) -> StorageResult<bool>;

    /// Returns every document of a collection in insertion order.
    ///
    /// **Warning**: This is a full scan.
    fn scan(&self, collection: &str) -> StorageResult<Vec<(DocumentId, Vec<u8>)>>;

    /// Writes (or overwrites) a named group of a document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the document does not exist.
    fn put_group(
        &self,
        collection: &str,
        id: DocumentId,
        group: &str,
        payload: &[u8],
    ) -> StorageResult<()>;

    /// Reads a named group of a document.
    fn get_group(
        &self,
        collection: &str,
        id: DocumentId,
        group: &str,
    ) -> StorageResult<Option<Vec<u8>>>;

    /// Removes a named group of a document.
    ///
    /// Returns `false` if there was nothing to remove.
    fn remove_group(&self, collection: &str, id: DocumentId, group: &str) -> StorageResult<bool>;

    /// Checks whether a document exists.
    fn exists(&self, collection: &str, id: DocumentId) -> StorageResult<bool> {
        Ok(self.get(collection, id)?.is_some())
    }

    /// Returns the number of documents in a collection.
    fn count(&self, collection: &str) -> StorageResult<usize> {
        Ok(self.scan(collection)?.len())
    }
}
