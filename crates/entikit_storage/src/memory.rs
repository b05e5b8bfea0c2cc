//! In-memory document store for testing.

use crate::backend::{DocumentId, DocumentStore};
use crate::error::{StorageError, StorageResult};
use crate::table::DocumentTable;
use parking_lot::RwLock;

/// An in-memory document store.
///
/// This store keeps all documents in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral data that doesn't need persistence
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use entikit_storage::{DocumentStore, InMemoryStore};
///
/// let store = InMemoryStore::new();
/// let id = store.insert("todo", b"payload").unwrap();
/// assert_eq!(store.get("todo", id).unwrap(), Some(b"payload".to_vec()));
/// ```
#[derive(Debug)]
pub struct InMemoryStore {
    table: RwLock<DocumentTable>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: RwLock::new(DocumentTable::new()),
        }
    }

    /// Returns the number of documents across all collections.
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.table.read().document_count()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for InMemoryStore {
    fn insert(&self, collection: &str, payload: &[u8]) -> StorageResult<DocumentId> {
        let mut table = self.table.write();
        let id = table.peek_next_id();
        table.insert_with_id(collection, id, payload.to_vec());
        Ok(id)
    }

    fn get(&self, collection: &str, id: DocumentId) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.table.read().get(collection, id).map(<[u8]>::to_vec))
    }

    fn replace(&self, collection: &str, id: DocumentId, payload: &[u8]) -> StorageResult<()> {
        self.table.write().replace(collection, id, payload.to_vec())
    }

    fn remove(&self, collection: &str, id: DocumentId) -> StorageResult<bool> {
        Ok(self.table.write().remove(collection, id))
    }

    fn scan(&self, collection: &str) -> StorageResult<Vec<(DocumentId, Vec<u8>)>> {
        Ok(self.table.read().scan(collection))
    }

    fn put_group(
        &self,
        collection: &str,
        id: DocumentId,
        group: &str,
        payload: &[u8],
    ) -> StorageResult<()> {
        self.table
            .write()
            .put_group(collection, id, group, payload.to_vec())
    }

    fn get_group(
        &self,
        collection: &str,
        id: DocumentId,
        group: &str,
    ) -> StorageResult<Option<Vec<u8>>> {
        Ok(self
            .table
            .read()
            .get_group(collection, id, group)
            .map(<[u8]>::to_vec))
    }

    fn remove_group(&self, collection: &str, id: DocumentId, group: &str) -> StorageResult<bool> {
        let mut table = self.table.write();
        if !table.contains(collection, id) {
            return Err(StorageError::not_found(collection, id));
        }
        Ok(table.remove_group(collection, id, group))
    }
}
