//! In-memory document table shared by all store implementations.

use crate::backend::DocumentId;
use crate::error::{StorageError, StorageResult};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default)]
struct Document {
    payload: Vec<u8>,
    groups: BTreeMap<String, Vec<u8>>,
}

/// Live document state.
///
/// Documents are keyed by id inside a `BTreeMap`, so iteration order is
/// insertion order because ids only grow.
#[derive(Debug, Default)]
pub(crate) struct DocumentTable {
    next_id: u64,
    collections: HashMap<String, BTreeMap<DocumentId, Document>>,
}

impl DocumentTable {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 1,
            collections: HashMap::new(),
        }
    }

    /// Reserves the next id without inserting anything.
    pub(crate) fn peek_next_id(&self) -> DocumentId {
        DocumentId::new(self.next_id)
    }

    /// Marks every id below `next_id` as spent.
    pub(crate) fn reserve_ids(&mut self, next_id: DocumentId) {
        self.next_id = self.next_id.max(next_id.as_u64());
    }

    pub(crate) fn insert_with_id(&mut self, collection: &str, id: DocumentId, payload: Vec<u8>) {
        self.next_id = self.next_id.max(id.as_u64() + 1);
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(
                id,
                Document {
                    payload,
                    groups: BTreeMap::new(),
                },
            );
    }

    pub(crate) fn get(&self, collection: &str, id: DocumentId) -> Option<&[u8]> {
        self.collections
            .get(collection)
            .and_then(|docs| docs.get(&id))
            .map(|doc| doc.payload.as_slice())
    }

    pub(crate) fn contains(&self, collection: &str, id: DocumentId) -> bool {
        self.get(collection, id).is_some()
    }

    pub(crate) fn replace(
        &mut self,
        collection: &str,
        id: DocumentId,
        payload: Vec<u8>,
    ) -> StorageResult<()> {
        let doc = self.document_mut(collection, id)?;
        doc.payload = payload;
        Ok(())
    }

    pub(crate) fn remove(&mut self, collection: &str, id: DocumentId) -> bool {
        self.collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(&id))
            .is_some()
    }

    pub(crate) fn scan(&self, collection: &str) -> Vec<(DocumentId, Vec<u8>)> {
        self.collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, doc)| (*id, doc.payload.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn put_group(
        &mut self,
        collection: &str,
        id: DocumentId,
        group: &str,
        payload: Vec<u8>,
    ) -> StorageResult<()> {
        let doc = self.document_mut(collection, id)?;
        doc.groups.insert(group.to_string(), payload);
        Ok(())
    }

    pub(crate) fn get_group(&self, collection: &str, id: DocumentId, group: &str) -> Option<&[u8]> {
        self.collections
            .get(collection)
            .and_then(|docs| docs.get(&id))
            .and_then(|doc| doc.groups.get(group))
            .map(Vec::as_slice)
    }

    pub(crate) fn remove_group(&mut self, collection: &str, id: DocumentId, group: &str) -> bool {
        self.collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(&id))
            .and_then(|doc| doc.groups.remove(group))
            .is_some()
    }

    /// Iterates every live document with its groups, collection by collection.
    pub(crate) fn for_each_document<F>(&self, mut f: F) -> StorageResult<()>
    where
        F: FnMut(&str, DocumentId, &[u8], &BTreeMap<String, Vec<u8>>) -> StorageResult<()>,
    {
        let mut names: Vec<&String> = self.collections.keys().collect();
        names.sort();
        for name in names {
            for (id, doc) in &self.collections[name] {
                f(name, *id, &doc.payload, &doc.groups)?;
            }
        }
        Ok(())
    }

    pub(crate) fn document_count(&self) -> usize {
        self.collections.values().map(BTreeMap::len).sum()
    }

    fn document_mut(&mut self, collection: &str, id: DocumentId) -> StorageResult<&mut Document> {
        self.collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(&id))
            .ok_or_else(|| StorageError::not_found(collection, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one_and_grow() {
        let mut table = DocumentTable::new();
        assert_eq!(table.peek_next_id(), DocumentId::new(1));
        table.insert_with_id("todo", DocumentId::new(1), vec![1]);
        assert_eq!(table.peek_next_id(), DocumentId::new(2));
    }

    #[test]
    fn replayed_id_bumps_counter() {
        let mut table = DocumentTable::new();
        table.insert_with_id("todo", DocumentId::new(41), vec![1]);
        assert_eq!(table.peek_next_id(), DocumentId::new(42));
    }

    #[test]
    fn reservation_only_moves_forward() {
        let mut table = DocumentTable::new();
        table.reserve_ids(DocumentId::new(7));
        assert_eq!(table.peek_next_id(), DocumentId::new(7));
        table.reserve_ids(DocumentId::new(3));
        assert_eq!(table.peek_next_id(), DocumentId::new(7));
    }

    #[test]
    fn group_on_missing_document_fails() {
        let mut table = DocumentTable::new();
        let result = table.put_group("todo", DocumentId::new(9), "details", vec![]);
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[test]
    fn remove_drops_groups() {
        let mut table = DocumentTable::new();
        let id = DocumentId::new(1);
        table.insert_with_id("todo", id, vec![1]);
        table.put_group("todo", id, "details", vec![2]).unwrap();
        assert!(table.remove("todo", id));
        assert!(table.get_group("todo", id, "details").is_none());
        assert_eq!(table.document_count(), 0);
    }
}
