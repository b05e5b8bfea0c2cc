//! Journal-backed document store for persistent storage.

use crate::backend::{DocumentId, DocumentStore};
use crate::error::{StorageError, StorageResult};
use crate::journal::{read_frame, FrameRead, JournalOp};
use crate::table::DocumentTable;
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File names within the store directory.
const JOURNAL_FILE: &str = "entikit.journal";
const JOURNAL_TEMP: &str = "entikit.journal.tmp";
const LOCK_FILE: &str = "LOCK";

/// Options for opening a [`FileStore`].
#[derive(Debug, Clone)]
pub struct FileStoreOptions {
    /// Whether to create the directory if it doesn't exist.
    pub create_if_missing: bool,
    /// Whether to `fsync` the journal after every write (safer but slower).
    pub sync_on_write: bool,
}

impl Default for FileStoreOptions {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_on_write: true,
        }
    }
}

impl FileStoreOptions {
    /// Creates options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to sync the journal on every write.
    #[must_use]
    pub const fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }
}

struct Inner {
    table: DocumentTable,
    journal: File,
}

/// A persistent document store backed by an append-only journal.
///
/// Layout:
///
/// ```text
/// <dir>/
/// ├─ LOCK               # Advisory lock for single-writer
/// └─ entikit.journal    # Append-only mutation journal
/// ```
///
/// The full document table is rebuilt from the journal on open. A torn
/// trailing frame (crash during append) is cut off; any other damage is
/// reported as [`StorageError::Corrupted`].
///
/// # Durability
///
/// Each mutation is appended before it becomes visible. With
/// `sync_on_write` the journal is `fsync`ed before the call returns.
///
/// # Example
///
/// ```no_run
/// use entikit_storage::{DocumentStore, FileStore};
/// use std::path::Path;
///
/// let store = FileStore::open(Path::new("todo_data")).unwrap();
/// let id = store.insert("todo", b"payload").unwrap();
/// ```
pub struct FileStore {
    dir: PathBuf,
    options: FileStoreOptions,
    inner: Mutex<Inner>,
    _lock_file: File,
}

impl FileStore {
    /// Opens or creates a store with default options.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be used, another process
    /// holds the lock, or the journal is corrupted.
    pub fn open(dir: &Path) -> StorageResult<Self> {
        Self::open_with_options(dir, FileStoreOptions::default())
    }

    /// Opens or creates a store.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory doesn't exist and `create_if_missing` is false
    /// - Another process holds the lock (`Locked`)
    /// - The journal is corrupted (`Corrupted`)
    pub fn open_with_options(dir: &Path, options: FileStoreOptions) -> StorageResult<Self> {
        if !dir.exists() {
            if options.create_if_missing {
                fs::create_dir_all(dir)?;
            } else {
                return Err(StorageError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("store directory does not exist: {}", dir.display()),
                )));
            }
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked);
        }

        let journal_path = dir.join(JOURNAL_FILE);
        let mut journal = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&journal_path)?;

        let table = Self::replay(&mut journal)?;
        info!(
            path = %dir.display(),
            documents = table.document_count(),
            "file store opened"
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            options,
            inner: Mutex::new(Inner { table, journal }),
            _lock_file: lock_file,
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Returns the number of live documents across all collections.
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.inner.lock().table.document_count()
    }

    /// Rewrites the journal so it only holds the live documents and the
    /// next id to hand out.
    ///
    /// The new journal is written to a temporary file and renamed over the
    /// old one, so a crash leaves either the old or the new journal intact.
    pub fn compact(&self) -> StorageResult<()> {
        let mut inner = self.inner.lock();
        let temp_path = self.dir.join(JOURNAL_TEMP);
        let mut temp = File::create(&temp_path)?;
        let reserve = JournalOp::ReserveIds {
            next_id: inner.table.peek_next_id(),
        };
        temp.write_all(&reserve.encode_frame()?)?;
        let mut frames = 1usize;

        inner.table.for_each_document(|collection, id, payload, groups| {
            let insert = JournalOp::Insert {
                collection: collection.to_string(),
                id,
                payload: payload.to_vec(),
            };
            temp.write_all(&insert.encode_frame()?)?;
            frames += 1;
            for (group, group_payload) in groups {
                let put = JournalOp::PutGroup {
                    collection: collection.to_string(),
                    id,
                    group: group.clone(),
                    payload: group_payload.clone(),
                };
                temp.write_all(&put.encode_frame()?)?;
                frames += 1;
            }
            Ok(())
        })?;
        temp.sync_all()?;
        drop(temp);

        let journal_path = self.dir.join(JOURNAL_FILE);
        fs::rename(&temp_path, &journal_path)?;
        inner.journal = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&journal_path)?;

        debug!(frames, "journal compacted");
        Ok(())
    }

    fn replay(journal: &mut File) -> StorageResult<DocumentTable> {
        let mut data = Vec::new();
        journal.read_to_end(&mut data)?;

        let mut table = DocumentTable::new();
        let mut pos = 0usize;
        loop {
            match read_frame(&data, pos)? {
                FrameRead::Frame { op, next } => {
                    Self::apply(&mut table, op);
                    pos = next;
                }
                FrameRead::End => break,
                FrameRead::TornTail => {
                    warn!(
                        offset = pos,
                        discarded = data.len() - pos,
                        "discarding torn journal tail"
                    );
                    journal.set_len(pos as u64)?;
                    break;
                }
            }
        }
        Ok(table)
    }

    /// Applies a replayed operation. Replay is lenient: an operation on a
    /// document that no longer exists is skipped.
    fn apply(table: &mut DocumentTable, op: JournalOp) {
        match op {
            JournalOp::Insert {
                collection,
                id,
                payload,
            } => table.insert_with_id(&collection, id, payload),
            JournalOp::Replace {
                collection,
                id,
                payload,
            } => {
                let _ = table.replace(&collection, id, payload);
            }
            JournalOp::Remove { collection, id } => {
                table.remove(&collection, id);
            }
            JournalOp::PutGroup {
                collection,
                id,
                group,
                payload,
            } => {
                let _ = table.put_group(&collection, id, &group, payload);
            }
            JournalOp::RemoveGroup {
                collection,
                id,
                group,
            } => {
                table.remove_group(&collection, id, &group);
            }
            JournalOp::ReserveIds { next_id } => table.reserve_ids(next_id),
        }
    }

    fn append(&self, inner: &mut Inner, op: &JournalOp) -> StorageResult<()> {
        inner.journal.write_all(&op.encode_frame()?)?;
        inner.journal.flush()?;
        if self.options.sync_on_write {
            inner.journal.sync_data()?;
        }
        Ok(())
    }
}

impl DocumentStore for FileStore {
    fn insert(&self, collection: &str, payload: &[u8]) -> StorageResult<DocumentId> {
        let mut inner = self.inner.lock();
        let id = inner.table.peek_next_id();
        let op = JournalOp::Insert {
            collection: collection.to_string(),
            id,
            payload: payload.to_vec(),
        };
        self.append(&mut inner, &op)?;
        inner.table.insert_with_id(collection, id, payload.to_vec());
        Ok(id)
    }

    fn get(&self, collection: &str, id: DocumentId) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.inner.lock().table.get(collection, id).map(<[u8]>::to_vec))
    }

    fn replace(&self, collection: &str, id: DocumentId, payload: &[u8]) -> StorageResult<()> {
        let mut inner = self.inner.lock();
        if !inner.table.contains(collection, id) {
            return Err(StorageError::not_found(collection, id));
        }
        let op = JournalOp::Replace {
            collection: collection.to_string(),
            id,
            payload: payload.to_vec(),
        };
        self.append(&mut inner, &op)?;
        inner.table.replace(collection, id, payload.to_vec())
    }

    fn remove(&self, collection: &str, id: DocumentId) -> StorageResult<bool> {
        let mut inner = self.inner.lock();
        if !inner.table.contains(collection, id) {
            return Ok(false);
        }
        let op = JournalOp::Remove {
            collection: collection.to_string(),
            id,
        };
        self.append(&mut inner, &op)?;
        Ok(inner.table.remove(collection, id))
    }

    fn scan(&self, collection: &str) -> StorageResult<Vec<(DocumentId, Vec<u8>)>> {
        Ok(self.inner.lock().table.scan(collection))
    }

    fn put_group(
        &self,
        collection: &str,
        id: DocumentId,
        group: &str,
        payload: &[u8],
    ) -> StorageResult<()> {
        let mut inner = self.inner.lock();
        if !inner.table.contains(collection, id) {
            return Err(StorageError::not_found(collection, id));
        }
        let op = JournalOp::PutGroup {
            collection: collection.to_string(),
            id,
            group: group.to_string(),
            payload: payload.to_vec(),
        };
        self.append(&mut inner, &op)?;
        inner.table.put_group(collection, id, group, payload.to_vec())
    }

    fn get_group(
        &self,
        collection: &str,
        id: DocumentId,
        group: &str,
    ) -> StorageResult<Option<Vec<u8>>> {
        Ok(self
            .inner
            .lock()
            .table
            .get_group(collection, id, group)
            .map(<[u8]>::to_vec))
    }

    fn remove_group(&self, collection: &str, id: DocumentId, group: &str) -> StorageResult<bool> {
        let mut inner = self.inner.lock();
        if !inner.table.contains(collection, id) {
            return Err(StorageError::not_found(collection, id));
        }
        if inner.table.get_group(collection, id, group).is_none() {
            return Ok(false);
        }
        let op = JournalOp::RemoveGroup {
            collection: collection.to_string(),
            id,
            group: group.to_string(),
        };
        self.append(&mut inner, &op)?;
        Ok(inner.table.remove_group(collection, id, group))
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("dir", &self.dir)
            .field("documents", &self.document_count())
            .finish_non_exhaustive()
    }
}
