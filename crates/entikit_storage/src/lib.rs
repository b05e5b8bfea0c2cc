//! # EntiKit Storage
//!
//! Document store trait and implementations for EntiKit.
//!
//! This crate provides the lowest-level storage abstraction for EntiKit.
//! Stores are **opaque document stores** - they do not interpret the
//! payloads they hold.
//!
//! ## Design Principles
//!
//! - Stores hold byte payloads addressed by `(collection, id)`
//! - Each document can carry named groups addressed by `(collection, id, group)`
//! - Ids are assigned by the store and grow in insertion order
//! - Must be `Send + Sync` for concurrent access
//! - EntiKit owns all payload interpretation
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and ephemeral data
//! - [`FileStore`] - Persistent storage on an append-only journal
//!
//! ## Example
//!
//! ```rust
//! use entikit_storage::{DocumentStore, InMemoryStore};
//!
//! let store = InMemoryStore::new();
//! let id = store.insert("todo", b"hello world").unwrap();
//! store.put_group("todo", id, "details", b"meta").unwrap();
//! assert!(store.exists("todo", id).unwrap());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod journal;
mod memory;
mod table;

pub use backend::{DocumentId, DocumentStore};
pub use error::{StorageError, StorageResult};
pub use file::{FileStore, FileStoreOptions};
pub use journal::compute_crc32;
pub use memory::InMemoryStore;
