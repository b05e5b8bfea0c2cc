//! # EntiKit Todo
//!
//! The "Todo" content type built on [`entikit_core`].
//!
//! A todo is a base record (title, notes) plus the `todo_details` field
//! group: workflow status, priority, due date and an estimate in hours.
//!
//! ## Example
//!
//! ```rust
//! use entikit_core::{Cache, Config, EntityContext, ManualClock};
//! use entikit_storage::InMemoryStore;
//! use entikit_todo::{NewTodo, Priority, Todos};
//! use std::sync::Arc;
//!
//! let clock = Arc::new(ManualClock::at_date(2024, 6, 1).unwrap());
//! let ctx = EntityContext::new(
//!     Arc::new(InMemoryStore::new()),
//!     Arc::new(Cache::new(clock.clone())),
//!     clock,
//!     Config::default(),
//! );
//! let todos = Todos::new(ctx)?;
//!
//! let id = todos.add(NewTodo::new("Buy milk").priority(Priority::High))?;
//! todos.complete(id)?;
//! assert_eq!(todos.stats()?.status_count("completed"), 1);
//! assert_eq!(todos.clear_completed()?, 1);
//! # Ok::<(), entikit_core::CoreError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod admin;
mod schema;
mod todos;

pub use schema::{details_schema, fields, Priority, TodoStatus, DETAILS, TODO_TYPE};
pub use todos::{NewTodo, Todos, EXPORT_FIELDS};
