//! # EntiKit Testkit
//!
//! Test utilities for EntiKit.
//!
//! This crate provides:
//! - Harnesses wiring a store, cache, manual clock and export directory
//! - Ready-made todo scenarios
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use entikit_testkit::prelude::*;
//!
//! with_todos(|todos, _clock| {
//!     scenarios::mixed_statuses(todos);
//!     assert_eq!(todos.stats().unwrap().total, 6);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
