//! # EntiKit Core
//!
//! Generic entity, schema, cache and export layer for EntiKit.
//!
//! This crate provides:
//! - [`Cache`]: namespaced TTL cache for derived values
//! - [`FieldSchema`]: typed, validated field groups ("metaboxes")
//! - [`Entity`]: a content type with CRUD, queries, cached statistics and
//!   admin metadata
//! - [`Exporter`]: streaming CSV / JSON-lines export of entity views
//!
//! Records and field groups are kept in any [`entikit_storage::DocumentStore`].
//! All interpretation of stored bytes happens here.
//!
//! ## Collaborators
//!
//! Everything an entity touches is injected through [`EntityContext`]: the
//! document store, the shared cache, a [`Clock`] and a [`TempSink`] for
//! export artifacts.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod clock;
mod codec;
mod config;
mod entity;
mod error;
mod export;
mod schema;

pub use cache::{Cache, CacheKey, CacheStats, CacheStatsSnapshot};
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::CodecError;
pub use config::Config;
pub use entity::{
    AdminButton, AdminColumn, CellFormatter, Comparison, Condition, Entity, EntityBuilder,
    EntityContext, EntityCore, EntityId, EntityPatch, EntityRecord, EntityView, Lifecycle,
    MetaInput, Query, RecordStatus, Scalar, SetupHook, SortOrder, StatsSnapshot, StatsSpec,
    Target, TeardownHook,
};
pub use error::{CoreError, CoreResult, SchemaError, SchemaResult};
pub use export::{
    ExportFormat, ExportHandle, ExportSpec, Exporter, FieldPath, FsTempSink, TempHandle, TempSink,
};
pub use schema::{
    Choices, Constraints, ErrorHook, ErrorKind, FieldDef, FieldKind, FieldSchema, FieldValue,
    FieldValues, Hook, HookRegistry, RawValues, SchemaBuilder, SchemaRegistry, SuccessHook,
    ValidationErrors, DEFAULT_DATE_FORMAT,
};
