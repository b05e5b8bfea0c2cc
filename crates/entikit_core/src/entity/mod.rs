//! Entity types ("models").
//!
//! An [`Entity`] binds an entity type name to its field schemas, a document
//! store collection, the shared cache and an exporter. It owns its
//! lifecycle: nothing but inspection is allowed until [`Entity::run`] has
//! completed.
//!
//! # Storage layout
//!
//! - Base records live in the collection named after the entity type
//! - Each schema's values are one group of the record, named by schema id
//! - Statistics are cached under `("<type>s", "<type>_stats")`
//!
//! # Example
//!
//! ```rust
//! use entikit_core::{
//!     Cache, Choices, Config, Constraints, Entity, EntityContext, EntityCore, FieldSchema,
//!     ManualClock, MetaInput, Query,
//! };
//! use entikit_storage::InMemoryStore;
//! use std::sync::Arc;
//!
//! let clock = Arc::new(ManualClock::at_date(2024, 6, 1).unwrap());
//! let ctx = EntityContext::new(
//!     Arc::new(InMemoryStore::new()),
//!     Arc::new(Cache::new(clock.clone())),
//!     clock,
//!     Config::default(),
//! );
//!
//! let details = FieldSchema::define("details", "Details", "note")
//!     .select("mood", "Mood", Choices::from([("calm", "Calm"), ("busy", "Busy")]), Constraints::new())?
//!     .build()?;
//! let notes = Entity::builder("note").schema(details).build(ctx)?;
//! notes.run()?;
//!
//! let id = notes.create(EntityCore::new("Hello"), MetaInput::new().set("details", "mood", "calm"))?;
//! let all = notes.get_posts(&Query::new(), true)?;
//! assert_eq!(all[0].id(), id);
//! assert_eq!(notes.get_stats()?.total, 1);
//! # Ok::<(), entikit_core::CoreError>(())
//! ```

mod admin;
mod lifecycle;
mod query;
mod record;
mod stats;

pub use admin::{AdminButton, AdminColumn, CellFormatter};
pub use lifecycle::{Lifecycle, SetupHook, TeardownHook};
pub use query::{Comparison, Condition, Query, Scalar, SortOrder, Target};
pub use record::{EntityCore, EntityPatch, EntityRecord, EntityView, MetaInput, RecordStatus};
pub use stats::{StatsSnapshot, StatsSpec};

/// Store-assigned entity identifier.
pub use entikit_storage::DocumentId as EntityId;

use crate::cache::Cache;
use crate::clock::Clock;
use crate::codec;
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::export::{ExportHandle, ExportSpec, Exporter, FsTempSink, TempSink};
use crate::schema::{FieldKind, FieldSchema, FieldValues, SchemaRegistry};
use entikit_storage::DocumentStore;
use parking_lot::{Mutex, RwLock};
use record::StoredRecord;
use stats::StatsAccumulator;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Collaborators shared by entity types.
#[derive(Clone)]
pub struct EntityContext {
    /// Document store holding records and field groups.
    pub store: Arc<dyn DocumentStore>,
    /// Cache shared across entity types.
    pub cache: Arc<Cache>,
    /// Time source for timestamps and "today".
    pub clock: Arc<dyn Clock>,
    /// Settings.
    pub config: Config,
    /// Destination of export artifacts.
    pub sink: Arc<dyn TempSink>,
}

impl EntityContext {
    /// Creates a context exporting to the directory named by `config`.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        cache: Arc<Cache>,
        clock: Arc<dyn Clock>,
        config: Config,
    ) -> Self {
        let sink = Arc::new(FsTempSink::from_config(&config));
        Self {
            store,
            cache,
            clock,
            config,
            sink,
        }
    }

    /// Replaces the export sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn TempSink>) -> Self {
        self.sink = sink;
        self
    }
}

impl fmt::Debug for EntityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityContext")
            .field("cache", &self.cache)
            .field("clock", &self.clock)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Entity`].
pub struct EntityBuilder {
    entity_type: String,
    label: Option<String>,
    schemas: Vec<FieldSchema>,
    stats: StatsSpec,
    columns: Vec<AdminColumn>,
    buttons: Vec<AdminButton>,
    setup: Vec<SetupHook>,
    teardown: Vec<TeardownHook>,
}

impl EntityBuilder {
    /// Sets the human-readable label (defaults to the type name).
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Attaches a field schema.
    #[must_use]
    pub fn schema(mut self, schema: FieldSchema) -> Self {
        self.schemas.push(schema);
        self
    }

    /// Sets how statistics are computed.
    #[must_use]
    pub fn stats(mut self, spec: StatsSpec) -> Self {
        self.stats = spec;
        self
    }

    /// Adds an admin list column.
    #[must_use]
    pub fn column(mut self, column: AdminColumn) -> Self {
        self.columns.push(column);
        self
    }

    /// Adds an admin list button.
    #[must_use]
    pub fn button(mut self, button: AdminButton) -> Self {
        self.buttons.push(button);
        self
    }

    /// Adds a callback run by `run()` before the entity accepts operations.
    #[must_use]
    pub fn on_setup<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Entity) -> CoreResult<()> + Send + Sync + 'static,
    {
        self.setup.push(Box::new(hook));
        self
    }

    /// Adds a callback run when a running entity is dropped.
    #[must_use]
    pub fn on_teardown<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Entity) + Send + Sync + 'static,
    {
        self.teardown.push(Box::new(hook));
        self
    }

    /// Builds the entity in the `Unregistered` state.
    ///
    /// # Errors
    ///
    /// - `SchemaError::OwnerMismatch` or `SchemaError::DuplicateSchema` for
    ///   a bad schema set
    /// - `CoreError::InvalidQuery` if the stats spec names an unknown schema
    pub fn build(self, ctx: EntityContext) -> CoreResult<Entity> {
        let mut registry = SchemaRegistry::new(self.entity_type.clone());
        for schema in self.schemas {
            registry.register(Arc::new(schema))?;
        }
        for target in self.stats.targets() {
            check_target(&registry, target)?;
        }

        let exporter = Exporter::new(Arc::clone(&ctx.sink)).with_delimiter(ctx.config.csv_delimiter);
        let label = self.label.unwrap_or_else(|| self.entity_type.clone());

        Ok(Entity {
            entity_type: self.entity_type,
            label,
            schemas: registry,
            stats_spec: self.stats,
            columns: self.columns,
            buttons: self.buttons,
            setup: self.setup,
            teardown: self.teardown,
            ctx,
            exporter,
            state: RwLock::new(Lifecycle::Unregistered),
            run_lock: Mutex::new(()),
        })
    }
}

/// A content type with schemas, cached statistics and exports.
///
/// # Thread Safety
///
/// `Entity` is `Send + Sync`. Operations may run concurrently; each store
/// call is atomic on its own but a multi-step operation such as `create`
/// is not.
pub struct Entity {
    entity_type: String,
    label: String,
    schemas: SchemaRegistry,
    stats_spec: StatsSpec,
    columns: Vec<AdminColumn>,
    buttons: Vec<AdminButton>,
    setup: Vec<SetupHook>,
    teardown: Vec<TeardownHook>,
    ctx: EntityContext,
    exporter: Exporter,
    state: RwLock<Lifecycle>,
    /// Serializes `run()` calls.
    run_lock: Mutex<()>,
}

impl Entity {
    /// Starts building an entity type.
    pub fn builder(entity_type: impl Into<String>) -> EntityBuilder {
        EntityBuilder {
            entity_type: entity_type.into(),
            label: None,
            schemas: Vec::new(),
            stats: StatsSpec::default(),
            columns: Vec::new(),
            buttons: Vec::new(),
            setup: Vec::new(),
            teardown: Vec::new(),
        }
    }

    /// Registers the entity and runs its setup callbacks in order.
    ///
    /// Calling `run()` on a running entity does nothing. If a setup callback
    /// fails the entity stays `Registered` and a later `run()` starts the
    /// callbacks over.
    ///
    /// # Errors
    ///
    /// Returns the first setup callback error.
    pub fn run(&self) -> CoreResult<&Self> {
        let _guard = self.run_lock.lock();
        if self.state().is_running() {
            debug!(entity = %self.entity_type, "run() on running entity ignored");
            return Ok(self);
        }

        *self.state.write() = Lifecycle::Registered;
        debug!(entity = %self.entity_type, schemas = self.schemas.len(), "entity registered");

        for hook in &self.setup {
            if let Err(err) = hook(self) {
                warn!(entity = %self.entity_type, error = %err, "setup callback failed");
                return Err(err);
            }
        }

        *self.state.write() = Lifecycle::Running;
        info!(entity = %self.entity_type, "entity running");
        Ok(self)
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> Lifecycle {
        *self.state.read()
    }

    /// Returns the entity type name.
    #[must_use]
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Returns the human-readable label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the registered schemas.
    #[must_use]
    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    /// Returns one schema.
    #[must_use]
    pub fn schema(&self, id: &str) -> Option<&FieldSchema> {
        self.schemas.get(id).map(|s| s.as_ref())
    }

    /// Returns the shared context.
    #[must_use]
    pub fn context(&self) -> &EntityContext {
        &self.ctx
    }

    /// Returns the `(namespace, key)` the statistics are cached under.
    #[must_use]
    pub fn stats_cache_key(&self) -> (String, String) {
        (
            format!("{}s", self.entity_type),
            format!("{}_stats", self.entity_type),
        )
    }

    /// Returns the admin list columns.
    #[must_use]
    pub fn admin_columns(&self) -> &[AdminColumn] {
        &self.columns
    }

    /// Returns the admin list buttons.
    #[must_use]
    pub fn admin_buttons(&self) -> &[AdminButton] {
        &self.buttons
    }

    /// Creates a record and stores the supplied field groups.
    ///
    /// The base record is written first, then each supplied schema in
    /// registration order. A schema failure is returned but the base record
    /// (and any group written before the failure) is kept. Cached
    /// statistics are dropped once the last write has been attempted.
    ///
    /// # Errors
    ///
    /// - `CoreError::NotRunning` before `run()`
    /// - `SchemaError::UnknownSchema` for meta of an unknown schema, before
    ///   anything is written
    /// - `SchemaError::Validation` from the first failing schema
    /// - `CoreError::Storage` from the store
    pub fn create(&self, core: EntityCore, meta: MetaInput) -> CoreResult<EntityId> {
        self.require_running()?;
        self.check_meta(&meta)?;

        let now = self.ctx.clock.now();
        let record = StoredRecord {
            title: core.title,
            body: core.body,
            status: core.status,
            created_at: now,
            modified_at: now,
        };
        let id = self
            .ctx
            .store
            .insert(&self.entity_type, &codec::encode(&record)?)?;
        info!(entity = %self.entity_type, %id, "record created");

        let written = self.persist_meta(id, &meta, false);
        self.invalidate_stats();
        written.map(|()| id)
    }

    /// Changes base fields and field groups of an existing record.
    ///
    /// Supplied values are merged over the stored ones, so a partial
    /// schema input leaves other fields of that schema as they were.
    ///
    /// # Errors
    ///
    /// - `CoreError::NotFound` if the record does not exist, checked before
    ///   the meta; nothing changes
    /// - the same errors as [`Entity::create`]
    pub fn update(&self, id: EntityId, patch: EntityPatch, meta: MetaInput) -> CoreResult<()> {
        self.require_running()?;
        let mut record = self.load_record(id)?.ok_or_else(|| self.not_found(id))?;
        self.check_meta(&meta)?;

        patch.apply(&mut record);
        record.modified_at = self.ctx.clock.now();
        self.ctx
            .store
            .replace(&self.entity_type, id, &codec::encode(&record)?)?;
        info!(entity = %self.entity_type, %id, "record updated");

        let written = self.persist_meta(id, &meta, true);
        self.invalidate_stats();
        written
    }

    /// Removes a record and all of its field groups.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` if the record does not exist.
    pub fn delete(&self, id: EntityId) -> CoreResult<()> {
        self.require_running()?;
        if !self.ctx.store.remove(&self.entity_type, id)? {
            return Err(self.not_found(id));
        }
        self.invalidate_stats();
        info!(entity = %self.entity_type, %id, "record deleted");
        Ok(())
    }

    /// Reads one record.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or a document cannot be decoded.
    pub fn get(&self, id: EntityId, with_meta: bool) -> CoreResult<Option<EntityView>> {
        self.require_running()?;
        let Some(record) = self.load_record(id)? else {
            return Ok(None);
        };
        let record = record.into_record(id, &self.entity_type);
        let meta = if with_meta {
            self.load_meta(id, self.schemas.iter().map(|s| s.id()))?
        } else {
            BTreeMap::new()
        };
        Ok(Some(EntityView { record, meta }))
    }

    /// Lists records matching a query.
    ///
    /// With `with_meta` every schema's values are loaded into each view;
    /// otherwise only the schemas the query reads are.
    ///
    /// # Errors
    ///
    /// - `CoreError::InvalidQuery` if the query names an unknown schema
    /// - store and codec errors
    pub fn get_posts(&self, query: &Query, with_meta: bool) -> CoreResult<Vec<EntityView>> {
        self.stream_posts(query, with_meta)?.collect()
    }

    /// Counts records matching a query, ignoring its pagination.
    ///
    /// # Errors
    ///
    /// See [`Entity::get_posts`].
    pub fn count(&self, query: &Query) -> CoreResult<usize> {
        self.require_running()?;
        let schemas = self.query_schemas(query, false)?;
        let mut count = 0;
        for view in self.scan_views(schemas)? {
            if query.matches(&view?) {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Iterates over records matching a query.
    ///
    /// Without a sort key, records are decoded and filtered lazily as the
    /// iterator advances. With one, all matches are collected and sorted
    /// first.
    ///
    /// # Errors
    ///
    /// See [`Entity::get_posts`]. Per-record errors are yielded as items.
    pub fn stream_posts<'a>(
        &'a self,
        query: &'a Query,
        with_meta: bool,
    ) -> CoreResult<Box<dyn Iterator<Item = CoreResult<EntityView>> + 'a>> {
        self.require_running()?;
        let schemas = self.query_schemas(query, with_meta)?;
        let matching = self
            .scan_views(schemas)?
            .filter(move |view| view.as_ref().map_or(true, |v| query.matches(v)));

        if query.sort().is_none() {
            return Ok(Box::new(query.paginate(matching)));
        }

        let mut views = matching.collect::<CoreResult<Vec<_>>>()?;
        query.sort_views(&mut views);
        Ok(Box::new(query.paginate(views.into_iter().map(Ok::<_, CoreError>))))
    }

    /// Returns cached statistics, computing them on a miss.
    ///
    /// # Errors
    ///
    /// Returns store or codec errors from the computation.
    pub fn get_stats(&self) -> CoreResult<StatsSnapshot> {
        self.require_running()?;
        let (namespace, key) = self.stats_cache_key();
        self.ctx
            .cache
            .remember(&namespace, &key, self.ctx.config.stats_ttl, || {
                self.compute_stats()
            })
    }

    /// Writes matching records to a new export artifact.
    ///
    /// # Errors
    ///
    /// - `CoreError::InvalidQuery` if the query names an unknown schema
    /// - `CoreError::Export` if the artifact cannot be written
    pub fn export(&self, spec: &ExportSpec) -> CoreResult<ExportHandle> {
        self.require_running()?;
        info!(
            entity = %self.entity_type,
            columns = spec.fields.len(),
            format = ?spec.format,
            "export started"
        );
        let rows = self.stream_posts(&spec.query, true)?;
        self.exporter.export(rows, &spec.fields, spec.format)
    }

    /// Deletes an export artifact.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact exists but cannot be removed.
    pub fn discard_export(&self, handle: &ExportHandle) -> CoreResult<()> {
        self.exporter.discard(handle)
    }

    fn require_running(&self) -> CoreResult<()> {
        match self.state() {
            Lifecycle::Running => Ok(()),
            state => Err(CoreError::NotRunning {
                entity_type: self.entity_type.clone(),
                state,
            }),
        }
    }

    fn not_found(&self, id: EntityId) -> CoreError {
        CoreError::not_found(&self.entity_type, id)
    }

    fn invalidate_stats(&self) {
        let (namespace, key) = self.stats_cache_key();
        self.ctx.cache.delete(&namespace, &key);
    }

    fn check_meta(&self, meta: &MetaInput) -> CoreResult<()> {
        for schema in meta.schema_ids() {
            self.schemas.require(schema)?;
        }
        Ok(())
    }

    fn persist_meta(&self, id: EntityId, meta: &MetaInput, merge: bool) -> CoreResult<()> {
        for schema in self.schemas.iter() {
            let Some(raw) = meta.get(schema.id()) else {
                continue;
            };
            let input = if merge {
                let mut merged = schema.to_raw(&schema.load(self.ctx.store.as_ref(), id)?);
                merged.extend(raw.iter().map(|(k, v)| (k.clone(), v.clone())));
                merged
            } else {
                raw.clone()
            };
            schema.persist(self.ctx.store.as_ref(), id, &input)?;
        }
        Ok(())
    }

    fn load_record(&self, id: EntityId) -> CoreResult<Option<StoredRecord>> {
        match self.ctx.store.get(&self.entity_type, id)? {
            Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn load_meta<'s>(
        &self,
        id: EntityId,
        schemas: impl IntoIterator<Item = &'s str>,
    ) -> CoreResult<BTreeMap<String, FieldValues>> {
        let mut meta = BTreeMap::new();
        for schema_id in schemas {
            let schema = self.schemas.require(schema_id)?;
            meta.insert(
                schema_id.to_string(),
                schema.load(self.ctx.store.as_ref(), id)?,
            );
        }
        Ok(meta)
    }

    /// Schemas to load for a query: all of them with `with_meta`, otherwise
    /// the ones it reads.
    fn query_schemas(&self, query: &Query, with_meta: bool) -> CoreResult<Vec<String>> {
        for schema in query.schemas() {
            if self.schemas.get(schema).is_none() {
                return Err(CoreError::invalid_query(format!(
                    "{} has no schema '{schema}'",
                    self.entity_type
                )));
            }
        }
        Ok(if with_meta {
            self.schemas.iter().map(|s| s.id().to_string()).collect()
        } else {
            query.schemas().into_iter().map(str::to_string).collect()
        })
    }

    /// Decodes every record of the collection lazily, in insertion order.
    fn scan_views(
        &self,
        schemas: Vec<String>,
    ) -> CoreResult<impl Iterator<Item = CoreResult<EntityView>> + '_> {
        let documents = self.ctx.store.scan(&self.entity_type)?;
        Ok(documents.into_iter().map(move |(id, bytes)| {
            let record: StoredRecord = codec::decode(&bytes)?;
            let meta = self.load_meta(id, schemas.iter().map(String::as_str))?;
            Ok(EntityView {
                record: record.into_record(id, &self.entity_type),
                meta,
            })
        }))
    }

    fn compute_stats(&self) -> CoreResult<StatsSnapshot> {
        let spec = &self.stats_spec;
        let schemas: Vec<String> = spec
            .targets()
            .filter_map(Target::schema)
            .map(str::to_string)
            .collect();

        let mut acc = StatsAccumulator::new(
            spec,
            self.ctx.clock.today(),
            self.choice_values(spec.status.as_ref()),
            self.choice_values(spec.priority.as_ref()),
        );
        for view in self.scan_views(schemas)? {
            acc.add(&view?);
        }
        let snapshot = acc.finish();
        debug!(entity = %self.entity_type, total = snapshot.total, "stats computed");
        Ok(snapshot)
    }

    /// Declared choices of a select field target, used to seed zero counts.
    fn choice_values(&self, target: Option<&Target>) -> Vec<String> {
        let Some(Target::Meta { schema, key }) = target else {
            return Vec::new();
        };
        self.schemas
            .get(schema)
            .and_then(|s| s.field(key))
            .filter(|f| f.kind() == FieldKind::Select)
            .map(|f| f.choices().values().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

fn check_target(registry: &SchemaRegistry, target: &Target) -> CoreResult<()> {
    let Target::Meta { schema, key } = target else {
        return Ok(());
    };
    let known = registry
        .get(schema)
        .is_some_and(|s| s.field(key).is_some());
    if known {
        Ok(())
    } else {
        Err(CoreError::invalid_query(format!(
            "{} has no field {target}",
            registry.entity_type()
        )))
    }
}

impl Drop for Entity {
    fn drop(&mut self) {
        if !self.state().is_running() {
            return;
        }
        for hook in self.teardown.iter().rev() {
            hook(&*self);
        }
        debug!(entity = %self.entity_type, "entity torn down");
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("entity_type", &self.entity_type)
            .field("state", &self.state())
            .field("schemas", &self.schemas.len())
            .finish_non_exhaustive()
    }
}
