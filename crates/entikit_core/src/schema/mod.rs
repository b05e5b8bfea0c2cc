//! Field schemas ("metaboxes").
//!
//! A [`FieldSchema`] is a named group of typed fields attached to one entity
//! type. Its values are validated as a whole and stored as one group of the
//! owning document, addressed by `(entity type, entity id, schema id)`.
//!
//! # Example
//!
//! ```rust
//! use entikit_core::{Choices, Constraints, FieldSchema, RawValues};
//!
//! let schema = FieldSchema::define("details", "Details", "todo")
//!     .select(
//!         "priority",
//!         "Priority",
//!         Choices::from([("low", "Low"), ("high", "High")]),
//!         Constraints::new().default_value("low"),
//!     )?
//!     .number("estimate", "Estimate", Constraints::new().min(0.0).step(0.5))?
//!     .build()?;
//!
//! let mut raw = RawValues::new();
//! raw.insert("estimate".into(), "1.5".into());
//! let values = schema.validate(&raw).unwrap();
//! assert_eq!(values["priority"].as_str(), Some("low"));
//! # Ok::<(), entikit_core::SchemaError>(())
//! ```

mod field;
mod hooks;
mod registry;
mod validate;

pub use field::{Choices, Constraints, FieldDef, FieldKind, FieldValue, FieldValues, RawValues};
pub use hooks::{ErrorHook, Hook, HookRegistry, SuccessHook};
pub use registry::SchemaRegistry;
pub use validate::{ErrorKind, ValidationErrors};

use crate::codec;
use crate::entity::EntityId;
use crate::error::{SchemaError, SchemaResult};
use entikit_storage::DocumentStore;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Date format used when a schema does not set one.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// A validated, immutable group of field definitions.
pub struct FieldSchema {
    id: String,
    label: String,
    owner: String,
    fields: Vec<FieldDef>,
    date_format: String,
    hooks: HookRegistry,
}

impl FieldSchema {
    /// Starts defining a schema owned by `owner` (an entity type).
    pub fn define(
        id: impl Into<String>,
        label: impl Into<String>,
        owner: impl Into<String>,
    ) -> SchemaBuilder {
        SchemaBuilder {
            id: id.into(),
            label: label.into(),
            owner: owner.into(),
            fields: Vec::new(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            hooks: HookRegistry::new(),
        }
    }

    /// Returns the schema id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the human-readable label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the owning entity type.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Returns the fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Returns one field definition.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.key() == key)
    }

    /// Returns the choices of a select field.
    #[must_use]
    pub fn choices(&self, key: &str) -> Option<&Choices> {
        self.field(key)
            .filter(|f| f.kind() == FieldKind::Select)
            .map(FieldDef::choices)
    }

    /// Returns the format date fields are parsed with.
    #[must_use]
    pub fn date_format(&self) -> &str {
        &self.date_format
    }

    /// Returns the registered hooks.
    #[must_use]
    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    /// Returns the typed defaults of every field that declares one.
    #[must_use]
    pub fn defaults(&self) -> FieldValues {
        self.fields
            .iter()
            .filter_map(|f| f.default_value().map(|v| (f.key().to_string(), v.clone())))
            .collect()
    }

    /// Validates raw input against every field.
    ///
    /// Unknown keys are ignored. Absent optional fields take their default
    /// when one is declared.
    ///
    /// # Errors
    ///
    /// Returns every failing field with its [`ErrorKind`].
    pub fn validate(&self, raw: &RawValues) -> Result<FieldValues, ValidationErrors> {
        let mut values = FieldValues::new();
        let mut errors = ValidationErrors::new();

        for def in &self.fields {
            let input = raw.get(def.key()).map(String::as_str);
            match validate::check_field(def, input, &self.date_format) {
                Ok(Some(value)) => {
                    values.insert(def.key().to_string(), value);
                }
                Ok(None) => {
                    if let Some(default) = def.default_value() {
                        values.insert(def.key().to_string(), default.clone());
                    }
                }
                Err(kind) => errors.insert(def.key(), kind),
            }
        }

        if errors.is_empty() {
            Ok(values)
        } else {
            Err(errors)
        }
    }

    /// Validates and stores the values for one entity.
    ///
    /// On success the whole group is replaced and success hooks run. On
    /// validation failure error hooks run and nothing is written.
    ///
    /// # Errors
    ///
    /// - `SchemaError::Validation` if any field is rejected
    /// - `SchemaError::Storage` if the store rejects the write, including
    ///   when the entity does not exist
    pub fn persist(
        &self,
        store: &dyn DocumentStore,
        id: EntityId,
        raw: &RawValues,
    ) -> SchemaResult<FieldValues> {
        let values = match self.validate(raw) {
            Ok(values) => values,
            Err(errors) => {
                warn!(schema = %self.id, entity = %id, %errors, "field validation failed");
                self.hooks.fire_error(&errors, id, self);
                return Err(SchemaError::Validation {
                    schema: self.id.clone(),
                    errors,
                });
            }
        };

        let bytes = codec::encode(&values)?;
        store.put_group(&self.owner, id, &self.id, &bytes)?;
        debug!(schema = %self.id, entity = %id, fields = values.len(), "field group stored");

        self.hooks.fire_success(id, self);
        Ok(values)
    }

    /// Loads the stored values of one entity merged over the defaults.
    ///
    /// Stored keys no longer declared by the schema are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the group cannot be decoded.
    pub fn load(&self, store: &dyn DocumentStore, id: EntityId) -> SchemaResult<FieldValues> {
        let mut values = self.defaults();
        if let Some(bytes) = store.get_group(&self.owner, id, &self.id)? {
            let stored: FieldValues = codec::decode(&bytes)?;
            for (key, value) in stored {
                if self.field(&key).is_some() {
                    values.insert(key, value);
                }
            }
        }
        Ok(values)
    }

    /// Renders typed values back into raw input form.
    #[must_use]
    pub fn to_raw(&self, values: &FieldValues) -> RawValues {
        values
            .iter()
            .map(|(k, v)| (k.clone(), v.to_raw(&self.date_format)))
            .collect()
    }
}

impl fmt::Debug for FieldSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSchema")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("fields", &self.fields.len())
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

/// Builder for [`FieldSchema`].
pub struct SchemaBuilder {
    id: String,
    label: String,
    owner: String,
    fields: Vec<FieldDef>,
    date_format: String,
    hooks: HookRegistry,
}

impl SchemaBuilder {
    /// Adds a field.
    ///
    /// # Errors
    ///
    /// - `SchemaError::DuplicateKey` if the key is already declared
    /// - `SchemaError::InvalidField` if the definition is inconsistent
    pub fn add_field(
        mut self,
        key: impl Into<String>,
        label: impl Into<String>,
        kind: FieldKind,
        choices: Choices,
        constraints: Constraints,
    ) -> SchemaResult<Self> {
        let def = FieldDef::new(key.into(), label.into(), kind, choices, constraints);
        if self.fields.iter().any(|f| f.key() == def.key()) {
            return Err(SchemaError::DuplicateKey {
                schema: self.id,
                key: def.key().to_string(),
            });
        }
        def.check()
            .map_err(|reason| SchemaError::invalid_field(&self.id, def.key(), reason))?;
        self.fields.push(def);
        Ok(self)
    }

    /// Adds a text field.
    ///
    /// # Errors
    ///
    /// See [`SchemaBuilder::add_field`].
    pub fn text(
        self,
        key: impl Into<String>,
        label: impl Into<String>,
        constraints: Constraints,
    ) -> SchemaResult<Self> {
        self.add_field(key, label, FieldKind::Text, Choices::new(), constraints)
    }

    /// Adds a select field.
    ///
    /// # Errors
    ///
    /// See [`SchemaBuilder::add_field`].
    pub fn select(
        self,
        key: impl Into<String>,
        label: impl Into<String>,
        choices: Choices,
        constraints: Constraints,
    ) -> SchemaResult<Self> {
        self.add_field(key, label, FieldKind::Select, choices, constraints)
    }

    /// Adds a date field.
    ///
    /// # Errors
    ///
    /// See [`SchemaBuilder::add_field`].
    pub fn date(
        self,
        key: impl Into<String>,
        label: impl Into<String>,
        constraints: Constraints,
    ) -> SchemaResult<Self> {
        self.add_field(key, label, FieldKind::Date, Choices::new(), constraints)
    }

    /// Adds a number field.
    ///
    /// # Errors
    ///
    /// See [`SchemaBuilder::add_field`].
    pub fn number(
        self,
        key: impl Into<String>,
        label: impl Into<String>,
        constraints: Constraints,
    ) -> SchemaResult<Self> {
        self.add_field(key, label, FieldKind::Number, Choices::new(), constraints)
    }

    /// Sets the `chrono` format date fields are parsed with.
    #[must_use]
    pub fn date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    /// Registers a callback run after values were stored.
    #[must_use]
    pub fn on_success<F>(mut self, hook: F) -> Self
    where
        F: Fn(EntityId, &FieldSchema) + Send + Sync + 'static,
    {
        self.hooks.push(Hook::Success(Arc::new(hook)));
        self
    }

    /// Registers a callback run when validation fails.
    #[must_use]
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ValidationErrors, EntityId, &FieldSchema) + Send + Sync + 'static,
    {
        self.hooks.push(Hook::Error(Arc::new(hook)));
        self
    }

    /// Finishes the schema, resolving field defaults.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::InvalidField` if the schema id is unusable or a
    /// default does not satisfy its own field.
    pub fn build(mut self) -> SchemaResult<FieldSchema> {
        if self.id.is_empty() || self.id.contains('.') {
            return Err(SchemaError::invalid_field(
                &self.id,
                "",
                "schema id must be non-empty without dots",
            ));
        }
        for def in &mut self.fields {
            let Some(raw) = def.constraints().default.clone() else {
                continue;
            };
            let value = validate::parse_value(def, raw.trim(), &self.date_format).map_err(
                |kind| SchemaError::invalid_field(&self.id, def.key(), format!("default: {kind}")),
            )?;
            def.set_default(Some(value));
        }

        Ok(FieldSchema {
            id: self.id,
            label: self.label,
            owner: self.owner,
            fields: self.fields,
            date_format: self.date_format,
            hooks: self.hooks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entikit_storage::InMemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn raw(pairs: &[(&str, &str)]) -> RawValues {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn details() -> FieldSchema {
        FieldSchema::define("details", "Details", "todo")
            .select(
                "status",
                "Status",
                Choices::from([("pending", "Pending"), ("completed", "Completed")]),
                Constraints::new().required().default_value("pending"),
            )
            .unwrap()
            .select(
                "priority",
                "Priority",
                Choices::from([("low", "Low"), ("medium", "Medium"), ("high", "High")]),
                Constraints::new().default_value("medium"),
            )
            .unwrap()
            .date("due_date", "Due date", Constraints::new())
            .unwrap()
            .number("estimate", "Estimate", Constraints::new().min(0.0).step(0.5))
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let result = FieldSchema::define("s", "S", "todo")
            .text("note", "Note", Constraints::new())
            .unwrap()
            .text("note", "Again", Constraints::new());
        assert!(matches!(result, Err(SchemaError::DuplicateKey { key, .. }) if key == "note"));
    }

    #[test]
    fn invalid_default_fails_build() {
        let result = FieldSchema::define("s", "S", "todo")
            .select("p", "P", Choices::from([("a", "A")]), Constraints::new().default_value("b"))
            .unwrap()
            .build();
        assert!(matches!(result, Err(SchemaError::InvalidField { .. })));
    }

    #[test]
    fn date_default_uses_schema_format() {
        let schema = FieldSchema::define("s", "S", "todo")
            .date("d", "D", Constraints::new().default_value("01/02/2024"))
            .unwrap()
            .date_format("%d/%m/%Y")
            .build()
            .unwrap();
        assert_eq!(schema.defaults()["d"].to_string(), "2024-02-01");
    }

    #[test]
    fn validate_applies_defaults_and_ignores_unknown_keys() {
        let schema = details();
        let values = schema
            .validate(&raw(&[("status", "completed"), ("colour", "red")]))
            .unwrap();
        assert_eq!(values["status"].as_str(), Some("completed"));
        assert_eq!(values["priority"].as_str(), Some("medium"));
        assert!(!values.contains_key("colour"));
        assert!(!values.contains_key("due_date"));
    }

    #[test]
    fn validate_collects_every_failure() {
        let schema = details();
        let errors = schema
            .validate(&raw(&[
                ("priority", "urgent"),
                ("due_date", "tomorrow"),
                ("estimate", "1.3"),
            ]))
            .unwrap_err();
        assert_eq!(errors.get("status"), Some(ErrorKind::MissingValue));
        assert_eq!(errors.get("priority"), Some(ErrorKind::InvalidChoice));
        assert_eq!(errors.get("due_date"), Some(ErrorKind::InvalidFormat));
        assert_eq!(errors.get("estimate"), Some(ErrorKind::OutOfRange));
    }

    #[test]
    fn persist_then_load() {
        let store = InMemoryStore::new();
        let id = store.insert("todo", b"record").unwrap();
        let schema = details();

        schema
            .persist(&store, id, &raw(&[("status", "completed"), ("estimate", "2.5")]))
            .unwrap();
        let loaded = schema.load(&store, id).unwrap();
        assert_eq!(loaded["status"].as_str(), Some("completed"));
        assert_eq!(loaded["estimate"].as_number(), Some(2.5));
        assert_eq!(loaded["priority"].as_str(), Some("medium"));
    }

    #[test]
    fn load_without_group_returns_defaults() {
        let store = InMemoryStore::new();
        let id = store.insert("todo", b"record").unwrap();
        let loaded = details().load(&store, id).unwrap();
        assert_eq!(loaded, details().defaults());
    }

    #[test]
    fn failed_persist_writes_nothing_and_fires_error_hooks() {
        let errors_seen = Arc::new(AtomicUsize::new(0));
        let successes = Arc::new(AtomicUsize::new(0));
        let (e, s) = (Arc::clone(&errors_seen), Arc::clone(&successes));
        let schema = FieldSchema::define("req", "Required", "todo")
            .text("name", "Name", Constraints::new().required())
            .unwrap()
            .on_error(move |errors, _, _| {
                assert_eq!(errors.get("name"), Some(ErrorKind::MissingValue));
                e.fetch_add(1, Ordering::SeqCst);
            })
            .on_success(move |_, _| {
                s.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap();

        let store = InMemoryStore::new();
        let id = store.insert("todo", b"record").unwrap();
        schema.persist(&store, id, &raw(&[("name", "first")])).unwrap();

        let result = schema.persist(&store, id, &RawValues::new());
        assert!(matches!(result, Err(SchemaError::Validation { .. })));
        assert_eq!(schema.load(&store, id).unwrap()["name"].as_str(), Some("first"));
        assert_eq!(errors_seen.load(Ordering::SeqCst), 1);
        assert_eq!(successes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn persist_for_missing_entity_is_a_storage_error() {
        let store = InMemoryStore::new();
        let result = details().persist(&store, EntityId::new(99), &raw(&[("status", "pending")]));
        assert!(matches!(result, Err(SchemaError::Storage(_))));
    }

    #[test]
    fn to_raw_round_trips_through_validate() {
        let schema = details();
        let values = schema
            .validate(&raw(&[("status", "pending"), ("due_date", "2024-06-30"), ("estimate", "3")]))
            .unwrap();
        assert_eq!(schema.validate(&schema.to_raw(&values)).unwrap(), values);
    }
}
