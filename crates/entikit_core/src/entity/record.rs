//! Base records and their inputs.

use super::EntityId;
use crate::schema::{FieldValue, FieldValues, RawValues};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Publication status of a base record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum RecordStatus {
    /// Not yet published.
    #[default]
    Draft,
    /// Awaiting review.
    Pending,
    /// Publicly visible.
    Published,
    /// Visible to its owner only.
    Private,
    /// Soft-deleted.
    Trash,
}

impl RecordStatus {
    /// Every status in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Draft,
        Self::Pending,
        Self::Published,
        Self::Private,
        Self::Trash,
    ];

    /// Returns the lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Published => "published",
            Self::Private => "private",
            Self::Trash => "trash",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown record status '{s}'"))
    }
}

/// The persisted form of a base record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredRecord {
    pub(crate) title: String,
    pub(crate) body: String,
    pub(crate) status: RecordStatus,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) modified_at: DateTime<Utc>,
}

impl StoredRecord {
    pub(crate) fn into_record(self, id: EntityId, entity_type: &str) -> EntityRecord {
        EntityRecord {
            id,
            entity_type: entity_type.to_string(),
            title: self.title,
            body: self.body,
            status: self.status,
            created_at: self.created_at,
            modified_at: self.modified_at,
        }
    }
}

/// A base record as returned to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    /// Store-assigned identifier.
    pub id: EntityId,
    /// The entity type the record belongs to.
    pub entity_type: String,
    /// Title.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Publication status.
    pub status: RecordStatus,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last modification instant.
    pub modified_at: DateTime<Utc>,
}

/// Base fields of a record to create.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityCore {
    /// Title.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Publication status.
    pub status: RecordStatus,
}

impl EntityCore {
    /// Creates a draft with a title and an empty body.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the status.
    #[must_use]
    pub fn status(mut self, status: RecordStatus) -> Self {
        self.status = status;
        self
    }
}

/// Base fields to change on update; `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityPatch {
    /// New title.
    pub title: Option<String>,
    /// New body.
    pub body: Option<String>,
    /// New status.
    pub status: Option<RecordStatus>,
}

impl EntityPatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Replaces the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Replaces the status.
    #[must_use]
    pub fn status(mut self, status: RecordStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Returns true if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none() && self.status.is_none()
    }

    pub(crate) fn apply(self, record: &mut StoredRecord) {
        if let Some(title) = self.title {
            record.title = title;
        }
        if let Some(body) = self.body {
            record.body = body;
        }
        if let Some(status) = self.status {
            record.status = status;
        }
    }
}

/// Raw field values per schema id.
///
/// # Example
///
/// ```rust
/// use entikit_core::MetaInput;
///
/// let meta = MetaInput::new()
///     .set("todo_details", "status", "pending")
///     .set("todo_details", "priority", "high");
/// assert_eq!(meta.get("todo_details").map(|raw| raw.len()), Some(2));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaInput(BTreeMap<String, RawValues>);

impl MetaInput {
    /// Creates an empty input.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one raw value.
    #[must_use]
    pub fn set(
        mut self,
        schema: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.0
            .entry(schema.into())
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    /// Sets every raw value of a schema at once.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>, values: RawValues) -> Self {
        self.0.insert(schema.into(), values);
        self
    }

    /// Returns the raw values supplied for a schema.
    #[must_use]
    pub fn get(&self, schema: &str) -> Option<&RawValues> {
        self.0.get(schema)
    }

    /// Iterates over supplied schema ids.
    pub fn schema_ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Returns true if no schema was supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A record together with the field groups that were loaded for it.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityView {
    /// The base record.
    pub record: EntityRecord,
    /// Field values per schema id; empty unless meta was requested.
    pub meta: BTreeMap<String, FieldValues>,
}

impl EntityView {
    /// Returns the record id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.record.id
    }

    /// Returns one loaded field value.
    #[must_use]
    pub fn meta_value(&self, schema: &str, key: &str) -> Option<&FieldValue> {
        self.meta.get(schema)?.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_names_round_trip() {
        for status in RecordStatus::ALL {
            assert_eq!(status.as_str().parse::<RecordStatus>(), Ok(status));
        }
        assert!("archived".parse::<RecordStatus>().is_err());
    }

    #[test]
    fn patch_only_touches_set_fields() {
        let now = Utc::now();
        let mut record = StoredRecord {
            title: "old".into(),
            body: "body".into(),
            status: RecordStatus::Draft,
            created_at: now,
            modified_at: now,
        };
        EntityPatch::new()
            .title("new")
            .status(RecordStatus::Published)
            .apply(&mut record);
        assert_eq!(record.title, "new");
        assert_eq!(record.body, "body");
        assert_eq!(record.status, RecordStatus::Published);
    }

    #[test]
    fn meta_input_groups_by_schema() {
        let meta = MetaInput::new()
            .set("a", "x", "1")
            .set("b", "y", "2")
            .set("a", "z", "3");
        let ids: Vec<_> = meta.schema_ids().collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(meta.get("a").unwrap().len(), 2);
    }
}
