//! Per-entity schema registry.

use super::FieldSchema;
use crate::error::{SchemaError, SchemaResult};
use std::sync::Arc;

/// The schemas attached to one entity type, in registration order.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    entity_type: String,
    schemas: Vec<Arc<FieldSchema>>,
}

impl SchemaRegistry {
    /// Creates an empty registry for an entity type.
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            schemas: Vec::new(),
        }
    }

    /// Adds a schema.
    ///
    /// # Errors
    ///
    /// - `SchemaError::OwnerMismatch` if the schema belongs to another type
    /// - `SchemaError::DuplicateSchema` if the id is already registered
    pub fn register(&mut self, schema: Arc<FieldSchema>) -> SchemaResult<()> {
        if schema.owner() != self.entity_type {
            return Err(SchemaError::OwnerMismatch {
                schema: schema.id().to_string(),
                owner: schema.owner().to_string(),
                entity_type: self.entity_type.clone(),
            });
        }
        if self.get(schema.id()).is_some() {
            return Err(SchemaError::DuplicateSchema {
                entity_type: self.entity_type.clone(),
                schema: schema.id().to_string(),
            });
        }
        self.schemas.push(schema);
        Ok(())
    }

    /// Returns a schema by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<FieldSchema>> {
        self.schemas.iter().find(|s| s.id() == id)
    }

    /// Returns a schema by id or `SchemaError::UnknownSchema`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::UnknownSchema` if no schema has that id.
    pub fn require(&self, id: &str) -> SchemaResult<&Arc<FieldSchema>> {
        self.get(id).ok_or_else(|| SchemaError::UnknownSchema {
            entity_type: self.entity_type.clone(),
            schema: id.to_string(),
        })
    }

    /// Iterates over schemas in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<FieldSchema>> {
        self.schemas.iter()
    }

    /// Returns the owning entity type.
    #[must_use]
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Returns the number of schemas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Returns true if no schema is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
