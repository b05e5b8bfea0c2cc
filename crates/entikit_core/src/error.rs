//! Error types for EntiKit core.

use crate::codec::CodecError;
use crate::entity::{EntityId, Lifecycle};
use crate::schema::ValidationErrors;
use entikit_storage::StorageError;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in EntiKit core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Document store error, passed through uninterpreted.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Field schema error (definition, registration or validation).
    ///
    /// Store and codec failures raised while a schema reads or writes its
    /// group convert to [`CoreError::Storage`] and [`CoreError::Codec`].
    #[error("schema error: {0}")]
    Schema(#[source] SchemaError),

    /// CBOR codec error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The addressed record does not exist for this entity type.
    #[error("{entity_type} {id} not found")]
    NotFound {
        /// The entity type searched.
        entity_type: String,
        /// The id that was not found.
        id: EntityId,
    },

    /// The entity has not reached the `Running` state.
    #[error("{entity_type} is {state:?}; call run() first")]
    NotRunning {
        /// The entity type.
        entity_type: String,
        /// Its current lifecycle state.
        state: Lifecycle,
    },

    /// Export could not read its rows or write its sink.
    #[error("export failed: {message}")]
    Export {
        /// Description of the failure.
        message: String,
    },

    /// A query refers to something the entity type does not have.
    #[error("invalid query: {message}")]
    InvalidQuery {
        /// Description of the problem.
        message: String,
    },
}

impl CoreError {
    /// Creates a not-found error.
    pub fn not_found(entity_type: impl Into<String>, id: EntityId) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id,
        }
    }

    /// Creates an export error.
    pub fn export(message: impl ToString) -> Self {
        Self::Export {
            message: message.to_string(),
        }
    }

    /// Creates an invalid query error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Returns true for [`CoreError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns the per-field validation failures, if this is one.
    #[must_use]
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Schema(SchemaError::Validation { errors, .. }) => Some(errors),
            _ => None,
        }
    }
}

impl From<SchemaError> for CoreError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::Storage(err) => Self::Storage(err),
            SchemaError::Codec(err) => Self::Codec(err),
            other => Self::Schema(other),
        }
    }
}

impl From<csv::Error> for CoreError {
    fn from(err: csv::Error) -> Self {
        Self::export(err)
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::export(err)
    }
}

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised by field schemas and the schema registry.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A field key was added twice to the same schema.
    #[error("duplicate field '{key}' in schema '{schema}'")]
    DuplicateKey {
        /// The schema being built.
        schema: String,
        /// The repeated key.
        key: String,
    },

    /// A field definition is inconsistent.
    #[error("invalid field '{key}' in schema '{schema}': {reason}")]
    InvalidField {
        /// The schema being built.
        schema: String,
        /// The offending key.
        key: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A schema id was registered twice for one entity type.
    #[error("schema '{schema}' is already registered for {entity_type}")]
    DuplicateSchema {
        /// The owning entity type.
        entity_type: String,
        /// The repeated schema id.
        schema: String,
    },

    /// A schema was attached to an entity type it does not belong to.
    #[error("schema '{schema}' belongs to {owner}, not {entity_type}")]
    OwnerMismatch {
        /// The schema id.
        schema: String,
        /// The schema's declared owner.
        owner: String,
        /// The entity type it was attached to.
        entity_type: String,
    },

    /// Meta values were supplied for a schema the entity does not have.
    #[error("{entity_type} has no schema '{schema}'")]
    UnknownSchema {
        /// The entity type.
        entity_type: String,
        /// The unknown schema id.
        schema: String,
    },

    /// One or more fields failed validation; nothing was written.
    #[error("validation failed for schema '{schema}': {errors}")]
    Validation {
        /// The schema that rejected the values.
        schema: String,
        /// Per-field failures.
        errors: ValidationErrors,
    },

    /// The store rejected the field group write or read.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A stored field group could not be decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl SchemaError {
    /// Creates an invalid field error.
    pub fn invalid_field(
        schema: impl Into<String>,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            schema: schema.into(),
            key: key.into(),
            reason: reason.into(),
        }
    }
}
