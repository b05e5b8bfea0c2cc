//! Success and error callbacks of a field schema.

use super::validate::ValidationErrors;
use super::FieldSchema;
use crate::entity::EntityId;
use std::fmt;
use std::sync::Arc;

/// Called after a schema's values were validated and stored.
pub type SuccessHook = Arc<dyn Fn(EntityId, &FieldSchema) + Send + Sync>;

/// Called when a schema rejected its input; nothing was stored.
pub type ErrorHook = Arc<dyn Fn(&ValidationErrors, EntityId, &FieldSchema) + Send + Sync>;

/// A registered callback.
#[derive(Clone)]
pub enum Hook {
    /// Runs after a successful persist.
    Success(SuccessHook),
    /// Runs after a failed validation.
    Error(ErrorHook),
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(_) => f.write_str("Hook::Success"),
            Self::Error(_) => f.write_str("Hook::Error"),
        }
    }
}

/// Callbacks in registration order.
#[derive(Debug, Clone, Default)]
pub struct HookRegistry {
    hooks: Vec<Hook>,
}

impl HookRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a hook.
    pub fn push(&mut self, hook: Hook) {
        self.hooks.push(hook);
    }

    /// Runs every success hook in registration order.
    pub fn fire_success(&self, id: EntityId, schema: &FieldSchema) {
        for hook in &self.hooks {
            if let Hook::Success(f) = hook {
                f(id, schema);
            }
        }
    }

    /// Runs every error hook in registration order.
    pub fn fire_error(&self, errors: &ValidationErrors, id: EntityId, schema: &FieldSchema) {
        for hook in &self.hooks {
            if let Hook::Error(f) = hook {
                f(errors, id, schema);
            }
        }
    }

    /// Returns the number of hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Returns true if no hook is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}
