//! Entity lifecycle state and callbacks.

use super::Entity;
use crate::error::CoreResult;

/// Lifecycle of an entity type.
///
/// ```text
/// Unregistered --run()--> Registered --setup ok--> Running
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Built but `run()` was never called.
    Unregistered,
    /// Schemas are registered; setup callbacks are running or failed.
    Registered,
    /// Accepting operations.
    Running,
}

impl Lifecycle {
    /// Returns true once the entity accepts operations.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

/// Called in order by `run()` before the entity starts accepting operations.
pub type SetupHook = Box<dyn Fn(&Entity) -> CoreResult<()> + Send + Sync>;

/// Called in reverse order when a running entity is dropped.
pub type TeardownHook = Box<dyn Fn(&Entity) + Send + Sync>;
