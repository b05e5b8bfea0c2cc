//! CLI command implementations.

pub mod demo;
pub mod manage;
pub mod report;

use entikit_core::{Cache, Config, EntityContext, SystemClock};
use entikit_storage::{DocumentStore, FileStore, InMemoryStore};
use entikit_todo::Todos;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Opens the todo entity over a file store at `path`, or an in-memory
/// store when no path is given.
pub fn open(
    path: Option<&Path>,
    export_dir: Option<PathBuf>,
) -> Result<Todos, Box<dyn std::error::Error>> {
    let store: Arc<dyn DocumentStore> = match path {
        Some(dir) => {
            debug!(path = %dir.display(), "opening file store");
            Arc::new(FileStore::open(dir)?)
        }
        None => {
            debug!("using in-memory store");
            Arc::new(InMemoryStore::new())
        }
    };

    let mut config = Config::new();
    if let Some(dir) = export_dir {
        config = config.export_dir(dir);
    }

    let clock = Arc::new(SystemClock);
    let ctx = EntityContext::new(store, Arc::new(Cache::new(clock.clone())), clock, config);
    Ok(Todos::new(ctx)?)
}
