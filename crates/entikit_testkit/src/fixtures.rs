//! Test fixtures and entity helpers.
//!
//! A [`TestHarness`] owns everything an entity type needs and keeps the
//! temporary directories alive for as long as the test runs.

use chrono::NaiveDate;
use entikit_core::{Cache, Config, EntityContext, ManualClock};
use entikit_storage::{DocumentStore, FileStore, InMemoryStore};
use entikit_todo::Todos;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Year, month and day every harness clock starts at.
pub const HARNESS_DATE: (i32, u32, u32) = (2024, 6, 10);

/// Store, cache, clock and export directory for one test.
pub struct TestHarness {
    /// Document store.
    pub store: Arc<dyn DocumentStore>,
    /// Cache driven by `clock`.
    pub cache: Arc<Cache>,
    /// Manual clock starting at [`HARNESS_DATE`].
    pub clock: Arc<ManualClock>,
    exports: TempDir,
    _data: Option<TempDir>,
}

impl TestHarness {
    /// Creates a harness over an in-memory store.
    pub fn memory() -> Self {
        Self::with_store(Arc::new(InMemoryStore::new()), None)
    }

    /// Creates a harness over a file store in a temporary directory.
    pub fn file() -> Self {
        let data = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::open(data.path()).expect("Failed to open file store");
        Self::with_store(Arc::new(store), Some(data))
    }

    fn with_store(store: Arc<dyn DocumentStore>, data: Option<TempDir>) -> Self {
        let (y, m, d) = HARNESS_DATE;
        let clock = Arc::new(ManualClock::at_date(y, m, d).expect("Invalid harness date"));
        Self {
            store,
            cache: Arc::new(Cache::new(clock.clone())),
            clock,
            exports: TempDir::new().expect("Failed to create export directory"),
            _data: data,
        }
    }

    /// Returns the harness start date.
    pub fn today(&self) -> NaiveDate {
        let (y, m, d) = HARNESS_DATE;
        NaiveDate::from_ymd_opt(y, m, d).expect("valid harness date")
    }

    /// Returns the export directory.
    pub fn export_dir(&self) -> &Path {
        self.exports.path()
    }

    /// Returns a context over the harness collaborators.
    pub fn context(&self) -> EntityContext {
        EntityContext::new(
            self.store.clone(),
            self.cache.clone(),
            self.clock.clone(),
            Config::default().export_dir(self.exports.path()),
        )
    }

    /// Builds and runs the todo entity type.
    pub fn todos(&self) -> Todos {
        Todos::new(self.context()).expect("Failed to start todos")
    }
}

/// Runs a test against a fresh todo entity over an in-memory store.
///
/// # Example
///
/// ```rust
/// use entikit_testkit::with_todos;
/// use entikit_todo::NewTodo;
///
/// with_todos(|todos, _clock| {
///     todos.add(NewTodo::new("Test")).unwrap();
///     assert_eq!(todos.stats().unwrap().total, 1);
/// });
/// ```
pub fn with_todos<F, R>(f: F) -> R
where
    F: FnOnce(&Todos, &ManualClock) -> R,
{
    let harness = TestHarness::memory();
    let todos = harness.todos();
    f(&todos, &harness.clock)
}

/// Ready-made todo data sets.
pub mod scenarios {
    use super::HARNESS_DATE;
    use chrono::NaiveDate;
    use entikit_core::EntityId;
    use entikit_todo::{NewTodo, Priority, TodoStatus, Todos};

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(HARNESS_DATE.0, month, day).expect("valid scenario date")
    }

    /// Adds six todos: two pending (one due before the harness date), one in
    /// progress and three completed (one of them with a past due date).
    ///
    /// Expected stats at the harness date: total 6, pending 2,
    /// in progress 1, completed 3, overdue 1.
    pub fn mixed_statuses(todos: &Todos) -> Vec<EntityId> {
        [
            NewTodo::new("File taxes").due(date(6, 1)),
            NewTodo::new("Plan trip").due(date(7, 1)),
            NewTodo::new("Paint fence").status(TodoStatus::InProgress),
            NewTodo::new("Buy milk")
                .status(TodoStatus::Completed)
                .due(date(5, 20)),
            NewTodo::new("Call mum").status(TodoStatus::Completed),
            NewTodo::new("Fix bike")
                .status(TodoStatus::Completed)
                .priority(Priority::High),
        ]
        .into_iter()
        .map(|todo| todos.add(todo).expect("Failed to add scenario todo"))
        .collect()
    }

    /// Adds `count` pending todos titled `Todo N`, cycling priorities.
    pub fn numbered(todos: &Todos, count: usize) -> Vec<EntityId> {
        (0..count)
            .map(|i| {
                let priority = Priority::ALL[i % Priority::ALL.len()];
                todos
                    .add(NewTodo::new(format!("Todo {i}")).priority(priority))
                    .expect("Failed to add numbered todo")
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entikit_core::Lifecycle;

    #[test]
    fn memory_harness_starts_running() {
        let harness = TestHarness::memory();
        let todos = harness.todos();
        assert_eq!(todos.state(), Lifecycle::Running);
        assert_eq!(todos.stats().unwrap().total, 0);
    }

    #[test]
    fn file_harness_persists_across_entities() {
        let harness = TestHarness::file();
        let ids = scenarios::numbered(&harness.todos(), 3);
        let reopened = harness.todos();
        assert!(reopened.get(ids[2], false).unwrap().is_some());
        assert_eq!(reopened.count(&Default::default()).unwrap(), 3);
    }

    #[test]
    fn mixed_scenario_matches_documented_stats() {
        with_todos(|todos, _| {
            scenarios::mixed_statuses(todos);
            let stats = todos.stats().unwrap();
            assert_eq!(stats.total, 6);
            assert_eq!(stats.status_count("pending"), 2);
            assert_eq!(stats.status_count("in_progress"), 1);
            assert_eq!(stats.status_count("completed"), 3);
            assert_eq!(stats.overdue, 1);
        });
    }
}
