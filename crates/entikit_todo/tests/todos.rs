//! End-to-end behaviour of the todo entity type.

use chrono::NaiveDate;
use entikit_core::{
    Cache, Clock, Config, CoreError, EntityContext, ErrorKind, ExportFormat, Lifecycle,
    ManualClock,
};
use entikit_storage::InMemoryStore;
use entikit_todo::{admin, fields, NewTodo, Priority, TodoStatus, Todos, DETAILS};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct Fixture {
    todos: Todos,
    clock: Arc<ManualClock>,
    _exports: TempDir,
}

fn fixture() -> Fixture {
    let exports = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::at_date(2024, 6, 10).unwrap());
    let ctx = EntityContext::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(Cache::new(clock.clone())),
        clock.clone(),
        Config::new().export_dir(exports.path()),
    );
    Fixture {
        todos: Todos::new(ctx).unwrap(),
        clock,
        _exports: exports,
    }
}

fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).unwrap()
}

/// Two pending (one overdue), one in progress, three completed (one with a
/// past due date).
fn seed(todos: &Todos) {
    let batch = [
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
    ];
    for todo in batch {
        todos.add(todo).unwrap();
    }
}

#[test]
fn stats_count_statuses_and_overdue() {
    let f = fixture();
    seed(&f.todos);

    let stats = f.todos.stats().unwrap();
    assert_eq!(stats.total, 6);
    assert_eq!(stats.status_count("pending"), 2);
    assert_eq!(stats.status_count("in_progress"), 1);
    assert_eq!(stats.status_count("completed"), 3);
    assert_eq!(stats.overdue, 1);
    assert_eq!(stats.priority_count("medium"), 5);
    assert_eq!(stats.priority_count("high"), 1);
    assert_eq!(stats.priority_count("low"), 0);
}

#[test]
fn overdue_moves_with_the_clock() {
    let f = fixture();
    seed(&f.todos);
    assert_eq!(f.todos.stats().unwrap().overdue, 1);

    // Past the cache lifetime and past the second due date.
    f.clock.advance(Duration::from_secs(30 * 86_400));
    assert!(f.clock.today() > date(7, 1));
    assert_eq!(f.todos.stats().unwrap().overdue, 2);
}

#[test]
fn status_change_refreshes_stats() {
    let f = fixture();
    let id = f.todos.add(NewTodo::new("Water plants")).unwrap();
    assert_eq!(f.todos.stats().unwrap().status_count("pending"), 1);

    f.todos.complete(id).unwrap();
    let stats = f.todos.stats().unwrap();
    assert_eq!(stats.status_count("pending"), 0);
    assert_eq!(stats.status_count("completed"), 1);

    let view = f.todos.get(id, true).unwrap().unwrap();
    assert_eq!(
        view.meta_value(DETAILS, fields::PRIORITY).and_then(|v| v.as_str()),
        Some("medium")
    );
}

#[test]
fn clear_completed_removes_only_completed() {
    let f = fixture();
    seed(&f.todos);

    assert_eq!(f.todos.clear_completed().unwrap(), 3);
    assert_eq!(f.todos.clear_completed().unwrap(), 0);

    let stats = f.todos.stats().unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.status_count("completed"), 0);
    assert!(f.todos.with_status(TodoStatus::Completed).unwrap().is_empty());
    assert_eq!(f.todos.with_status(TodoStatus::Pending).unwrap().len(), 2);
}

#[test]
fn overdue_list_skips_completed() {
    let f = fixture();
    seed(&f.todos);
    f.todos
        .add(NewTodo::new("Return books").due(date(5, 1)))
        .unwrap();

    let overdue = f.todos.overdue(f.clock.today()).unwrap();
    let titles: Vec<_> = overdue.iter().map(|v| v.record.title.as_str()).collect();
    assert_eq!(titles, vec!["Return books", "File taxes"]);
}

#[test]
fn invalid_estimate_is_rejected() {
    let f = fixture();
    let err = f
        .todos
        .add(NewTodo::new("Negative").estimate(-1.0))
        .unwrap_err();
    let errors = err.validation_errors().unwrap();
    assert_eq!(errors.get(fields::ESTIMATE), Some(ErrorKind::OutOfRange));
}

#[test]
fn missing_todo_is_not_found() {
    let f = fixture();
    let id = f.todos.add(NewTodo::new("Only one")).unwrap();
    f.todos.delete(id).unwrap();

    assert!(matches!(f.todos.complete(id), Err(CoreError::NotFound { .. })));
    assert!(f.todos.delete(id).unwrap_err().is_not_found());
}

#[test]
fn admin_metadata() {
    let f = fixture();
    assert_eq!(f.todos.state(), Lifecycle::Running);

    let keys: Vec<_> = f.todos.admin_columns().iter().map(|c| c.key.as_str()).collect();
    assert_eq!(keys, vec!["title", "status", "priority", "due_date", "created"]);
    assert!(f.todos.admin_columns().iter().all(|c| c.sortable));

    let actions: Vec<_> = f
        .todos
        .admin_buttons()
        .iter()
        .map(|b| b.action.as_str())
        .collect();
    assert_eq!(
        actions,
        vec![admin::EXPORT_ACTION, admin::CLEAR_COMPLETED_ACTION]
    );

    let id = f
        .todos
        .add(NewTodo::new("Render me").due(date(6, 12)))
        .unwrap();
    let view = f.todos.get(id, true).unwrap().unwrap();
    let cells: Vec<_> = f
        .todos
        .admin_columns()
        .iter()
        .map(|c| c.render(&view))
        .collect();
    assert_eq!(
        cells,
        vec!["Render me", "pending", "medium", "2024-06-12", "2024-06-10"]
    );
}

#[test]
fn csv_export_has_labels_and_quoting() {
    let f = fixture();
    f.todos
        .add(
            NewTodo::new("Milk, eggs")
                .priority(Priority::High)
                .due(date(6, 11))
                .estimate(0.5),
        )
        .unwrap();
    f.todos.add(NewTodo::new("Bread")).unwrap();

    let handle = f.todos.export(ExportFormat::Csv).unwrap();
    assert_eq!(handle.row_count, 2);

    let text = fs::read_to_string(handle.path()).unwrap();
    assert!(text.contains("\"Milk, eggs\""));

    let mut reader = csv::Reader::from_path(handle.path()).unwrap();
    let header: Vec<String> = reader
        .headers()
        .unwrap()
        .iter()
        .map(str::to_string)
        .collect();
    assert_eq!(
        header,
        vec!["id", "title", "status", "priority", "due_date", "estimate"]
    );

    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(&rows[0][1], "Milk, eggs");
    assert_eq!(&rows[0][3], "high");
    assert_eq!(&rows[0][4], "2024-06-11");
    assert_eq!(&rows[0][5], "0.5");
    assert_eq!(&rows[1][3], "medium");
    assert_eq!(&rows[1][4], "");

    f.todos.discard_export(&handle).unwrap();
    assert!(!handle.path().exists());
}

#[test]
fn json_lines_export() {
    let f = fixture();
    seed(&f.todos);

    let handle = f.todos.export(ExportFormat::JsonLines).unwrap();
    assert_eq!(handle.row_count, 6);

    let text = fs::read_to_string(handle.path()).unwrap();
    let first: serde_json::Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
    assert_eq!(first["title"], "File taxes");
    assert_eq!(first["due_date"], "2024-06-01");
    assert!(first["estimate"].is_null());
}
