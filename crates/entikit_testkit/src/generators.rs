//! Property-based test generators using proptest.
//!
//! Strategies produce inputs that pass the todo details schema unless the
//! name says otherwise.

use chrono::NaiveDate;
use entikit_core::RawValues;
use entikit_todo::{fields, NewTodo, Priority, TodoStatus};
use proptest::prelude::*;

/// Strategy for generating todo titles, including CSV-hostile characters.
pub fn title_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z][A-Za-z0-9 ,\"']{0,39}").expect("Invalid regex")
}

/// Strategy for generating dates within 2020-2029.
pub fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (2020i32..2030, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).expect("day 1-28 is always valid"))
}

/// Strategy for generating workflow statuses.
pub fn status_strategy() -> impl Strategy<Value = TodoStatus> {
    prop::sample::select(TodoStatus::ALL.to_vec())
}

/// Strategy for generating priorities.
pub fn priority_strategy() -> impl Strategy<Value = Priority> {
    prop::sample::select(Priority::ALL.to_vec())
}

/// Strategy for generating estimates on the half-hour grid.
pub fn estimate_strategy() -> impl Strategy<Value = f64> {
    (0u32..80).prop_map(|halves| f64::from(halves) * 0.5)
}

/// Strategy for generating valid new todos.
pub fn new_todo_strategy() -> impl Strategy<Value = NewTodo> {
    (
        title_strategy(),
        status_strategy(),
        priority_strategy(),
        prop::option::of(date_strategy()),
        prop::option::of(estimate_strategy()),
    )
        .prop_map(|(title, status, priority, due, estimate)| {
            let mut todo = NewTodo::new(title).status(status).priority(priority);
            if let Some(due) = due {
                todo = todo.due(due);
            }
            if let Some(hours) = estimate {
                todo = todo.estimate(hours);
            }
            todo
        })
}

/// Strategy for generating raw details input, valid or not.
///
/// Values are drawn from a mix of accepted choices, off-grid numbers,
/// malformed dates and blanks.
pub fn raw_details_strategy() -> impl Strategy<Value = RawValues> {
    let status = prop_oneof![
        Just(String::new()),
        Just("pending".to_string()),
        Just("done".to_string()),
    ];
    let estimate = prop_oneof![
        Just("1.5".to_string()),
        Just("-2".to_string()),
        Just("0.3".to_string()),
        Just("lots".to_string()),
    ];
    let due = prop_oneof![
        Just("2024-06-01".to_string()),
        Just("06/01/2024".to_string()),
    ];
    (
        prop::option::of(status),
        prop::option::of(estimate),
        prop::option::of(due),
    )
        .prop_map(|(status, estimate, due)| {
            let mut raw = RawValues::new();
            for (key, value) in [
                (fields::STATUS, status),
                (fields::ESTIMATE, estimate),
                (fields::DUE_DATE, due),
            ] {
                if let Some(value) = value {
                    raw.insert(key.to_string(), value);
                }
            }
            raw
        })
}

/// A batch of todo operations for model-based tests.
#[derive(Debug, Clone)]
pub enum TodoOp {
    /// Add a todo.
    Add(NewTodo),
    /// Complete the todo at this index of the live list, modulo its length.
    Complete(usize),
    /// Delete the todo at this index of the live list, modulo its length.
    Delete(usize),
    /// Delete every completed todo.
    ClearCompleted,
}

/// Strategy for generating operation sequences.
pub fn todo_ops_strategy(max_len: usize) -> impl Strategy<Value = Vec<TodoOp>> {
    let op = prop_oneof![
        4 => new_todo_strategy().prop_map(TodoOp::Add),
        2 => any::<usize>().prop_map(TodoOp::Complete),
        1 => any::<usize>().prop_map(TodoOp::Delete),
        1 => Just(TodoOp::ClearCompleted),
    ];
    prop::collection::vec(op, 0..max_len)
}
