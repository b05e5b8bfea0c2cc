//! Sample data walkthrough.

use chrono::{Days, NaiveDate};
use entikit_core::ExportFormat;
use entikit_todo::{NewTodo, Priority, TodoStatus, Todos};
use std::fs;

/// Seeds sample todos relative to today, then prints statistics, the
/// overdue list and a CSV export.
pub fn run(todos: &Todos) -> Result<(), Box<dyn std::error::Error>> {
    let today = todos.context().clock.today();
    let day = |offset: i64| -> NaiveDate {
        if offset < 0 {
            today - Days::new(offset.unsigned_abs())
        } else {
            today + Days::new(offset.unsigned_abs())
        }
    };

    let samples = [
        NewTodo::new("Write release notes")
            .priority(Priority::High)
            .due(day(-2))
            .estimate(2.0),
        NewTodo::new("Review pull requests")
            .status(TodoStatus::InProgress)
            .due(day(1))
            .estimate(1.5),
        NewTodo::new("Renew domain, DNS and TLS")
            .priority(Priority::High)
            .due(day(7)),
        NewTodo::new("Archive old tickets")
            .priority(Priority::Low)
            .status(TodoStatus::Completed)
            .due(day(-5)),
    ];
    for todo in samples {
        todos.add(todo)?;
    }

    println!("Statistics:");
    println!("{}", serde_json::to_string_pretty(&todos.stats()?)?);

    println!("\nOverdue:");
    for view in todos.overdue(today)? {
        println!("  #{} {}", view.id(), view.record.title);
    }

    let handle = todos.export(ExportFormat::Csv)?;
    println!("\nExport ({} rows, {}):", handle.row_count, handle.path().display());
    print!("{}", fs::read_to_string(handle.path())?);
    todos.discard_export(&handle)?;
    Ok(())
}
