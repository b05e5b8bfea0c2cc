//! Admin list metadata for todos.

use crate::schema::{fields, DETAILS};
use entikit_core::{AdminButton, AdminColumn, EntityView, Target};

/// Action name of the CSV export button.
pub const EXPORT_ACTION: &str = "export_csv";

/// Action name of the clear-completed button.
pub const CLEAR_COMPLETED_ACTION: &str = "clear_completed";

/// Columns of the todo list: title, status, priority, due date, created.
#[must_use]
pub fn columns() -> Vec<AdminColumn> {
    vec![
        AdminColumn::new("title", "Title").sortable(),
        AdminColumn::new("status", "Status")
            .target(Target::meta(DETAILS, fields::STATUS))
            .sortable(),
        AdminColumn::new("priority", "Priority")
            .target(Target::meta(DETAILS, fields::PRIORITY))
            .sortable(),
        AdminColumn::new("due_date", "Due Date")
            .target(Target::meta(DETAILS, fields::DUE_DATE))
            .sortable(),
        AdminColumn::new("created", "Created")
            .formatter(created_date)
            .sortable(),
    ]
}

/// Buttons above the todo list.
#[must_use]
pub fn buttons() -> Vec<AdminButton> {
    vec![
        AdminButton::new("export", "Export CSV", EXPORT_ACTION),
        AdminButton::new("clear", "Clear Completed", CLEAR_COMPLETED_ACTION),
    ]
}

fn created_date(view: &EntityView) -> String {
    view.record.created_at.format("%Y-%m-%d").to_string()
}
