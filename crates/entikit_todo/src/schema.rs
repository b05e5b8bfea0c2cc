//! The `todo_details` field schema.

use entikit_core::{Choices, Constraints, FieldSchema, SchemaResult};
use std::fmt;
use std::str::FromStr;

/// Entity type name of todos.
pub const TODO_TYPE: &str = "todo";

/// Id of the todo details schema.
pub const DETAILS: &str = "todo_details";

/// Field keys of the details schema.
pub mod fields {
    /// Workflow status.
    pub const STATUS: &str = "status";
    /// Priority.
    pub const PRIORITY: &str = "priority";
    /// Due date.
    pub const DUE_DATE: &str = "due_date";
    /// Estimated hours.
    pub const ESTIMATE: &str = "estimate";
}

/// Workflow status of a todo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TodoStatus {
    /// Not started.
    #[default]
    Pending,
    /// Being worked on.
    InProgress,
    /// Done.
    Completed,
}

impl TodoStatus {
    /// Every status in display order.
    pub const ALL: [Self; 3] = [Self::Pending, Self::InProgress, Self::Completed];

    /// Returns the stored choice value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    /// Returns the display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }
}

/// Priority of a todo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Priority {
    /// Can wait.
    Low,
    /// Normal.
    #[default]
    Medium,
    /// Urgent.
    High,
}

impl Priority {
    /// Every priority in display order.
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    /// Returns the stored choice value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Returns the display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

macro_rules! choice_enum_impls {
    ($ty:ty, $what:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .into_iter()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| format!(concat!("unknown ", $what, " '{}'"), s))
            }
        }
    };
}

choice_enum_impls!(TodoStatus, "status");
choice_enum_impls!(Priority, "priority");

/// Builds the `todo_details` schema.
///
/// | key | kind | rules |
/// |---|---|---|
/// | `status` | select | required, default `pending` |
/// | `priority` | select | default `medium` |
/// | `due_date` | date | `%Y-%m-%d` |
/// | `estimate` | number | hours, `>= 0`, half-hour steps |
///
/// # Errors
///
/// Never fails for this fixed definition; the `Result` comes from the
/// schema builder.
pub fn details_schema() -> SchemaResult<FieldSchema> {
    let statuses = TodoStatus::ALL
        .into_iter()
        .fold(Choices::new(), |c, s| c.with(s.as_str(), s.label()));
    let priorities = Priority::ALL
        .into_iter()
        .fold(Choices::new(), |c, p| c.with(p.as_str(), p.label()));

    FieldSchema::define(DETAILS, "Todo Details", TODO_TYPE)
        .select(
            fields::STATUS,
            "Status",
            statuses,
            Constraints::new()
                .required()
                .default_value(TodoStatus::Pending.as_str()),
        )?
        .select(
            fields::PRIORITY,
            "Priority",
            priorities,
            Constraints::new().default_value(Priority::Medium.as_str()),
        )?
        .date(fields::DUE_DATE, "Due Date", Constraints::new())?
        .number(
            fields::ESTIMATE,
            "Estimate (hours)",
            Constraints::new().min(0.0).step(0.5),
        )?
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use entikit_core::{ErrorKind, FieldKind, RawValues};

    #[test]
    fn schema_shape() {
        let schema = details_schema().unwrap();
        assert_eq!(schema.owner(), TODO_TYPE);
        let keys: Vec<_> = schema.fields().iter().map(|f| f.key()).collect();
        assert_eq!(keys, vec!["status", "priority", "due_date", "estimate"]);
        assert_eq!(schema.field("due_date").unwrap().kind(), FieldKind::Date);

        let statuses: Vec<_> = schema.choices("status").unwrap().values().collect();
        assert_eq!(statuses, vec!["pending", "in_progress", "completed"]);
    }

    #[test]
    fn defaults() {
        let defaults = details_schema().unwrap().defaults();
        assert_eq!(defaults["status"].as_str(), Some("pending"));
        assert_eq!(defaults["priority"].as_str(), Some("medium"));
        assert!(!defaults.contains_key("due_date"));
    }

    #[test]
    fn estimate_in_half_hours() {
        let schema = details_schema().unwrap();
        let mut raw = RawValues::new();
        raw.insert("status".into(), "pending".into());
        raw.insert("estimate".into(), "1.5".into());
        assert!(schema.validate(&raw).is_ok());

        raw.insert("estimate".into(), "1.3".into());
        let errors = schema.validate(&raw).unwrap_err();
        assert_eq!(errors.get("estimate"), Some(ErrorKind::OutOfRange));
    }

    #[test]
    fn enums_parse() {
        assert_eq!("in_progress".parse::<TodoStatus>(), Ok(TodoStatus::InProgress));
        assert_eq!("high".parse::<Priority>(), Ok(Priority::High));
        assert!("urgent".parse::<Priority>().is_err());
        assert_eq!(TodoStatus::Completed.to_string(), "completed");
    }
}
