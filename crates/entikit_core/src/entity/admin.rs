//! Declarative admin list metadata.
//!
//! Columns and buttons only describe what a list screen shows; rendering
//! them is left to the host.

use super::query::Target;
use super::record::EntityView;

/// Custom cell renderer.
pub type CellFormatter = fn(&EntityView) -> String;

/// One column of an admin list.
#[derive(Debug, Clone)]
pub struct AdminColumn {
    /// Column key.
    pub key: String,
    /// Column header.
    pub label: String,
    /// Whether the host may offer sorting on this column.
    pub sortable: bool,
    /// Value shown when no formatter is set.
    pub target: Option<Target>,
    /// Custom renderer, preferred over `target`.
    pub formatter: Option<CellFormatter>,
}

impl AdminColumn {
    /// Creates a column reading the target named by `key`, if any.
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        let key = key.into();
        let target = Target::parse(&key);
        Self {
            key,
            label: label.into(),
            sortable: false,
            target,
            formatter: None,
        }
    }

    /// Marks the column sortable.
    #[must_use]
    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    /// Sets the value the column shows.
    #[must_use]
    pub fn target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    /// Sets a custom renderer.
    #[must_use]
    pub fn formatter(mut self, formatter: CellFormatter) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Renders the cell for one view; empty when there is nothing to show.
    #[must_use]
    pub fn render(&self, view: &EntityView) -> String {
        if let Some(format) = self.formatter {
            return format(view);
        }
        self.target
            .as_ref()
            .and_then(|t| t.extract(view))
            .map(|v| v.to_string())
            .unwrap_or_default()
    }
}

/// An action button of an admin list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminButton {
    /// Button id.
    pub id: String,
    /// Button caption.
    pub label: String,
    /// Action name the host dispatches on click.
    pub action: String,
}

impl AdminButton {
    /// Creates a button.
    pub fn new(id: impl Into<String>, label: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            action: action.into(),
        }
    }
}
