//! Column paths of an export.

use crate::entity::{EntityView, Scalar, Target};
use std::fmt;

/// A dotted path selecting one export column.
///
/// Accepted forms are `entity.<attr>`, a bare `<attr>` and
/// `meta.<schema_id>.<field_key>`. Anything else is kept but renders as an
/// empty cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    raw: String,
    target: Option<Target>,
}

impl FieldPath {
    /// Parses a path. Never fails.
    pub fn parse(path: impl Into<String>) -> Self {
        let raw = path.into();
        let target = Target::parse(&raw);
        Self { raw, target }
    }

    /// Parses several paths.
    pub fn parse_all<I, S>(paths: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        paths.into_iter().map(Self::parse).collect()
    }

    /// Returns the header label: the last path segment.
    #[must_use]
    pub fn label(&self) -> &str {
        self.raw.rsplit('.').next().unwrap_or(&self.raw)
    }

    /// Returns the path as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the resolved target, if the path is understood.
    #[must_use]
    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    /// Reads the value from a view.
    #[must_use]
    pub fn resolve(&self, view: &EntityView) -> Option<Scalar> {
        self.target.as_ref()?.extract(view)
    }

    /// Renders the cell text; empty when unresolved.
    #[must_use]
    pub fn cell(&self, view: &EntityView) -> String {
        self.resolve(view)
            .map(|v| v.to_string())
            .unwrap_or_default()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}
