//! Streaming export of entity views.
//!
//! Rows are written to a [`TempSink`] artifact as they arrive, so an export
//! never holds the whole listing in memory. The caller owns the artifact and
//! removes it with [`Exporter::discard`] once it has been delivered.

mod path;
mod sink;

pub use path::FieldPath;
pub use sink::{FsTempSink, TempHandle, TempSink};

use crate::entity::{EntityView, Query, Scalar};
use crate::error::{CoreError, CoreResult};
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Output format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Comma separated values with a header row.
    #[default]
    Csv,
    /// One JSON object per line, keyed by column label (the full path when
    /// two columns share a label).
    JsonLines,
}

impl ExportFormat {
    /// Returns the artifact file extension.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::JsonLines => "jsonl",
        }
    }
}

/// A finished export artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportHandle {
    /// Where the artifact was written.
    pub path: PathBuf,
    /// Number of data rows written.
    pub row_count: usize,
    /// Format of the artifact.
    pub format: ExportFormat,
}

impl ExportHandle {
    /// Returns the artifact path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// What an entity export contains.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportSpec {
    /// Records to export.
    pub query: Query,
    /// Columns, in order.
    pub fields: Vec<FieldPath>,
    /// Output format.
    pub format: ExportFormat,
}

impl ExportSpec {
    /// Exports every record with the given columns as CSV.
    pub fn csv<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            query: Query::new(),
            fields: FieldPath::parse_all(fields),
            format: ExportFormat::Csv,
        }
    }

    /// Restricts the export to a query.
    #[must_use]
    pub fn query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    /// Sets the format.
    #[must_use]
    pub fn format(mut self, format: ExportFormat) -> Self {
        self.format = format;
        self
    }
}

/// Writes views to sink artifacts.
#[derive(Clone)]
pub struct Exporter {
    sink: Arc<dyn TempSink>,
    delimiter: u8,
}

impl Exporter {
    /// Creates an exporter writing comma separated CSV.
    pub fn new(sink: Arc<dyn TempSink>) -> Self {
        Self {
            sink,
            delimiter: b',',
        }
    }

    /// Sets the CSV delimiter.
    #[must_use]
    pub const fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Writes every row to a new artifact.
    ///
    /// The header (CSV) or key set (JSON lines) is the label of each path;
    /// JSON lines fall back to the whole path for labels that repeat.
    /// Paths that do not resolve produce empty cells.
    ///
    /// # Errors
    ///
    /// - The first error yielded by `rows`, unchanged
    /// - `CoreError::Export` if the artifact cannot be created or written
    ///
    /// On any error the partial artifact is deleted.
    pub fn export<I>(
        &self,
        rows: I,
        fields: &[FieldPath],
        format: ExportFormat,
    ) -> CoreResult<ExportHandle>
    where
        I: IntoIterator<Item = CoreResult<EntityView>>,
    {
        let mut handle = self
            .sink
            .open_for_write(format.extension())
            .map_err(CoreError::export)?;
        let path = handle.path().to_path_buf();

        let written = match format {
            ExportFormat::Csv => self.write_csv(&mut handle, rows, fields),
            ExportFormat::JsonLines => write_json_lines(&mut handle, rows, fields),
        };
        drop(handle);

        match written {
            Ok(row_count) => {
                info!(path = %path.display(), row_count, ?format, "export written");
                Ok(ExportHandle {
                    path,
                    row_count,
                    format,
                })
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "export failed; removing artifact");
                if let Err(e) = self.sink.delete(&path) {
                    warn!(path = %path.display(), error = %e, "could not remove partial export");
                }
                Err(err)
            }
        }
    }

    /// Deletes a finished artifact. Discarding twice succeeds.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Io` if the artifact exists but cannot be removed.
    pub fn discard(&self, handle: &ExportHandle) -> CoreResult<()> {
        self.sink.delete(&handle.path)?;
        Ok(())
    }

    fn write_csv<W, I>(&self, out: W, rows: I, fields: &[FieldPath]) -> CoreResult<usize>
    where
        W: Write,
        I: IntoIterator<Item = CoreResult<EntityView>>,
    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(out);
        writer.write_record(fields.iter().map(FieldPath::label))?;

        let mut count = 0;
        for row in rows {
            let view = row?;
            writer.write_record(fields.iter().map(|f| f.cell(&view)))?;
            count += 1;
        }
        writer.flush().map_err(CoreError::export)?;
        Ok(count)
    }
}

impl fmt::Debug for Exporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exporter")
            .field("delimiter", &char::from(self.delimiter))
            .finish_non_exhaustive()
    }
}

fn write_json_lines<W, I>(mut out: W, rows: I, fields: &[FieldPath]) -> CoreResult<usize>
where
    W: Write,
    I: IntoIterator<Item = CoreResult<EntityView>>,
{
    let keys = json_keys(fields);
    let mut count = 0;
    for row in rows {
        let view = row?;
        let object: serde_json::Map<String, serde_json::Value> = keys
            .iter()
            .zip(fields)
            .map(|(key, f)| (key.to_string(), json_value(f.resolve(&view))))
            .collect();
        serde_json::to_writer(&mut out, &object)?;
        out.write_all(b"\n").map_err(CoreError::export)?;
        count += 1;
    }
    out.flush().map_err(CoreError::export)?;
    Ok(count)
}

/// Object keys for JSON lines: the label, or the whole path for fields
/// whose label is shared with another field.
fn json_keys(fields: &[FieldPath]) -> Vec<&str> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for field in fields {
        *seen.entry(field.label()).or_default() += 1;
    }
    fields
        .iter()
        .map(|f| if seen[f.label()] > 1 { f.as_str() } else { f.label() })
        .collect()
}

fn json_value(value: Option<Scalar>) -> serde_json::Value {
    use serde_json::Value;
    match value {
        None => Value::Null,
        Some(Scalar::Number(n)) => serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number),
        Some(Scalar::Id(id)) => Value::from(id),
        Some(other) => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityId, EntityRecord, RecordStatus};
    use crate::schema::{FieldValue, FieldValues};
    use chrono::Utc;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::tempdir;

    fn view(id: u64, title: &str, priority: &str) -> EntityView {
        let now = Utc::now();
        let mut fields = FieldValues::new();
        fields.insert("priority".into(), FieldValue::Choice(priority.into()));
        let mut meta = BTreeMap::new();
        meta.insert("d".to_string(), fields);
        EntityView {
            record: EntityRecord {
                id: EntityId::new(id),
                entity_type: "todo".into(),
                title: title.into(),
                body: String::new(),
                status: RecordStatus::Draft,
                created_at: now,
                modified_at: now,
            },
            meta,
        }
    }

    fn exporter(dir: &Path) -> Exporter {
        Exporter::new(Arc::new(FsTempSink::new(dir, "test")))
    }

    #[test]
    fn csv_quotes_commas() {
        let dir = tempdir().unwrap();
        let rows = vec![Ok(view(1, "Milk, eggs", "high")), Ok(view(2, "Bread", "low"))];
        let fields = FieldPath::parse_all(["title", "meta.d.priority"]);

        let handle = exporter(dir.path())
            .export(rows, &fields, ExportFormat::Csv)
            .unwrap();
        assert_eq!(handle.row_count, 2);

        let text = fs::read_to_string(handle.path()).unwrap();
        assert_eq!(text, "title,priority\n\"Milk, eggs\",high\nBread,low\n");
    }

    #[test]
    fn unresolved_paths_are_empty_cells() {
        let dir = tempdir().unwrap();
        let fields = FieldPath::parse_all(["id", "entity.colour", "meta.x.y"]);
        let handle = exporter(dir.path())
            .export(vec![Ok(view(7, "t", "low"))], &fields, ExportFormat::Csv)
            .unwrap();
        let text = fs::read_to_string(handle.path()).unwrap();
        assert_eq!(text, "id,colour,y\n7,,\n");
    }

    #[test]
    fn custom_delimiter() {
        let dir = tempdir().unwrap();
        let fields = FieldPath::parse_all(["title", "meta.d.priority"]);
        let handle = exporter(dir.path())
            .with_delimiter(b';')
            .export(vec![Ok(view(1, "a;b", "high"))], &fields, ExportFormat::Csv)
            .unwrap();
        let text = fs::read_to_string(handle.path()).unwrap();
        assert_eq!(text, "title;priority\n\"a;b\";high\n");
    }

    #[test]
    fn json_lines() {
        let dir = tempdir().unwrap();
        let fields = FieldPath::parse_all(["id", "title", "meta.d.missing"]);
        let handle = exporter(dir.path())
            .export(vec![Ok(view(4, "Tea", "low"))], &fields, ExportFormat::JsonLines)
            .unwrap();
        assert!(handle.path().extension().is_some_and(|e| e == "jsonl"));

        let text = fs::read_to_string(handle.path()).unwrap();
        let line: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(line["id"], 4);
        assert_eq!(line["title"], "Tea");
        assert!(line["missing"].is_null());
    }

    #[test]
    fn json_lines_keep_columns_with_shared_labels() {
        let dir = tempdir().unwrap();
        let fields = FieldPath::parse_all(["title", "meta.d.priority", "meta.e.priority"]);
        let handle = exporter(dir.path())
            .export(vec![Ok(view(4, "Tea", "low"))], &fields, ExportFormat::JsonLines)
            .unwrap();

        let text = fs::read_to_string(handle.path()).unwrap();
        let line: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(line.as_object().unwrap().len(), 3);
        assert_eq!(line["title"], "Tea");
        assert_eq!(line["meta.d.priority"], "low");
        assert!(line["meta.e.priority"].is_null());
    }

    #[test]
    fn failing_row_removes_artifact() {
        let dir = tempdir().unwrap();
        let rows = vec![
            Ok(view(1, "ok", "low")),
            Err(CoreError::export("source went away")),
        ];
        let result = exporter(dir.path()).export(rows, &FieldPath::parse_all(["title"]), ExportFormat::Csv);
        assert!(matches!(result, Err(CoreError::Export { .. })));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn discard_removes_artifact() {
        let dir = tempdir().unwrap();
        let exporter = exporter(dir.path());
        let handle = exporter
            .export(Vec::new(), &FieldPath::parse_all(["title"]), ExportFormat::Csv)
            .unwrap();
        assert_eq!(handle.row_count, 0);
        assert!(handle.path().exists());

        exporter.discard(&handle).unwrap();
        assert!(!handle.path().exists());
        exporter.discard(&handle).unwrap();
    }
}
