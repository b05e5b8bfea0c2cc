//! Filtering, sorting and pagination over entity views.
//!
//! Queries run in memory over the views produced by a collection scan, the
//! same way the store leaves all interpretation to the caller.

use super::record::{EntityView, RecordStatus};
use super::EntityId;
use crate::schema::FieldValue;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

/// A value a query or export can read from a view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Target {
    /// Record id.
    Id,
    /// Record title.
    Title,
    /// Record body.
    Body,
    /// Record status.
    Status,
    /// Creation instant.
    CreatedAt,
    /// Last modification instant.
    ModifiedAt,
    /// One field of one schema.
    Meta {
        /// Schema id.
        schema: String,
        /// Field key.
        key: String,
    },
}

impl Target {
    /// Targets a schema field.
    pub fn meta(schema: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Meta {
            schema: schema.into(),
            key: key.into(),
        }
    }

    /// Parses `attr`, `entity.attr` or `meta.schema.key`.
    #[must_use]
    pub fn parse(path: &str) -> Option<Self> {
        let parts: Vec<&str> = path.split('.').collect();
        match parts.as_slice() {
            ["entity", attr] | [attr] => Self::base(attr),
            ["meta", schema, key] if !schema.is_empty() && !key.is_empty() => {
                Some(Self::meta(*schema, *key))
            }
            _ => None,
        }
    }

    fn base(attr: &str) -> Option<Self> {
        Some(match attr {
            "id" => Self::Id,
            "title" => Self::Title,
            "body" => Self::Body,
            "status" => Self::Status,
            "created_at" => Self::CreatedAt,
            "modified_at" => Self::ModifiedAt,
            _ => return None,
        })
    }

    /// Returns the schema id for meta targets.
    #[must_use]
    pub fn schema(&self) -> Option<&str> {
        match self {
            Self::Meta { schema, .. } => Some(schema),
            _ => None,
        }
    }

    /// Reads the target from a view. Meta values that were not loaded or
    /// never stored are `None`.
    #[must_use]
    pub fn extract(&self, view: &EntityView) -> Option<Scalar> {
        let record = &view.record;
        Some(match self {
            Self::Id => Scalar::Id(record.id.as_u64()),
            Self::Title => Scalar::Text(record.title.clone()),
            Self::Body => Scalar::Text(record.body.clone()),
            Self::Status => Scalar::Text(record.status.as_str().to_string()),
            Self::CreatedAt => Scalar::DateTime(record.created_at),
            Self::ModifiedAt => Scalar::DateTime(record.modified_at),
            Self::Meta { schema, key } => Scalar::from(view.meta_value(schema, key)?),
        })
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id => f.write_str("id"),
            Self::Title => f.write_str("title"),
            Self::Body => f.write_str("body"),
            Self::Status => f.write_str("status"),
            Self::CreatedAt => f.write_str("created_at"),
            Self::ModifiedAt => f.write_str("modified_at"),
            Self::Meta { schema, key } => write!(f, "meta.{schema}.{key}"),
        }
    }
}

/// A comparable value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Text, choice values and statuses.
    Text(String),
    /// Numbers.
    Number(f64),
    /// Calendar dates.
    Date(NaiveDate),
    /// Instants.
    DateTime(DateTime<Utc>),
    /// Record ids.
    Id(u64),
}

impl Scalar {
    /// Orders two scalars, or `None` if they cannot be compared.
    ///
    /// Text is coerced to a number or ISO date when compared against one.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        use Scalar::{Date, DateTime as Instant, Id, Number, Text};
        match (self, other) {
            (Text(a), Text(b)) => Some(a.cmp(b)),
            (Number(a), Number(b)) => a.partial_cmp(b),
            (Date(a), Date(b)) => Some(a.cmp(b)),
            (Instant(a), Instant(b)) => Some(a.cmp(b)),
            (Id(a), Id(b)) => Some(a.cmp(b)),
            (Id(a), Number(b)) => (*a as f64).partial_cmp(b),
            (Number(a), Id(b)) => a.partial_cmp(&(*b as f64)),
            (Date(a), Instant(b)) => Some(a.cmp(&b.date_naive())),
            (Instant(a), Date(b)) => Some(a.date_naive().cmp(b)),
            (Number(_) | Date(_), Text(t)) => self.compare(&Self::coerce(self, t)?),
            (Text(t), Number(_) | Date(_)) => Self::coerce(other, t)?.compare(other),
            _ => None,
        }
    }

    fn coerce(like: &Self, text: &str) -> Option<Self> {
        match like {
            Self::Number(_) => text.trim().parse().ok().map(Self::Number),
            Self::Date(_) => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
                .ok()
                .map(Self::Date),
            _ => None,
        }
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(t) => f.write_str(t),
            Self::Number(n) => write!(f, "{n}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::DateTime(t) => f.write_str(&t.to_rfc3339_opts(SecondsFormat::Secs, true)),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

impl From<&FieldValue> for Scalar {
    fn from(value: &FieldValue) -> Self {
        match value {
            FieldValue::Text(s) | FieldValue::Choice(s) => Self::Text(s.clone()),
            FieldValue::Date(d) => Self::Date(*d),
            FieldValue::Number(n) => Self::Number(*n),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<NaiveDate> for Scalar {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<DateTime<Utc>> for Scalar {
    fn from(value: DateTime<Utc>) -> Self {
        Self::DateTime(value)
    }
}

impl From<RecordStatus> for Scalar {
    fn from(value: RecordStatus) -> Self {
        Self::Text(value.as_str().to_string())
    }
}

impl From<EntityId> for Scalar {
    fn from(value: EntityId) -> Self {
        Self::Id(value.as_u64())
    }
}

/// A binary comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
}

impl Comparison {
    fn holds(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
        }
    }
}

/// One filter of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `target <op> value`.
    Compare(Target, Comparison, Scalar),
    /// `target` equals one of the values.
    In(Target, Vec<Scalar>),
    /// `target` is text containing the needle, ignoring case.
    Contains(Target, String),
}

impl Condition {
    /// Returns the target the condition reads.
    #[must_use]
    pub fn target(&self) -> &Target {
        match self {
            Self::Compare(t, _, _) | Self::In(t, _) | Self::Contains(t, _) => t,
        }
    }

    /// Tests a view. A missing value never matches.
    #[must_use]
    pub fn matches(&self, view: &EntityView) -> bool {
        let Some(value) = self.target().extract(view) else {
            return false;
        };
        match self {
            Self::Compare(_, op, expected) => value
                .compare(expected)
                .is_some_and(|ordering| op.holds(ordering)),
            Self::In(_, options) => options
                .iter()
                .any(|o| value.compare(o) == Some(Ordering::Equal)),
            Self::Contains(_, needle) => value
                .as_text()
                .is_some_and(|text| text.to_lowercase().contains(&needle.to_lowercase())),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

/// A filtered, optionally sorted and paginated listing.
///
/// Without a sort key results keep insertion order. With one the sort is
/// stable, ties keep id order and records lacking the value come last.
///
/// # Example
///
/// ```rust
/// use entikit_core::{Comparison, Query, SortOrder, Target};
///
/// let query = Query::new()
///     .where_eq(Target::meta("todo_details", "status"), "pending")
///     .where_cmp(Target::meta("todo_details", "estimate"), Comparison::Ge, 1.0)
///     .sort_by(Target::meta("todo_details", "due_date"), SortOrder::Ascending)
///     .page(2, 10);
/// assert_eq!(query.offset_value(), 10);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    conditions: Vec<Condition>,
    sort: Option<(Target, SortOrder)>,
    limit: Option<usize>,
    offset: usize,
}

impl Query {
    /// Creates a query matching everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality filter.
    #[must_use]
    pub fn where_eq(self, target: Target, value: impl Into<Scalar>) -> Self {
        self.where_cmp(target, Comparison::Eq, value)
    }

    /// Adds a comparison filter.
    #[must_use]
    pub fn where_cmp(mut self, target: Target, op: Comparison, value: impl Into<Scalar>) -> Self {
        self.conditions
            .push(Condition::Compare(target, op, value.into()));
        self
    }

    /// Adds a membership filter.
    #[must_use]
    pub fn where_in<I, V>(mut self, target: Target, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Scalar>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.conditions.push(Condition::In(target, values));
        self
    }

    /// Adds a case-insensitive substring filter.
    #[must_use]
    pub fn where_contains(mut self, target: Target, needle: impl Into<String>) -> Self {
        self.conditions
            .push(Condition::Contains(target, needle.into()));
        self
    }

    /// Sorts by a target.
    #[must_use]
    pub fn sort_by(mut self, target: Target, order: SortOrder) -> Self {
        self.sort = Some((target, order));
        self
    }

    /// Caps the number of results.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips the first matches.
    #[must_use]
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Selects a 1-based page of `per_page` results.
    #[must_use]
    pub fn page(self, page: usize, per_page: usize) -> Self {
        let skip = page.saturating_sub(1).saturating_mul(per_page);
        self.offset(skip).limit(per_page)
    }

    /// Returns the filters.
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Returns the sort key.
    #[must_use]
    pub fn sort(&self) -> Option<&(Target, SortOrder)> {
        self.sort.as_ref()
    }

    /// Returns the result cap.
    #[must_use]
    pub const fn limit_value(&self) -> Option<usize> {
        self.limit
    }

    /// Returns the number of skipped matches.
    #[must_use]
    pub const fn offset_value(&self) -> usize {
        self.offset
    }

    /// Returns the schema ids the query reads.
    #[must_use]
    pub fn schemas(&self) -> BTreeSet<&str> {
        self.conditions
            .iter()
            .map(Condition::target)
            .chain(self.sort.as_ref().map(|(t, _)| t))
            .filter_map(Target::schema)
            .collect()
    }

    /// Tests a view against every filter.
    #[must_use]
    pub fn matches(&self, view: &EntityView) -> bool {
        self.conditions.iter().all(|c| c.matches(view))
    }

    /// Sorts views in place. No-op without a sort key.
    pub fn sort_views(&self, views: &mut [EntityView]) {
        let Some((target, order)) = &self.sort else {
            return;
        };
        let mut keyed: Vec<(Option<Scalar>, usize)> = views
            .iter()
            .enumerate()
            .map(|(i, v)| (target.extract(v), i))
            .collect();
        keyed.sort_by(|(a, ia), (b, ib)| {
            let ordering = match (a, b) {
                (Some(a), Some(b)) => {
                    let ordering = a.compare(b).unwrap_or(Ordering::Equal);
                    match order {
                        SortOrder::Ascending => ordering,
                        SortOrder::Descending => ordering.reverse(),
                    }
                }
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            ordering.then_with(|| views[*ia].id().cmp(&views[*ib].id()))
        });
        let order: Vec<usize> = keyed.into_iter().map(|(_, i)| i).collect();
        let sorted: Vec<EntityView> = order.iter().map(|&i| views[i].clone()).collect();
        for (slot, view) in views.iter_mut().zip(sorted) {
            *slot = view;
        }
    }

    /// Applies offset and limit to an iterator of matches.
    pub fn paginate<I: Iterator>(&self, iter: I) -> impl Iterator<Item = I::Item> {
        iter.skip(self.offset).take(self.limit.unwrap_or(usize::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::record::EntityRecord;
    use crate::schema::FieldValues;
    use std::collections::BTreeMap;

    fn view(id: u64, title: &str, priority: Option<&str>, estimate: Option<f64>) -> EntityView {
        let now = Utc::now();
        let mut fields = FieldValues::new();
        if let Some(p) = priority {
            fields.insert("priority".into(), FieldValue::Choice(p.into()));
        }
        if let Some(e) = estimate {
            fields.insert("estimate".into(), FieldValue::Number(e));
        }
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

    fn ids(views: &[EntityView]) -> Vec<u64> {
        views.iter().map(|v| v.id().as_u64()).collect()
    }

    #[test]
    fn parse_targets() {
        assert_eq!(Target::parse("title"), Some(Target::Title));
        assert_eq!(Target::parse("entity.created_at"), Some(Target::CreatedAt));
        assert_eq!(Target::parse("meta.d.priority"), Some(Target::meta("d", "priority")));
        assert_eq!(Target::parse("meta.d"), None);
        assert_eq!(Target::parse("colour"), None);
        assert_eq!(Target::parse("entity.meta.d.x"), None);
    }

    #[test]
    fn range_filter_skips_missing_values() {
        let views = vec![
            view(1, "a", None, Some(1.0)),
            view(2, "b", None, None),
            view(3, "c", None, Some(3.0)),
        ];
        let query = Query::new().where_cmp(Target::meta("d", "estimate"), Comparison::Ge, 2.0);
        let matched: Vec<_> = views.into_iter().filter(|v| query.matches(v)).collect();
        assert_eq!(ids(&matched), vec![3]);
    }

    #[test]
    fn ne_does_not_match_missing() {
        let query = Query::new().where_cmp(Target::meta("d", "priority"), Comparison::Ne, "low");
        assert!(!query.matches(&view(1, "a", None, None)));
        assert!(query.matches(&view(2, "b", Some("high"), None)));
    }

    #[test]
    fn in_and_contains() {
        let q = Query::new()
            .where_in(Target::meta("d", "priority"), ["low", "high"])
            .where_contains(Target::Title, "MILK");
        assert!(q.matches(&view(1, "Buy milk", Some("high"), None)));
        assert!(!q.matches(&view(2, "Buy milk", Some("medium"), None)));
        assert!(!q.matches(&view(3, "Buy eggs", Some("low"), None)));
    }

    #[test]
    fn text_coerces_against_numbers_and_dates() {
        let n = Scalar::Number(2.5);
        assert_eq!(n.compare(&Scalar::from("2.5")), Some(Ordering::Equal));
        let d = Scalar::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(d.compare(&Scalar::from("2024-01-03")), Some(Ordering::Less));
        assert_eq!(Scalar::from("x").compare(&Scalar::Id(1)), None);
    }

    #[test]
    fn sort_is_stable_with_missing_last() {
        let mut views = vec![
            view(1, "a", None, Some(2.0)),
            view(2, "b", None, None),
            view(3, "c", None, Some(1.0)),
            view(4, "d", None, Some(2.0)),
        ];
        let asc = Query::new().sort_by(Target::meta("d", "estimate"), SortOrder::Ascending);
        asc.sort_views(&mut views);
        assert_eq!(ids(&views), vec![3, 1, 4, 2]);

        let desc = Query::new().sort_by(Target::meta("d", "estimate"), SortOrder::Descending);
        desc.sort_views(&mut views);
        assert_eq!(ids(&views), vec![1, 4, 3, 2]);
    }

    #[test]
    fn pagination() {
        let q = Query::new().page(2, 2);
        let got: Vec<_> = q.paginate(1..=5).collect();
        assert_eq!(got, vec![3, 4]);
        let all: Vec<_> = Query::new().paginate(1..=3).collect();
        assert_eq!(all, vec![1, 2, 3]);
    }

    #[test]
    fn schemas_read_by_query() {
        let q = Query::new()
            .where_eq(Target::meta("a", "x"), "1")
            .where_eq(Target::Title, "t")
            .sort_by(Target::meta("b", "y"), SortOrder::Ascending);
        let schemas: Vec<_> = q.schemas().into_iter().collect();
        assert_eq!(schemas, vec!["a", "b"]);
    }
}
