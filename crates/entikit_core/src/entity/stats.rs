//! Aggregate statistics over an entity type.

use super::query::{Scalar, Target};
use super::record::{EntityView, RecordStatus};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Which values the statistics are computed from.
///
/// Without a status target, records are counted by [`RecordStatus`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSpec {
    /// Value counted per status.
    pub status: Option<Target>,
    /// Status value that exempts a record from being overdue.
    pub completed_value: Option<String>,
    /// Value counted per priority.
    pub priority: Option<Target>,
    /// Date compared against today for the overdue count.
    pub due_date: Option<Target>,
}

impl StatsSpec {
    /// Creates a spec counting base record statuses only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the status target.
    #[must_use]
    pub fn status(mut self, target: Target) -> Self {
        self.status = Some(target);
        self
    }

    /// Sets the completed status value.
    #[must_use]
    pub fn completed(mut self, value: impl Into<String>) -> Self {
        self.completed_value = Some(value.into());
        self
    }

    /// Sets the priority target.
    #[must_use]
    pub fn priority(mut self, target: Target) -> Self {
        self.priority = Some(target);
        self
    }

    /// Sets the due date target.
    #[must_use]
    pub fn due_date(mut self, target: Target) -> Self {
        self.due_date = Some(target);
        self
    }

    /// Returns every target the statistics read.
    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        [&self.status, &self.priority, &self.due_date]
            .into_iter()
            .flatten()
    }
}

/// Computed statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Number of records.
    pub total: usize,
    /// Records per status value.
    pub by_status: BTreeMap<String, usize>,
    /// Records per priority value; empty without a priority target.
    pub by_priority: BTreeMap<String, usize>,
    /// Records due before today that are not completed.
    pub overdue: usize,
}

impl StatsSnapshot {
    /// Returns the count for one status value.
    #[must_use]
    pub fn status_count(&self, status: &str) -> usize {
        self.by_status.get(status).copied().unwrap_or(0)
    }

    /// Returns the count for one priority value.
    #[must_use]
    pub fn priority_count(&self, priority: &str) -> usize {
        self.by_priority.get(priority).copied().unwrap_or(0)
    }
}

/// Accumulates a [`StatsSnapshot`] one view at a time.
#[derive(Debug)]
pub(crate) struct StatsAccumulator<'a> {
    spec: &'a StatsSpec,
    today: NaiveDate,
    snapshot: StatsSnapshot,
}

impl<'a> StatsAccumulator<'a> {
    /// Starts with every known status and priority value at zero.
    pub(crate) fn new<S, P>(spec: &'a StatsSpec, today: NaiveDate, statuses: S, priorities: P) -> Self
    where
        S: IntoIterator<Item = String>,
        P: IntoIterator<Item = String>,
    {
        let mut snapshot = StatsSnapshot::default();
        if spec.status.is_some() {
            snapshot.by_status = statuses.into_iter().map(|s| (s, 0)).collect();
        } else {
            snapshot.by_status = RecordStatus::ALL
                .iter()
                .map(|s| (s.as_str().to_string(), 0))
                .collect();
        }
        if spec.priority.is_some() {
            snapshot.by_priority = priorities.into_iter().map(|p| (p, 0)).collect();
        }
        Self {
            spec,
            today,
            snapshot,
        }
    }

    pub(crate) fn add(&mut self, view: &EntityView) {
        self.snapshot.total += 1;

        let status = match &self.spec.status {
            Some(target) => target.extract(view).map(|s| s.to_string()),
            None => Some(view.record.status.as_str().to_string()),
        };
        if let Some(status) = &status {
            *self.snapshot.by_status.entry(status.clone()).or_insert(0) += 1;
        }

        if let Some(target) = &self.spec.priority {
            if let Some(priority) = target.extract(view) {
                *self
                    .snapshot
                    .by_priority
                    .entry(priority.to_string())
                    .or_insert(0) += 1;
            }
        }

        let completed = match (&status, &self.spec.completed_value) {
            (Some(status), Some(done)) => status == done,
            _ => false,
        };
        if !completed && self.is_past_due(view) {
            self.snapshot.overdue += 1;
        }
    }

    fn is_past_due(&self, view: &EntityView) -> bool {
        let Some(target) = &self.spec.due_date else {
            return false;
        };
        match target.extract(view) {
            Some(Scalar::Date(due)) => due < self.today,
            Some(Scalar::DateTime(due)) => due.date_naive() < self.today,
            _ => false,
        }
    }

    pub(crate) fn finish(self) -> StatsSnapshot {
        self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::record::EntityRecord;
    use crate::entity::EntityId;
    use crate::schema::{FieldValue, FieldValues};
    use chrono::Utc;

    fn view(id: u64, status: &str, due: Option<NaiveDate>) -> EntityView {
        let now = Utc::now();
        let mut fields = FieldValues::new();
        fields.insert("status".into(), FieldValue::Choice(status.into()));
        if let Some(d) = due {
            fields.insert("due".into(), FieldValue::Date(d));
        }
        EntityView {
            record: EntityRecord {
                id: EntityId::new(id),
                entity_type: "todo".into(),
                title: format!("t{id}"),
                body: String::new(),
                status: RecordStatus::Published,
                created_at: now,
                modified_at: now,
            },
            meta: [("d".to_string(), fields)].into_iter().collect(),
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    #[test]
    fn seeded_values_stay_at_zero() {
        let spec = StatsSpec::new().status(Target::meta("d", "status"));
        let acc = StatsAccumulator::new(
            &spec,
            date(10),
            ["pending".to_string(), "completed".to_string()],
            Vec::new(),
        );
        let snap = acc.finish();
        assert_eq!(snap.total, 0);
        assert_eq!(snap.status_count("pending"), 0);
        assert!(snap.by_status.contains_key("completed"));
    }

    #[test]
    fn overdue_excludes_completed_and_today() {
        let spec = StatsSpec::new()
            .status(Target::meta("d", "status"))
            .completed("completed")
            .due_date(Target::meta("d", "due"));
        let mut acc = StatsAccumulator::new(&spec, date(10), Vec::new(), Vec::new());
        acc.add(&view(1, "pending", Some(date(9))));
        acc.add(&view(2, "completed", Some(date(1))));
        acc.add(&view(3, "pending", Some(date(10))));
        acc.add(&view(4, "pending", None));
        let snap = acc.finish();

        assert_eq!(snap.total, 4);
        assert_eq!(snap.status_count("pending"), 3);
        assert_eq!(snap.overdue, 1);
    }

    #[test]
    fn falls_back_to_record_status() {
        let spec = StatsSpec::new();
        let mut acc = StatsAccumulator::new(&spec, date(10), Vec::new(), Vec::new());
        acc.add(&view(1, "pending", None));
        let snap = acc.finish();
        assert_eq!(snap.status_count("published"), 1);
        assert_eq!(snap.status_count("draft"), 0);
        assert_eq!(snap.by_status.len(), RecordStatus::ALL.len());
        assert!(snap.by_priority.is_empty());
    }
}
