//! The todo entity type.

use crate::admin;
use crate::schema::{details_schema, fields, Priority, TodoStatus, DETAILS, TODO_TYPE};
use chrono::NaiveDate;
use entikit_core::{
    Comparison, CoreResult, Entity, EntityBuilder, EntityContext, EntityCore, EntityId, EntityPatch, EntityView,
    ExportFormat, ExportHandle, ExportSpec, MetaInput, Query, RecordStatus, SortOrder,
    StatsSnapshot, StatsSpec, Target,
};
use std::ops::Deref;
use tracing::info;

/// Columns of the default todo export.
pub const EXPORT_FIELDS: [&str; 6] = [
    "id",
    "title",
    "meta.todo_details.status",
    "meta.todo_details.priority",
    "meta.todo_details.due_date",
    "meta.todo_details.estimate",
];

/// Input for a new todo.
///
/// # Example
///
/// ```rust
/// use entikit_todo::{NewTodo, Priority};
///
/// let todo = NewTodo::new("Renew passport")
///     .priority(Priority::High)
///     .estimate(1.5);
/// assert_eq!(todo.title, "Renew passport");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NewTodo {
    /// Title.
    pub title: String,
    /// Notes.
    pub body: String,
    /// Workflow status.
    pub status: TodoStatus,
    /// Priority.
    pub priority: Priority,
    /// Due date.
    pub due_date: Option<NaiveDate>,
    /// Estimated hours.
    pub estimate: Option<f64>,
}

impl NewTodo {
    /// Creates a pending, medium priority todo.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: String::new(),
            status: TodoStatus::default(),
            priority: Priority::default(),
            due_date: None,
            estimate: None,
        }
    }

    /// Sets the notes.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the status.
    #[must_use]
    pub fn status(mut self, status: TodoStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the priority.
    #[must_use]
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the due date.
    #[must_use]
    pub fn due(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    /// Sets the estimate in hours.
    #[must_use]
    pub fn estimate(mut self, hours: f64) -> Self {
        self.estimate = Some(hours);
        self
    }

    fn into_parts(self) -> (EntityCore, MetaInput) {
        let core = EntityCore::new(self.title)
            .body(self.body)
            .status(RecordStatus::Published);
        let mut meta = MetaInput::new()
            .set(DETAILS, fields::STATUS, self.status.as_str())
            .set(DETAILS, fields::PRIORITY, self.priority.as_str());
        if let Some(due) = self.due_date {
            meta = meta.set(DETAILS, fields::DUE_DATE, due.format("%Y-%m-%d").to_string());
        }
        if let Some(hours) = self.estimate {
            meta = meta.set(DETAILS, fields::ESTIMATE, hours.to_string());
        }
        (core, meta)
    }
}

/// The todo entity type.
///
/// Dereferences to the underlying [`Entity`] for generic operations.
#[derive(Debug)]
pub struct Todos {
    entity: Entity,
}

impl Todos {
    /// Builds and runs the todo entity type.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity cannot be built or started.
    pub fn new(ctx: EntityContext) -> CoreResult<Self> {
        let entity = Self::builder()?.build(ctx)?;
        entity.run()?;
        Ok(Self { entity })
    }

    /// Returns the todo entity builder, for callers that add their own
    /// callbacks before building.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Schema` if the details schema fails to build.
    pub fn builder() -> CoreResult<EntityBuilder> {
        let mut builder = Entity::builder(TODO_TYPE)
            .label("Todos")
            .schema(details_schema()?)
            .stats(Self::stats_spec());
        for column in admin::columns() {
            builder = builder.column(column);
        }
        for button in admin::buttons() {
            builder = builder.button(button);
        }
        Ok(builder)
    }

    /// Statistics wiring: status, priority and overdue from the details
    /// schema.
    #[must_use]
    pub fn stats_spec() -> StatsSpec {
        StatsSpec::new()
            .status(Target::meta(DETAILS, fields::STATUS))
            .completed(TodoStatus::Completed.as_str())
            .priority(Target::meta(DETAILS, fields::PRIORITY))
            .due_date(Target::meta(DETAILS, fields::DUE_DATE))
    }

    /// Returns the underlying entity.
    #[must_use]
    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    /// Adds a todo.
    ///
    /// # Errors
    ///
    /// Returns a validation error (for example a negative estimate) or a
    /// store error.
    pub fn add(&self, todo: NewTodo) -> CoreResult<EntityId> {
        let (core, meta) = todo.into_parts();
        self.entity.create(core, meta)
    }

    /// Changes the workflow status of a todo.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` if the todo does not exist.
    pub fn set_status(&self, id: EntityId, status: TodoStatus) -> CoreResult<()> {
        self.entity.update(
            id,
            EntityPatch::new(),
            MetaInput::new().set(DETAILS, fields::STATUS, status.as_str()),
        )
    }

    /// Marks a todo completed.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` if the todo does not exist.
    pub fn complete(&self, id: EntityId) -> CoreResult<()> {
        self.set_status(id, TodoStatus::Completed)
    }

    /// Lists todos with a given status, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns store or codec errors.
    pub fn with_status(&self, status: TodoStatus) -> CoreResult<Vec<EntityView>> {
        self.entity.get_posts(&Self::status_query(status), true)
    }

    /// Lists open todos due before `today`, earliest first.
    ///
    /// # Errors
    ///
    /// Returns store or codec errors.
    pub fn overdue(&self, today: NaiveDate) -> CoreResult<Vec<EntityView>> {
        let due = Target::meta(DETAILS, fields::DUE_DATE);
        let query = Query::new()
            .where_cmp(due.clone(), Comparison::Lt, today)
            .where_cmp(
                Target::meta(DETAILS, fields::STATUS),
                Comparison::Ne,
                TodoStatus::Completed.as_str(),
            )
            .sort_by(due, SortOrder::Ascending);
        self.entity.get_posts(&query, true)
    }

    /// Deletes every completed todo and returns how many were deleted.
    ///
    /// # Errors
    ///
    /// Returns the first store error; todos deleted before it stay deleted.
    pub fn clear_completed(&self) -> CoreResult<usize> {
        let done = self
            .entity
            .get_posts(&Self::status_query(TodoStatus::Completed), false)?;
        for view in &done {
            self.entity.delete(view.id())?;
        }
        info!(count = done.len(), "completed todos cleared");
        Ok(done.len())
    }

    /// Returns cached todo statistics.
    ///
    /// # Errors
    ///
    /// Returns store or codec errors from the computation.
    pub fn stats(&self) -> CoreResult<StatsSnapshot> {
        self.entity.get_stats()
    }

    /// Exports every todo with the default columns.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Export` if the artifact cannot be written.
    pub fn export(&self, format: ExportFormat) -> CoreResult<ExportHandle> {
        self.entity
            .export(&ExportSpec::csv(EXPORT_FIELDS).format(format))
    }

    fn status_query(status: TodoStatus) -> Query {
        Query::new().where_eq(Target::meta(DETAILS, fields::STATUS), status.as_str())
    }
}

impl Deref for Todos {
    type Target = Entity;

    fn deref(&self) -> &Self::Target {
        &self.entity
    }
}
