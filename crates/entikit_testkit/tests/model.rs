//! Model-based checks of the todo entity against generated inputs.

use entikit_core::{EntityCore, EntityId, MetaInput};
use entikit_testkit::prelude::*;
use entikit_todo::{details_schema, fields, TodoStatus, DETAILS};
use proptest::prelude::*;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct ModelTodo {
    status: TodoStatus,
    due: Option<chrono::NaiveDate>,
}

fn apply(
    todos: &entikit_todo::Todos,
    model: &mut BTreeMap<EntityId, ModelTodo>,
    op: TodoOp,
) {
    match op {
        TodoOp::Add(todo) => {
            let entry = ModelTodo {
                status: todo.status,
                due: todo.due_date,
            };
            let id = todos.add(todo).unwrap();
            model.insert(id, entry);
        }
        TodoOp::Complete(i) => {
            if let Some(&id) = model.keys().nth(i % model.len().max(1)) {
                todos.complete(id).unwrap();
                if let Some(entry) = model.get_mut(&id) {
                    entry.status = TodoStatus::Completed;
                }
            }
        }
        TodoOp::Delete(i) => {
            if let Some(&id) = model.keys().nth(i % model.len().max(1)) {
                todos.delete(id).unwrap();
                model.remove(&id);
            }
        }
        TodoOp::ClearCompleted => {
            let expected = model
                .values()
                .filter(|t| t.status == TodoStatus::Completed)
                .count();
            assert_eq!(todos.clear_completed().unwrap(), expected);
            model.retain(|_, t| t.status != TodoStatus::Completed);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Cached statistics always agree with a plain model of the todos,
    /// because every write invalidates them.
    #[test]
    fn stats_track_every_write(ops in todo_ops_strategy(24)) {
        let harness = TestHarness::memory();
        let todos = harness.todos();
        let today = harness.today();
        let mut model = BTreeMap::new();

        for op in ops {
            apply(&todos, &mut model, op);
            let stats = todos.stats().unwrap();

            prop_assert_eq!(stats.total, model.len());
            for status in TodoStatus::ALL {
                let expected = model.values().filter(|t| t.status == status).count();
                prop_assert_eq!(stats.status_count(status.as_str()), expected);
            }
            let overdue = model
                .values()
                .filter(|t| t.status != TodoStatus::Completed && t.due.is_some_and(|d| d < today))
                .count();
            prop_assert_eq!(stats.overdue, overdue);
        }
    }

    /// A details group is stored only when the whole input validates.
    #[test]
    fn details_are_all_or_nothing(raw in raw_details_strategy()) {
        let harness = TestHarness::memory();
        let todos = harness.todos();
        let valid = details_schema().unwrap().validate(&raw).is_ok();

        let result = todos.create(
            EntityCore::new("generated"),
            MetaInput::new().schema(DETAILS, raw.clone()),
        );
        prop_assert_eq!(result.is_ok(), valid);

        let view = todos.get_posts(&Default::default(), true).unwrap().remove(0);
        let estimate = view.meta_value(DETAILS, fields::ESTIMATE).and_then(|v| v.as_number());
        if valid {
            let expected = raw.get(fields::ESTIMATE).and_then(|s| s.parse::<f64>().ok());
            prop_assert_eq!(estimate, expected);
        } else {
            prop_assert_eq!(estimate, None);
        }
    }
}
