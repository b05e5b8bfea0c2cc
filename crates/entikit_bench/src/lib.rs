//! Benchmark utilities.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use chrono::{Days, NaiveDate};
use entikit_core::{Cache, Config, EntityContext, ManualClock};
use entikit_storage::InMemoryStore;
use entikit_todo::{NewTodo, Priority, TodoStatus, Todos};
use rand::Rng;
use std::path::Path;
use std::sync::Arc;

const TODAY: (i32, u32, u32) = (2024, 6, 10);

/// Date the benchmark clock is frozen at.
pub fn bench_today() -> NaiveDate {
    let (y, m, d) = TODAY;
    NaiveDate::from_ymd_opt(y, m, d).expect("valid benchmark date")
}

/// Generates a random valid todo due within sixty days either side of
/// [`bench_today`].
pub fn random_todo<R: Rng>(rng: &mut R, n: usize) -> NewTodo {
    let today = bench_today();
    let offset = rng.gen_range(0..120u64);
    let due = if offset < 60 {
        today - Days::new(60 - offset)
    } else {
        today + Days::new(offset - 60)
    };
    NewTodo::new(format!("Todo {n}"))
        .status(TodoStatus::ALL[rng.gen_range(0..TodoStatus::ALL.len())])
        .priority(Priority::ALL[rng.gen_range(0..Priority::ALL.len())])
        .due(due)
        .estimate(f64::from(rng.gen_range(0..16u32)) * 0.5)
}

/// Builds an in-memory todo entity holding `count` random todos.
///
/// # Panics
///
/// Panics if the entity cannot be started or a todo cannot be added.
pub fn populated_todos(count: usize, export_dir: &Path) -> (Todos, Arc<ManualClock>) {
    let (y, m, d) = TODAY;
    let clock = Arc::new(ManualClock::at_date(y, m, d).expect("Invalid bench date"));
    let ctx = EntityContext::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(Cache::new(clock.clone())),
        clock.clone(),
        Config::default().export_dir(export_dir),
    );
    let todos = Todos::new(ctx).expect("start todos");
    let mut rng = rand::thread_rng();
    for n in 0..count {
        todos.add(random_todo(&mut rng, n)).expect("add todo");
    }
    (todos, clock)
}
