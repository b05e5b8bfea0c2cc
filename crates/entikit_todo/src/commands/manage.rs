//! Commands that change or list todos.

use entikit_core::{EntityId, Query, Target};
use entikit_todo::{fields, NewTodo, TodoStatus, Todos, DETAILS};

/// Adds a todo and prints its id.
pub fn add(todos: &Todos, todo: NewTodo) -> Result<(), Box<dyn std::error::Error>> {
    let id = todos.add(todo)?;
    println!("{id}");
    Ok(())
}

/// Prints todos as a tab separated table of the admin columns.
pub fn list(
    todos: &Todos,
    status: Option<TodoStatus>,
    limit: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut query = Query::new();
    if let Some(status) = status {
        query = query.where_eq(Target::meta(DETAILS, fields::STATUS), status.as_str());
    }
    if let Some(limit) = limit {
        query = query.limit(limit);
    }

    let columns = todos.admin_columns();
    let header: Vec<&str> = columns.iter().map(|c| c.label.as_str()).collect();
    println!("ID\t{}", header.join("\t"));
    for view in todos.get_posts(&query, true)? {
        let cells: Vec<String> = columns.iter().map(|c| c.render(&view)).collect();
        println!("{}\t{}", view.id(), cells.join("\t"));
    }
    Ok(())
}

/// Marks a todo completed.
pub fn complete(todos: &Todos, id: u64) -> Result<(), Box<dyn std::error::Error>> {
    todos.complete(EntityId::new(id))?;
    println!("Todo {id} completed");
    Ok(())
}

/// Deletes completed todos.
pub fn clear_completed(todos: &Todos) -> Result<(), Box<dyn std::error::Error>> {
    let removed = todos.clear_completed()?;
    println!("Removed {removed} completed todo(s)");
    Ok(())
}
