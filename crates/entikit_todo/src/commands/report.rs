//! Statistics and export commands.

use entikit_core::ExportFormat;
use entikit_todo::Todos;

/// Prints statistics as pretty JSON.
pub fn stats(todos: &Todos) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = todos.stats()?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

/// Exports every todo and prints where the artifact was written.
pub fn export(todos: &Todos, format: ExportFormat) -> Result<(), Box<dyn std::error::Error>> {
    let handle = todos.export(format)?;
    println!("{} row(s) written to {}", handle.row_count, handle.path().display());
    Ok(())
}
