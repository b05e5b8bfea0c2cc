//! Todo CLI
//!
//! Command-line front end for the todo content type.
//!
//! # Commands
//!
//! - `demo` - Seed sample todos, print statistics and export them
//! - `add` - Add a todo
//! - `list` - List todos as admin columns
//! - `complete` - Mark a todo completed
//! - `clear-completed` - Delete every completed todo
//! - `stats` - Print todo statistics
//! - `export` - Export every todo to CSV or JSON lines

mod commands;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use entikit_core::ExportFormat;
use entikit_todo::{Priority, TodoStatus};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Todo list tools.
#[derive(Parser)]
#[command(name = "todo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Store directory; todos are kept in memory when omitted
    #[arg(global = true, short, long, env = "ENTIKIT_DATA")]
    path: Option<PathBuf>,

    /// Directory for export artifacts
    #[arg(global = true, long)]
    export_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed sample todos, print statistics and export them
    Demo,

    /// Add a todo
    Add {
        /// Title
        title: String,

        /// Notes
        #[arg(short, long, default_value = "")]
        body: String,

        /// Priority (low, medium, high)
        #[arg(long, default_value = "medium")]
        priority: Priority,

        /// Status (pending, in_progress, completed)
        #[arg(long, default_value = "pending")]
        status: TodoStatus,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,

        /// Estimated hours
        #[arg(long)]
        estimate: Option<f64>,
    },

    /// List todos as admin columns
    List {
        /// Only todos with this status
        #[arg(short, long)]
        status: Option<TodoStatus>,

        /// Maximum number of todos to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Mark a todo completed
    Complete {
        /// Todo id
        id: u64,
    },

    /// Delete every completed todo
    ClearCompleted,

    /// Print todo statistics as JSON
    Stats,

    /// Export every todo
    Export {
        /// Output format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: Format,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Jsonl,
}

impl From<Format> for ExportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Csv => Self::Csv,
            Format::Jsonl => Self::JsonLines,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let todos = commands::open(cli.path.as_deref(), cli.export_dir)?;

    match cli.command {
        Commands::Demo => commands::demo::run(&todos)?,
        Commands::Add {
            title,
            body,
            priority,
            status,
            due,
            estimate,
        } => {
            let mut todo = entikit_todo::NewTodo::new(title)
                .body(body)
                .priority(priority)
                .status(status);
            if let Some(due) = due {
                todo = todo.due(due);
            }
            if let Some(hours) = estimate {
                todo = todo.estimate(hours);
            }
            commands::manage::add(&todos, todo)?;
        }
        Commands::List { status, limit } => commands::manage::list(&todos, status, limit)?,
        Commands::Complete { id } => commands::manage::complete(&todos, id)?,
        Commands::ClearCompleted => commands::manage::clear_completed(&todos)?,
        Commands::Stats => commands::report::stats(&todos)?,
        Commands::Export { format } => commands::report::export(&todos, format.into())?,
    }

    Ok(())
}
