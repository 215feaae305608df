use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::Result;
use std::path::PathBuf;
use todostore::config::{self, Config};
use todostore::{
    BlobPersistence, Clock, Filter, KeyValueStore, Persistence, SortOrder, StoreOptions, SystemClock, Task, TaskId,
    TaskStore,
};
use tracing::Level;

type CliStore = TaskStore<BlobPersistence<Box<dyn KeyValueStore>>, SystemClock>;

#[derive(Parser)]
#[command(name = "todostore")]
#[command(about = "TodoStore CLI - To-do list with filtered views and local persistence")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Directory to keep the store in (default: the user data directory)
    #[arg(short, long, global = true)]
    store_path: Option<PathBuf>,

    /// Log store activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a task
    Add {
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// List tasks
    List {
        /// all, completed or pending
        #[arg(short, long, default_value_t = Filter::All)]
        filter: Filter,

        /// newest or oldest
        #[arg(long, default_value_t = SortOrder::Newest)]
        sort: SortOrder,
    },

    /// Mark a task done, or not done again
    Toggle { id: TaskId },

    /// Replace a task's text
    Edit {
        id: TaskId,
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Delete a task
    Remove { id: TaskId },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let store_dir = config::resolve_store_dir(cli.store_path.as_deref())?;
    let config = Config::load(&store_dir)?;
    let storage = config::open_storage(&store_dir, &config)?;
    let persistence = BlobPersistence::new(storage, config.namespace.clone());
    let mut store: CliStore = TaskStore::open(persistence, SystemClock, StoreOptions::from(&config));

    for line in execute(&mut store, cli.command) {
        println!("{}", line);
    }

    // Surface any write that failed during the command
    store.flush()?;

    Ok(())
}

/// Apply one command to the store and return the lines to print.
///
/// Unknown ids and blank text are reported, not treated as failures.
fn execute<P: Persistence, C: Clock>(store: &mut TaskStore<P, C>, command: Commands) -> Vec<String> {
    match command {
        Commands::Add { text } => match store.add(&text.join(" ")) {
            Some(id) => vec![format!("Added task {}", id)],
            None => vec!["Nothing to add".to_string()],
        },
        Commands::List { filter, sort } => {
            let view = store.view(filter, sort);
            if view.is_empty() {
                return vec![format!("No {} tasks", filter)];
            }
            view.into_iter().map(format_task).collect()
        }
        Commands::Toggle { id } => {
            if !store.toggle(id) {
                return vec![format!("No task with id {}", id)];
            }
            let state = if store.get(id).is_some_and(|t| t.completed) { "completed" } else { "pending" };
            vec![format!("Task {} is now {}", id, state)]
        }
        Commands::Edit { id, text } => {
            if store.begin_edit(id).is_none() {
                return vec![format!("No task with id {}", id)];
            }
            if !store.commit_edit(id, &text.join(" ")) {
                store.cancel_edit();
                return vec![format!("Not saving blank text for task {}", id)];
            }
            vec![format!("Updated task {}", id)]
        }
        Commands::Remove { id } => {
            if !store.remove(id) {
                return vec![format!("No task with id {}", id)];
            }
            vec![format!("Removed task {}", id)]
        }
    }
}

fn format_task(task: &Task) -> String {
    let date = task.created_at.format("%Y-%m-%d %H:%M").to_string();
    if task.completed {
        format!(
            "{} {:>14}  {}  {}",
            "[x]".green(),
            task.id,
            task.text.dimmed().strikethrough(),
            date.dimmed()
        )
    } else {
        format!("{} {:>14}  {}  {}", "[ ]", task.id, task.text, date.dimmed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use todostore::MemoryStorage;

    fn memory_store(options: StoreOptions) -> TaskStore<BlobPersistence<MemoryStorage>, SystemClock> {
        TaskStore::open(
            BlobPersistence::with_default_namespace(MemoryStorage::new()),
            SystemClock,
            options,
        )
    }

    #[test]
    fn test_unknown_ids_are_reported_not_failed() {
        let mut store = memory_store(StoreOptions::default());

        assert_eq!(execute(&mut store, Commands::Toggle { id: 42 }), vec!["No task with id 42"]);
        assert_eq!(execute(&mut store, Commands::Remove { id: 42 }), vec!["No task with id 42"]);
        assert_eq!(
            execute(
                &mut store,
                Commands::Edit {
                    id: 42,
                    text: vec!["x".to_string()]
                }
            ),
            vec!["No task with id 42"]
        );
        assert!(store.is_empty());
        store.flush().unwrap();
    }

    #[test]
    fn test_add_toggle_remove() {
        let mut store = memory_store(StoreOptions::default());

        let out = execute(
            &mut store,
            Commands::Add {
                text: vec!["Buy".to_string(), "milk".to_string()],
            },
        );
        let id = store.tasks()[0].id;
        assert_eq!(out, vec![format!("Added task {}", id)]);
        assert_eq!(store.tasks()[0].text, "Buy milk");

        assert_eq!(
            execute(&mut store, Commands::Toggle { id }),
            vec![format!("Task {} is now completed", id)]
        );
        assert_eq!(execute(&mut store, Commands::Remove { id }), vec![format!("Removed task {}", id)]);
        assert_eq!(
            execute(
                &mut store,
                Commands::List {
                    filter: Filter::All,
                    sort: SortOrder::Newest
                }
            ),
            vec!["No all tasks"]
        );
    }

    #[test]
    fn test_blank_edit_refused_when_configured() {
        let mut store = memory_store(StoreOptions {
            reject_blank_edits: true,
        });
        let id = store.add("keep me").unwrap();

        assert_eq!(
            execute(
                &mut store,
                Commands::Edit {
                    id,
                    text: vec!["  ".to_string()]
                }
            ),
            vec![format!("Not saving blank text for task {}", id)]
        );
        assert_eq!(store.get(id).unwrap().text, "keep me");
        assert_eq!(store.editing(), None);
    }
}
