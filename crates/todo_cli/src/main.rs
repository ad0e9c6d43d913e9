//! Command-line front end for the activity/todo services.
//!
//! # Responsibility
//! - Load configuration, open the database and wire the services.
//! - Map subcommands onto service calls and print plain-text results.

use clap::{Args, Parser, Subcommand};
use log::error;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use todo_core::db::{open_db, open_db_in_memory, share};
use todo_core::{
    init_logging, Activity, ActivityGroup, ActivityService, AppConfig, SqliteActivityRepository,
    SqliteTodoRepository, Todo, TodoService,
};

#[derive(Debug, Parser)]
#[command(name = "todo", version, about = "Manage activity groups and their todos")]
struct Cli {
    /// JSON config file; defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Activity group operations.
    #[command(subcommand)]
    Activity(ActivityCommand),
    /// Todo operations.
    #[command(subcommand)]
    Todo(TodoCommand),
}

#[derive(Debug, Args)]
struct PageArgs {
    /// Cursor printed by a previous `list`.
    #[arg(long, default_value = "")]
    cursor: String,
    /// Page size; 0 uses the default.
    #[arg(long, default_value_t = 0)]
    num: i64,
}

#[derive(Debug, Subcommand)]
enum ActivityCommand {
    Add { title: String, email: String },
    List(PageArgs),
    Get { id: i64 },
    Delete { id: i64 },
}

#[derive(Debug, Subcommand)]
enum TodoCommand {
    Add {
        activity_id: i64,
        title: String,
        #[arg(long, default_value_t = 0)]
        priority: i64,
    },
    List(PageArgs),
    Get { id: i64 },
    /// Marks a todo inactive.
    Done { id: i64 },
    Delete { id: i64 },
}

type CliResult = Result<(), Box<dyn Error>>;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_exit module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult {
    let config = match cli.config.as_ref() {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(dir) = config.log.dir.as_deref() {
        init_logging(config.log_level(), dir)?;
    }

    let conn = if config.database.path == ":memory:" {
        open_db_in_memory()?
    } else {
        open_db(&config.database.path)?
    };
    let conn = share(conn);
    let activities = Arc::new(SqliteActivityRepository::new(conn.clone()));
    let todos = Arc::new(SqliteTodoRepository::new(conn));
    let settings = config.service_settings();

    match cli.command {
        Command::Activity(command) => {
            run_activity(ActivityService::new(activities, settings), command).await
        }
        Command::Todo(command) => {
            run_todo(TodoService::new(todos, activities, settings), command).await
        }
    }
}

async fn run_activity(
    service: ActivityService<SqliteActivityRepository>,
    command: ActivityCommand,
) -> CliResult {
    match command {
        ActivityCommand::Add { title, email } => {
            let mut activity = Activity::new(title, email);
            service.store(&mut activity).await?;
            println!("created activity {}", activity.id);
        }
        ActivityCommand::List(page) => {
            let page = service.fetch(&page.cursor, page.num).await?;
            for activity in &page.items {
                print_activity(activity);
            }
            print_next_cursor(&page.next_cursor);
        }
        ActivityCommand::Get { id } => print_activity(&service.get_by_id(id).await?),
        ActivityCommand::Delete { id } => {
            service.delete(id).await?;
            println!("deleted activity {id}");
        }
    }
    Ok(())
}

async fn run_todo(
    service: TodoService<SqliteTodoRepository, SqliteActivityRepository>,
    command: TodoCommand,
) -> CliResult {
    match command {
        TodoCommand::Add {
            activity_id,
            title,
            priority,
        } => {
            let mut todo = Todo::new(activity_id, title);
            todo.priority = priority;
            service.store(&mut todo).await?;
            println!("created todo {}", todo.id);
        }
        TodoCommand::List(page) => {
            let page = service.fetch(&page.cursor, page.num).await?;
            for todo in &page.todos {
                print_todo(todo);
            }
            if let Some(err) = page.enrichment_error.as_ref() {
                eprintln!("warning: activity groups unavailable: {err}");
            }
            print_next_cursor(&page.next_cursor);
        }
        TodoCommand::Get { id } => print_todo(&service.get_by_id(id).await?),
        TodoCommand::Done { id } => {
            service.set_active(id, false).await?;
            println!("completed todo {id}");
        }
        TodoCommand::Delete { id } => {
            service.delete(id).await?;
            println!("deleted todo {id}");
        }
    }
    Ok(())
}

fn print_activity(activity: &Activity) {
    println!(
        "{}\t{}\t{}\t{}",
        activity.id,
        activity.title,
        activity.email,
        activity.created_at.to_rfc3339()
    );
}

fn print_todo(todo: &Todo) {
    let group = match &todo.activity_group {
        ActivityGroup::Resolved(activity) => format!("{} ({})", activity.title, activity.id),
        ActivityGroup::Ref(id) => format!("#{id}"),
    };
    let state = if todo.is_active { "open" } else { "done" };
    println!(
        "{}\t{}\t{}\tpriority={}\t{}",
        todo.id, state, todo.title, todo.priority, group
    );
}

fn print_next_cursor(cursor: &str) {
    if !cursor.is_empty() {
        println!("next cursor: {cursor}");
    }
}
