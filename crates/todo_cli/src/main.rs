//! Command-line client for the todo core.
//!
//! # Responsibility
//! - Wire configuration, backend and service together for one invocation.
//! - Print results as JSON and map error kinds to exit codes.

use clap::{Parser, Subcommand, ValueEnum};
use log::error;
use std::path::PathBuf;
use std::process::ExitCode;
use todo_core::config::{BACKEND_ENV, PATH_ENV};
use todo_core::{
    default_log_level, init_logging, open_store, ConfigError, CreateTodoRequest, ErrorKind,
    ServiceError, StoreBackend, StoreConfig, TodoPatch, TodoService, TodoStore,
};

#[derive(Debug, Parser)]
#[command(name = "todo", version, about = "Manage a personal todo list")]
struct Cli {
    /// Storage backend (defaults to TODO_STORE_BACKEND, then `file`).
    #[arg(long, value_enum, global = true)]
    backend: Option<BackendArg>,

    /// Storage path (defaults to TODO_STORE_PATH, then the backend default).
    #[arg(long, global = true)]
    path: Option<PathBuf>,

    /// Directory for daily-rotated log files; logging is off when unset.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// off | error | warn | info | debug | trace
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    File,
    Table,
}

impl From<BackendArg> for StoreBackend {
    fn from(value: BackendArg) -> Self {
        match value {
            BackendArg::File => StoreBackend::File,
            BackendArg::Table => StoreBackend::Table,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List todos.
    List {
        #[arg(long)]
        category: Option<String>,
        /// created | priority | due | duedesc
        #[arg(long)]
        sort: Option<String>,
    },
    /// List distinct categories.
    Categories,
    /// Show one todo.
    Show { id: String },
    /// Create a todo.
    Add {
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        priority: Option<i64>,
        /// YYYY-MM-DD or YYYY-MM-DDTHH:mm
        #[arg(long)]
        due: Option<String>,
    },
    /// Update fields of a todo; an empty string clears an optional field.
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        priority: Option<i64>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        completed: Option<bool>,
    },
    /// Flip the completed flag.
    Toggle { id: String },
    /// Delete a todo.
    Rm { id: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_ref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        if let Err(err) = init_logging(level, log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(2);
        }
    };

    let store = match open_store(&config) {
        Ok(store) => store,
        Err(err) => {
            error!("event=cli_open module=cli status=error error={err}");
            eprintln!("failed to open {} store: {err}", config.backend.as_str());
            return ExitCode::from(1);
        }
    };

    let service = TodoService::new(store);
    match run(&service, cli.command) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(exit_code(&err))
        }
    }
}

/// Flags take precedence over environment variables.
fn resolve_config(cli: &Cli) -> Result<StoreConfig, ConfigError> {
    StoreConfig::from_lookup(|key| {
        let flag = match key {
            BACKEND_ENV => cli.backend.map(|b| StoreBackend::from(b).as_str().to_string()),
            PATH_ENV => cli.path.as_ref().map(|p| p.to_string_lossy().into_owned()),
            _ => None,
        };
        flag.or_else(|| std::env::var(key).ok())
    })
}

fn run(service: &TodoService<TodoStore>, command: Command) -> Result<String, ServiceError> {
    let value = match command {
        Command::List { category, sort } => {
            let sort = service.parse_sort(sort.as_deref())?;
            to_json(&service.list(category.as_deref(), sort)?)
        }
        Command::Categories => to_json(&service.list_categories()?),
        Command::Show { id } => to_json(&service.get(&id)?),
        Command::Add {
            title,
            description,
            category,
            priority,
            due,
        } => {
            let request = CreateTodoRequest {
                title,
                description,
                category,
                priority,
                due_date: due,
            };
            to_json(&service.create(&request)?)
        }
        Command::Edit {
            id,
            title,
            description,
            category,
            priority,
            due,
            completed,
        } => {
            let patch = TodoPatch {
                title,
                description: description.map(clearable),
                category: category.map(clearable),
                priority,
                due_date: due.map(clearable),
                completed,
            };
            to_json(&service.update(&id, &patch)?)
        }
        Command::Toggle { id } => to_json(&service.toggle(&id)?),
        Command::Rm { id } => {
            service.delete(&id)?;
            to_json(&serde_json::json!({ "deleted": id }))
        }
    };
    Ok(value)
}

/// Empty flag values clear the field.
fn clearable(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|err| format!("{{\"error\":\"{err}\"}}"))
}

fn exit_code(err: &ServiceError) -> u8 {
    match err.kind() {
        ErrorKind::InvalidArgument => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::StorageFailure => 1,
    }
}
