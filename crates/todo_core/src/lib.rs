//! Storage and query core for the todo service.
//!
//! The transport layer calls into [`TodoService`]; the service talks to one
//! [`TodoRepository`] backend chosen at startup through [`open_store`].

pub mod config;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, StoreBackend, StoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::todo::{
    normalize_due_date, normalize_optional_text, normalize_priority, normalize_title,
    parse_due_date_time, TodoId, TodoItem, TodoValidationError, DEFAULT_PRIORITY,
    DUE_DATE_FORMAT, MAX_PRIORITY, MIN_PRIORITY,
};
pub use repo::file_repo::FileTodoRepository;
pub use repo::sqlite_repo::SqliteTodoRepository;
pub use repo::sqlite_schema::{SchemaError, SCHEMA_VERSION};
pub use repo::store::{open_store, TodoStore};
pub use repo::todo_repo::{sort_created_desc, RepoError, RepoResult, TodoRepository};
pub use service::todo_service::{
    sort_items, CreateTodoRequest, ErrorKind, ServiceError, ServiceResult, SortKey, TodoPatch,
    TodoService,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
