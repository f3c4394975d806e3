//! Todo repository contract and shared error type.
//!
//! # Responsibility
//! - Declare the CRUD surface every backend implements.
//! - Carry backend failures as one `RepoError` type.
//!
//! # Invariants
//! - `delete` of a missing id returns `Ok(false)`, never an error.
//! - `update` of a missing id inserts the record as given.
//! - `create` never overwrites: an id already present is `DuplicateId`.
//! - Backends are `Send + Sync` so one store can serve many threads.

use crate::model::todo::{TodoId, TodoItem, TodoValidationError};
use crate::repo::sqlite_schema::SchemaError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for todo persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(TodoValidationError),
    DuplicateId(TodoId),
    Sqlite(rusqlite::Error),
    Schema(SchemaError),
    Io(std::io::Error),
    Serialization(serde_json::Error),
    InvalidData(String),
    LockPoisoned,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::DuplicateId(id) => write!(f, "todo `{id}` already exists"),
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Schema(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "storage i/o failed: {err}"),
            Self::Serialization(err) => write!(f, "storage serialization failed: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted todo data: {message}"),
            Self::LockPoisoned => write!(f, "todo store lock poisoned"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Sqlite(err) => Some(err),
            Self::Schema(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::DuplicateId(_) | Self::InvalidData(_) | Self::LockPoisoned => None,
        }
    }
}

impl From<TodoValidationError> for RepoError {
    fn from(value: TodoValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<SchemaError> for RepoError {
    fn from(value: SchemaError) -> Self {
        Self::Schema(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<std::io::Error> for RepoError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Repository interface for todo CRUD operations.
pub trait TodoRepository: Send + Sync {
    /// All todos, newest first.
    fn list(&self) -> RepoResult<Vec<TodoItem>>;
    /// Exact id lookup.
    fn find_by_id(&self, id: &str) -> RepoResult<Option<TodoItem>>;
    /// Stores a new record and returns the stored copy.
    ///
    /// Fails with `DuplicateId` when the id is already present.
    fn create(&self, item: &TodoItem) -> RepoResult<TodoItem>;
    /// Replaces the record with the same id, inserting it when missing.
    fn update(&self, item: &TodoItem) -> RepoResult<TodoItem>;
    /// Removes a record; returns whether one was removed.
    fn delete(&self, id: &str) -> RepoResult<bool>;
}

/// Sorts in place by `created_at` descending, keeping ties stable.
pub fn sort_created_desc(items: &mut [TodoItem]) {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
