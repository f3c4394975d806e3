//! Backend selection.
//!
//! # Responsibility
//! - Model the shipped backends as one closed set implementing the
//!   repository contract.
//! - Build the configured backend once at process start.

use crate::config::{StoreBackend, StoreConfig};
use crate::model::todo::TodoItem;
use crate::repo::file_repo::FileTodoRepository;
use crate::repo::sqlite_repo::SqliteTodoRepository;
use crate::repo::todo_repo::{RepoResult, TodoRepository};
use log::info;
use std::fs;

/// The configured todo backend.
pub enum TodoStore {
    File(FileTodoRepository),
    Table(SqliteTodoRepository),
}

impl TodoStore {
    pub fn backend(&self) -> StoreBackend {
        match self {
            Self::File(_) => StoreBackend::File,
            Self::Table(_) => StoreBackend::Table,
        }
    }
}

/// Opens the backend named by `config`.
///
/// The file backend defers all I/O to first use. The table backend creates
/// the parent directory, opens the database and applies migrations.
pub fn open_store(config: &StoreConfig) -> RepoResult<TodoStore> {
    let store = match config.backend {
        StoreBackend::File => TodoStore::File(FileTodoRepository::new(&config.path)),
        StoreBackend::Table => {
            if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            TodoStore::Table(SqliteTodoRepository::open(&config.path)?)
        }
    };

    info!(
        "event=store_open module=repo status=ok backend={} path={}",
        config.backend.as_str(),
        config.path.display()
    );
    Ok(store)
}

impl TodoRepository for TodoStore {
    fn list(&self) -> RepoResult<Vec<TodoItem>> {
        match self {
            Self::File(repo) => repo.list(),
            Self::Table(repo) => repo.list(),
        }
    }

    fn find_by_id(&self, id: &str) -> RepoResult<Option<TodoItem>> {
        match self {
            Self::File(repo) => repo.find_by_id(id),
            Self::Table(repo) => repo.find_by_id(id),
        }
    }

    fn create(&self, item: &TodoItem) -> RepoResult<TodoItem> {
        match self {
            Self::File(repo) => repo.create(item),
            Self::Table(repo) => repo.create(item),
        }
    }

    fn update(&self, item: &TodoItem) -> RepoResult<TodoItem> {
        match self {
            Self::File(repo) => repo.update(item),
            Self::Table(repo) => repo.update(item),
        }
    }

    fn delete(&self, id: &str) -> RepoResult<bool> {
        match self {
            Self::File(repo) => repo.delete(id),
            Self::Table(repo) => repo.delete(id),
        }
    }
}
