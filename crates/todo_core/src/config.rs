//! Store configuration.
//!
//! # Responsibility
//! - Describe which backend to open and where its data lives.
//! - Resolve configuration from environment variables with stable defaults.
//!
//! # Invariants
//! - Exactly one backend is selected per process.
//! - Blank environment values behave as if unset.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const BACKEND_ENV: &str = "TODO_STORE_BACKEND";
pub const PATH_ENV: &str = "TODO_STORE_PATH";
pub const DEFAULT_FILE_PATH: &str = "data/todos.json";
pub const DEFAULT_TABLE_PATH: &str = "data/todos.sqlite3";

/// Persistence backend kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Single JSON document with in-process cache.
    #[default]
    File,
    /// SQLite `todo_item` table.
    Table,
}

impl StoreBackend {
    /// Parses a backend name (case-insensitive); `json`/`sqlite` are aliases.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "file" | "json" => Ok(Self::File),
            "table" | "sqlite" => Ok(Self::Table),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Table => "table",
        }
    }

    /// Storage path used when none is configured.
    pub fn default_path(self) -> PathBuf {
        match self {
            Self::File => PathBuf::from(DEFAULT_FILE_PATH),
            Self::Table => PathBuf::from(DEFAULT_TABLE_PATH),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    UnknownBackend(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownBackend(value) => write!(
                f,
                "unsupported store backend `{value}`; expected file|table"
            ),
        }
    }
}

impl Error for ConfigError {}

/// Backend selection plus its storage location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::for_backend(StoreBackend::default())
    }
}

impl StoreConfig {
    /// Config for `backend` at its default path.
    pub fn for_backend(backend: StoreBackend) -> Self {
        Self {
            backend,
            path: backend.default_path(),
        }
    }

    /// Reads `TODO_STORE_BACKEND` and `TODO_STORE_PATH`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_blank = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let backend = match non_blank(BACKEND_ENV) {
            Some(raw) => StoreBackend::parse(&raw)?,
            None => StoreBackend::default(),
        };
        let path = non_blank(PATH_ENV)
            .map(|raw| PathBuf::from(raw.trim()))
            .unwrap_or_else(|| backend.default_path());

        Ok(Self { backend, path })
    }
}
