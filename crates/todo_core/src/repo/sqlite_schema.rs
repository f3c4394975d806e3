//! `todo_item` table bootstrap for the table-backed store.
//!
//! # Invariants
//! - The schema version lives in `PRAGMA user_version`.
//! - A connection is handed to the repository only after `todo_item` exists
//!   with every column the row mapper reads.

use crate::repo::todo_repo::RepoResult;
use log::info;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Schema version written by this build.
pub const SCHEMA_VERSION: u32 = 1;

const TODO_ITEM_DDL: &str = include_str!("todo_item.sql");

/// Columns the row mapper depends on.
const TODO_COLUMNS: [&str; 9] = [
    "id",
    "title",
    "description",
    "category",
    "priority",
    "due_date",
    "completed",
    "created_at",
    "updated_at",
];

/// Reasons a database cannot back the todo store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The file was written by a newer build.
    NewerVersion { found: u32, supported: u32 },
    /// `todo_item` exists but lacks columns the store reads.
    MissingColumns(Vec<String>),
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NewerVersion { found, supported } => write!(
                f,
                "todo database schema version {found} is newer than supported {supported}"
            ),
            Self::MissingColumns(columns) => {
                write!(f, "todo_item is missing columns: {}", columns.join(", "))
            }
        }
    }
}

impl Error for SchemaError {}

/// Creates or checks the `todo_item` table.
///
/// An unversioned database gets the table (an existing compatible
/// `todo_item` is adopted as-is) and is stamped with `SCHEMA_VERSION`.
pub(crate) fn prepare_schema(conn: &mut Connection) -> RepoResult<()> {
    let found = schema_version(conn)?;
    if found > SCHEMA_VERSION {
        return Err(SchemaError::NewerVersion {
            found,
            supported: SCHEMA_VERSION,
        }
        .into());
    }

    if found < SCHEMA_VERSION {
        let missing = missing_columns(conn)?;
        // A pre-existing table is only adopted when it is complete.
        if missing.len() < TODO_COLUMNS.len() {
            ensure_complete(missing)?;
        }

        let tx = conn.transaction()?;
        tx.execute_batch(TODO_ITEM_DDL)?;
        tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        tx.commit()?;
        info!(
            "event=schema_init module=repo status=ok backend=table from_version={found} to_version={SCHEMA_VERSION}"
        );
    }

    ensure_complete(missing_columns(conn)?)
}

pub fn schema_version(conn: &Connection) -> RepoResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}

fn ensure_complete(missing: Vec<String>) -> RepoResult<()> {
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::MissingColumns(missing).into())
    }
}

fn missing_columns(conn: &Connection) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare("PRAGMA table_info(todo_item);")?;
    let present = stmt
        .query_map([], |row| row.get::<_, String>("name"))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TODO_COLUMNS
        .iter()
        .filter(|column| !present.iter().any(|name| name == *column))
        .map(|column| column.to_string())
        .collect())
}
