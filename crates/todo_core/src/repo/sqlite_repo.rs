//! SQLite-backed todo repository.
//!
//! # Responsibility
//! - Map each repository operation onto one statement against `todo_item`.
//! - Keep SQL and column encoding details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths call `TodoItem::validate()` before SQL mutations.
//! - Read paths reject rows that violate entity invariants instead of
//!   masking them.
//! - `todo_item` is created or checked before the first statement runs.
//! - Timestamps are stored as fixed-width RFC 3339 UTC text so that lexical
//!   order equals chronological order.

use crate::model::todo::{TodoItem, MAX_PRIORITY, MIN_PRIORITY};
use crate::repo::sqlite_schema::prepare_schema;
use crate::repo::todo_repo::{RepoError, RepoResult, TodoRepository};
use chrono::{DateTime, SecondsFormat, Utc};
use log::{error, info, warn};
use rusqlite::{ffi, params, Connection, ErrorCode, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const TODO_SELECT_SQL: &str = "SELECT
    id,
    title,
    description,
    category,
    priority,
    due_date,
    completed,
    created_at,
    updated_at
FROM todo_item";

/// SQLite-backed todo repository.
///
/// One connection serves every caller; each operation holds the connection
/// mutex for its statements, read-back included.
pub struct SqliteTodoRepository {
    conn: Mutex<Connection>,
}

impl SqliteTodoRepository {
    /// Wraps a connection, creating or checking `todo_item` first.
    pub fn new(mut conn: Connection) -> RepoResult<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        prepare_schema(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a database file. Missing parent directories are not created.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        let path = path.as_ref();
        Self::open_with(&path.display().to_string(), || Connection::open(path))
    }

    pub fn open_in_memory() -> RepoResult<Self> {
        Self::open_with(":memory:", Connection::open_in_memory)
    }

    fn open_with(
        target: &str,
        connect: impl FnOnce() -> rusqlite::Result<Connection>,
    ) -> RepoResult<Self> {
        let started_at = Instant::now();
        let opened = connect().map_err(RepoError::from).and_then(Self::new);
        match &opened {
            Ok(_) => info!(
                "event=db_open module=repo status=ok backend=table target={target} duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=db_open module=repo status=error backend=table target={target} duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            ),
        }
        opened
    }

    /// Locks the shared connection.
    pub fn connection(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| RepoError::LockPoisoned)
    }
}

impl TodoRepository for SqliteTodoRepository {
    fn list(&self) -> RepoResult<Vec<TodoItem>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!("{TODO_SELECT_SQL} ORDER BY created_at DESC;"))?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();

        while let Some(row) = rows.next()? {
            items.push(parse_todo_row(row)?);
        }

        Ok(items)
    }

    fn find_by_id(&self, id: &str) -> RepoResult<Option<TodoItem>> {
        select_by_id(&*self.connection()?, id)
    }

    fn create(&self, item: &TodoItem) -> RepoResult<TodoItem> {
        item.validate()?;
        let conn = self.connection()?;
        insert(&conn, item)?;
        read_back(&conn, &item.id)
    }

    fn update(&self, item: &TodoItem) -> RepoResult<TodoItem> {
        item.validate()?;
        let conn = self.connection()?;

        let changed = conn.execute(
            "UPDATE todo_item
             SET
                title = ?1,
                description = ?2,
                category = ?3,
                priority = ?4,
                due_date = ?5,
                completed = ?6,
                created_at = ?7,
                updated_at = ?8
             WHERE id = ?9;",
            params![
                item.title.as_str(),
                item.description.as_deref(),
                item.category.as_deref(),
                i64::from(item.priority),
                item.due_date.as_deref(),
                bool_to_int(item.completed),
                timestamp_to_db(&item.created_at),
                timestamp_to_db(&item.updated_at),
                item.id.as_str(),
            ],
        )?;

        if changed == 0 {
            warn!(
                "event=todo_upsert module=repo status=ok backend=table id={} reason=missing_on_update",
                item.id
            );
            insert(&conn, item)?;
        }

        read_back(&conn, &item.id)
    }

    fn delete(&self, id: &str) -> RepoResult<bool> {
        let changed = self
            .connection()?
            .execute("DELETE FROM todo_item WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }
}

fn select_by_id(conn: &Connection, id: &str) -> RepoResult<Option<TodoItem>> {
    let mut stmt = conn.prepare(&format!("{TODO_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_todo_row(row)?));
    }
    Ok(None)
}

fn read_back(conn: &Connection, id: &str) -> RepoResult<TodoItem> {
    select_by_id(conn, id)?.ok_or_else(|| {
        RepoError::InvalidData(format!("todo `{id}` not found in read-back after write"))
    })
}

fn insert(conn: &Connection, item: &TodoItem) -> RepoResult<()> {
    let inserted = conn.execute(
        "INSERT INTO todo_item (
            id,
            title,
            description,
            category,
            priority,
            due_date,
            completed,
            created_at,
            updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
        params![
            item.id.as_str(),
            item.title.as_str(),
            item.description.as_deref(),
            item.category.as_deref(),
            i64::from(item.priority),
            item.due_date.as_deref(),
            bool_to_int(item.completed),
            timestamp_to_db(&item.created_at),
            timestamp_to_db(&item.updated_at),
        ],
    );

    match inserted {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == ErrorCode::ConstraintViolation
                && err.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            Err(RepoError::DuplicateId(item.id.clone()))
        }
        Err(err) => Err(err.into()),
    }
}

fn parse_todo_row(row: &Row<'_>) -> RepoResult<TodoItem> {
    let id: String = row.get("id")?;

    let priority_value: i64 = row.get("priority")?;
    let priority = u8::try_from(priority_value)
        .ok()
        .filter(|p| (MIN_PRIORITY..=MAX_PRIORITY).contains(p))
        .ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid priority `{priority_value}` in todo_item.priority"
            ))
        })?;

    let completed = match row.get::<_, i64>("completed")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid completed value `{other}` in todo_item.completed"
            )));
        }
    };

    let created_at = parse_timestamp(&row.get::<_, String>("created_at")?, "created_at")?;
    let updated_at = parse_timestamp(&row.get::<_, String>("updated_at")?, "updated_at")?;

    let item = TodoItem {
        id,
        title: row.get("title")?,
        description: row.get("description")?,
        category: row.get("category")?,
        priority,
        due_date: row.get("due_date")?,
        completed,
        created_at,
        updated_at,
    };
    item.validate().map_err(|err| {
        RepoError::InvalidData(format!("todo `{}` violates invariants: {err}", item.id))
    })?;
    Ok(item)
}

fn timestamp_to_db(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(value: &str, column: &str) -> RepoResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            RepoError::InvalidData(format!("invalid timestamp `{value}` in todo_item.{column}"))
        })
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
