//! Todo use-case service.
//!
//! # Responsibility
//! - Normalize and validate caller input before any repository write.
//! - Filter by category and order list results by the requested sort key.
//! - Check existence before mutating and report missing ids as `NotFound`.
//!
//! # Invariants
//! - Validation completes before the repository is called; no partial writes.
//! - Every ordering falls back to `created_at DESC` for ties.
//! - `updated_at` only moves when a field actually changed (toggle always
//!   changes `completed`).
//! - Service APIs never bypass the repository contract.

use crate::model::todo::{
    normalize_due_date, normalize_optional_text, normalize_priority, normalize_title, TodoId,
    TodoItem, TodoValidationError,
};
use crate::repo::todo_repo::{RepoError, TodoRepository};
use chrono::NaiveDateTime;
use log::{debug, info};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Transport-facing error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or out-of-range input.
    InvalidArgument,
    /// The target id does not exist.
    NotFound,
    /// The durable medium could not be read or written.
    StorageFailure,
}

/// Service error for todo use-cases.
#[derive(Debug)]
pub enum ServiceError {
    InvalidArgument(TodoValidationError),
    NotFound(TodoId),
    Storage(RepoError),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Storage(_) => ErrorKind::StorageFailure,
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "todo not found: {id}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidArgument(err) => Some(err),
            Self::NotFound(_) => None,
            Self::Storage(err) => Some(err),
        }
    }
}

impl From<TodoValidationError> for ServiceError {
    fn from(value: TodoValidationError) -> Self {
        Self::InvalidArgument(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::InvalidArgument(err),
            other => Self::Storage(other),
        }
    }
}

/// Ordering applied to list results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    CreatedDesc,
    PriorityDesc,
    DueDateAsc,
    DueDateDesc,
}

impl SortKey {
    /// Maps a case-insensitive alias to a sort key.
    ///
    /// Absent or blank input yields the default key.
    pub fn parse(raw: Option<&str>) -> Result<Self, TodoValidationError> {
        let Some(raw) = raw else {
            return Ok(Self::default());
        };
        let normalized = raw.trim().to_lowercase();
        match normalized.as_str() {
            "" => Ok(Self::default()),
            "priority" | "prioritydesc" | "priority_desc" => Ok(Self::PriorityDesc),
            "due" | "duedate" | "due_date" | "duedateasc" | "due_date_asc" | "dueasc" => {
                Ok(Self::DueDateAsc)
            }
            "duedatedesc" | "due_date_desc" | "duedesc" => Ok(Self::DueDateDesc),
            "created" | "createdat" | "created_at" | "createddesc" | "created_at_desc" => {
                Ok(Self::CreatedDesc)
            }
            _ => Err(TodoValidationError::UnknownSortKey(raw.trim().to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreatedDesc => "created_at_desc",
            Self::PriorityDesc => "priority_desc",
            Self::DueDateAsc => "due_date_asc",
            Self::DueDateDesc => "due_date_desc",
        }
    }
}

/// Input for creating a todo. Fields are normalized by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateTodoRequest {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: Option<i64>,
    pub due_date: Option<String>,
}

impl CreateTodoRequest {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Partial update with per-field presence.
///
/// Outer `None` leaves a field unchanged. For optional fields, `Some(None)`
/// clears the value; `Some(Some(text))` is normalized, so blank text also
/// clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub category: Option<Option<String>>,
    pub priority: Option<i64>,
    pub due_date: Option<Option<String>>,
    pub completed: Option<bool>,
}

/// Use-case service over one repository implementation.
pub struct TodoService<R: TodoRepository> {
    repo: R,
}

impl<R: TodoRepository> TodoService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Lists todos, optionally restricted to one category, in `sort` order.
    ///
    /// A blank category filter means no filtering.
    pub fn list(&self, category: Option<&str>, sort: SortKey) -> ServiceResult<Vec<TodoItem>> {
        let mut items = self.repo.list()?;
        if let Some(category) = normalize_optional_text(category) {
            items.retain(|item| item.category.as_deref() == Some(category.as_str()));
        }
        sort_items(&mut items, sort);
        debug!(
            "event=todo_list module=service status=ok sort={} filtered={} count={}",
            sort.as_str(),
            category.is_some_and(|c| !c.trim().is_empty()),
            items.len()
        );
        Ok(items)
    }

    /// Distinct non-blank categories in ascending order.
    pub fn list_categories(&self) -> ServiceResult<Vec<String>> {
        let categories: BTreeSet<String> = self
            .repo
            .list()?
            .into_iter()
            .filter_map(|item| item.category)
            .filter(|category| !category.trim().is_empty())
            .collect();
        Ok(categories.into_iter().collect())
    }

    /// Loads one todo by id.
    pub fn get(&self, id: &str) -> ServiceResult<TodoItem> {
        self.repo
            .find_by_id(id)?
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))
    }

    /// Creates an open todo from normalized request fields.
    pub fn create(&self, request: &CreateTodoRequest) -> ServiceResult<TodoItem> {
        let title = normalize_title(&request.title)?;
        let description = normalize_optional_text(request.description.as_deref());
        let category = normalize_optional_text(request.category.as_deref());
        let priority = normalize_priority(request.priority)?;
        let due_date = normalize_due_date(request.due_date.as_deref())?;

        let mut item = TodoItem::new(title);
        item.description = description;
        item.category = category;
        item.priority = priority;
        item.due_date = due_date;

        let created = self.repo.create(&item)?;
        info!(
            "event=todo_create module=service status=ok id={}",
            created.id
        );
        Ok(created)
    }

    /// Applies a partial update to an existing todo.
    ///
    /// `completed`, when present, is set verbatim rather than toggled. The
    /// record is persisted even when nothing changed.
    pub fn update(&self, id: &str, patch: &TodoPatch) -> ServiceResult<TodoItem> {
        let existing = self.get(id)?;
        let mut item = existing.clone();

        if let Some(title) = patch.title.as_deref() {
            item.title = normalize_title(title)?;
        }
        if let Some(description) = &patch.description {
            item.description = normalize_optional_text(description.as_deref());
        }
        if let Some(category) = &patch.category {
            item.category = normalize_optional_text(category.as_deref());
        }
        if let Some(priority) = patch.priority {
            item.priority = normalize_priority(Some(priority))?;
        }
        if let Some(due_date) = &patch.due_date {
            item.due_date = normalize_due_date(due_date.as_deref())?;
        }
        if let Some(completed) = patch.completed {
            item.completed = completed;
        }

        let changed = item != existing;
        if changed {
            item.touch();
        }

        let updated = self.repo.update(&item)?;
        info!(
            "event=todo_update module=service status=ok id={} changed={}",
            updated.id, changed
        );
        Ok(updated)
    }

    /// Flips `completed` and refreshes `updated_at`.
    pub fn toggle(&self, id: &str) -> ServiceResult<TodoItem> {
        let mut item = self.get(id)?;
        item.completed = !item.completed;
        item.touch();

        let updated = self.repo.update(&item)?;
        info!(
            "event=todo_toggle module=service status=ok id={} completed={}",
            updated.id, updated.completed
        );
        Ok(updated)
    }

    /// Removes a todo; a missing id is `NotFound`.
    pub fn delete(&self, id: &str) -> ServiceResult<()> {
        if !self.repo.delete(id)? {
            return Err(ServiceError::NotFound(id.to_string()));
        }
        info!("event=todo_delete module=service status=ok id={id}");
        Ok(())
    }

    /// Maps a raw sort parameter to a `SortKey`.
    pub fn parse_sort(&self, raw: Option<&str>) -> ServiceResult<SortKey> {
        Ok(SortKey::parse(raw)?)
    }
}

/// Sorts in place by `key`, breaking ties by `created_at` descending.
pub fn sort_items(items: &mut [TodoItem], key: SortKey) {
    match key {
        SortKey::CreatedDesc => items.sort_by(created_desc),
        SortKey::PriorityDesc => {
            items.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| created_desc(a, b)))
        }
        SortKey::DueDateAsc | SortKey::DueDateDesc => {
            let descending = key == SortKey::DueDateDesc;
            items.sort_by(|a, b| {
                compare_due(a.due_date_time(), b.due_date_time(), descending)
                    .then_with(|| created_desc(a, b))
            });
        }
    }
}

fn created_desc(a: &TodoItem, b: &TodoItem) -> Ordering {
    b.created_at.cmp(&a.created_at)
}

/// Orders present due dates by direction; missing ones always sort last.
fn compare_due(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if descending => b.cmp(&a),
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
