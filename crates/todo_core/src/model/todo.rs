//! Todo domain model and field normalization.
//!
//! # Responsibility
//! - Define the record persisted by file and table backends.
//! - Provide the normalization rules for user-supplied fields.
//!
//! # Invariants
//! - `id` is stable and never reused for another todo.
//! - `title` is never blank once stored.
//! - `priority` is within `MIN_PRIORITY..=MAX_PRIORITY`.
//! - `due_date`, when present, is in canonical `YYYY-MM-DDTHH:mm` form.
//! - `created_at <= updated_at`.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Opaque todo identifier, minted server-side.
pub type TodoId = String;

/// Priority assigned when the caller does not supply one (medium).
pub const DEFAULT_PRIORITY: u8 = 2;
pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 3;

/// Canonical rendering of `due_date`.
pub const DUE_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M";

const DATE_ONLY_FORMAT: &str = "%Y-%m-%d";
const DATE_ONLY_LEN: usize = 10;
const MINUTES_LEN: usize = 16;
const SECONDS_LEN: usize = 19;
/// Zero-padded layout every accepted input follows; `0` marks a digit.
const DUE_DATE_SHAPE: &[u8] = b"0000-00-00T00:00:00";
const DATE_TIME_FORMATS: &[&str] = &[DUE_DATE_FORMAT, "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Validation failures for todo fields and list queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoValidationError {
    BlankId,
    BlankTitle,
    PriorityOutOfRange(i64),
    InvalidDueDate(String),
    UnknownSortKey(String),
    UpdatedBeforeCreated,
}

impl Display for TodoValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankId => write!(f, "id must not be blank"),
            Self::BlankTitle => write!(f, "title must not be blank"),
            Self::PriorityOutOfRange(value) => write!(
                f,
                "priority must be {MIN_PRIORITY}..{MAX_PRIORITY}, got {value}"
            ),
            Self::InvalidDueDate(value) => {
                write!(f, "dueDate must be yyyy-MM-ddTHH:mm, got `{value}`")
            }
            Self::UnknownSortKey(value) => write!(f, "invalid sort: `{value}`"),
            Self::UpdatedBeforeCreated => write!(f, "updatedAt must not be earlier than createdAt"),
        }
    }
}

impl Error for TodoValidationError {}

/// Canonical todo record.
///
/// Serialized with camelCase keys; absent optional fields render as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub id: TodoId,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: u8,
    /// Canonical `YYYY-MM-DDTHH:mm` local date-time.
    pub due_date: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TodoItem {
    /// Creates an open todo with a freshly minted id.
    ///
    /// # Invariants
    /// - `created_at == updated_at`.
    /// - Optional fields start as `None`, priority as `DEFAULT_PRIORITY`.
    /// - The title is stored as given; callers normalize first.
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            description: None,
            category: None,
            priority: DEFAULT_PRIORITY,
            due_date: None,
            completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Refreshes `updated_at`.
    ///
    /// The new value is strictly later than the previous one, even when the
    /// wall clock has not advanced between two mutations.
    pub fn touch(&mut self) {
        let now = Utc::now();
        let floor = self.updated_at + Duration::microseconds(1);
        self.updated_at = if now > self.updated_at { now } else { floor };
    }

    /// Parsed due date, or `None` when absent or unparseable.
    pub fn due_date_time(&self) -> Option<NaiveDateTime> {
        self.due_date.as_deref().and_then(parse_due_date_time)
    }

    /// Checks record-level invariants before persistence.
    pub fn validate(&self) -> Result<(), TodoValidationError> {
        if self.id.trim().is_empty() {
            return Err(TodoValidationError::BlankId);
        }
        if self.title.trim().is_empty() {
            return Err(TodoValidationError::BlankTitle);
        }
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&self.priority) {
            return Err(TodoValidationError::PriorityOutOfRange(i64::from(self.priority)));
        }
        if let Some(due) = self.due_date.as_deref() {
            if normalize_due_date(Some(due))?.as_deref() != Some(due) {
                return Err(TodoValidationError::InvalidDueDate(due.to_string()));
            }
        }
        if self.updated_at < self.created_at {
            return Err(TodoValidationError::UpdatedBeforeCreated);
        }
        Ok(())
    }
}

/// Trims a required title; blank input is rejected.
pub fn normalize_title(title: &str) -> Result<String, TodoValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TodoValidationError::BlankTitle);
    }
    Ok(trimmed.to_string())
}

/// Trims optional text; blank input collapses to `None`.
///
/// Applies to `description` and `category`.
pub fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Applies the default priority or checks the supplied one.
pub fn normalize_priority(priority: Option<i64>) -> Result<u8, TodoValidationError> {
    let Some(value) = priority else {
        return Ok(DEFAULT_PRIORITY);
    };
    match u8::try_from(value) {
        Ok(p) if (MIN_PRIORITY..=MAX_PRIORITY).contains(&p) => Ok(p),
        _ => Err(TodoValidationError::PriorityOutOfRange(value)),
    }
}

/// Normalizes a due date into canonical `YYYY-MM-DDTHH:mm` form.
///
/// - Blank or absent input yields `None`.
/// - A bare `YYYY-MM-DD` date is interpreted as midnight.
/// - Anything else must be a local date-time without zone; seconds are
///   accepted and dropped.
pub fn normalize_due_date(value: Option<&str>) -> Result<Option<String>, TodoValidationError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    parse_due_date_time(trimmed)
        .map(|dt| Some(dt.format(DUE_DATE_FORMAT).to_string()))
        .ok_or_else(|| TodoValidationError::InvalidDueDate(trimmed.to_string()))
}

/// Lenient due-date parser used for ordering.
///
/// Returns `None` for blank or unparseable input instead of failing.
pub fn parse_due_date_time(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if !has_due_date_shape(trimmed) {
        return None;
    }

    if trimmed.len() == DATE_ONLY_LEN {
        return NaiveDate::parse_from_str(trimmed, DATE_ONLY_FORMAT)
            .ok()
            .map(|date| date.and_time(NaiveTime::MIN));
    }

    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
}

/// Checks zero-padded `YYYY-MM-DD[THH:mm[:ss[.fff]]]` layout.
///
/// chrono accepts unpadded fields, so the layout is checked first.
fn has_due_date_shape(value: &str) -> bool {
    let bytes = value.as_bytes();
    let fixed_len = match bytes.len() {
        DATE_ONLY_LEN | MINUTES_LEN | SECONDS_LEN => bytes.len(),
        len if len > SECONDS_LEN + 1
            && bytes[SECONDS_LEN] == b'.'
            && bytes[SECONDS_LEN + 1..].iter().all(u8::is_ascii_digit) =>
        {
            SECONDS_LEN
        }
        _ => return false,
    };

    bytes[..fixed_len]
        .iter()
        .zip(DUE_DATE_SHAPE)
        .all(|(&byte, &expected)| {
            if expected == b'0' {
                byte.is_ascii_digit()
            } else {
                byte == expected
            }
        })
}
