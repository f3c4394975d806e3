//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the storage contract the service layer programs against.
//! - Provide the file-backed (JSON document) and table-backed (SQLite)
//!   implementations plus the closed set used to pick one at startup.
//!
//! # Invariants
//! - Repository writes call `TodoItem::validate()` before touching the medium.
//! - Callers always receive owned copies; nothing hands out shared references
//!   into backend state.
//! - `list()` returns records in creation-descending order.

pub mod file_repo;
pub mod sqlite_repo;
pub mod sqlite_schema;
pub mod store;
pub mod todo_repo;
