//! Todo domain model.
//!
//! # Responsibility
//! - Define the canonical todo record shared by every storage backend.
//! - Own the pure normalization rules applied before anything is persisted.
//!
//! # Invariants
//! - Every stored record passes `TodoItem::validate()`.
//! - Normalization functions are deterministic and perform no I/O.

pub mod todo;
