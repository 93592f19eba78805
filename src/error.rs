use std::fmt;

use thiserror::Error;

/// Record families addressed by id from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Task,
    GroceryList,
    GroceryItem,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecordKind::Task => "task",
            RecordKind::GroceryList => "grocery list",
            RecordKind::GroceryItem => "grocery item",
        })
    }
}

/// Validation and lookup failures raised before or instead of a database write.
///
/// Storage returns these wrapped in `anyhow::Error`; use `downcast_ref` to
/// branch on them.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlannerError {
    #[error("task content cannot be empty")]
    EmptyContent,
    #[error("grocery list name cannot be empty")]
    EmptyListName,
    #[error("grocery item content cannot be empty")]
    EmptyItemContent,
    #[error("invalid due date '{raw}' (expected YYYY-MM-DD)")]
    InvalidDueDate { raw: String },
    #[error("{kind} '{id}' not found")]
    NotFound { kind: RecordKind, id: String },
    #[error("{kind} id '{prefix}' is ambiguous ({matches} matches)")]
    AmbiguousId {
        kind: RecordKind,
        prefix: String,
        matches: usize,
    },
}
