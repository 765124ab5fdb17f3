//! Error types for the todo service.
//!
//! # Design
//! Three kinds reach callers: `Validation` (bad input, raised before any
//! store call), `NotFound` (unknown id), and `Store` (I/O, serialization or
//! database failure). `NotFound` gets its own variant on `TodoError` rather
//! than living inside `StoreError` because both backends and the id parser
//! produce it and callers map it to a client error.

use uuid::Uuid;

/// Maximum length of a todo's text, in UTF-16 code units.
pub const MAX_TEXT_LEN: usize = 200;

/// Input rejected by the validation layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Todo {0} is required")]
    MissingField(&'static str),

    #[error("Todo {field} must be a {expected}")]
    InvalidType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("Todo text cannot be empty")]
    EmptyText,

    #[error("Todo text cannot exceed 200 characters (got {0})")]
    TooLong(usize),

    #[error("Todo ID is required")]
    MissingId,
}

/// Failures inside a persistence backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Errors returned by `TodoStore` and `TodoService` operations.
#[derive(Debug, thiserror::Error)]
pub enum TodoError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Todo '{0}' not found")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TodoError {
    pub fn not_found(id: Uuid) -> Self {
        TodoError::NotFound(id.to_string())
    }
}

impl From<std::io::Error> for TodoError {
    fn from(e: std::io::Error) -> Self {
        TodoError::Store(StoreError::Io(e))
    }
}

impl From<serde_json::Error> for TodoError {
    fn from(e: serde_json::Error) -> Self {
        TodoError::Store(StoreError::Serialization(e))
    }
}

impl From<sqlx::Error> for TodoError {
    fn from(e: sqlx::Error) -> Self {
        TodoError::Store(StoreError::Database(e))
    }
}

pub type Result<T, E = TodoError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_are_user_facing() {
        assert_eq!(
            ValidationError::MissingField("text").to_string(),
            "Todo text is required"
        );
        assert_eq!(
            ValidationError::TooLong(201).to_string(),
            "Todo text cannot exceed 200 characters (got 201)"
        );
    }

    #[test]
    fn validation_error_passes_through_transparently() {
        let err = TodoError::from(ValidationError::EmptyText);
        assert_eq!(err.to_string(), "Todo text cannot be empty");
    }

    #[test]
    fn io_error_lands_in_store_variant() {
        let err = TodoError::from(std::io::Error::other("disk gone"));
        assert!(matches!(err, TodoError::Store(StoreError::Io(_))));
    }
}
