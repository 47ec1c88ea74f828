//! Unified error handling for the rota crate
//!
//! Every failure the core can report maps to one variant of [`Error`], and
//! every variant renders a distinct message so callers (and tests) can tell
//! the exact cause apart.
//!
//! # Architecture
//!
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum
//!
//! # Usage
//!
//! ```rust,ignore
//! use rota::error::{Error, ErrorCategory};
//!
//! fn handle_error(err: Error) {
//!     match err.category() {
//!         ErrorCategory::Authorization => eprintln!("denied: {err}"),
//!         _ if err.is_recoverable() => eprintln!("retry later: {err}"),
//!         _ => eprintln!("failed: {err}"),
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed or missing input
    Validation,
    /// Referenced entity does not exist
    NotFound,
    /// Duplicate or double-booked state
    Conflict,
    /// Actor lacks role or scope
    Authorization,
    /// Transition not permitted from the current state
    State,
    /// Persistence, I/O and serialization failures
    Storage,
    /// Configuration errors
    Config,
}

impl ErrorCategory {
    /// Short machine-friendly label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Authorization => "authorization",
            Self::State => "state",
            Self::Storage => "storage",
            Self::Config => "config",
        }
    }
}

/// Unified error type for the rota crate
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or missing required input
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Referenced date, slot, person or request does not exist
    #[error("{what} not found: {key}")]
    NotFound { what: &'static str, key: String },

    /// Duplicate active request, duplicate id, double booking
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Actor lacks role or scope for the attempted mutation
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Transition attempted from a state that does not permit it
    #[error("Invalid state transition: cannot {action} a request that is '{status}'")]
    State { action: &'static str, status: String },

    /// Nothing stored to delete
    #[error("Nothing to delete: {0}")]
    EmptyState(String),

    /// Storage backend failure
    #[error("Storage error during '{operation}': {reason}")]
    Storage { operation: String, reason: String },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not-found error
    pub fn not_found(what: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            what,
            key: key.to_string(),
        }
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create an authorization error
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Authorization(msg.into())
    }

    /// Create a state-transition error
    pub fn state(action: &'static str, status: impl ToString) -> Self {
        Self::State {
            action,
            status: status.to_string(),
        }
    }

    /// Create an empty-state error
    pub fn empty_state(msg: impl Into<String>) -> Self {
        Self::EmptyState(msg.into())
    }

    /// Create a storage error with context
    pub fn storage(operation: impl Into<String>, reason: impl ToString) -> Self {
        Self::Storage {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) | Self::EmptyState(_) => ErrorCategory::Validation,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Conflict(_) => ErrorCategory::Conflict,
            Self::Authorization(_) => ErrorCategory::Authorization,
            Self::State { .. } => ErrorCategory::State,
            Self::Storage { .. } | Self::Io(_) | Self::Json(_) => ErrorCategory::Storage,
            Self::Config(_) => ErrorCategory::Config,
        }
    }

    /// Check if this error is recoverable (can be retried by the caller)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Io(_))
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category() {
        assert_eq!(
            Error::validation("empty schedule").category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            Error::not_found("day", "2025-10-05").category(),
            ErrorCategory::NotFound
        );
        assert_eq!(Error::state("approve", "pending").category(), ErrorCategory::State);
        assert_eq!(
            Error::empty_state("no schedule").category(),
            ErrorCategory::Validation
        );
    }

    #[test]
    fn test_messages_are_distinct() {
        let errors = [
            Error::validation("x"),
            Error::not_found("request", "x"),
            Error::conflict("x"),
            Error::unauthorized("x"),
            Error::state("accept", "x"),
            Error::empty_state("x"),
            Error::storage("save", "x"),
            Error::config("x"),
        ];
        let messages: std::collections::HashSet<String> =
            errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(messages.len(), errors.len());
    }

    #[test]
    fn test_state_message() {
        let err = Error::state("approve", "approved");
        assert_eq!(
            err.to_string(),
            "Invalid state transition: cannot approve a request that is 'approved'"
        );
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::storage("save", "disk full").is_recoverable());
        assert!(!Error::conflict("duplicate").is_recoverable());
        assert!(!Error::unauthorized("viewer").is_recoverable());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
        assert_eq!(err.category(), ErrorCategory::Storage);
    }
}
