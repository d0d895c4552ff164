//! Error types for livestate.
//!
//! Errors are strongly typed using thiserror. Programming errors such as
//! reentrant object locking are not represented here: they panic at the
//! call site because they indicate a defect in the caller.

use std::path::PathBuf;

use thiserror::Error;

use crate::object::ObjectId;

/// Validation errors raised before a query touches any row.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Table '{table}' has no column '{column}'")]
    UnknownColumn {
        table: String,
        column: String,
    },

    #[error("Invalid regular expression '{pattern}': {reason}")]
    InvalidRegex {
        pattern: String,
        reason: String,
    },

    #[error("Unknown filter operator '{operator}'")]
    UnknownOperator {
        operator: String,
    },

    #[error("Query requests neither columns nor statistics")]
    EmptyQuery,

    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },
}

/// Execution errors raised by the query runtime.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Query queue is full (capacity: {capacity})")]
    QueueFull {
        capacity: usize,
    },

    #[error("Worker channel disconnected: {path}")]
    Disconnected {
        path: String,
    },

    #[error("Query timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },
}

/// Errors raised by an [`ObjectRegistry`](crate::registry::ObjectRegistry).
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Object name already registered: {0}")]
    DuplicateName(String),

    #[error("Object id already registered: {0}")]
    DuplicateId(ObjectId),

    #[error("Object not found: {0}")]
    NotFound(ObjectId),
}

/// Errors raised while loading a [`LiveConfig`](crate::config::LiveConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config value for '{field}': {reason}")]
    InvalidValue {
        field: String,
        reason: String,
    },
}

/// Top-level error type for livestate.
#[derive(Debug, Error)]
pub enum LiveError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl LiveError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if this is a registry error.
    #[must_use]
    pub const fn is_registry(&self) -> bool {
        matches!(self, Self::Registry(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns true if resubmitting the same query may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Execution(e) => matches!(
                e,
                ExecutionError::QueueFull { .. } | ExecutionError::Timeout { .. }
            ),
            Self::Validation(_) | Self::Registry(_) | Self::Config(_) | Self::Internal { .. } => {
                false
            }
        }
    }
}

/// Result type alias for livestate operations.
pub type LiveResult<T> = Result<T, LiveError>;
