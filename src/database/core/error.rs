//! Error envelope for store operations
//!
//! Every failed statement is reported as [`StoreError::Query`], carrying the
//! caller-supplied operation name, the [`Stage`] that failed, and a JSON
//! rendering of the underlying error.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Which half of an operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// The engine rejected the statement (syntax, constraint, I/O).
    Execution,
    /// The result transform failed while shaping a successful result.
    Transform,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Execution => write!(f, "execution-stage"),
            Stage::Transform => write!(f, "transform-stage"),
        }
    }
}

/// Errors produced by the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database file could not be opened or configured.
    #[error("failed to open database '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    /// The directory holding the database file could not be created.
    #[error("failed to create database directory '{path}': {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A statement or its result transform failed.
    #[error("{operation} - {stage}: {detail}")]
    Query {
        operation: String,
        stage: Stage,
        detail: String,
    },

    /// The alteration log is not a contiguous, ordered sequence.
    #[error("invalid migration log: {0}")]
    MigrationLog(String),
}

impl StoreError {
    pub(crate) fn execution(operation: &str, err: &rusqlite::Error) -> Self {
        StoreError::Query {
            operation: operation.to_string(),
            stage: Stage::Execution,
            detail: ErrorReport::from_engine(err).to_json(),
        }
    }

    pub(crate) fn execution_message(operation: &str, message: impl Into<String>) -> Self {
        StoreError::Query {
            operation: operation.to_string(),
            stage: Stage::Execution,
            detail: ErrorReport::message(message).to_json(),
        }
    }

    pub(crate) fn transform(operation: &str, err: impl fmt::Display) -> Self {
        StoreError::Query {
            operation: operation.to_string(),
            stage: Stage::Transform,
            detail: ErrorReport::message(err.to_string()).to_json(),
        }
    }

    /// Stage of a failed query, `None` for open and log errors.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            StoreError::Query { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Operation name of a failed query.
    pub fn operation(&self) -> Option<&str> {
        match self {
            StoreError::Query { operation, .. } => Some(operation),
            _ => None,
        }
    }
}

/// Serializable form of an underlying error.
#[derive(Debug, Serialize)]
struct ErrorReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<i32>,
    message: String,
}

impl ErrorReport {
    fn from_engine(err: &rusqlite::Error) -> Self {
        let code = match err {
            rusqlite::Error::SqliteFailure(e, _) => Some(e.extended_code),
            _ => None,
        };
        ErrorReport {
            code,
            message: err.to_string(),
        }
    }

    fn message(message: impl Into<String>) -> Self {
        ErrorReport {
            code: None,
            message: message.into(),
        }
    }

    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.message.clone())
    }
}

/// Convenience alias for results with [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Execution.to_string(), "execution-stage");
        assert_eq!(Stage::Transform.to_string(), "transform-stage");
    }

    #[test]
    fn test_transform_error_message() {
        let err = StoreError::transform("loadSurvey", "missing column");
        assert_eq!(err.stage(), Some(Stage::Transform));
        assert_eq!(err.operation(), Some("loadSurvey"));
        assert_eq!(
            err.to_string(),
            r#"loadSurvey - transform-stage: {"message":"missing column"}"#
        );
    }

    #[test]
    fn test_execution_error_carries_engine_code() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let engine_err = conn.execute("INSERT INTO missing VALUES (1)", []).unwrap_err();
        let err = StoreError::execution("insertMissing", &engine_err);
        let text = err.to_string();
        assert!(text.starts_with("insertMissing - execution-stage: {\"code\":"));
        assert!(text.contains("no such table"));
    }
}
