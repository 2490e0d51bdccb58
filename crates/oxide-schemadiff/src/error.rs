//! Error types for the schema diff pipeline.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::operations::OperationKind;

/// Category of a schema validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    /// A required field is absent (or a name is empty).
    MissingField,
    /// Two columns in the same table share a name.
    DuplicateName,
    /// A column type is not in the recognized set.
    UnknownType,
    /// A field is present but holds the wrong kind of value.
    InvalidValue,
    /// A table constraint names a column the table does not declare.
    UnknownColumn,
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MissingField => "missing field",
            Self::DuplicateName => "duplicate name",
            Self::UnknownType => "unknown type",
            Self::InvalidValue => "invalid value",
            Self::UnknownColumn => "unknown column",
        };
        f.write_str(name)
    }
}

/// A malformed schema snapshot, located by its path inside the input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at '{path}': {message}")]
pub struct ValidationError {
    /// What went wrong.
    pub kind: ValidationErrorKind,
    /// Location such as `tables.users.columns[1].type`.
    pub path: String,
    /// Human-readable detail.
    pub message: String,
}

impl ValidationError {
    /// Creates a validation error.
    #[must_use]
    pub fn new(
        kind: ValidationErrorKind,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn missing(path: impl Into<String>, field: &str) -> Self {
        Self::new(
            ValidationErrorKind::MissingField,
            path,
            format!("required field '{field}' is missing"),
        )
    }

    pub(crate) fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ValidationErrorKind::InvalidValue, path, message)
    }
}

/// A destructive operation that the safety gate refused to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockedOperation {
    /// Operation kind.
    pub kind: OperationKind,
    /// Table the operation touches.
    pub table: String,
    /// Column the operation touches, if any.
    pub column: Option<String>,
    /// Why the classifier considers it destructive.
    pub reason: String,
}

impl fmt::Display for BlockedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(column) => write!(
                f,
                "{}: {}.{} ({})",
                self.kind, self.table, column, self.reason
            ),
            None => write!(f, "{}: {} ({})", self.kind, self.table, self.reason),
        }
    }
}

/// Errors raised by the destructive-operation gate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SafetyError {
    /// Destructive operations were found and not explicitly allowed.
    #[error(
        "destructive operations detected; re-run with --allow-destructive:\n{}",
        .blocked.iter().map(|b| format!("  - {b}")).collect::<Vec<_>>().join("\n")
    )]
    DestructiveBlocked {
        /// Every operation that tripped the gate, in plan order.
        blocked: Vec<BlockedOperation>,
    },
}

/// Errors that can occur anywhere in the library.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Input snapshot failed validation.
    #[error("Invalid schema: {0}")]
    Validation(#[from] ValidationError),

    /// Safety gate refused the migration.
    #[error(transparent)]
    Safety(#[from] SafetyError),

    /// Failed to read a schema file.
    #[error("Failed to read '{path}': {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// A schema file is not valid JSON.
    #[error("Invalid JSON in '{path}': {source}")]
    Json {
        /// File being parsed.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// An operation does not apply to the schema it is replayed on.
    #[error("Invalid migration state: {0}")]
    InvalidState(String),
}

/// Result type for schema diff operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
