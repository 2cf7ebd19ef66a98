//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::script::ScriptError;

/// Domain errors represent violations of the navigation data model.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("malformed navigation data at {location}: {message}")]
    MalformedNavData { location: String, message: String },

    #[error("syntax error: {0}")]
    Syntax(#[from] ScriptError),

    #[error("declaration not found: var {0}")]
    MissingDeclaration(String),

    #[error("invalid shard size: {0} (must be at least 1)")]
    InvalidShardSize(usize),
}

impl DomainError {
    pub(crate) fn malformed(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedNavData {
            location: location.into(),
            message: message.into(),
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
