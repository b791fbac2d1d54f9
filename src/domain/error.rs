//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent violations of the hierarchy's shape.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("malformed hierarchy input at {location}: {message}")]
    MalformedInput { location: String, message: String },

    #[error("unit {0} appears more than once in hierarchy")]
    DuplicateUnit(i64),

    #[error("hierarchy exceeds maximum depth of {max}")]
    DepthExceeded { max: usize },

    #[error("cycle detected in hierarchy at unit {0}")]
    CycleDetected(i64),
}

impl DomainError {
    pub(crate) fn malformed(location: &str, message: impl Into<String>) -> Self {
        Self::MalformedInput {
            location: if location.is_empty() {
                "/".to_string()
            } else {
                location.to_string()
            },
            message: message.into(),
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
