//! Application-level errors (wraps domain errors)

use itertools::Itertools;
use thiserror::Error;

use crate::domain::{DomainError, ImportError, InvariantViolation};

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("{0}")]
    Import(#[from] ImportError),

    #[error("tree violates invariants: {}", .0.iter().join("; "))]
    Invariants(Vec<InvariantViolation>),

    #[error("invalid system id \"{0}\": use letters, digits, '-' and '_'")]
    InvalidSystemId(String),

    #[error("indicator system not found: {0}")]
    SystemNotFound(String),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl From<Vec<InvariantViolation>> for ApplicationError {
    fn from(violations: Vec<InvariantViolation>) -> Self {
        Self::Invariants(violations)
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
