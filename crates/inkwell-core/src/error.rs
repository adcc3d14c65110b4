//! Domain-level error types.

use thiserror::Error;

use crate::ports::AuthError;

/// Domain errors - what callers of the content and session layers see.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: &'static str, id: String },

    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl DomainError {
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        DomainError::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        DomainError::Validation(vec![message.into()])
    }
}

/// Repository-level errors raised by store adapters.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Store connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    Query(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Batch aborted: {0}")]
    Aborted(String),
}

/// Store failures reach callers verbatim as `BackendUnavailable`.
impl From<RepoError> for DomainError {
    fn from(err: RepoError) -> Self {
        DomainError::BackendUnavailable(err.to_string())
    }
}
