use thiserror::Error;

/// Outcomes the pharmacy directory surfaces to its callers
///
/// Each kind is distinguishable so the HTTP layer can pick the right
/// response. Only `Store` and `DataCorruption` mean "try again later".
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Malformed or missing input, detected before touching the store
    #[error("validation failed: {0}")]
    Validation(String),

    /// Duplicate email, username or phone
    #[error("{0} already registered")]
    UniquenessConflict(String),

    /// Referenced entity is absent
    #[error("{0} not found")]
    NotFound(String),

    /// Update carried nothing from the allowlist
    #[error("no fields to update")]
    NoFields,

    /// Transport or transaction failure
    #[error("database error: {0}")]
    Store(#[from] sqlx::Error),

    /// A stored row violates a domain invariant
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

impl RepositoryError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn pharmacy_not_found() -> Self {
        Self::NotFound("pharmacy".to_string())
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
