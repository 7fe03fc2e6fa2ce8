use thiserror::Error;

use crate::store::StoreError;

/// Errors returned by repository operations.
///
/// `Contention` and `StoreUnavailable` are transient: the caller may retry
/// the whole operation. `Conflict` is a clash with existing data (a taken ID)
/// and fails the same way every time.
#[derive(Error, Debug)]
pub enum RepoError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Concurrent modification: {0}")]
    Contention(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Corrupt document: {0}")]
    Corrupt(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

impl RepoError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Contention(_) | Self::StoreUnavailable(_))
    }
}

impl From<StoreError> for RepoError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::not_found("project", id),
            StoreError::Conflict { .. } => Self::Contention(err.to_string()),
            StoreError::Unavailable(msg) => Self::StoreUnavailable(msg),
            StoreError::Corrupt { .. } => Self::Corrupt(err.to_string()),
            StoreError::Database(msg) => Self::Storage(msg),
            StoreError::Json(e) => Self::Serialization(e),
        }
    }
}
