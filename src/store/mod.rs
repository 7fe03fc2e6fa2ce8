//! Persistence of whole project documents with optimistic versioning.
//!
//! A store knows nothing about the tree inside a document. It loads a project
//! with its current [`Version`] and replaces it only if that version is still
//! current, which is all the repository needs to run its
//! load-mutate-commit cycle.

mod memory;
mod schema;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::models::Project;

/// Monotonic version token of a stored document. `Version::NEW` stands for
/// "not stored yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(pub u64);

impl Version {
    pub const NEW: Version = Version(0);

    pub fn next(self) -> Version {
        Version(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Project not found: {0}")]
    NotFound(String),

    /// The document changed since it was loaded. Reload and retry.
    #[error("Version conflict for project {project_id}: expected {expected}, but it was modified")]
    Conflict { project_id: String, expected: Version },

    #[error("{0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Stored document for project {project_id} is unreadable: {source}")]
    Corrupt {
        project_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Versioned storage of one document per project.
pub trait DocumentStore: Send + Sync {
    fn load(&self, project_id: &str) -> StoreResult<(Project, Version)>;

    /// Writes `project` if the stored version equals `expected` and returns the
    /// new version. `Version::NEW` inserts and fails with `Conflict` if the
    /// project already exists.
    fn commit_if_unchanged(
        &self,
        project_id: &str,
        expected: Version,
        project: &Project,
    ) -> StoreResult<Version>;

    /// Returns `false` if there was nothing to delete.
    fn delete(&self, project_id: &str) -> StoreResult<bool>;

    /// Every stored project, newest first.
    fn list(&self) -> StoreResult<Vec<(Project, Version)>>;
}
