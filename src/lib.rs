//! casebook: a hierarchical test-artifact repository.
//!
//! Projects own a four-level tree (Epic → Feature → UseCase → TestCase) that an
//! AI agent generates and a UI reviews. The whole tree of one project is stored
//! as a single versioned document and every write goes through an optimistic
//! load-mutate-commit cycle.

pub mod api;
pub mod config;
pub mod error;
pub mod ids;
pub mod mcp;
pub mod merge;
pub mod models;
pub mod repository;
pub mod search;
pub mod stats;
pub mod store;
pub mod tree;

pub use error::{RepoError, RepoResult};
pub use repository::Repository;
