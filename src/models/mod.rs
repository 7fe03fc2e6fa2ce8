//! Domain models for casebook.
//!
//! # Hierarchy
//!
//! - [`Project`]: the unit of storage. Owns the ordered list of epics and the
//!   set of retired node identifiers.
//! - [`Epic`]: a body of work; the level that is synchronised with Jira.
//! - [`Feature`]: a capability inside an epic.
//! - [`UseCase`]: a scenario of a feature, reviewed by humans.
//! - [`TestCase`]: an executable test of a use case.
//!
//! Each level has a `*Fields` struct (content for creation and import) and a
//! `*Patch` struct (partial update through the mutation API).
//!
//! ## Field ownership
//!
//! Generated content may be overwritten by a later import. Review state
//! (`review_status`, `comments`) and Jira state (`jira_status`, `jira_key`,
//! `jira_pushed_at`) are owned by people and the sync tracker and survive
//! imports untouched.

mod epic;
mod feature;
mod level;
mod node;
mod project;
mod report;
mod statistics;
mod status;
mod test_case;
mod use_case;

pub use epic::*;
pub use feature::*;
pub use level::*;
pub use node::*;
pub use project::*;
pub use report::*;
pub use statistics::*;
pub use status::*;
pub use test_case::*;
pub use use_case::*;

use crate::error::{RepoError, RepoResult};

pub(crate) fn require_text(field: &str, value: &str) -> RepoResult<()> {
    if value.trim().is_empty() {
        return Err(RepoError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}
