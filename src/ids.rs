//! Project-scoped identifiers for tree nodes.
//!
//! Minted IDs are the level prefix followed by a zero-padded counter
//! (`E001`, `F012`, `UC003`, `TC120`). The counter continues from the highest
//! suffix ever used in the project, retired IDs included, so a deleted node's
//! ID is never handed to a different node.

use std::collections::HashSet;

use crate::error::{RepoError, RepoResult};
use crate::models::Level;
use crate::tree::ProjectTree;

pub const ID_WIDTH: usize = 3;
pub const MAX_ID_LEN: usize = 64;

/// The next free identifier for `level`.
pub fn next_id(tree: &ProjectTree, level: Level) -> String {
    next_id_excluding(tree, level, &HashSet::new())
}

/// Like [`next_id`], but also passes over `reserved` IDs that are not in the
/// tree yet.
pub fn next_id_excluding(tree: &ProjectTree, level: Level, reserved: &HashSet<String>) -> String {
    let prefix = level.id_prefix();
    let highest = tree
        .taken_ids()
        .filter_map(|id| numeric_suffix(id, prefix))
        .max()
        .unwrap_or(0);

    let mut n = highest.saturating_add(1);
    loop {
        let candidate = format!("{prefix}{n:0width$}", width = ID_WIDTH);
        if !tree.is_taken(&candidate) && !reserved.contains(&candidate) {
            return candidate;
        }
        n = n.saturating_add(1);
    }
}

/// Uses the caller's ID when one is given, otherwise mints a new one.
///
/// An explicit ID that is already live or was retired is a `Conflict`;
/// it is never silently renamed.
pub fn claim_id(tree: &ProjectTree, level: Level, explicit: Option<&str>) -> RepoResult<String> {
    let Some(id) = normalize(explicit) else {
        return Ok(next_id(tree, level));
    };
    validate(id)?;
    if tree.contains(id) {
        return Err(RepoError::Conflict(format!("id {id} is already in use")));
    }
    if tree.is_retired(id) {
        return Err(RepoError::Conflict(format!(
            "id {id} belonged to a deleted node and cannot be reused"
        )));
    }
    Ok(id.to_string())
}

/// Blank explicit IDs count as absent.
pub fn normalize(explicit: Option<&str>) -> Option<&str> {
    explicit.map(str::trim).filter(|id| !id.is_empty())
}

pub fn validate(id: &str) -> RepoResult<()> {
    if id.is_empty() {
        return Err(RepoError::Validation("id must not be empty".into()));
    }
    if id.len() > MAX_ID_LEN {
        return Err(RepoError::Validation(format!(
            "id {id} is longer than {MAX_ID_LEN} characters"
        )));
    }
    if id.chars().any(char::is_whitespace) {
        return Err(RepoError::Validation(format!("id '{id}' contains whitespace")));
    }
    Ok(())
}

fn numeric_suffix(id: &str, prefix: &str) -> Option<u64> {
    let digits = id.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
