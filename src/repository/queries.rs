use crate::error::{RepoError, RepoResult};
use crate::models::{Level, LocatedNode, ProjectStatistics};
use crate::search::{self, SearchMatch};
use crate::stats;

use super::Repository;

impl Repository {
    /// A single node (without children) and its ancestor path.
    pub fn get_node(&self, project_id: &str, node_id: &str) -> RepoResult<LocatedNode> {
        let tree = self.load_tree(project_id)?;
        let node = tree
            .node(node_id)
            .ok_or_else(|| RepoError::not_found("node", node_id))?;
        Ok(LocatedNode {
            node,
            path: tree.ancestry(node_id),
        })
    }

    pub fn search(
        &self,
        project_id: &str,
        term: &str,
        level: Option<Level>,
    ) -> RepoResult<Vec<SearchMatch>> {
        if term.trim().is_empty() {
            return Err(RepoError::Validation("search term must not be empty".into()));
        }
        let project = self.get_project(project_id)?;
        search::search(&project, term, level)
    }

    pub fn statistics(&self, project_id: &str) -> RepoResult<ProjectStatistics> {
        let project = self.get_project(project_id)?;
        Ok(stats::compute(&project))
    }
}
