//! Single-node add/update/delete at every level.

use tracing::info;

use super::{Repository, Write};
use crate::error::{RepoError, RepoResult};
use crate::ids;
use crate::models::{
    Epic, EpicFields, EpicPatch, Feature, FeatureFields, FeaturePatch, Level, TestCase,
    TestCaseFields, TestCasePatch, UseCase, UseCaseFields, UseCasePatch,
};
use crate::tree::ProjectTree;

impl Repository {
    // ============================================================
    // Add
    // ============================================================

    /// Appends a new epic. Returns its ID, minted unless `epic_id` is given.
    pub fn add_epic(
        &self,
        project_id: &str,
        fields: EpicFields,
        epic_id: Option<&str>,
    ) -> RepoResult<String> {
        fields.validate()?;
        let id = self.mutate(project_id, |tree| {
            let id = ids::claim_id(tree, Level::Epic, epic_id)?;
            tree.insert_epic(Epic::new(id.clone(), fields.clone()))?;
            Ok(Write::Commit(id))
        })?;
        info!(project_id, epic_id = %id, "Added epic");
        Ok(id)
    }

    pub fn add_feature(
        &self,
        project_id: &str,
        epic_id: &str,
        fields: FeatureFields,
        feature_id: Option<&str>,
    ) -> RepoResult<String> {
        fields.validate()?;
        let id = self.mutate(project_id, |tree| {
            require_parent(tree, Level::Epic, epic_id)?;
            let id = ids::claim_id(tree, Level::Feature, feature_id)?;
            tree.insert_feature(epic_id, Feature::new(id.clone(), fields.clone()))?;
            Ok(Write::Commit(id))
        })?;
        info!(project_id, epic_id, feature_id = %id, "Added feature");
        Ok(id)
    }

    pub fn add_use_case(
        &self,
        project_id: &str,
        feature_id: &str,
        fields: UseCaseFields,
        use_case_id: Option<&str>,
    ) -> RepoResult<String> {
        fields.validate()?;
        let id = self.mutate(project_id, |tree| {
            require_parent(tree, Level::Feature, feature_id)?;
            let id = ids::claim_id(tree, Level::UseCase, use_case_id)?;
            tree.insert_use_case(feature_id, UseCase::new(id.clone(), fields.clone()))?;
            Ok(Write::Commit(id))
        })?;
        info!(project_id, feature_id, use_case_id = %id, "Added use case");
        Ok(id)
    }

    pub fn add_test_case(
        &self,
        project_id: &str,
        use_case_id: &str,
        fields: TestCaseFields,
        test_case_id: Option<&str>,
    ) -> RepoResult<String> {
        fields.validate()?;
        let id = self.mutate(project_id, |tree| {
            require_parent(tree, Level::UseCase, use_case_id)?;
            let id = ids::claim_id(tree, Level::TestCase, test_case_id)?;
            tree.insert_test_case(use_case_id, TestCase::new(id.clone(), fields.clone()))?;
            Ok(Write::Commit(id))
        })?;
        info!(project_id, use_case_id, test_case_id = %id, "Added test case");
        Ok(id)
    }

    // ============================================================
    // Update
    // ============================================================

    pub fn update_epic(&self, project_id: &str, epic_id: &str, patch: EpicPatch) -> RepoResult<Epic> {
        patch.validate()?;
        self.mutate(project_id, |tree| {
            let changed = tree.patch_epic(epic_id, patch.clone())?;
            let epic = tree
                .epic(epic_id)
                .cloned()
                .ok_or_else(|| RepoError::not_found("epic", epic_id))?;
            Ok(commit_if(changed, epic))
        })
    }

    pub fn update_feature(
        &self,
        project_id: &str,
        feature_id: &str,
        patch: FeaturePatch,
    ) -> RepoResult<Feature> {
        patch.validate()?;
        self.mutate(project_id, |tree| {
            let changed = tree.patch_feature(feature_id, patch.clone())?;
            let feature = tree
                .feature(feature_id)
                .cloned()
                .ok_or_else(|| RepoError::not_found("feature", feature_id))?;
            Ok(commit_if(changed, feature))
        })
    }

    pub fn update_use_case(
        &self,
        project_id: &str,
        use_case_id: &str,
        patch: UseCasePatch,
    ) -> RepoResult<UseCase> {
        patch.validate()?;
        self.mutate(project_id, |tree| {
            let changed = tree.patch_use_case(use_case_id, patch.clone())?;
            let use_case = tree
                .use_case(use_case_id)
                .cloned()
                .ok_or_else(|| RepoError::not_found("use_case", use_case_id))?;
            Ok(commit_if(changed, use_case))
        })
    }

    pub fn update_test_case(
        &self,
        project_id: &str,
        test_case_id: &str,
        patch: TestCasePatch,
    ) -> RepoResult<TestCase> {
        patch.validate()?;
        self.mutate(project_id, |tree| {
            let changed = tree.patch_test_case(test_case_id, patch.clone())?;
            let test_case = tree
                .test_case(test_case_id)
                .cloned()
                .ok_or_else(|| RepoError::not_found("test_case", test_case_id))?;
            Ok(commit_if(changed, test_case))
        })
    }

    // ============================================================
    // Delete
    // ============================================================

    /// Deletes a node of any level with its subtree and returns every removed
    /// ID. When `level` is given the node must be of that level.
    pub fn delete_node(
        &self,
        project_id: &str,
        node_id: &str,
        level: Option<Level>,
    ) -> RepoResult<Vec<String>> {
        let removed = self.mutate(project_id, |tree| {
            let kind = level.map_or("node", |l| l.as_str());
            match (tree.level_of(node_id), level) {
                (None, _) => return Err(RepoError::not_found(kind, node_id)),
                (Some(found), Some(wanted)) if found != wanted => {
                    return Err(RepoError::not_found(kind, node_id))
                }
                _ => {}
            }
            Ok(Write::Commit(tree.remove(node_id)?))
        })?;
        info!(project_id, node_id, removed = removed.len(), "Deleted node");
        Ok(removed)
    }

    pub fn delete_epic(&self, project_id: &str, epic_id: &str) -> RepoResult<Vec<String>> {
        self.delete_node(project_id, epic_id, Some(Level::Epic))
    }

    pub fn delete_feature(&self, project_id: &str, feature_id: &str) -> RepoResult<Vec<String>> {
        self.delete_node(project_id, feature_id, Some(Level::Feature))
    }

    pub fn delete_use_case(&self, project_id: &str, use_case_id: &str) -> RepoResult<Vec<String>> {
        self.delete_node(project_id, use_case_id, Some(Level::UseCase))
    }

    pub fn delete_test_case(
        &self,
        project_id: &str,
        test_case_id: &str,
    ) -> RepoResult<Vec<String>> {
        self.delete_node(project_id, test_case_id, Some(Level::TestCase))
    }
}

fn require_parent(tree: &ProjectTree, level: Level, id: &str) -> RepoResult<()> {
    if tree.level_of(id) == Some(level) {
        Ok(())
    } else {
        Err(RepoError::not_found(level.as_str(), id))
    }
}

fn commit_if<T>(changed: bool, value: T) -> Write<T> {
    if changed {
        Write::Commit(value)
    } else {
        Write::Skip(value)
    }
}
