//! In-memory view of one project with a flat node index.
//!
//! The document keeps the nested shape callers expect; the index maps every
//! node ID to its level and parent so lookups, collision checks and path
//! reconstruction never need a full walk.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

use crate::error::{RepoError, RepoResult};
use crate::models::{
    dedup_frameworks, Epic, EpicFields, EpicPatch, Feature, FeatureFields, FeaturePatch,
    JiraStatus, Level, Node, PathSegment, Project, TestCase, TestCaseFields, TestCasePatch,
    UpdateProjectInput, UseCase, UseCaseFields, UseCasePatch,
};

#[derive(Debug, Clone, PartialEq, Eq)]
struct NodeEntry {
    level: Level,
    parent: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProjectTree {
    project: Project,
    index: HashMap<String, NodeEntry>,
}

impl ProjectTree {
    /// Indexes a loaded document, rejecting duplicate or blank IDs.
    pub fn new(project: Project) -> RepoResult<Self> {
        let entries = project_entries(&project);
        let mut index = HashMap::with_capacity(entries.len());
        for (id, entry) in entries {
            if id.trim().is_empty() {
                return Err(RepoError::Corrupt(format!(
                    "{} with an empty id in project {}",
                    entry.level, project.project_id
                )));
            }
            if index.insert(id.clone(), entry).is_some() {
                return Err(RepoError::Corrupt(format!(
                    "duplicate id {id} in project {}",
                    project.project_id
                )));
            }
        }
        if let Some(id) = project.retired_ids.iter().find(|id| index.contains_key(*id)) {
            return Err(RepoError::Corrupt(format!(
                "retired id {id} is still in use in project {}",
                project.project_id
            )));
        }
        Ok(Self { project, index })
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn into_project(self) -> Project {
        self.project
    }

    // ============================================================
    // Lookups
    // ============================================================

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn is_retired(&self, id: &str) -> bool {
        self.project.retired_ids.contains(id)
    }

    /// Live or retired: either way the ID cannot be given to a new node.
    pub fn is_taken(&self, id: &str) -> bool {
        self.contains(id) || self.is_retired(id)
    }

    /// Live node IDs, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    pub(crate) fn taken_ids(&self) -> impl Iterator<Item = &str> {
        self.ids()
            .chain(self.project.retired_ids.iter().map(String::as_str))
    }

    pub fn level_of(&self, id: &str) -> Option<Level> {
        self.index.get(id).map(|e| e.level)
    }

    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.index.get(id).and_then(|e| e.parent.as_deref())
    }

    /// Root-first path of the node's ancestors, excluding the node itself.
    pub fn ancestry(&self, id: &str) -> Vec<PathSegment> {
        let mut path = Vec::new();
        let mut current = self.parent_of(id);
        while let Some(ancestor) = current {
            if let Some(node) = self.node(ancestor) {
                path.push(PathSegment {
                    level: node.level(),
                    id: node.id().to_string(),
                    label: node.label().to_string(),
                });
            }
            current = self.parent_of(ancestor);
        }
        path.reverse();
        path
    }

    pub fn epic(&self, id: &str) -> Option<&Epic> {
        if self.level_of(id) != Some(Level::Epic) {
            return None;
        }
        self.project.epics.iter().find(|e| e.epic_id == id)
    }

    pub fn feature(&self, id: &str) -> Option<&Feature> {
        if self.level_of(id) != Some(Level::Feature) {
            return None;
        }
        self.epic(self.parent_of(id)?)?
            .features
            .iter()
            .find(|f| f.feature_id == id)
    }

    pub fn use_case(&self, id: &str) -> Option<&UseCase> {
        if self.level_of(id) != Some(Level::UseCase) {
            return None;
        }
        self.feature(self.parent_of(id)?)?
            .use_cases
            .iter()
            .find(|uc| uc.use_case_id == id)
    }

    pub fn test_case(&self, id: &str) -> Option<&TestCase> {
        if self.level_of(id) != Some(Level::TestCase) {
            return None;
        }
        self.use_case(self.parent_of(id)?)?
            .test_cases
            .iter()
            .find(|tc| tc.test_case_id == id)
    }

    /// Shallow copy of any node.
    pub fn node(&self, id: &str) -> Option<Node> {
        match self.level_of(id)? {
            Level::Epic => self.epic(id).map(|e| Node::Epic(e.shallow())),
            Level::Feature => self.feature(id).map(|f| Node::Feature(f.shallow())),
            Level::UseCase => self.use_case(id).map(|uc| Node::UseCase(uc.shallow())),
            Level::TestCase => self.test_case(id).cloned().map(Node::TestCase),
        }
    }

    // ============================================================
    // Structural mutations
    // ============================================================

    pub fn insert_epic(&mut self, epic: Epic) -> RepoResult<()> {
        let mut entries = Vec::new();
        epic_entries(&epic, &mut entries);
        self.check_free(&entries)?;
        self.index.extend(entries);
        self.project.epics.push(epic);
        Ok(())
    }

    pub fn insert_feature(&mut self, epic_id: &str, feature: Feature) -> RepoResult<()> {
        let mut entries = Vec::new();
        feature_entries(&feature, epic_id, &mut entries);
        self.check_free(&entries)?;
        let epic = self.epic_mut(epic_id)?;
        epic.features.push(feature);
        self.index.extend(entries);
        Ok(())
    }

    pub fn insert_use_case(&mut self, feature_id: &str, use_case: UseCase) -> RepoResult<()> {
        let mut entries = Vec::new();
        use_case_entries(&use_case, feature_id, &mut entries);
        self.check_free(&entries)?;
        let feature = self.feature_mut(feature_id)?;
        feature.use_cases.push(use_case);
        self.index.extend(entries);
        Ok(())
    }

    pub fn insert_test_case(&mut self, use_case_id: &str, test_case: TestCase) -> RepoResult<()> {
        let entries = vec![(
            test_case.test_case_id.clone(),
            NodeEntry {
                level: Level::TestCase,
                parent: Some(use_case_id.to_string()),
            },
        )];
        self.check_free(&entries)?;
        let use_case = self.use_case_mut(use_case_id)?;
        use_case.test_cases.push(test_case);
        self.index.extend(entries);
        Ok(())
    }

    /// Removes a node and its subtree. Every removed ID is retired.
    /// Returns the removed IDs, the node itself first.
    pub fn remove(&mut self, id: &str) -> RepoResult<Vec<String>> {
        let level = self
            .level_of(id)
            .ok_or_else(|| RepoError::not_found("node", id))?;
        let parent = self.parent_of(id).map(str::to_string);

        let mut removed = Vec::new();
        match (level, parent.as_deref()) {
            (Level::Epic, _) => {
                let pos = self
                    .project
                    .epics
                    .iter()
                    .position(|e| e.epic_id == id)
                    .ok_or_else(|| RepoError::not_found("epic", id))?;
                let epic = self.project.epics.remove(pos);
                epic_entries(&epic, &mut removed);
            }
            (Level::Feature, Some(epic_id)) => {
                let features = &mut self.epic_mut(epic_id)?.features;
                let pos = features
                    .iter()
                    .position(|f| f.feature_id == id)
                    .ok_or_else(|| RepoError::not_found("feature", id))?;
                let feature = features.remove(pos);
                feature_entries(&feature, epic_id, &mut removed);
            }
            (Level::UseCase, Some(feature_id)) => {
                let use_cases = &mut self.feature_mut(feature_id)?.use_cases;
                let pos = use_cases
                    .iter()
                    .position(|uc| uc.use_case_id == id)
                    .ok_or_else(|| RepoError::not_found("use_case", id))?;
                let use_case = use_cases.remove(pos);
                use_case_entries(&use_case, feature_id, &mut removed);
            }
            (Level::TestCase, Some(use_case_id)) => {
                let test_cases = &mut self.use_case_mut(use_case_id)?.test_cases;
                let pos = test_cases
                    .iter()
                    .position(|tc| tc.test_case_id == id)
                    .ok_or_else(|| RepoError::not_found("test_case", id))?;
                test_cases.remove(pos);
                removed.push((id.to_string(), self.index[id].clone()));
            }
            (level, None) => {
                return Err(RepoError::Corrupt(format!("{level} {id} has no parent")));
            }
        }

        let ids: Vec<String> = removed.into_iter().map(|(id, _)| id).collect();
        for removed_id in &ids {
            self.index.remove(removed_id);
            self.project.retired_ids.insert(removed_id.clone());
        }
        Ok(ids)
    }

    // ============================================================
    // Field mutations
    // ============================================================

    pub fn patch_epic(&mut self, id: &str, patch: EpicPatch) -> RepoResult<bool> {
        patch.validate()?;
        Ok(self.epic_mut(id)?.apply_patch(patch))
    }

    pub fn patch_feature(&mut self, id: &str, patch: FeaturePatch) -> RepoResult<bool> {
        patch.validate()?;
        Ok(self.feature_mut(id)?.apply_patch(patch))
    }

    pub fn patch_use_case(&mut self, id: &str, patch: UseCasePatch) -> RepoResult<bool> {
        patch.validate()?;
        Ok(self.use_case_mut(id)?.apply_patch(patch))
    }

    pub fn patch_test_case(&mut self, id: &str, patch: TestCasePatch) -> RepoResult<bool> {
        patch.validate()?;
        Ok(self.test_case_mut(id)?.apply_patch(patch))
    }

    pub fn overwrite_epic_content(&mut self, id: &str, fields: EpicFields) -> RepoResult<bool> {
        fields.validate()?;
        Ok(self.epic_mut(id)?.apply_content(fields))
    }

    pub fn overwrite_feature_content(
        &mut self,
        id: &str,
        fields: FeatureFields,
    ) -> RepoResult<bool> {
        fields.validate()?;
        Ok(self.feature_mut(id)?.apply_content(fields))
    }

    pub fn overwrite_use_case_content(
        &mut self,
        id: &str,
        fields: UseCaseFields,
    ) -> RepoResult<bool> {
        fields.validate()?;
        Ok(self.use_case_mut(id)?.apply_content(fields))
    }

    pub fn overwrite_test_case_content(
        &mut self,
        id: &str,
        fields: TestCaseFields,
    ) -> RepoResult<bool> {
        fields.validate()?;
        Ok(self.test_case_mut(id)?.apply_content(fields))
    }

    pub fn set_jira_status(
        &mut self,
        epic_id: &str,
        status: JiraStatus,
        jira_key: Option<&str>,
        now: DateTime<Utc>,
    ) -> RepoResult<bool> {
        Ok(self.epic_mut(epic_id)?.record_sync(status, jira_key, now))
    }

    pub fn patch_project(&mut self, input: UpdateProjectInput) -> RepoResult<bool> {
        if let Some(name) = &input.name {
            crate::models::require_text("project_name", name)?;
        }
        let before = (
            self.project.project_name.clone(),
            self.project.description.clone(),
            self.project.status,
            self.project.compliance_frameworks.clone(),
            self.project.jira_project_key.clone(),
            self.project.coverage_summary.clone(),
        );
        let p = &mut self.project;
        if let Some(name) = input.name {
            p.project_name = name.trim().to_string();
        }
        if let Some(description) = input.description {
            p.description = Some(description);
        }
        if let Some(status) = input.status {
            p.status = status;
        }
        if let Some(frameworks) = input.compliance_frameworks {
            p.compliance_frameworks = dedup_frameworks(frameworks);
        }
        if let Some(key) = input.jira_project_key {
            p.jira_project_key = Some(key);
        }
        if let Some(summary) = input.coverage_summary {
            p.coverage_summary = Some(summary);
        }
        Ok(before
            != (
                p.project_name.clone(),
                p.description.clone(),
                p.status,
                p.compliance_frameworks.clone(),
                p.jira_project_key.clone(),
                p.coverage_summary.clone(),
            ))
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.project.updated_at = now;
    }

    /// Rebuilds the index from the document and compares it with the live one.
    pub fn check_integrity(&self) -> RepoResult<()> {
        let rebuilt = ProjectTree::new(self.project.clone())?;
        if rebuilt.index != self.index {
            return Err(RepoError::Corrupt(format!(
                "index out of sync with document for project {}",
                self.project.project_id
            )));
        }
        Ok(())
    }

    // ============================================================
    // Helpers
    // ============================================================

    fn check_free(&self, entries: &[(String, NodeEntry)]) -> RepoResult<()> {
        let mut seen = HashSet::new();
        for (id, entry) in entries {
            if id.trim().is_empty() {
                return Err(RepoError::Validation(format!("{} id must not be empty", entry.level)));
            }
            if self.contains(id) {
                return Err(RepoError::Conflict(format!("id {id} is already in use")));
            }
            if self.is_retired(id) {
                return Err(RepoError::Conflict(format!(
                    "id {id} belonged to a deleted node and cannot be reused"
                )));
            }
            if !seen.insert(id.as_str()) {
                return Err(RepoError::Conflict(format!("id {id} appears twice in the subtree")));
            }
        }
        Ok(())
    }

    fn epic_mut(&mut self, id: &str) -> RepoResult<&mut Epic> {
        if self.level_of(id) != Some(Level::Epic) {
            return Err(RepoError::not_found("epic", id));
        }
        self.project
            .epics
            .iter_mut()
            .find(|e| e.epic_id == id)
            .ok_or_else(|| RepoError::not_found("epic", id))
    }

    fn feature_mut(&mut self, id: &str) -> RepoResult<&mut Feature> {
        let epic_id = self.parent_at(id, Level::Feature)?;
        self.epic_mut(&epic_id)?
            .features
            .iter_mut()
            .find(|f| f.feature_id == id)
            .ok_or_else(|| RepoError::not_found("feature", id))
    }

    fn use_case_mut(&mut self, id: &str) -> RepoResult<&mut UseCase> {
        let feature_id = self.parent_at(id, Level::UseCase)?;
        self.feature_mut(&feature_id)?
            .use_cases
            .iter_mut()
            .find(|uc| uc.use_case_id == id)
            .ok_or_else(|| RepoError::not_found("use_case", id))
    }

    fn test_case_mut(&mut self, id: &str) -> RepoResult<&mut TestCase> {
        let use_case_id = self.parent_at(id, Level::TestCase)?;
        self.use_case_mut(&use_case_id)?
            .test_cases
            .iter_mut()
            .find(|tc| tc.test_case_id == id)
            .ok_or_else(|| RepoError::not_found("test_case", id))
    }

    /// Parent of a node that must exist at `level`.
    fn parent_at(&self, id: &str, level: Level) -> RepoResult<String> {
        match self.index.get(id) {
            Some(NodeEntry {
                level: found,
                parent: Some(parent),
            }) if *found == level => Ok(parent.clone()),
            _ => Err(RepoError::not_found(level.as_str(), id)),
        }
    }
}

fn project_entries(project: &Project) -> Vec<(String, NodeEntry)> {
    let mut out = Vec::new();
    for epic in &project.epics {
        epic_entries(epic, &mut out);
    }
    out
}

fn epic_entries(epic: &Epic, out: &mut Vec<(String, NodeEntry)>) {
    out.push((
        epic.epic_id.clone(),
        NodeEntry {
            level: Level::Epic,
            parent: None,
        },
    ));
    for feature in &epic.features {
        feature_entries(feature, &epic.epic_id, out);
    }
}

fn feature_entries(feature: &Feature, epic_id: &str, out: &mut Vec<(String, NodeEntry)>) {
    out.push((
        feature.feature_id.clone(),
        NodeEntry {
            level: Level::Feature,
            parent: Some(epic_id.to_string()),
        },
    ));
    for use_case in &feature.use_cases {
        use_case_entries(use_case, &feature.feature_id, out);
    }
}

fn use_case_entries(use_case: &UseCase, feature_id: &str, out: &mut Vec<(String, NodeEntry)>) {
    out.push((
        use_case.use_case_id.clone(),
        NodeEntry {
            level: Level::UseCase,
            parent: Some(feature_id.to_string()),
        },
    ));
    for test_case in &use_case.test_cases {
        out.push((
            test_case.test_case_id.clone(),
            NodeEntry {
                level: Level::TestCase,
                parent: Some(use_case.use_case_id.clone()),
            },
        ));
    }
}
