//! The operations callers run against stored projects.
//!
//! Every write is one load-mutate-commit cycle against a single project
//! document. When the commit loses a race (the stored version moved on) or
//! the store is momentarily unavailable, the whole cycle is rerun on a fresh
//! copy with exponential backoff, up to [`RetryPolicy::max_attempts`].
//! Reads work on a snapshot and never block writers.

mod nodes;
mod queries;
mod retry;
mod sync;

pub use retry::RetryPolicy;

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{RepoError, RepoResult};
use crate::merge;
use crate::models::{
    dedup_frameworks, CreateProjectInput, MergeReport, Project, ProjectFilter, ProjectStatus,
    ProjectSummary, UpdateProjectInput,
};
use crate::store::{DocumentStore, MemoryStore, StoreError, Version};
use crate::tree::ProjectTree;

/// Result of one mutation closure.
pub(crate) enum Write<T> {
    /// The tree changed and must be committed.
    Commit(T),
    /// Nothing changed; skip the write.
    Skip(T),
}

enum Attempt {
    Retry(StoreError),
    Fail(RepoError),
}

impl Attempt {
    fn from_store(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { .. } | StoreError::Unavailable(_) => Attempt::Retry(err),
            other => Attempt::Fail(other.into()),
        }
    }
}

#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn DocumentStore>,
    retry: RetryPolicy,
}

impl Repository {
    pub fn new(store: impl DocumentStore + 'static) -> Self {
        Self::with_retry(store, RetryPolicy::default())
    }

    pub fn with_retry(store: impl DocumentStore + 'static, retry: RetryPolicy) -> Self {
        Self {
            store: Arc::new(store),
            retry,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Runs `op` on the blocking thread pool.
    ///
    /// Store access and retry backoff block the calling thread, so async
    /// callers go through here rather than calling operations directly.
    pub async fn blocking<T, F>(&self, op: F) -> RepoResult<T>
    where
        F: FnOnce(&Repository) -> RepoResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let repo = self.clone();
        tokio::task::spawn_blocking(move || op(&repo))
            .await
            .map_err(|e| RepoError::Storage(format!("repository task failed: {e}")))?
    }

    // ============================================================
    // Project operations
    // ============================================================

    pub fn create_project(&self, input: CreateProjectInput) -> RepoResult<Project> {
        crate::models::require_text("project_name", &input.name)?;
        let now = Utc::now();
        let project = Project {
            project_id: format!("PROJ_{}", Uuid::new_v4().simple()),
            project_name: input.name.trim().to_string(),
            description: input.description,
            status: ProjectStatus::Active,
            compliance_frameworks: dedup_frameworks(input.compliance_frameworks),
            jira_project_key: input.jira_project_key,
            coverage_summary: None,
            created_by: input.created_by,
            created_at: now,
            updated_at: now,
            epics: Vec::new(),
            retired_ids: Default::default(),
        };
        self.store
            .commit_if_unchanged(&project.project_id, Version::NEW, &project)?;
        info!(project_id = %project.project_id, name = %project.project_name, "Created project");
        Ok(project)
    }

    pub fn get_project(&self, project_id: &str) -> RepoResult<Project> {
        Ok(self.load_tree(project_id)?.into_project())
    }

    /// Project summaries, newest first.
    pub fn list_projects(&self, filter: &ProjectFilter) -> RepoResult<Vec<ProjectSummary>> {
        let limit = filter.limit.unwrap_or(ProjectFilter::DEFAULT_LIMIT);
        let mut projects: Vec<Project> = self
            .store
            .list()?
            .into_iter()
            .map(|(project, _)| project)
            .filter(|project| filter.matches(project))
            .collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects
            .iter()
            .take(limit)
            .map(ProjectSummary::from)
            .collect())
    }

    pub fn update_project(
        &self,
        project_id: &str,
        input: UpdateProjectInput,
    ) -> RepoResult<Project> {
        let ((), project) = self.run(project_id, |tree| {
            if tree.patch_project(input.clone())? {
                Ok(Write::Commit(()))
            } else {
                Ok(Write::Skip(()))
            }
        })?;
        Ok(project)
    }

    pub fn delete_project(&self, project_id: &str) -> RepoResult<()> {
        if !self.store.delete(project_id)? {
            return Err(RepoError::not_found("project", project_id));
        }
        info!(project_id, "Deleted project");
        Ok(())
    }

    // ============================================================
    // Import
    // ============================================================

    /// Merges an agent-generated (sub)tree into the project.
    ///
    /// Bad branches are reported as skipped and never fail the call; only a
    /// payload without any recognised key is rejected outright. The merge is
    /// committed once, or not at all if it changed nothing.
    pub fn import_structure(&self, project_id: &str, payload: &Value) -> RepoResult<MergeReport> {
        merge::check_payload(payload)?;
        let mut report = self.mutate(project_id, |tree| {
            let report = merge::merge_into(tree, payload);
            if report.has_changes() {
                Ok(Write::Commit(report))
            } else {
                Ok(Write::Skip(report))
            }
        })?;
        report.committed = report.has_changes();
        info!(
            project_id,
            created = report.created,
            updated = report.updated,
            unchanged = report.unchanged,
            skipped = report.skipped,
            "Imported test structure"
        );
        Ok(report)
    }

    // ============================================================
    // Load-mutate-commit
    // ============================================================

    pub(crate) fn load_tree(&self, project_id: &str) -> RepoResult<ProjectTree> {
        let (project, version) = self.store.load(project_id)?;
        debug!(project_id, %version, "Loaded project");
        ProjectTree::new(project)
    }

    pub(crate) fn mutate<T, F>(&self, project_id: &str, op: F) -> RepoResult<T>
    where
        F: FnMut(&mut ProjectTree) -> RepoResult<Write<T>>,
    {
        self.run(project_id, op).map(|(value, _)| value)
    }

    /// Runs `op` until its result is committed (or nothing needs committing)
    /// and returns it with the resulting document.
    fn run<T, F>(&self, project_id: &str, mut op: F) -> RepoResult<(T, Project)>
    where
        F: FnMut(&mut ProjectTree) -> RepoResult<Write<T>>,
    {
        let mut attempt = 1;
        loop {
            match self.attempt(project_id, &mut op) {
                Ok(done) => return Ok(done),
                Err(Attempt::Fail(err)) => return Err(err),
                Err(Attempt::Retry(err)) if attempt >= self.retry.max_attempts => {
                    warn!(project_id, attempt, error = %err, "Giving up after repeated failures");
                    return Err(match err {
                        StoreError::Unavailable(msg) => RepoError::StoreUnavailable(msg),
                        _ => RepoError::Contention(format!(
                            "project {project_id} kept changing concurrently; retries exhausted after {attempt} attempts"
                        )),
                    });
                }
                Err(Attempt::Retry(err)) => {
                    let delay = self.retry.backoff(attempt);
                    warn!(project_id, attempt, ?delay, error = %err, "Retrying write");
                    std::thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }

    fn attempt<T, F>(&self, project_id: &str, op: &mut F) -> Result<(T, Project), Attempt>
    where
        F: FnMut(&mut ProjectTree) -> RepoResult<Write<T>>,
    {
        let (project, version) = self.store.load(project_id).map_err(Attempt::from_store)?;
        let mut tree = ProjectTree::new(project).map_err(Attempt::Fail)?;

        match op(&mut tree).map_err(Attempt::Fail)? {
            Write::Skip(value) => Ok((value, tree.into_project())),
            Write::Commit(value) => {
                tree.touch(Utc::now());
                let project = tree.into_project();
                let committed = self
                    .store
                    .commit_if_unchanged(project_id, version, &project)
                    .map_err(Attempt::from_store)?;
                debug!(project_id, %committed, "Committed project");
                Ok((value, project))
            }
        }
    }
}
