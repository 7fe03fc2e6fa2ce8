use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{DocumentStore, StoreError, StoreResult, Version};
use crate::models::Project;

/// Store kept entirely in memory. Used by tests and for embedding.
#[derive(Clone, Default)]
pub struct MemoryStore {
    documents: Arc<Mutex<HashMap<String, (Project, Version)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn load(&self, project_id: &str) -> StoreResult<(Project, Version)> {
        let documents = self.documents.lock().expect("store lock poisoned");
        documents
            .get(project_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(project_id.to_string()))
    }

    fn commit_if_unchanged(
        &self,
        project_id: &str,
        expected: Version,
        project: &Project,
    ) -> StoreResult<Version> {
        let mut documents = self.documents.lock().expect("store lock poisoned");
        let current = documents.get(project_id).map(|(_, v)| *v);
        match (current, expected) {
            (None, Version::NEW) => {}
            (None, _) => return Err(StoreError::NotFound(project_id.to_string())),
            (Some(v), e) if v == e => {}
            (Some(_), _) => {
                return Err(StoreError::Conflict {
                    project_id: project_id.to_string(),
                    expected,
                })
            }
        }
        let next = expected.next();
        documents.insert(project_id.to_string(), (project.clone(), next));
        Ok(next)
    }

    fn delete(&self, project_id: &str) -> StoreResult<bool> {
        let mut documents = self.documents.lock().expect("store lock poisoned");
        Ok(documents.remove(project_id).is_some())
    }

    fn list(&self) -> StoreResult<Vec<(Project, Version)>> {
        let documents = self.documents.lock().expect("store lock poisoned");
        let mut all: Vec<_> = documents.values().cloned().collect();
        all.sort_by(|(a, _), (b, _)| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.project_id.cmp(&b.project_id))
        });
        Ok(all)
    }
}
