use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{require_text, Feature, JiraStatus};
use crate::error::RepoResult;

/// A large body of work, and the unit that is pushed to Jira.
///
/// `jira_status`, `jira_key` and `jira_pushed_at` belong to the sync tracker;
/// imports never touch them on an existing epic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Epic {
    pub epic_id: String,
    #[serde(alias = "name")]
    pub epic_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub jira_status: JiraStatus,
    #[serde(default, alias = "jira_epic_key")]
    pub jira_key: Option<String>,
    #[serde(default)]
    pub jira_pushed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl Epic {
    pub fn new(epic_id: String, fields: EpicFields) -> Self {
        Self {
            epic_id,
            epic_name: fields.name,
            description: fields.description,
            jira_status: JiraStatus::NotPushed,
            jira_key: None,
            jira_pushed_at: None,
            features: Vec::new(),
        }
    }

    /// Replaces generated content, keeping sync state and children.
    pub fn apply_content(&mut self, fields: EpicFields) -> bool {
        let changed = self.epic_name != fields.name || self.description != fields.description;
        self.epic_name = fields.name;
        self.description = fields.description;
        changed
    }

    pub fn apply_patch(&mut self, patch: EpicPatch) -> bool {
        let mut changed = false;
        if let Some(name) = patch.name {
            changed |= self.epic_name != name;
            self.epic_name = name;
        }
        if let Some(description) = patch.description {
            changed |= self.description.as_deref() != Some(description.as_str());
            self.description = Some(description);
        }
        changed
    }

    /// Records a sync outcome. Returns `false` when the epic already carries
    /// this status and key, in which case nothing is modified.
    pub fn record_sync(
        &mut self,
        status: JiraStatus,
        jira_key: Option<&str>,
        now: DateTime<Utc>,
    ) -> bool {
        let jira_key = jira_key.map(str::trim).filter(|k| !k.is_empty());
        let key_unchanged = jira_key.map_or(true, |k| self.jira_key.as_deref() == Some(k));
        if self.jira_status == status && key_unchanged {
            return false;
        }
        self.jira_status = status;
        if let Some(key) = jira_key {
            self.jira_key = Some(key.to_string());
        }
        if status == JiraStatus::Pushed {
            self.jira_pushed_at = Some(now);
        }
        true
    }

    /// Copy without children.
    pub fn shallow(&self) -> Self {
        Self {
            features: Vec::new(),
            ..self.clone()
        }
    }
}

/// Content fields for a new epic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EpicFields {
    #[serde(alias = "epic_name")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl EpicFields {
    pub fn validate(&self) -> RepoResult<()> {
        require_text("epic_name", &self.name)
    }
}

/// Partial update of an epic. Jira state is changed through the sync tracker only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EpicPatch {
    #[serde(default, alias = "epic_name")]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl EpicPatch {
    pub fn validate(&self) -> RepoResult<()> {
        match &self.name {
            Some(name) => require_text("epic_name", name),
            None => Ok(()),
        }
    }
}
