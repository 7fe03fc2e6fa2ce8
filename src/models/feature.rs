use serde::{Deserialize, Serialize};

use super::{require_text, UseCase};
use crate::error::RepoResult;

/// A capability within an epic, grouping the use cases that exercise it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    pub feature_id: String,
    #[serde(alias = "name")]
    pub feature_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub use_cases: Vec<UseCase>,
}

impl Feature {
    pub fn new(feature_id: String, fields: FeatureFields) -> Self {
        Self {
            feature_id,
            feature_name: fields.name,
            description: fields.description,
            use_cases: Vec::new(),
        }
    }

    pub fn apply_content(&mut self, fields: FeatureFields) -> bool {
        let changed = self.feature_name != fields.name || self.description != fields.description;
        self.feature_name = fields.name;
        self.description = fields.description;
        changed
    }

    pub fn apply_patch(&mut self, patch: FeaturePatch) -> bool {
        let mut changed = false;
        if let Some(name) = patch.name {
            changed |= self.feature_name != name;
            self.feature_name = name;
        }
        if let Some(description) = patch.description {
            changed |= self.description.as_deref() != Some(description.as_str());
            self.description = Some(description);
        }
        changed
    }

    pub fn shallow(&self) -> Self {
        Self {
            use_cases: Vec::new(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureFields {
    #[serde(alias = "feature_name")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl FeatureFields {
    pub fn validate(&self) -> RepoResult<()> {
        require_text("feature_name", &self.name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeaturePatch {
    #[serde(default, alias = "feature_name")]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl FeaturePatch {
    pub fn validate(&self) -> RepoResult<()> {
        match &self.name {
            Some(name) => require_text("feature_name", name),
            None => Ok(()),
        }
    }
}
