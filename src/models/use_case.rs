use serde::{Deserialize, Serialize};

use super::{require_text, ReviewStatus, RiskLevel, TestCase};
use crate::error::RepoResult;

/// A concrete scenario of a feature, exercised by its test cases.
///
/// `review_status` and `comments` are owned by human reviewers; everything
/// else is generated content that a later import may overwrite.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UseCase {
    pub use_case_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub test_scenarios_outline: Vec<String>,
    #[serde(default)]
    pub compliance_mapping: Vec<String>,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    /// The generating model's rationale for this use case.
    #[serde(default)]
    pub model_explanation: Option<String>,
    #[serde(default)]
    pub review_status: ReviewStatus,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

impl UseCase {
    pub fn new(use_case_id: String, fields: UseCaseFields) -> Self {
        Self {
            use_case_id,
            title: fields.title,
            description: fields.description,
            test_scenarios_outline: fields.test_scenarios_outline,
            compliance_mapping: fields.compliance_mapping,
            risk_level: fields.risk_level,
            model_explanation: fields.model_explanation,
            review_status: fields.review_status.unwrap_or_default(),
            comments: fields.comments,
            test_cases: Vec::new(),
        }
    }

    /// Replaces generated content. Review state and children are kept.
    pub fn apply_content(&mut self, fields: UseCaseFields) -> bool {
        let before = self.shallow();
        self.title = fields.title;
        self.description = fields.description;
        self.test_scenarios_outline = fields.test_scenarios_outline;
        self.compliance_mapping = fields.compliance_mapping;
        self.risk_level = fields.risk_level;
        self.model_explanation = fields.model_explanation;
        before != self.shallow()
    }

    pub fn apply_patch(&mut self, patch: UseCasePatch) -> bool {
        let before = self.shallow();
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(outline) = patch.test_scenarios_outline {
            self.test_scenarios_outline = outline;
        }
        if let Some(mapping) = patch.compliance_mapping {
            self.compliance_mapping = mapping;
        }
        if let Some(risk) = patch.risk_level {
            self.risk_level = Some(risk);
        }
        if let Some(explanation) = patch.model_explanation {
            self.model_explanation = Some(explanation);
        }
        if let Some(status) = patch.review_status {
            self.review_status = status;
        }
        if let Some(comments) = patch.comments {
            self.comments = Some(comments);
        }
        before != self.shallow()
    }

    pub fn shallow(&self) -> Self {
        Self {
            test_cases: Vec::new(),
            ..self.clone()
        }
    }
}

/// Fields for a new use case. `review_status` and `comments` only apply on
/// creation; merging into an existing use case ignores them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UseCaseFields {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub test_scenarios_outline: Vec<String>,
    #[serde(default)]
    pub compliance_mapping: Vec<String>,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub model_explanation: Option<String>,
    #[serde(default)]
    pub review_status: Option<ReviewStatus>,
    #[serde(default)]
    pub comments: Option<String>,
}

impl UseCaseFields {
    pub fn validate(&self) -> RepoResult<()> {
        require_text("title", &self.title)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UseCasePatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub test_scenarios_outline: Option<Vec<String>>,
    #[serde(default)]
    pub compliance_mapping: Option<Vec<String>>,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub model_explanation: Option<String>,
    #[serde(default)]
    pub review_status: Option<ReviewStatus>,
    #[serde(default)]
    pub comments: Option<String>,
}

impl UseCasePatch {
    pub fn validate(&self) -> RepoResult<()> {
        match &self.title {
            Some(title) => require_text("title", title),
            None => Ok(()),
        }
    }
}
