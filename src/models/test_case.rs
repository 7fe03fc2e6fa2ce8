use serde::{Deserialize, Serialize};

use super::{require_text, ReviewStatus, RiskLevel};
use crate::error::{RepoError, RepoResult};

pub const DEFAULT_TEST_TYPE: &str = "Functional";

fn default_test_type() -> String {
    DEFAULT_TEST_TYPE.to_string()
}

/// An executable test: steps, preconditions and the expected result.
///
/// `test_type` is free text. Agents emit values such as "Functional",
/// "Security" or "Negative" and all of them are kept verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestCase {
    pub test_case_id: String,
    #[serde(alias = "test_case_title")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub preconditions: Vec<String>,
    #[serde(default)]
    pub test_steps: Vec<String>,
    #[serde(default)]
    pub expected_result: String,
    #[serde(default = "default_test_type")]
    pub test_type: String,
    #[serde(default)]
    pub compliance_mapping: Vec<String>,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub review_status: ReviewStatus,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub model_explanation: Option<String>,
}

impl TestCase {
    pub fn new(test_case_id: String, fields: TestCaseFields) -> Self {
        Self {
            test_case_id,
            title: fields.title,
            description: fields.description,
            preconditions: fields.preconditions,
            test_steps: fields.test_steps,
            expected_result: fields.expected_result,
            test_type: fields.test_type.unwrap_or_else(default_test_type),
            compliance_mapping: fields.compliance_mapping,
            risk_level: fields.risk_level,
            review_status: fields.review_status.unwrap_or_default(),
            comments: fields.comments,
            model_explanation: fields.model_explanation,
        }
    }

    /// Replaces generated content, keeping `review_status` and `comments`.
    pub fn apply_content(&mut self, fields: TestCaseFields) -> bool {
        let before = self.clone();
        self.title = fields.title;
        self.description = fields.description;
        self.preconditions = fields.preconditions;
        self.test_steps = fields.test_steps;
        self.expected_result = fields.expected_result;
        self.test_type = fields.test_type.unwrap_or_else(default_test_type);
        self.compliance_mapping = fields.compliance_mapping;
        self.risk_level = fields.risk_level;
        self.model_explanation = fields.model_explanation;
        before != *self
    }

    pub fn apply_patch(&mut self, patch: TestCasePatch) -> bool {
        let before = self.clone();
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(preconditions) = patch.preconditions {
            self.preconditions = preconditions;
        }
        if let Some(steps) = patch.test_steps {
            self.test_steps = steps;
        }
        if let Some(expected) = patch.expected_result {
            self.expected_result = expected;
        }
        if let Some(test_type) = patch.test_type {
            self.test_type = test_type;
        }
        if let Some(mapping) = patch.compliance_mapping {
            self.compliance_mapping = mapping;
        }
        if let Some(risk) = patch.risk_level {
            self.risk_level = Some(risk);
        }
        if let Some(status) = patch.review_status {
            self.review_status = status;
        }
        if let Some(comments) = patch.comments {
            self.comments = Some(comments);
        }
        if let Some(explanation) = patch.model_explanation {
            self.model_explanation = Some(explanation);
        }
        before != *self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestCaseFields {
    #[serde(alias = "test_case_title")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub preconditions: Vec<String>,
    pub test_steps: Vec<String>,
    pub expected_result: String,
    #[serde(default)]
    pub test_type: Option<String>,
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

impl TestCaseFields {
    pub fn validate(&self) -> RepoResult<()> {
        require_text("title", &self.title)?;
        require_text("expected_result", &self.expected_result)?;
        if self.test_steps.iter().all(|s| s.trim().is_empty()) {
            return Err(RepoError::Validation(
                "test_steps must contain at least one step".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestCasePatch {
    #[serde(default, alias = "test_case_title")]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub preconditions: Option<Vec<String>>,
    #[serde(default)]
    pub test_steps: Option<Vec<String>>,
    #[serde(default)]
    pub expected_result: Option<String>,
    #[serde(default)]
    pub test_type: Option<String>,
    #[serde(default)]
    pub compliance_mapping: Option<Vec<String>>,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub review_status: Option<ReviewStatus>,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub model_explanation: Option<String>,
}

impl TestCasePatch {
    pub fn validate(&self) -> RepoResult<()> {
        if let Some(title) = &self.title {
            require_text("title", title)?;
        }
        if let Some(expected) = &self.expected_result {
            require_text("expected_result", expected)?;
        }
        if let Some(test_type) = &self.test_type {
            require_text("test_type", test_type)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> TestCaseFields {
        TestCaseFields {
            title: "Verify login".into(),
            test_steps: vec!["Open page".into(), "Submit credentials".into()],
            expected_result: "Dashboard shown".into(),
            ..Default::default()
        }
    }

    #[test]
    fn new_defaults_test_type_and_review_status() {
        let tc = TestCase::new("TC001".into(), fields());
        assert_eq!(tc.test_type, "Functional");
        assert_eq!(tc.review_status, ReviewStatus::Pending);
    }

    #[test]
    fn keeps_free_form_test_type() {
        let tc = TestCase::new(
            "TC002".into(),
            TestCaseFields {
                test_type: Some("Negative".into()),
                ..fields()
            },
        );
        assert_eq!(tc.test_type, "Negative");
    }

    #[test]
    fn validate_requires_steps_and_expected_result() {
        assert!(fields().validate().is_ok());
        let no_steps = TestCaseFields {
            test_steps: vec![],
            ..fields()
        };
        assert!(matches!(no_steps.validate(), Err(RepoError::Validation(_))));
        let no_result = TestCaseFields {
            expected_result: "  ".into(),
            ..fields()
        };
        assert!(matches!(no_result.validate(), Err(RepoError::Validation(_))));
    }

    #[test]
    fn patch_only_touches_given_fields() {
        let mut tc = TestCase::new("TC001".into(), fields());
        let changed = tc.apply_patch(TestCasePatch {
            review_status: Some(ReviewStatus::Approved),
            ..Default::default()
        });
        assert!(changed);
        assert_eq!(tc.review_status, ReviewStatus::Approved);
        assert_eq!(tc.title, "Verify login");
        assert!(!tc.apply_patch(TestCasePatch::default()));
    }
}
