//! Request and response types for MCP tools.

use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ============================================================
// Request Types
// ============================================================

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct CreateProjectRequest {
    #[schemars(description = "Project name")]
    pub name: String,
    #[schemars(description = "What the system under test does")]
    #[serde(default)]
    pub description: Option<String>,
    #[schemars(description = "Compliance frameworks the tests must cover, e.g. ['HIPAA', 'GDPR']")]
    #[serde(default)]
    pub compliance_frameworks: Vec<String>,
    #[schemars(description = "Jira project key that epics are pushed to")]
    #[serde(default)]
    pub jira_project_key: Option<String>,
    #[schemars(description = "Who created the project")]
    #[serde(default)]
    pub created_by: Option<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ProjectIdRequest {
    #[schemars(description = "Project ID (PROJ_...)")]
    pub project_id: String,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListProjectsRequest {
    #[schemars(description = "Filter by status: 'Active', 'Completed', 'On Hold' or 'Archived'")]
    #[serde(default)]
    pub status: Option<String>,
    #[schemars(description = "Only projects that list this compliance framework")]
    #[serde(default)]
    pub compliance_framework: Option<String>,
    #[schemars(description = "Case-insensitive text matched against name and description")]
    #[serde(default)]
    pub text_search: Option<String>,
    #[schemars(description = "Maximum number of projects to return (default 100)")]
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct UpdateProjectRequest {
    #[schemars(description = "Project ID (PROJ_...)")]
    pub project_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[schemars(description = "'Active', 'Completed', 'On Hold' or 'Archived'")]
    #[serde(default)]
    pub status: Option<String>,
    #[schemars(description = "Replaces the project's compliance frameworks")]
    #[serde(default)]
    pub compliance_frameworks: Option<Vec<String>>,
    #[serde(default)]
    pub jira_project_key: Option<String>,
    #[serde(default)]
    pub coverage_summary: Option<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ImportTestStructureRequest {
    #[schemars(description = "Project ID (PROJ_...)")]
    pub project_id: String,
    #[schemars(
        description = "JSON object with 'epics' (nested epic → feature → use case → test case trees) and/or flat 'features' (with epic_id), 'use_cases' (with feature_id), 'test_cases' (with use_case_id), plus an optional 'coverage_summary'. Nodes that carry an existing ID under the same parent are updated; nodes without an ID are created."
    )]
    pub tree_json: String,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct AddEpicRequest {
    pub project_id: String,
    #[schemars(description = "Explicit epic ID. Omit to have one assigned (E001, E002, ...)")]
    #[serde(default)]
    pub epic_id: Option<String>,
    pub epic_name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct AddFeatureRequest {
    pub project_id: String,
    #[schemars(description = "ID of the epic the feature belongs to")]
    pub epic_id: String,
    #[schemars(description = "Explicit feature ID. Omit to have one assigned (F001, ...)")]
    #[serde(default)]
    pub feature_id: Option<String>,
    pub feature_name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct AddUseCaseRequest {
    pub project_id: String,
    #[schemars(description = "ID of the feature the use case belongs to")]
    pub feature_id: String,
    #[schemars(description = "Explicit use case ID. Omit to have one assigned (UC001, ...)")]
    #[serde(default)]
    pub use_case_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub test_scenarios_outline: Vec<String>,
    #[serde(default)]
    pub compliance_mapping: Vec<String>,
    #[schemars(description = "'High', 'Medium' or 'Low'")]
    #[serde(default)]
    pub risk_level: Option<String>,
    #[schemars(description = "Why the model produced this use case")]
    #[serde(default)]
    pub model_explanation: Option<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct AddTestCaseRequest {
    pub project_id: String,
    #[schemars(description = "ID of the use case the test case belongs to")]
    pub use_case_id: String,
    #[schemars(description = "Explicit test case ID. Omit to have one assigned (TC001, ...)")]
    #[serde(default)]
    pub test_case_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub preconditions: Vec<String>,
    pub test_steps: Vec<String>,
    pub expected_result: String,
    #[schemars(description = "Free text such as 'Functional', 'Security' or 'Negative'. Defaults to 'Functional'")]
    #[serde(default)]
    pub test_type: Option<String>,
    #[serde(default)]
    pub compliance_mapping: Vec<String>,
    #[schemars(description = "'High', 'Medium' or 'Low'")]
    #[serde(default)]
    pub risk_level: Option<String>,
    #[serde(default)]
    pub model_explanation: Option<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct UpdateEpicRequest {
    pub project_id: String,
    pub epic_id: String,
    #[serde(default)]
    pub epic_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct UpdateFeatureRequest {
    pub project_id: String,
    pub feature_id: String,
    #[serde(default)]
    pub feature_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct UpdateUseCaseRequest {
    pub project_id: String,
    pub use_case_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub test_scenarios_outline: Option<Vec<String>>,
    #[serde(default)]
    pub compliance_mapping: Option<Vec<String>>,
    #[serde(default)]
    pub risk_level: Option<String>,
    #[serde(default)]
    pub model_explanation: Option<String>,
    #[schemars(description = "'Pending', 'Approved', 'Needs Clarification' or 'Rejected'")]
    #[serde(default)]
    pub review_status: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct UpdateTestCaseRequest {
    pub project_id: String,
    pub test_case_id: String,
    #[serde(default)]
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
    pub risk_level: Option<String>,
    #[schemars(description = "'Pending', 'Approved', 'Needs Clarification' or 'Rejected'")]
    #[serde(default)]
    pub review_status: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub model_explanation: Option<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct DeleteNodeRequest {
    pub project_id: String,
    #[schemars(description = "ID of the epic, feature, use case or test case to delete")]
    pub node_id: String,
    #[schemars(
        description = "Optional guard: 'epic', 'feature', 'use_case' or 'test_case'. The delete fails if the node is of another level"
    )]
    #[serde(default)]
    pub level: Option<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct UpdateEpicJiraStatusRequest {
    pub project_id: String,
    pub epic_id: String,
    #[schemars(description = "'Not Pushed', 'Pushed' or 'Failed'")]
    pub status: String,
    #[schemars(description = "Jira issue key, e.g. 'PORTAL-12'. Kept unchanged when omitted")]
    #[serde(default)]
    pub jira_key: Option<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct SearchTestCasesRequest {
    pub project_id: String,
    #[schemars(description = "Case-insensitive text matched against IDs, names, titles and descriptions")]
    pub query: String,
    #[schemars(description = "Restrict to one level: 'epic', 'feature', 'use_case' or 'test_case'")]
    #[serde(default)]
    pub level: Option<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct GetNodeRequest {
    pub project_id: String,
    #[schemars(description = "ID of any epic, feature, use case or test case")]
    pub node_id: String,
}

// ============================================================
// Response Types
// ============================================================

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreatedNodeResponse {
    pub project_id: String,
    /// 'epic', 'feature', 'use_case' or 'test_case'
    pub level: String,
    /// The ID the node was stored under
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DeletedResponse {
    pub project_id: String,
    /// Every removed ID, the requested node first
    pub deleted: Vec<String>,
}
