//! MCP server for AI-assisted test generation.

pub mod tree_render;
mod types;

pub use types::*;

use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::Serialize;

use crate::error::RepoError;
use crate::models::*;
use crate::repository::Repository;
use crate::search::SearchMatch;

#[derive(Clone)]
pub struct McpServer {
    repo: Repository,
    tool_router: ToolRouter<Self>,
}

fn repo_error(err: RepoError) -> McpError {
    match err {
        RepoError::NotFound { .. } | RepoError::Validation(_) | RepoError::Conflict(_) => {
            McpError::invalid_params(err.to_string(), None)
        }
        // Contention and StoreUnavailable land here; the client may retry.
        _ => McpError::internal_error(err.to_string(), None),
    }
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Parses an optional enum-valued string parameter.
fn parse_opt<T>(
    field: &str,
    raw: Option<&str>,
    parse: fn(&str) -> Option<T>,
    allowed: &str,
) -> Result<Option<T>, McpError> {
    match raw {
        None => Ok(None),
        Some(s) => parse(s).map(Some).ok_or_else(|| {
            McpError::invalid_params(
                format!("Invalid {field} '{s}'. Must be one of: {allowed}"),
                None,
            )
        }),
    }
}

const PROJECT_STATUSES: &str = "Active, Completed, On Hold, Archived";
const RISK_LEVELS: &str = "High, Medium, Low";
const REVIEW_STATUSES: &str = "Pending, Approved, Needs Clarification, Rejected";
const JIRA_STATUSES: &str = "Not Pushed, Pushed, Failed";
const LEVELS: &str = "epic, feature, use_case, test_case";

impl McpServer {
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            tool_router: Self::tool_router(),
        }
    }

    /// Runs tool logic on the blocking thread pool, off the stdio runtime.
    async fn blocking<T, F>(&self, op: F) -> Result<T, McpError>
    where
        F: FnOnce(&McpServer) -> Result<T, McpError> + Send + 'static,
        T: Send + 'static,
    {
        let server = self.clone();
        tokio::task::spawn_blocking(move || op(&server))
            .await
            .map_err(|e| McpError::internal_error(format!("tool task failed: {e}"), None))?
    }

    // ============================================================
    // Tool logic - shared by the MCP tools below and by tests
    // ============================================================

    pub fn handle_create_project(&self, req: CreateProjectRequest) -> Result<Project, McpError> {
        self.repo
            .create_project(CreateProjectInput {
                name: req.name,
                description: req.description,
                compliance_frameworks: req.compliance_frameworks,
                jira_project_key: req.jira_project_key,
                created_by: req.created_by,
            })
            .map_err(repo_error)
    }

    pub fn handle_get_project(&self, project_id: &str) -> Result<Project, McpError> {
        self.repo.get_project(project_id).map_err(repo_error)
    }

    pub fn handle_list_projects(
        &self,
        req: ListProjectsRequest,
    ) -> Result<Vec<ProjectSummary>, McpError> {
        let filter = ProjectFilter {
            status: parse_opt(
                "status",
                req.status.as_deref(),
                ProjectStatus::from_str,
                PROJECT_STATUSES,
            )?,
            compliance_framework: req.compliance_framework,
            text_search: req.text_search,
            limit: req.limit,
        };
        self.repo.list_projects(&filter).map_err(repo_error)
    }

    pub fn handle_update_project(&self, req: UpdateProjectRequest) -> Result<Project, McpError> {
        let input = UpdateProjectInput {
            name: req.name,
            description: req.description,
            status: parse_opt(
                "status",
                req.status.as_deref(),
                ProjectStatus::from_str,
                PROJECT_STATUSES,
            )?,
            compliance_frameworks: req.compliance_frameworks,
            jira_project_key: req.jira_project_key,
            coverage_summary: req.coverage_summary,
        };
        self.repo
            .update_project(&req.project_id, input)
            .map_err(repo_error)
    }

    pub fn handle_delete_project(&self, project_id: &str) -> Result<(), McpError> {
        self.repo.delete_project(project_id).map_err(repo_error)
    }

    pub fn handle_import_test_structure(
        &self,
        req: ImportTestStructureRequest,
    ) -> Result<MergeReport, McpError> {
        let payload: serde_json::Value = serde_json::from_str(&req.tree_json).map_err(|e| {
            McpError::invalid_params(format!("tree_json is not valid JSON: {e}"), None)
        })?;
        self.repo
            .import_structure(&req.project_id, &payload)
            .map_err(repo_error)
    }

    pub fn handle_add_epic(&self, req: AddEpicRequest) -> Result<CreatedNodeResponse, McpError> {
        let fields = EpicFields {
            name: req.epic_name,
            description: req.description,
        };
        let id = self
            .repo
            .add_epic(&req.project_id, fields, req.epic_id.as_deref())
            .map_err(repo_error)?;
        Ok(created(req.project_id, Level::Epic, id))
    }

    pub fn handle_add_feature(
        &self,
        req: AddFeatureRequest,
    ) -> Result<CreatedNodeResponse, McpError> {
        let fields = FeatureFields {
            name: req.feature_name,
            description: req.description,
        };
        let id = self
            .repo
            .add_feature(&req.project_id, &req.epic_id, fields, req.feature_id.as_deref())
            .map_err(repo_error)?;
        Ok(created(req.project_id, Level::Feature, id))
    }

    pub fn handle_add_use_case(
        &self,
        req: AddUseCaseRequest,
    ) -> Result<CreatedNodeResponse, McpError> {
        let fields = UseCaseFields {
            title: req.title,
            description: req.description,
            test_scenarios_outline: req.test_scenarios_outline,
            compliance_mapping: req.compliance_mapping,
            risk_level: parse_opt(
                "risk_level",
                req.risk_level.as_deref(),
                RiskLevel::from_str,
                RISK_LEVELS,
            )?,
            model_explanation: req.model_explanation,
            review_status: None,
            comments: None,
        };
        let id = self
            .repo
            .add_use_case(
                &req.project_id,
                &req.feature_id,
                fields,
                req.use_case_id.as_deref(),
            )
            .map_err(repo_error)?;
        Ok(created(req.project_id, Level::UseCase, id))
    }

    pub fn handle_add_test_case(
        &self,
        req: AddTestCaseRequest,
    ) -> Result<CreatedNodeResponse, McpError> {
        let fields = TestCaseFields {
            title: req.title,
            description: req.description,
            preconditions: req.preconditions,
            test_steps: req.test_steps,
            expected_result: req.expected_result,
            test_type: req.test_type,
            compliance_mapping: req.compliance_mapping,
            risk_level: parse_opt(
                "risk_level",
                req.risk_level.as_deref(),
                RiskLevel::from_str,
                RISK_LEVELS,
            )?,
            model_explanation: req.model_explanation,
            review_status: None,
            comments: None,
        };
        let id = self
            .repo
            .add_test_case(
                &req.project_id,
                &req.use_case_id,
                fields,
                req.test_case_id.as_deref(),
            )
            .map_err(repo_error)?;
        Ok(created(req.project_id, Level::TestCase, id))
    }

    pub fn handle_update_epic(&self, req: UpdateEpicRequest) -> Result<Epic, McpError> {
        let patch = EpicPatch {
            name: req.epic_name,
            description: req.description,
        };
        self.repo
            .update_epic(&req.project_id, &req.epic_id, patch)
            .map_err(repo_error)
    }

    pub fn handle_update_feature(&self, req: UpdateFeatureRequest) -> Result<Feature, McpError> {
        let patch = FeaturePatch {
            name: req.feature_name,
            description: req.description,
        };
        self.repo
            .update_feature(&req.project_id, &req.feature_id, patch)
            .map_err(repo_error)
    }

    pub fn handle_update_use_case(&self, req: UpdateUseCaseRequest) -> Result<UseCase, McpError> {
        let patch = UseCasePatch {
            title: req.title,
            description: req.description,
            test_scenarios_outline: req.test_scenarios_outline,
            compliance_mapping: req.compliance_mapping,
            risk_level: parse_opt(
                "risk_level",
                req.risk_level.as_deref(),
                RiskLevel::from_str,
                RISK_LEVELS,
            )?,
            model_explanation: req.model_explanation,
            review_status: parse_opt(
                "review_status",
                req.review_status.as_deref(),
                ReviewStatus::from_str,
                REVIEW_STATUSES,
            )?,
            comments: req.comments,
        };
        self.repo
            .update_use_case(&req.project_id, &req.use_case_id, patch)
            .map_err(repo_error)
    }

    pub fn handle_update_test_case(
        &self,
        req: UpdateTestCaseRequest,
    ) -> Result<TestCase, McpError> {
        let patch = TestCasePatch {
            title: req.title,
            description: req.description,
            preconditions: req.preconditions,
            test_steps: req.test_steps,
            expected_result: req.expected_result,
            test_type: req.test_type,
            compliance_mapping: req.compliance_mapping,
            risk_level: parse_opt(
                "risk_level",
                req.risk_level.as_deref(),
                RiskLevel::from_str,
                RISK_LEVELS,
            )?,
            review_status: parse_opt(
                "review_status",
                req.review_status.as_deref(),
                ReviewStatus::from_str,
                REVIEW_STATUSES,
            )?,
            comments: req.comments,
            model_explanation: req.model_explanation,
        };
        self.repo
            .update_test_case(&req.project_id, &req.test_case_id, patch)
            .map_err(repo_error)
    }

    pub fn handle_delete_node(&self, req: DeleteNodeRequest) -> Result<DeletedResponse, McpError> {
        let level = parse_opt("level", req.level.as_deref(), Level::from_str, LEVELS)?;
        let deleted = self
            .repo
            .delete_node(&req.project_id, &req.node_id, level)
            .map_err(repo_error)?;
        Ok(DeletedResponse {
            project_id: req.project_id,
            deleted,
        })
    }

    pub fn handle_update_epic_jira_status(
        &self,
        req: UpdateEpicJiraStatusRequest,
    ) -> Result<Epic, McpError> {
        let status = parse_opt(
            "status",
            Some(req.status.as_str()),
            JiraStatus::from_str,
            JIRA_STATUSES,
        )?
        .unwrap_or_default();
        let epic = self
            .repo
            .update_epic_jira_status(&req.project_id, &req.epic_id, status, req.jira_key.as_deref())
            .map_err(repo_error)?;
        Ok(epic.shallow())
    }

    pub fn handle_search_test_cases(
        &self,
        req: SearchTestCasesRequest,
    ) -> Result<Vec<SearchMatch>, McpError> {
        let level = parse_opt("level", req.level.as_deref(), Level::from_str, LEVELS)?;
        self.repo
            .search(&req.project_id, &req.query, level)
            .map_err(repo_error)
    }

    pub fn handle_get_project_statistics(
        &self,
        project_id: &str,
    ) -> Result<ProjectStatistics, McpError> {
        self.repo.statistics(project_id).map_err(repo_error)
    }

    pub fn handle_get_node(&self, req: GetNodeRequest) -> Result<LocatedNode, McpError> {
        self.repo
            .get_node(&req.project_id, &req.node_id)
            .map_err(repo_error)
    }

    pub fn handle_render_project_tree(&self, project_id: &str) -> Result<String, McpError> {
        let project = self.repo.get_project(project_id).map_err(repo_error)?;
        Ok(tree_render::render_project(&project))
    }
}

fn created(project_id: String, level: Level, id: String) -> CreatedNodeResponse {
    CreatedNodeResponse {
        project_id,
        level: level.as_str().to_string(),
        id,
    }
}

#[tool_router]
impl McpServer {
    // ============================================================
    // Project Tools
    // ============================================================

    #[tool(
        description = "Create a new, empty test project. Returns the project with its generated project_id (PROJ_...). Populate it afterwards with import_test_structure or the add_* tools."
    )]
    async fn create_project(
        &self,
        params: Parameters<CreateProjectRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        json_result(&self.blocking(move |s| s.handle_create_project(req)).await?)
    }

    #[tool(
        description = "Get a project with its complete epic → feature → use case → test case tree."
    )]
    async fn get_project(
        &self,
        params: Parameters<ProjectIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        let project_id = params.0.project_id;
        json_result(&self.blocking(move |s| s.handle_get_project(&project_id)).await?)
    }

    #[tool(
        description = "List projects, newest first, with per-level counts. Optional filters: status, compliance_framework, text_search, limit (default 100)."
    )]
    async fn list_projects(
        &self,
        params: Parameters<ListProjectsRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        json_result(&self.blocking(move |s| s.handle_list_projects(req)).await?)
    }

    #[tool(
        description = "Update project metadata (name, description, status, compliance_frameworks, jira_project_key, coverage_summary). Omitted fields are left unchanged."
    )]
    async fn update_project(
        &self,
        params: Parameters<UpdateProjectRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        json_result(&self.blocking(move |s| s.handle_update_project(req)).await?)
    }

    #[tool(description = "Delete a project and its entire tree. This cannot be undone.")]
    async fn delete_project(
        &self,
        params: Parameters<ProjectIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        let project_id = params.0.project_id;
        let id = project_id.clone();
        self.blocking(move |s| s.handle_delete_project(&id)).await?;
        Ok(CallToolResult::success(vec![Content::text(format!(
            "Project {project_id} deleted"
        ))]))
    }

    // ============================================================
    // Generation Tools - Used by the test-generation agent
    // ============================================================

    #[tool(
        description = "Merge a generated test structure into a project. tree_json is a JSON object with 'epics' (nested trees) and/or flat 'features' (with epic_id), 'use_cases' (with feature_id), 'test_cases' (with use_case_id), and an optional 'coverage_summary'. Nodes whose ID already exists under the same parent are updated in place; review status, comments and Jira state are preserved. Nodes without an ID get one assigned. Malformed branches are skipped and reported, never fatal. Returns a report with the outcome for every node."
    )]
    async fn import_test_structure(
        &self,
        params: Parameters<ImportTestStructureRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        json_result(&self.blocking(move |s| s.handle_import_test_structure(req)).await?)
    }

    #[tool(description = "Add an epic to a project. Returns the epic's ID.")]
    async fn add_epic(
        &self,
        params: Parameters<AddEpicRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        json_result(&self.blocking(move |s| s.handle_add_epic(req)).await?)
    }

    #[tool(description = "Add a feature under an existing epic. Returns the feature's ID.")]
    async fn add_feature(
        &self,
        params: Parameters<AddFeatureRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        json_result(&self.blocking(move |s| s.handle_add_feature(req)).await?)
    }

    #[tool(description = "Add a use case under an existing feature. Returns the use case's ID.")]
    async fn add_use_case(
        &self,
        params: Parameters<AddUseCaseRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        json_result(&self.blocking(move |s| s.handle_add_use_case(req)).await?)
    }

    #[tool(
        description = "Add a test case under an existing use case. Requires title, test_steps and expected_result. Returns the test case's ID."
    )]
    async fn add_test_case(
        &self,
        params: Parameters<AddTestCaseRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        json_result(&self.blocking(move |s| s.handle_add_test_case(req)).await?)
    }

    // ============================================================
    // Review Tools - Edits made on behalf of reviewers
    // ============================================================

    #[tool(description = "Update an epic's name or description. Returns the updated epic.")]
    async fn update_epic(
        &self,
        params: Parameters<UpdateEpicRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        json_result(&self.blocking(move |s| s.handle_update_epic(req)).await?)
    }

    #[tool(description = "Update a feature's name or description. Returns the updated feature.")]
    async fn update_feature(
        &self,
        params: Parameters<UpdateFeatureRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        json_result(&self.blocking(move |s| s.handle_update_feature(req)).await?)
    }

    #[tool(
        description = "Update a use case. Any subset of fields may be given, including review_status and comments. Returns the updated use case."
    )]
    async fn update_use_case(
        &self,
        params: Parameters<UpdateUseCaseRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        json_result(&self.blocking(move |s| s.handle_update_use_case(req)).await?)
    }

    #[tool(
        description = "Update a test case. Any subset of fields may be given, including review_status and comments. Returns the updated test case."
    )]
    async fn update_test_case(
        &self,
        params: Parameters<UpdateTestCaseRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        json_result(&self.blocking(move |s| s.handle_update_test_case(req)).await?)
    }

    #[tool(
        description = "Delete an epic, feature, use case or test case together with everything below it. Deleted IDs are never reused. Returns every removed ID."
    )]
    async fn delete_node(
        &self,
        params: Parameters<DeleteNodeRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        json_result(&self.blocking(move |s| s.handle_delete_node(req)).await?)
    }

    // ============================================================
    // Jira Tools
    // ============================================================

    #[tool(
        description = "Record the outcome of pushing an epic to Jira: status 'Pushed' or 'Failed' (or 'Not Pushed' to reset), plus the Jira issue key when known. Reporting the same status and key again changes nothing. A failed push may be reported as 'Pushed' once it succeeds."
    )]
    async fn update_epic_jira_status(
        &self,
        params: Parameters<UpdateEpicJiraStatusRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        json_result(&self.blocking(move |s| s.handle_update_epic_jira_status(req)).await?)
    }

    // ============================================================
    // Query Tools
    // ============================================================

    #[tool(
        description = "Search a project for text in IDs, names, titles, descriptions and expected results. Each match includes the node, the matched fields and its path (epic → feature → use case)."
    )]
    async fn search_test_cases(
        &self,
        params: Parameters<SearchTestCasesRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        json_result(&self.blocking(move |s| s.handle_search_test_cases(req)).await?)
    }

    #[tool(
        description = "Get project statistics: counts per level, Jira sync counts, test type and review status distributions, and compliance coverage."
    )]
    async fn get_project_statistics(
        &self,
        params: Parameters<ProjectIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        let project_id = params.0.project_id;
        json_result(&self.blocking(move |s| s.handle_get_project_statistics(&project_id)).await?)
    }

    #[tool(
        description = "Get a single node of any level (without its children) and its ancestor path. Includes the model_explanation recorded at generation time."
    )]
    async fn get_node(
        &self,
        params: Parameters<GetNodeRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        json_result(&self.blocking(move |s| s.handle_get_node(req)).await?)
    }

    #[tool(
        description = "Render a project as an ASCII tree. Epics show Jira state (● pushed, ○ not pushed, ✗ failed); use cases and test cases show review state (◇ pending, ✓ approved, ? needs clarification, ✗ rejected)."
    )]
    async fn render_project_tree(
        &self,
        params: Parameters<ProjectIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        let project_id = params.0.project_id;
        let tree = self
            .blocking(move |s| s.handle_render_project_tree(&project_id))
            .await?;
        Ok(CallToolResult::success(vec![Content::text(tree)]))
    }
}

#[tool_handler]
impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: rmcp::model::Implementation {
                name: "casebook".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            instructions: Some(
                r#"casebook stores generated test artifacts for a project as a tree:

  Project
  └── Epic (pushed to Jira)
      └── Feature
          └── Use Case (reviewed by people)
              └── Test Case (reviewed by people)

GENERATION WORKFLOW:
1. create_project (or list_projects to find an existing one)
2. import_test_structure with the generated tree. Include IDs (E001, F001,
   UC001, TC001, ...) for nodes you are regenerating so they are updated in
   place rather than duplicated. Omit IDs for new nodes.
3. Read the returned report: skipped nodes carry a reason.
4. get_project_statistics or render_project_tree to check coverage.

FIELD OWNERSHIP:
- Generated content (names, titles, steps, expected results, mappings) is
  replaced by later imports.
- review_status and comments belong to reviewers; jira_status, jira_key and
  jira_pushed_at belong to the Jira sync. Imports never change them.

IDS:
- IDs are unique across all levels of a project.
- Deleted IDs are retired and never assigned again.
- An explicit ID that is already taken is rejected, never renamed."#
                    .into(),
            ),
            ..Default::default()
        }
    }
}

pub async fn run_stdio_server(repo: Repository) -> anyhow::Result<()> {
    use tokio::io::{stdin, stdout};

    tracing::info!("Starting MCP server via stdio");

    let service = McpServer::new(repo);
    let server = service.serve((stdin(), stdout())).await?;

    let quit_reason = server.waiting().await?;
    tracing::info!("MCP server stopped: {:?}", quit_reason);

    Ok(())
}
