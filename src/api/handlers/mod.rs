use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RepoError;
use crate::mcp::tree_render::render_project;
use crate::models::*;
use crate::repository::Repository;
use crate::search::SearchMatch;

type ApiResult<T> = Result<T, (StatusCode, String)>;

// ============================================================
// Error Handling
// ============================================================

/// Map a repository error to a response. Caller mistakes are reported as-is;
/// storage faults are logged and returned as a generic message so internal
/// details do not leak.
fn repo_error(err: RepoError) -> (StatusCode, String) {
    let status = match &err {
        RepoError::NotFound { .. } => StatusCode::NOT_FOUND,
        RepoError::Conflict(_) | RepoError::Contention(_) => StatusCode::CONFLICT,
        RepoError::Validation(_) => StatusCode::BAD_REQUEST,
        RepoError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        RepoError::Corrupt(_) | RepoError::Storage(_) | RepoError::Serialization(_) => {
            tracing::error!("Internal error: {}", err);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            );
        }
    };
    tracing::warn!("Request failed: {}", err);
    (status, err.to_string())
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Projects
// ============================================================

pub async fn list_projects(
    State(repo): State<Repository>,
    Query(filter): Query<ProjectFilter>,
) -> ApiResult<Json<Vec<ProjectSummary>>> {
    repo.blocking(move |repo| repo.list_projects(&filter))
        .await
        .map(Json)
        .map_err(repo_error)
}

pub async fn get_project(
    State(repo): State<Repository>,
    Path(id): Path<String>,
) -> ApiResult<Json<Project>> {
    repo.blocking(move |repo| repo.get_project(&id))
        .await
        .map(Json)
        .map_err(repo_error)
}

pub async fn create_project(
    State(repo): State<Repository>,
    Json(input): Json<CreateProjectInput>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    repo.blocking(move |repo| repo.create_project(input))
        .await
        .map(|p| (StatusCode::CREATED, Json(p)))
        .map_err(repo_error)
}

pub async fn update_project(
    State(repo): State<Repository>,
    Path(id): Path<String>,
    Json(input): Json<UpdateProjectInput>,
) -> ApiResult<Json<Project>> {
    repo.blocking(move |repo| repo.update_project(&id, input))
        .await
        .map(Json)
        .map_err(repo_error)
}

pub async fn delete_project(
    State(repo): State<Repository>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    repo.blocking(move |repo| repo.delete_project(&id))
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(repo_error)
}

pub async fn import_structure(
    State(repo): State<Repository>,
    Path(id): Path<String>,
    Json(payload): Json<Value>,
) -> ApiResult<Json<MergeReport>> {
    repo.blocking(move |repo| repo.import_structure(&id, &payload))
        .await
        .map(Json)
        .map_err(repo_error)
}

pub async fn render_tree(
    State(repo): State<Repository>,
    Path(id): Path<String>,
) -> ApiResult<String> {
    repo.blocking(move |repo| repo.get_project(&id))
        .await
        .map(|p| render_project(&p))
        .map_err(repo_error)
}

pub async fn get_statistics(
    State(repo): State<Repository>,
    Path(id): Path<String>,
) -> ApiResult<Json<ProjectStatistics>> {
    repo.blocking(move |repo| repo.statistics(&id))
        .await
        .map(Json)
        .map_err(repo_error)
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default)]
    pub level: Option<Level>,
}

pub async fn search(
    State(repo): State<Repository>,
    Path(id): Path<String>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<SearchMatch>>> {
    repo.blocking(move |repo| repo.search(&id, &params.q, params.level))
        .await
        .map(Json)
        .map_err(repo_error)
}

// ============================================================
// Nodes
// ============================================================

#[derive(Debug, Serialize)]
pub struct Created {
    pub id: String,
}

fn created(id: String) -> (StatusCode, Json<Created>) {
    (StatusCode::CREATED, Json(Created { id }))
}

#[derive(Debug, Deserialize)]
pub struct AddEpicBody {
    #[serde(default)]
    pub epic_id: Option<String>,
    #[serde(flatten)]
    pub fields: EpicFields,
}

pub async fn add_epic(
    State(repo): State<Repository>,
    Path(id): Path<String>,
    Json(body): Json<AddEpicBody>,
) -> ApiResult<(StatusCode, Json<Created>)> {
    repo.blocking(move |repo| repo.add_epic(&id, body.fields, body.epic_id.as_deref()))
        .await
        .map(created)
    .map_err(repo_error)
}

#[derive(Debug, Deserialize)]
pub struct AddFeatureBody {
    #[serde(default)]
    pub feature_id: Option<String>,
    #[serde(flatten)]
    pub fields: FeatureFields,
}

pub async fn add_feature(
    State(repo): State<Repository>,
    Path((id, epic_id)): Path<(String, String)>,
    Json(body): Json<AddFeatureBody>,
) -> ApiResult<(StatusCode, Json<Created>)> {
    repo.blocking(move |repo| {
        repo.add_feature(&id, &epic_id, body.fields, body.feature_id.as_deref())
    })
    .await
    .map(created)
    .map_err(repo_error)
}

#[derive(Debug, Deserialize)]
pub struct AddUseCaseBody {
    #[serde(default)]
    pub use_case_id: Option<String>,
    #[serde(flatten)]
    pub fields: UseCaseFields,
}

pub async fn add_use_case(
    State(repo): State<Repository>,
    Path((id, feature_id)): Path<(String, String)>,
    Json(body): Json<AddUseCaseBody>,
) -> ApiResult<(StatusCode, Json<Created>)> {
    repo.blocking(move |repo| {
        repo.add_use_case(&id, &feature_id, body.fields, body.use_case_id.as_deref())
    })
    .await
    .map(created)
    .map_err(repo_error)
}

#[derive(Debug, Deserialize)]
pub struct AddTestCaseBody {
    #[serde(default)]
    pub test_case_id: Option<String>,
    #[serde(flatten)]
    pub fields: TestCaseFields,
}

pub async fn add_test_case(
    State(repo): State<Repository>,
    Path((id, use_case_id)): Path<(String, String)>,
    Json(body): Json<AddTestCaseBody>,
) -> ApiResult<(StatusCode, Json<Created>)> {
    repo.blocking(move |repo| {
        repo.add_test_case(&id, &use_case_id, body.fields, body.test_case_id.as_deref())
    })
    .await
    .map(created)
    .map_err(repo_error)
}

pub async fn get_node(
    State(repo): State<Repository>,
    Path((id, node_id)): Path<(String, String)>,
) -> ApiResult<Json<LocatedNode>> {
    repo.blocking(move |repo| repo.get_node(&id, &node_id))
        .await
        .map(Json)
        .map_err(repo_error)
}

pub async fn update_epic(
    State(repo): State<Repository>,
    Path((id, epic_id)): Path<(String, String)>,
    Json(patch): Json<EpicPatch>,
) -> ApiResult<Json<Epic>> {
    repo.blocking(move |repo| repo.update_epic(&id, &epic_id, patch))
        .await
        .map(|e| Json(e.shallow()))
        .map_err(repo_error)
}

pub async fn update_feature(
    State(repo): State<Repository>,
    Path((id, feature_id)): Path<(String, String)>,
    Json(patch): Json<FeaturePatch>,
) -> ApiResult<Json<Feature>> {
    repo.blocking(move |repo| repo.update_feature(&id, &feature_id, patch))
        .await
        .map(|f| Json(f.shallow()))
        .map_err(repo_error)
}

pub async fn update_use_case(
    State(repo): State<Repository>,
    Path((id, use_case_id)): Path<(String, String)>,
    Json(patch): Json<UseCasePatch>,
) -> ApiResult<Json<UseCase>> {
    repo.blocking(move |repo| repo.update_use_case(&id, &use_case_id, patch))
        .await
        .map(|u| Json(u.shallow()))
        .map_err(repo_error)
}

pub async fn update_test_case(
    State(repo): State<Repository>,
    Path((id, test_case_id)): Path<(String, String)>,
    Json(patch): Json<TestCasePatch>,
) -> ApiResult<Json<TestCase>> {
    repo.blocking(move |repo| repo.update_test_case(&id, &test_case_id, patch))
        .await
        .map(Json)
        .map_err(repo_error)
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub level: Option<Level>,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub deleted: Vec<String>,
}

pub async fn delete_node(
    State(repo): State<Repository>,
    Path((id, node_id)): Path<(String, String)>,
    Query(params): Query<DeleteParams>,
) -> ApiResult<Json<Deleted>> {
    repo.blocking(move |repo| repo.delete_node(&id, &node_id, params.level))
        .await
        .map(|deleted| Json(Deleted { deleted }))
        .map_err(repo_error)
}

// ============================================================
// Jira
// ============================================================

#[derive(Debug, Deserialize)]
pub struct JiraStatusBody {
    pub status: JiraStatus,
    #[serde(default)]
    pub jira_key: Option<String>,
}

pub async fn update_epic_jira_status(
    State(repo): State<Repository>,
    Path((id, epic_id)): Path<(String, String)>,
    Json(body): Json<JiraStatusBody>,
) -> ApiResult<Json<Epic>> {
    repo.blocking(move |repo| {
        repo.update_epic_jira_status(&id, &epic_id, body.status, body.jira_key.as_deref())
    })
    .await
    .map(|e| Json(e.shallow()))
    .map_err(repo_error)
}
