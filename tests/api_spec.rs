use axum::http::StatusCode;
use axum_test::TestServer;
use casebook::api::create_router;
use casebook::models::*;
use casebook::search::SearchMatch;
use casebook::Repository;
use serde_json::{json, Value};

fn setup() -> TestServer {
    let app = create_router(Repository::in_memory());
    TestServer::new(app).expect("Failed to create test server")
}

async fn create_test_project(server: &TestServer) -> Project {
    server
        .post("/api/v1/projects")
        .json(&json!({
            "name": "Patient Portal",
            "compliance_frameworks": ["HIPAA"]
        }))
        .await
        .json::<Project>()
}

/// Imports E001 → F001 → UC001 → TC001 into a new project.
async fn seed(server: &TestServer) -> String {
    let project = create_test_project(server).await;
    server
        .post(&format!("/api/v1/projects/{}/import", project.project_id))
        .json(&json!({
            "epics": [{
                "epic_name": "Auth",
                "features": [{
                    "feature_name": "Login",
                    "use_cases": [{
                        "title": "Valid login",
                        "test_cases": [{
                            "title": "Verify login",
                            "test_steps": ["go to page", "enter creds", "submit"],
                            "expected_result": "redirected to dashboard"
                        }]
                    }]
                }]
            }]
        }))
        .await
        .assert_status_ok();
    project.project_id
}

mod health {
    use super::*;

    #[tokio::test]
    async fn returns_ok() {
        let server = setup();
        let response = server.get("/api/v1/health").await;
        response.assert_status_ok();
        response.assert_json(&json!({ "status": "ok" }));
    }
}

mod projects {
    use super::*;

    #[tokio::test]
    async fn creates_and_fetches_a_project() {
        let server = setup();
        let project = create_test_project(&server).await;
        assert!(project.project_id.starts_with("PROJ_"));

        let response = server
            .get(&format!("/api/v1/projects/{}", project.project_id))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Project>().project_name, "Patient Portal");
    }

    #[tokio::test]
    async fn create_returns_201() {
        let server = setup();
        let response = server
            .post("/api/v1/projects")
            .json(&json!({ "name": "Billing" }))
            .await;
        response.assert_status(StatusCode::CREATED);
    }

    #[tokio::test]
    async fn blank_name_is_a_bad_request() {
        let server = setup();
        let response = server
            .post("/api/v1/projects")
            .json(&json!({ "name": "" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_project_is_404() {
        let server = setup();
        let response = server.get("/api/v1/projects/PROJ_missing").await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn lists_with_filters() {
        let server = setup();
        create_test_project(&server).await;
        server
            .post("/api/v1/projects")
            .json(&json!({ "name": "Billing", "compliance_frameworks": ["PCI-DSS"] }))
            .await;

        let all = server.get("/api/v1/projects").await.json::<Vec<ProjectSummary>>();
        assert_eq!(all.len(), 2);

        let pci = server
            .get("/api/v1/projects")
            .add_query_param("compliance_framework", "PCI-DSS")
            .await
            .json::<Vec<ProjectSummary>>();
        assert_eq!(pci.len(), 1);
        assert_eq!(pci[0].project_name, "Billing");
    }

    #[tokio::test]
    async fn updates_a_project() {
        let server = setup();
        let project = create_test_project(&server).await;

        let response = server
            .put(&format!("/api/v1/projects/{}", project.project_id))
            .json(&json!({ "status": "On Hold", "jira_project_key": "PORTAL" }))
            .await;
        response.assert_status_ok();
        let updated = response.json::<Project>();
        assert_eq!(updated.status, ProjectStatus::OnHold);
        assert_eq!(updated.jira_project_key.as_deref(), Some("PORTAL"));
    }

    #[tokio::test]
    async fn deletes_a_project() {
        let server = setup();
        let project = create_test_project(&server).await;
        let url = format!("/api/v1/projects/{}", project.project_id);

        server.delete(&url).await.assert_status(StatusCode::NO_CONTENT);
        server.get(&url).await.assert_status(StatusCode::NOT_FOUND);
        server.delete(&url).await.assert_status(StatusCode::NOT_FOUND);
    }
}

mod import {
    use super::*;

    #[tokio::test]
    async fn returns_the_merge_report() {
        let server = setup();
        let project = create_test_project(&server).await;

        let response = server
            .post(&format!("/api/v1/projects/{}/import", project.project_id))
            .json(&json!({
                "epics": [{ "epic_name": "Auth" }, { "description": "nameless" }],
                "coverage_summary": "Auth only"
            }))
            .await;

        response.assert_status_ok();
        let report = response.json::<MergeReport>();
        assert_eq!(report.created, 1);
        assert_eq!(report.skipped, 1);
        assert!(report.coverage_summary_updated);
        assert!(report.committed);
    }

    #[tokio::test]
    async fn rejects_an_unrecognised_payload() {
        let server = setup();
        let project = create_test_project(&server).await;

        let response = server
            .post(&format!("/api/v1/projects/{}/import", project.project_id))
            .json(&json!({ "stories": [] }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}

mod nodes {
    use super::*;

    #[tokio::test]
    async fn adds_nodes_at_every_level() {
        let server = setup();
        let project = create_test_project(&server).await;
        let base = format!("/api/v1/projects/{}", project.project_id);

        let epic = server
            .post(&format!("{base}/epics"))
            .json(&json!({ "epic_name": "Billing" }))
            .await;
        epic.assert_status(StatusCode::CREATED);
        assert_eq!(epic.json::<Value>()["id"], "E001");

        let feature = server
            .post(&format!("{base}/epics/E001/features"))
            .json(&json!({ "feature_id": "F010", "feature_name": "Invoices" }))
            .await;
        assert_eq!(feature.json::<Value>()["id"], "F010");

        let use_case = server
            .post(&format!("{base}/features/F010/use-cases"))
            .json(&json!({ "title": "Download invoice", "risk_level": "High" }))
            .await;
        assert_eq!(use_case.json::<Value>()["id"], "UC001");

        let test_case = server
            .post(&format!("{base}/use-cases/UC001/test-cases"))
            .json(&json!({
                "title": "PDF downloads",
                "test_steps": ["click download"],
                "expected_result": "a PDF is saved"
            }))
            .await;
        test_case.assert_status(StatusCode::CREATED);
        assert_eq!(test_case.json::<Value>()["id"], "TC001");
    }

    #[tokio::test]
    async fn duplicate_id_is_a_conflict() {
        let server = setup();
        let project_id = seed(&server).await;

        let response = server
            .post(&format!("/api/v1/projects/{project_id}/epics"))
            .json(&json!({ "epic_id": "E001", "epic_name": "Again" }))
            .await;
        response.assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn missing_parent_is_404() {
        let server = setup();
        let project = create_test_project(&server).await;

        let response = server
            .post(&format!(
                "/api/v1/projects/{}/epics/E404/features",
                project.project_id
            ))
            .json(&json!({ "feature_name": "Orphan" }))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn gets_a_node_with_its_path() {
        let server = setup();
        let project_id = seed(&server).await;

        let response = server
            .get(&format!("/api/v1/projects/{project_id}/nodes/TC001"))
            .await;
        response.assert_status_ok();
        let located = response.json::<LocatedNode>();
        assert_eq!(located.node.level(), Level::TestCase);
        assert_eq!(located.path.len(), 3);
    }

    #[tokio::test]
    async fn reviews_a_test_case() {
        let server = setup();
        let project_id = seed(&server).await;

        let response = server
            .put(&format!("/api/v1/projects/{project_id}/test-cases/TC001"))
            .json(&json!({ "review_status": "Approved", "comments": "ok" }))
            .await;
        response.assert_status_ok();
        let tc = response.json::<TestCase>();
        assert_eq!(tc.review_status, ReviewStatus::Approved);
        assert_eq!(tc.title, "Verify login");
    }

    #[tokio::test]
    async fn updates_an_epic_without_returning_children() {
        let server = setup();
        let project_id = seed(&server).await;

        let response = server
            .put(&format!("/api/v1/projects/{project_id}/epics/E001"))
            .json(&json!({ "epic_name": "Identity" }))
            .await;
        response.assert_status_ok();
        let epic = response.json::<Epic>();
        assert_eq!(epic.epic_name, "Identity");
        assert!(epic.features.is_empty());
    }

    #[tokio::test]
    async fn deletes_a_subtree() {
        let server = setup();
        let project_id = seed(&server).await;

        let response = server
            .delete(&format!("/api/v1/projects/{project_id}/nodes/F001"))
            .await;
        response.assert_status_ok();
        assert_eq!(
            response.json::<Value>()["deleted"],
            json!(["F001", "UC001", "TC001"])
        );
    }

    #[tokio::test]
    async fn delete_honours_the_level_guard() {
        let server = setup();
        let project_id = seed(&server).await;

        let response = server
            .delete(&format!("/api/v1/projects/{project_id}/nodes/F001"))
            .add_query_param("level", "epic")
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }
}

mod jira {
    use super::*;

    #[tokio::test]
    async fn records_a_push() {
        let server = setup();
        let project_id = seed(&server).await;

        let response = server
            .put(&format!("/api/v1/projects/{project_id}/epics/E001/jira"))
            .json(&json!({ "status": "Pushed", "jira_key": "PORTAL-3" }))
            .await;
        response.assert_status_ok();
        let epic = response.json::<Epic>();
        assert_eq!(epic.jira_status, JiraStatus::Pushed);
        assert_eq!(epic.jira_key.as_deref(), Some("PORTAL-3"));
    }

    #[tokio::test]
    async fn rejects_an_unknown_status() {
        let server = setup();
        let project_id = seed(&server).await;

        let response = server
            .put(&format!("/api/v1/projects/{project_id}/epics/E001/jira"))
            .json(&json!({ "status": "Shipped" }))
            .await;
        assert!(response.status_code().is_client_error());
    }
}

mod queries {
    use super::*;

    #[tokio::test]
    async fn searches_a_project() {
        let server = setup();
        let project_id = seed(&server).await;

        let response = server
            .get(&format!("/api/v1/projects/{project_id}/search"))
            .add_query_param("q", "dashboard")
            .await;
        response.assert_status_ok();
        let matches = response.json::<Vec<SearchMatch>>();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].node.id(), "TC001");
        assert_eq!(matches[0].matched_fields, vec!["expected_result"]);
    }

    #[tokio::test]
    async fn search_can_be_limited_to_a_level() {
        let server = setup();
        let project_id = seed(&server).await;

        let response = server
            .get(&format!("/api/v1/projects/{project_id}/search"))
            .add_query_param("q", "login")
            .add_query_param("level", "use_case")
            .await;
        let matches = response.json::<Vec<SearchMatch>>();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].node.id(), "UC001");
    }

    #[tokio::test]
    async fn returns_statistics() {
        let server = setup();
        let project_id = seed(&server).await;

        let response = server
            .get(&format!("/api/v1/projects/{project_id}/statistics"))
            .await;
        response.assert_status_ok();
        let stats = response.json::<ProjectStatistics>();
        assert_eq!(stats.epic_count, 1);
        assert_eq!(stats.feature_count, 1);
        assert_eq!(stats.use_case_count, 1);
        assert_eq!(stats.test_case_count, 1);
    }

    #[tokio::test]
    async fn renders_the_tree() {
        let server = setup();
        let project_id = seed(&server).await;

        let response = server
            .get(&format!("/api/v1/projects/{project_id}/tree"))
            .await;
        response.assert_status_ok();
        let text = response.text();
        assert!(text.starts_with("Patient Portal\n"));
        assert!(text.contains("○ E001 Auth"));
        assert!(text.contains("◇ TC001 Verify login [Functional]"));
    }
}
