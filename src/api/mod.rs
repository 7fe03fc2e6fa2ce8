mod handlers;

use axum::{
    http::HeaderValue,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::repository::Repository;

pub fn create_router(repo: Repository) -> Router {
    create_router_with_cors(repo, None)
}

/// Builds the router, restricting CORS to `cors_origins` when given.
pub fn create_router_with_cors(repo: Repository, cors_origins: Option<Vec<String>>) -> Router {
    let api = Router::new()
        // Projects
        .route(
            "/projects",
            get(handlers::list_projects).post(handlers::create_project),
        )
        .route(
            "/projects/{id}",
            get(handlers::get_project)
                .put(handlers::update_project)
                .delete(handlers::delete_project),
        )
        .route("/projects/{id}/import", post(handlers::import_structure))
        .route("/projects/{id}/tree", get(handlers::render_tree))
        .route("/projects/{id}/statistics", get(handlers::get_statistics))
        .route("/projects/{id}/search", get(handlers::search))
        // Nodes
        .route("/projects/{id}/epics", post(handlers::add_epic))
        .route(
            "/projects/{id}/epics/{epic_id}/features",
            post(handlers::add_feature),
        )
        .route(
            "/projects/{id}/features/{feature_id}/use-cases",
            post(handlers::add_use_case),
        )
        .route(
            "/projects/{id}/use-cases/{use_case_id}/test-cases",
            post(handlers::add_test_case),
        )
        .route(
            "/projects/{id}/nodes/{node_id}",
            get(handlers::get_node).delete(handlers::delete_node),
        )
        .route("/projects/{id}/epics/{epic_id}", put(handlers::update_epic))
        .route(
            "/projects/{id}/features/{feature_id}",
            put(handlers::update_feature),
        )
        .route(
            "/projects/{id}/use-cases/{use_case_id}",
            put(handlers::update_use_case),
        )
        .route(
            "/projects/{id}/test-cases/{test_case_id}",
            put(handlers::update_test_case),
        )
        // Jira
        .route(
            "/projects/{id}/epics/{epic_id}/jira",
            put(handlers::update_epic_jira_status),
        )
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(repo)
}

fn cors_layer(origins: Option<Vec<String>>) -> CorsLayer {
    match origins {
        None => CorsLayer::permissive(),
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                        None
                    }
                })
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }
}
