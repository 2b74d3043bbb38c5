pub mod health;

use axum::{extract::DefaultBodyLimit, routing::{get, post}, Router};

use crate::generation::handlers as generation;
use crate::lecture::handlers as lecture;
use crate::state::AppState;

/// Uploaded source files may be whole books.
const UPLOAD_BODY_LIMIT: usize = 50 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let lecture_routes = Router::new()
        .route(
            "/sources",
            post(lecture::handle_upload_sources).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/bibliography", post(lecture::handle_bibliography))
        .route(
            "/bibliography/summary",
            post(lecture::handle_bibliography_summary),
        )
        .route("/outline", post(lecture::handle_outline))
        .route("/draft", post(lecture::handle_draft))
        .route("/revision", post(lecture::handle_revision))
        .route("/glossary", post(lecture::handle_glossary))
        .route(
            "/presentation-prompt",
            post(lecture::handle_presentation_prompt),
        )
        .route("/brief", post(lecture::handle_brief));

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/generate", post(generation::handle_generate))
        .nest(
            "/api/v1/courses/:course_id/lectures/:lecture_id",
            lecture_routes,
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::generation::ExpansionPolicy;
    use crate::lecture::pipeline::LecturePipeline;
    use crate::lecture::store::ArtifactStore;
    use crate::llm_client::testing::{ScriptedProvider, Step};
    use crate::llm_client::{ProviderKind, ProviderSet};
    use crate::openalex::OpenAlexClient;

    fn app(script: Vec<Step>, outputs: &std::path::Path) -> Router {
        let config = Config::from_lookup(|key| match key {
            "DEEPSEEK_API_KEY" => Some("sk-test".to_string()),
            _ => None,
        })
        .unwrap();
        let providers = ProviderSet::new(ProviderKind::Standard).with_provider(Arc::new(
            ScriptedProvider::new(ProviderKind::Standard, script),
        ));
        let policy = ExpansionPolicy::default();
        let pipeline = LecturePipeline::new(
            providers.clone(),
            OpenAlexClient::new("http://127.0.0.1:9", None).unwrap(),
            ArtifactStore::new(outputs),
            policy,
        );
        build_router(AppState {
            config,
            providers,
            policy,
            pipeline,
        })
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_lists_configured_providers() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(vec![], dir.path())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["providers"], serde_json::json!(["standard"]));
        assert_eq!(body["default_provider"], "standard");
    }

    #[tokio::test]
    async fn test_generate_returns_result() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(vec![Step::stop("A complete answer.")], dir.path())
            .oneshot(post_json(
                "/api/v1/generate",
                serde_json::json!({"user_prompt": "Say something.", "target_words": 3}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["text"], "A complete answer.");
        assert_eq!(body["word_count"], 3);
        assert_eq!(body["finish_reason"], "complete");
        assert_eq!(body["iterations_used"], 1);
        assert!(body["generation_id"].is_string());
    }

    #[tokio::test]
    async fn test_generate_with_unconfigured_provider() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(vec![], dir.path())
            .oneshot(post_json(
                "/api/v1/generate",
                serde_json::json!({"user_prompt": "x", "provider": "high_context"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "CONFIGURATION_ERROR");
    }

    #[tokio::test]
    async fn test_generate_rejects_empty_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(vec![], dir.path())
            .oneshot(post_json(
                "/api/v1/generate",
                serde_json::json!({"user_prompt": "  "}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_outline_route_stores_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(vec![Step::stop("1. Introduction.")], dir.path())
            .oneshot(post_json(
                "/api/v1/courses/lit-101/lectures/lec-1/outline",
                serde_json::json!({"lecture": {"title": "Dostoevsky"}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["step"], "outline");
        assert!(dir.path().join("lit-101/lec-1_outline.md").exists());
    }

    #[tokio::test]
    async fn test_invalid_course_id_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(vec![], dir.path())
            .oneshot(post_json(
                "/api/v1/courses/lit.101/lectures/lec-1/glossary",
                serde_json::json!({"lecture_text": "Text."}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_draft_without_outline_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(vec![], dir.path())
            .oneshot(post_json(
                "/api/v1/courses/lit-101/lectures/lec-1/draft",
                serde_json::json!({"lecture": {"title": "Dostoevsky", "target_length": 500}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
