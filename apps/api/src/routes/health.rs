use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::llm_client::ProviderKind;
use crate::state::AppState;

/// GET /health
/// Returns service status, version and which providers have credentials.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let providers: Vec<&str> = ProviderKind::ALL
        .into_iter()
        .filter(|kind| state.providers.is_configured(*kind))
        .map(ProviderKind::as_str)
        .collect();

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "lectureflow-api",
        "providers": providers,
        "default_provider": state.config.default_provider,
    }))
}
