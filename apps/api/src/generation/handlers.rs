//! Axum route handler for raw length-guaranteed generation.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::{
    generate_with_providers, ExpansionPolicy, GenerationRequest, GenerationResult,
};
use crate::llm_client::ProviderKind;
use crate::state::AppState;

/// Upper bound on caller-requested expansion rounds.
const MAX_REQUESTED_EXPANSION_ROUNDS: u32 = 5;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub system_prompt: String,
    pub user_prompt: String,
    #[serde(default)]
    pub target_words: u32,
    pub provider: Option<ProviderKind>,
    pub temperature: Option<f32>,
    pub max_expansion_rounds: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub generation_id: Uuid,
    pub provider: ProviderKind,
    #[serde(flatten)]
    pub result: GenerationResult,
}

/// POST /api/v1/generate
///
/// Generates text of at least `target_words` words, continuing truncated output and
/// expanding short output.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    if request.user_prompt.trim().is_empty() {
        return Err(AppError::Validation("user_prompt cannot be empty".to_string()));
    }
    if let Some(t) = request.temperature {
        if !(0.0..=2.0).contains(&t) {
            return Err(AppError::Validation(
                "temperature must be between 0 and 2".to_string(),
            ));
        }
    }
    let policy = match request.max_expansion_rounds {
        Some(rounds) if rounds > MAX_REQUESTED_EXPANSION_ROUNDS => {
            return Err(AppError::Validation(format!(
                "max_expansion_rounds cannot exceed {MAX_REQUESTED_EXPANSION_ROUNDS}"
            )));
        }
        Some(rounds) => ExpansionPolicy {
            max_expansion_rounds: rounds,
        },
        None => state.policy,
    };

    let provider = request
        .provider
        .unwrap_or_else(|| state.providers.default_kind());
    let mut generation =
        GenerationRequest::new(provider, request.system_prompt, request.user_prompt)
            .with_target_words(request.target_words);
    if let Some(t) = request.temperature {
        generation = generation.with_temperature(t);
    }

    let generation_id = Uuid::new_v4();
    info!(%generation_id, %provider, target_words = request.target_words, "Generation requested");

    let result = generate_with_providers(&state.providers, &generation, &policy).await?;

    Ok(Json(GenerateResponse {
        generation_id,
        provider,
        result,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_defaults() {
        let request: GenerateRequest =
            serde_json::from_str(r#"{"user_prompt": "Write about Gogol."}"#).unwrap();
        assert_eq!(request.target_words, 0);
        assert_eq!(request.system_prompt, "");
        assert!(request.provider.is_none());
    }

    #[test]
    fn test_generate_request_parses_provider() {
        let request: GenerateRequest = serde_json::from_str(
            r#"{"user_prompt": "x", "provider": "high_context", "target_words": 500}"#,
        )
        .unwrap();
        assert_eq!(request.provider, Some(ProviderKind::HighContext));
        assert_eq!(request.target_words, 500);
    }
}
