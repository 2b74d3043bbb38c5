/// LLM Client: the single point of entry for all chat-completion calls in LectureFlow.
///
/// ARCHITECTURAL RULE: No other module may call a provider HTTP API directly.
/// All LLM interactions go through a `ChatProvider` obtained from the `ProviderSet`
/// built once at startup and passed down explicitly.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod openai_compat;
pub mod prompts;
pub mod provider;
pub mod registry;

#[cfg(test)]
pub mod testing;

pub use openai_compat::OpenAiCompatProvider;
pub use provider::{ContinuationStrategy, ProviderKind, ProviderLimits};
pub use registry::ProviderSet;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Why the provider stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of the answer.
    Stop,
    /// The per-call token ceiling was hit.
    Length,
    /// Anything else the provider reports (content filter, tool calls, ...).
    Error,
}

impl FinishReason {
    /// Maps a provider's raw `finish_reason` field. A missing value counts as a normal stop.
    pub fn from_wire(raw: Option<&str>) -> Self {
        match raw {
            None | Some("stop") | Some("end_turn") => FinishReason::Stop,
            Some("length") | Some("max_tokens") => FinishReason::Length,
            Some(_) => FinishReason::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A turn appended after the system and user messages (prior assistant output,
/// follow-up instructions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// One chat-completion call.
#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub user: &'a str,
    pub prior_turns: &'a [ChatTurn],
    pub temperature: f32,
    pub max_tokens: u32,
}

/// What a provider returned for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub finish_reason: FinishReason,
    /// Completion tokens, when the provider reports usage.
    pub output_tokens: Option<u32>,
}

/// Uniform chat-completion interface over every configured backend.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// The provider variant this adapter serves; decides limits and continuation strategy.
    fn kind(&self) -> ProviderKind;

    /// Model identifier sent on the wire.
    fn model(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion, LlmError>;
}
