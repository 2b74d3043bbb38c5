// Length-guaranteed text generation.
// Budget estimation, truncation detection, continuation and expansion. Every lecture
// step reaches the provider through `guarantee::generate_with_length_guarantee`.

pub mod budget;
pub mod completion;
pub mod continuation;
pub mod guarantee;
pub mod handlers;
pub mod prompts;

use thiserror::Error;

use crate::llm_client::LlmError;

pub use guarantee::{
    generate_with_length_guarantee, generate_with_providers, ExpansionPolicy, GenerationRequest,
    GenerationResult, Termination,
};

/// Failures that end a generation request. Continuation and expansion failures are
/// not represented here; they surface as `Termination::Error` on the result.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Missing credentials or an unusable provider selection. Not retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The initial call of the request failed.
    #[error("Provider error: {0}")]
    Provider(#[from] LlmError),
}

/// Whitespace-separated word count.
pub fn count_words(text: &str) -> u32 {
    text.split_whitespace().count().try_into().unwrap_or(u32::MAX)
}
