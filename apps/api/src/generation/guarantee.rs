//! Length-Guarantee Orchestrator: drives a request to its target word count.
//!
//! # States
//! - `Generating`: initial call with the estimated budget, then continuation.
//! - `Checking`: recount words; at or above target → `Done`.
//! - `Expanding`: fresh call asking for at least the shortfall, continued and
//!   appended. Bounded by `ExpansionPolicy::max_expansion_rounds`.
//! - `Done`: build the `GenerationResult`.
//!
//! Only the initial call can fail the request. Continuation and expansion
//! failures downgrade the result to `Termination::Error` with a warning.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::generation::budget::{call_budget, expansion_budget};
use crate::generation::completion::detect_completion;
use crate::generation::continuation::{extend_if_truncated, ContinuationOutcome, ConversationContext};
use crate::generation::prompts::build_expansion_prompt;
use crate::generation::{count_words, GenerationError};
use crate::llm_client::{ChatProvider, CompletionRequest, FinishReason, ProviderKind, ProviderSet};

/// Temperature for continuation and expansion calls.
const FOLLOW_UP_TEMPERATURE: f32 = 0.7;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// One length-guaranteed generation. Built once, never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    /// Minimum word count; 0 disables expansion.
    pub target_words: u32,
    /// Words used to size the token budget when it differs from the target.
    #[serde(default)]
    pub budget_words: Option<u32>,
    pub provider: ProviderKind,
    pub temperature: f32,
}

impl GenerationRequest {
    pub fn new(
        provider: ProviderKind,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            target_words: 0,
            budget_words: None,
            provider,
            temperature: 0.7,
        }
    }

    pub fn with_target_words(mut self, target_words: u32) -> Self {
        self.target_words = target_words;
        self
    }

    pub fn with_budget_words(mut self, budget_words: u32) -> Self {
        self.budget_words = Some(budget_words);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn sizing_words(&self) -> u32 {
        self.budget_words.unwrap_or(self.target_words)
    }
}

/// How many expansion passes a request may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionPolicy {
    pub max_expansion_rounds: u32,
}

impl Default for ExpansionPolicy {
    fn default() -> Self {
        Self {
            max_expansion_rounds: 1,
        }
    }
}

/// How the final text ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Complete,
    /// The final text still looks cut off.
    LengthLimited,
    /// A continuation or expansion call failed; the best text so far is returned.
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub text: String,
    /// Always counted from `text`.
    pub word_count: u32,
    pub target_words: u32,
    pub finish_reason: Termination,
    /// Provider calls issued: initial, continuations and expansions.
    pub iterations_used: u32,
    pub expansion_rounds: u32,
    pub warnings: Vec<String>,
}

impl GenerationResult {
    pub fn shortfall(&self) -> u32 {
        self.target_words.saturating_sub(self.word_count)
    }

    pub fn meets_target(&self) -> bool {
        self.word_count >= self.target_words
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Generating,
    Checking,
    Expanding,
    Done,
}

/// Text and bookkeeping carried between phases.
struct Progress {
    text: String,
    last_finish: FinishReason,
    calls: u32,
    expansion_rounds: u32,
    failed: bool,
    warnings: Vec<String>,
}

impl Progress {
    fn absorb(&mut self, outcome: ContinuationOutcome) -> String {
        self.calls += outcome.calls;
        self.failed |= outcome.failed;
        self.warnings.extend(outcome.warnings);
        self.last_finish = outcome.last_finish;
        outcome.text
    }
}

/// Resolves the request's provider from `providers` and runs the orchestrator.
pub async fn generate_with_providers(
    providers: &ProviderSet,
    request: &GenerationRequest,
    policy: &ExpansionPolicy,
) -> Result<GenerationResult, GenerationError> {
    let provider = providers.get(request.provider)?;
    generate_with_length_guarantee(provider.as_ref(), request, policy).await
}

/// Generates text for `request`, continuing truncated output and expanding short
/// output until the target is met or the expansion rounds are spent.
pub async fn generate_with_length_guarantee(
    provider: &dyn ChatProvider,
    request: &GenerationRequest,
    policy: &ExpansionPolicy,
) -> Result<GenerationResult, GenerationError> {
    if provider.kind() != request.provider {
        return Err(GenerationError::Configuration(format!(
            "request targets provider '{}' but '{}' was supplied",
            request.provider,
            provider.kind()
        )));
    }

    let limits = request.provider.limits();
    let target = request.target_words;
    let mut progress = Progress {
        text: String::new(),
        last_finish: FinishReason::Stop,
        calls: 0,
        expansion_rounds: 0,
        failed: false,
        warnings: Vec::new(),
    };
    let mut phase = Phase::Generating;

    while phase != Phase::Done {
        phase = match phase {
            Phase::Generating => {
                let budget = call_budget(request.sizing_words(), &limits);
                info!(
                    provider = %request.provider,
                    model = provider.model(),
                    target_words = target,
                    max_tokens = budget,
                    "Generating"
                );

                let first = provider
                    .complete(&CompletionRequest {
                        system: &request.system_prompt,
                        user: &request.user_prompt,
                        prior_turns: &[],
                        temperature: request.temperature,
                        max_tokens: budget,
                    })
                    .await?;
                progress.calls += 1;

                let ctx = ConversationContext {
                    system: &request.system_prompt,
                    user: &request.user_prompt,
                    temperature: FOLLOW_UP_TEMPERATURE,
                };
                let outcome = extend_if_truncated(provider, &ctx, first, budget).await;
                progress.text = progress.absorb(outcome);
                Phase::Checking
            }

            Phase::Checking => {
                let word_count = count_words(&progress.text);
                if word_count >= target {
                    Phase::Done
                } else if progress.failed {
                    // The text may end mid-thought; expanding it would build on a broken tail.
                    Phase::Done
                } else if progress.expansion_rounds < policy.max_expansion_rounds {
                    Phase::Expanding
                } else {
                    warn!(
                        word_count,
                        target_words = target,
                        rounds = progress.expansion_rounds,
                        "Target not reached, expansion rounds exhausted"
                    );
                    Phase::Done
                }
            }

            Phase::Expanding => {
                progress.expansion_rounds += 1;
                let word_count = count_words(&progress.text);
                let shortfall = target.saturating_sub(word_count);
                let prompt = build_expansion_prompt(&progress.text, word_count, target, shortfall);
                let budget = expansion_budget(target, shortfall, &limits);

                info!(
                    provider = %request.provider,
                    round = progress.expansion_rounds,
                    word_count,
                    shortfall,
                    max_tokens = budget,
                    "Text below target, expanding"
                );

                progress.calls += 1;
                let expansion = provider
                    .complete(&CompletionRequest {
                        system: &request.system_prompt,
                        user: &prompt,
                        prior_turns: &[],
                        temperature: FOLLOW_UP_TEMPERATURE,
                        max_tokens: budget,
                    })
                    .await;

                match expansion {
                    Ok(segment) => {
                        let ctx = ConversationContext {
                            system: &request.system_prompt,
                            user: &prompt,
                            temperature: FOLLOW_UP_TEMPERATURE,
                        };
                        let outcome = extend_if_truncated(provider, &ctx, segment, budget).await;
                        let addition = progress.absorb(outcome);
                        let addition = addition.trim();
                        if !addition.is_empty() {
                            progress.text = format!("{}\n\n{addition}", progress.text.trim_end());
                        }
                        Phase::Checking
                    }
                    Err(e) => {
                        warn!(
                            provider = %request.provider,
                            error = %e,
                            "Expansion failed, keeping text generated so far"
                        );
                        progress.failed = true;
                        progress.warnings.push(format!("Expansion failed: {e}"));
                        Phase::Done
                    }
                }
            }

            Phase::Done => Phase::Done,
        };
    }

    Ok(finish(progress, target))
}

fn finish(progress: Progress, target_words: u32) -> GenerationResult {
    let word_count = count_words(&progress.text);
    let finish_reason = if progress.failed {
        Termination::Error
    } else if detect_completion(&progress.text, Some(progress.last_finish)).is_truncated() {
        Termination::LengthLimited
    } else {
        Termination::Complete
    };

    info!(
        word_count,
        target_words,
        iterations = progress.calls,
        expansion_rounds = progress.expansion_rounds,
        finish = ?finish_reason,
        "Generation finished"
    );

    GenerationResult {
        text: progress.text,
        word_count,
        target_words,
        finish_reason,
        iterations_used: progress.calls,
        expansion_rounds: progress.expansion_rounds,
        warnings: progress.warnings,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
