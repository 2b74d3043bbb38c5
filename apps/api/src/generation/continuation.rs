//! Continuation Engine: extends output that stopped before it was finished.
//!
//! The truncated text goes back to the provider as an assistant turn, followed by
//! an instruction to carry on without repeating itself; only the new suffix comes
//! back. How often that happens depends on the provider's `ContinuationStrategy`.
//!
//! A failing continuation call never fails the caller: the text accumulated so
//! far is returned unchanged and the failure is recorded as a warning.

use tracing::{debug, info, warn};

use crate::generation::completion::detect_completion;
use crate::llm_client::prompts::CONTINUE_INSTRUCTION;
use crate::llm_client::{
    ChatProvider, ChatTurn, Completion, CompletionRequest, ContinuationStrategy, FinishReason,
    LlmError,
};

/// Upper bound on the token budget of a single continuation call.
pub const CONTINUATION_CAP: u32 = 3_000;

/// Single-shot continuations shorter than this (trimmed, in chars) are discarded.
pub const MIN_MEANINGFUL_CONTINUATION_CHARS: usize = 10;

/// The prompts that produced the text being continued.
#[derive(Debug, Clone, Copy)]
pub struct ConversationContext<'a> {
    pub system: &'a str,
    pub user: &'a str,
    pub temperature: f32,
}

/// Result of running the continuation strategy over one generated segment.
#[derive(Debug, Clone)]
pub struct ContinuationOutcome {
    /// The segment with every accepted continuation appended.
    pub text: String,
    /// Continuation calls issued, failed ones included.
    pub calls: u32,
    /// Finish reason of the last call whose output was kept.
    pub last_finish: FinishReason,
    /// A continuation call failed and its output was lost.
    pub failed: bool,
    pub warnings: Vec<String>,
}

impl ContinuationOutcome {
    fn untouched(completion: Completion) -> Self {
        Self {
            text: completion.text,
            calls: 0,
            last_finish: completion.finish_reason,
            failed: false,
            warnings: Vec::new(),
        }
    }
}

/// `min(CONTINUATION_CAP, remaining_budget)`.
pub fn continuation_budget(remaining_budget: u32) -> u32 {
    remaining_budget.min(CONTINUATION_CAP)
}

/// Issues one continuation call for `partial` and returns the provider's reply
/// (the new suffix only).
pub async fn continue_once(
    provider: &dyn ChatProvider,
    ctx: &ConversationContext<'_>,
    partial: &str,
    budget: u32,
) -> Result<Completion, LlmError> {
    let turns = [
        ChatTurn::assistant(partial),
        ChatTurn::user(CONTINUE_INSTRUCTION),
    ];
    provider
        .complete(&CompletionRequest {
            system: ctx.system,
            user: ctx.user,
            prior_turns: &turns,
            temperature: ctx.temperature,
            max_tokens: budget,
        })
        .await
}

/// Applies the provider's continuation strategy to a freshly generated segment.
///
/// `remaining_budget` is the per-call allowance of the exchange the segment came from.
pub async fn extend_if_truncated(
    provider: &dyn ChatProvider,
    ctx: &ConversationContext<'_>,
    segment: Completion,
    remaining_budget: u32,
) -> ContinuationOutcome {
    let kind = provider.kind();
    let budget = continuation_budget(remaining_budget);
    let separator = kind.continuation_separator();

    match kind.continuation_strategy() {
        ContinuationStrategy::SingleShot => {
            let verdict = detect_completion(&segment.text, Some(segment.finish_reason));
            if !verdict.is_truncated() {
                return ContinuationOutcome::untouched(segment);
            }
            let mut outcome = ContinuationOutcome::untouched(segment);
            if budget == 0 {
                let message = "Output looks truncated but no token budget is left to continue it";
                warn!(provider = %kind, "{message}");
                outcome.warnings.push(message.to_string());
                return outcome;
            }

            info!(provider = %kind, ?verdict, budget, "Output truncated, requesting continuation");
            outcome.calls = 1;
            match continue_once(provider, ctx, &outcome.text, budget).await {
                Ok(continuation) => {
                    let suffix = continuation.text.trim();
                    if suffix.chars().count() > MIN_MEANINGFUL_CONTINUATION_CHARS {
                        outcome.text = format!("{}{separator}{suffix}", outcome.text);
                        outcome.last_finish = continuation.finish_reason;
                    } else {
                        debug!(
                            provider = %kind,
                            chars = suffix.chars().count(),
                            "Continuation too short to keep"
                        );
                    }
                }
                Err(e) => record_failure(&mut outcome, kind.as_str(), &e),
            }
            outcome
        }

        ContinuationStrategy::FollowFinishReason { max_iterations } => {
            let mut outcome = ContinuationOutcome::untouched(segment);

            while outcome.last_finish == FinishReason::Length && outcome.calls < max_iterations {
                outcome.calls += 1;
                info!(
                    provider = %kind,
                    iteration = outcome.calls,
                    budget,
                    "Generation hit token limit, continuing"
                );

                match continue_once(provider, ctx, &outcome.text, budget).await {
                    Ok(continuation) => {
                        let suffix = continuation.text.trim();
                        if !suffix.is_empty() {
                            outcome.text = format!("{}{separator}{suffix}", outcome.text);
                        }
                        outcome.last_finish = continuation.finish_reason;
                    }
                    Err(e) => {
                        record_failure(&mut outcome, kind.as_str(), &e);
                        break;
                    }
                }
            }

            if outcome.last_finish == FinishReason::Length && !outcome.failed {
                let message = format!(
                    "Stopped continuing after {max_iterations} iterations; output may still be truncated"
                );
                warn!(provider = %kind, "{message}");
                outcome.warnings.push(message);
            } else if outcome.calls > 0 {
                info!(
                    provider = %kind,
                    iterations = outcome.calls,
                    chars = outcome.text.chars().count(),
                    "Continuation loop finished"
                );
            }
            outcome
        }
    }
}

fn record_failure(outcome: &mut ContinuationOutcome, provider: &str, err: &LlmError) {
    warn!(provider, error = %err, "Continuation failed, keeping text generated so far");
    outcome.failed = true;
    outcome
        .warnings
        .push(format!("Continuation failed: {err}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::{ScriptedProvider, Step};
    use crate::llm_client::{ProviderKind, Role};

    const CTX: ConversationContext<'static> = ConversationContext {
        system: "You are a lecturer.",
        user: "Write about Tolstoy.",
        temperature: 0.7,
    };

    fn reply(text: &str, finish: FinishReason) -> Completion {
        Completion {
            text: text.to_string(),
            finish_reason: finish,
            output_tokens: None,
        }
    }

    #[test]
    fn test_continuation_budget_is_capped() {
        assert_eq!(continuation_budget(7800), 3000);
        assert_eq!(continuation_budget(1200), 1200);
        assert_eq!(continuation_budget(0), 0);
    }

    #[tokio::test]
    async fn test_complete_segment_makes_no_call() {
        let provider = ScriptedProvider::new(ProviderKind::Standard, vec![]);
        let outcome = extend_if_truncated(
            &provider,
            &CTX,
            reply("A finished thought.", FinishReason::Stop),
            7800,
        )
        .await;
        assert_eq!(outcome.text, "A finished thought.");
        assert_eq!(outcome.calls, 0);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_single_shot_appends_continuation_once() {
        let provider = ScriptedProvider::new(
            ProviderKind::Standard,
            vec![Step::stop("ve, and they held across every cohort.")],
        );
        let outcome = extend_if_truncated(
            &provider,
            &CTX,
            reply("The results were impressi", FinishReason::Length),
            7800,
        )
        .await;

        assert_eq!(
            outcome.text,
            "The results were impressi\n\nve, and they held across every cohort."
        );
        assert_eq!(outcome.calls, 1);
        assert!(!outcome.failed);

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].max_tokens, 3000);
        assert_eq!(calls[0].user, "Write about Tolstoy.");
        assert_eq!(calls[0].prior_turns[0].role, Role::Assistant);
        assert_eq!(calls[0].prior_turns[0].content, "The results were impressi");
        assert_eq!(calls[0].prior_turns[1].content, CONTINUE_INSTRUCTION);
    }

    #[tokio::test]
    async fn test_single_shot_uses_heuristic_when_provider_says_stop() {
        let provider = ScriptedProvider::new(
            ProviderKind::Standard,
            vec![Step::stop("and the argument concludes here.")],
        );
        let outcome = extend_if_truncated(
            &provider,
            &CTX,
            reply("The second point,", FinishReason::Stop),
            1000,
        )
        .await;
        assert_eq!(provider.calls()[0].max_tokens, 1000);
        assert!(outcome.text.ends_with("concludes here."));
    }

    #[tokio::test]
    async fn test_single_shot_discards_trivial_continuation() {
        let provider = ScriptedProvider::new(ProviderKind::Standard, vec![Step::stop("  ok.  ")]);
        let outcome = extend_if_truncated(
            &provider,
            &CTX,
            reply("Half a sentence", FinishReason::Length),
            7800,
        )
        .await;
        assert_eq!(outcome.text, "Half a sentence");
        assert_eq!(outcome.calls, 1);
        assert_eq!(outcome.last_finish, FinishReason::Length);
    }

    #[tokio::test]
    async fn test_failed_continuation_keeps_original_text() {
        let provider = ScriptedProvider::new(ProviderKind::Standard, vec![Step::fail()]);
        let original = "A long and expensive first draft that stops mid";
        let outcome = extend_if_truncated(
            &provider,
            &CTX,
            reply(original, FinishReason::Length),
            7800,
        )
        .await;
        assert_eq!(outcome.text, original);
        assert!(outcome.failed);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_zero_budget_skips_continuation() {
        let provider = ScriptedProvider::new(ProviderKind::Standard, vec![]);
        let outcome =
            extend_if_truncated(&provider, &CTX, reply("Cut", FinishReason::Length), 0).await;
        assert_eq!(outcome.text, "Cut");
        assert_eq!(provider.call_count(), 0);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_follow_finish_reason_loops_until_stop() {
        let provider = ScriptedProvider::new(
            ProviderKind::HighContext,
            vec![
                Step::length("second part"),
                Step::length("third part"),
                Step::stop("final part."),
            ],
        );
        let outcome = extend_if_truncated(
            &provider,
            &CTX,
            reply("first part", FinishReason::Length),
            50_000,
        )
        .await;

        assert_eq!(outcome.calls, 3);
        assert_eq!(provider.call_count(), 3);
        assert_eq!(outcome.text, "first part second part third part final part.");
        assert_eq!(outcome.last_finish, FinishReason::Stop);
        assert!(outcome.warnings.is_empty());

        // Each call carries everything accumulated so far.
        let calls = provider.calls();
        assert_eq!(calls[2].prior_turns[0].content, "first part second part third part");
        assert!(calls.iter().all(|c| c.max_tokens == CONTINUATION_CAP));
    }

    #[tokio::test]
    async fn test_follow_finish_reason_ignores_heuristic() {
        let provider = ScriptedProvider::new(ProviderKind::HighContext, vec![]);
        let outcome = extend_if_truncated(
            &provider,
            &CTX,
            reply("no terminal punctuation", FinishReason::Stop),
            50_000,
        )
        .await;
        assert_eq!(outcome.calls, 0);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_follow_finish_reason_is_bounded() {
        let script = (0..10).map(|i| Step::length(&format!("part{i}"))).collect();
        let provider = ScriptedProvider::new(ProviderKind::HighContext, script);
        let outcome =
            extend_if_truncated(&provider, &CTX, reply("start", FinishReason::Length), 50_000)
                .await;
        assert_eq!(outcome.calls, 10);
        assert_eq!(provider.call_count(), 10);
        assert_eq!(outcome.last_finish, FinishReason::Length);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_follow_finish_reason_failure_stops_loop() {
        let provider = ScriptedProvider::new(
            ProviderKind::HighContext,
            vec![Step::length("more"), Step::fail()],
        );
        let outcome =
            extend_if_truncated(&provider, &CTX, reply("start", FinishReason::Length), 50_000)
                .await;
        assert_eq!(outcome.text, "start more");
        assert_eq!(outcome.calls, 2);
        assert!(outcome.failed);
    }
}
