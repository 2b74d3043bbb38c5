//! Provider variants and the behaviour attached to each of them.
//!
//! `ProviderKind` is resolved once from configuration. Everything that used to be
//! decided by inspecting a model name (token ceiling, continuation style, defaults)
//! hangs off the variant instead.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Hard iteration ceiling for the finish-reason driven continuation loop.
pub const MAX_CONTINUATION_ITERATIONS: u32 = 10;

/// Static per-provider limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProviderLimits {
    /// Requests above this `max_tokens` are rejected by the provider.
    pub max_tokens_per_call: u32,
    /// Tokens per word of lecture text (≈1.2 measured, 1.6 with margin).
    pub tokens_per_word: f32,
    /// Context window in tokens. Only used to route very large documents.
    pub context_window: u32,
}

/// How truncated output is continued for a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContinuationStrategy {
    /// One continuation call when the completion detector reports truncation.
    SingleShot,
    /// Keep continuing while the provider reports a length-limited finish.
    FollowFinishReason { max_iterations: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// DeepSeek chat: 8k output ceiling.
    Standard,
    /// xAI Grok: 2M context window, large outputs.
    HighContext,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::Standard, ProviderKind::HighContext];

    pub fn limits(self) -> ProviderLimits {
        match self {
            // DeepSeek caps output at 8192; 7800 leaves headroom.
            ProviderKind::Standard => ProviderLimits {
                max_tokens_per_call: 7_800,
                tokens_per_word: 1.6,
                context_window: 64_000,
            },
            ProviderKind::HighContext => ProviderLimits {
                max_tokens_per_call: 50_000,
                tokens_per_word: 1.6,
                context_window: 2_000_000,
            },
        }
    }

    pub fn continuation_strategy(self) -> ContinuationStrategy {
        match self {
            ProviderKind::Standard => ContinuationStrategy::SingleShot,
            ProviderKind::HighContext => ContinuationStrategy::FollowFinishReason {
                max_iterations: MAX_CONTINUATION_ITERATIONS,
            },
        }
    }

    /// Joiner placed between accumulated text and a continuation segment.
    pub fn continuation_separator(self) -> &'static str {
        match self {
            ProviderKind::Standard => "\n\n",
            ProviderKind::HighContext => " ",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::Standard => "deepseek-chat",
            ProviderKind::HighContext => "grok-4-fast-reasoning",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            ProviderKind::Standard => "https://api.deepseek.com",
            ProviderKind::HighContext => "https://api.x.ai/v1",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Standard => "standard",
            ProviderKind::HighContext => "high_context",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" | "deepseek" => Ok(ProviderKind::Standard),
            "high_context" | "high-context" | "grok" => Ok(ProviderKind::HighContext),
            other => Err(format!(
                "unknown provider '{other}' (expected 'standard' or 'high_context')"
            )),
        }
    }
}
