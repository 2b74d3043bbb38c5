//! Completion Detector: decides whether generated text was cut off.
//!
//! A provider-reported length limit is conclusive. Otherwise the last visible
//! character decides: text must end in a sentence terminator, a closing quote or
//! guillemet, an ellipsis, or a newline. Anything else is treated as truncated,
//! although that verdict is only a heuristic.
//!
//! Known limitation: complete text ending in `)`, a digit, or a non-Latin terminal
//! mark is reported as truncated.

use serde::{Deserialize, Serialize};

use crate::llm_client::FinishReason;

/// Characters accepted as a proper ending.
pub const TERMINAL_CHARS: [char; 8] = ['.', '!', '?', '"', '”', '»', '…', '\n'];

/// How the truncation verdict was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationEvidence {
    /// The provider stopped on its token ceiling.
    ProviderReported,
    /// The text ends on a non-terminal character. May be a false positive.
    Heuristic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "verdict")]
pub enum Completeness {
    Complete,
    Truncated { evidence: TruncationEvidence },
}

impl Completeness {
    pub fn is_truncated(self) -> bool {
        matches!(self, Completeness::Truncated { .. })
    }

    /// Truncation inferred from the text alone.
    pub fn is_ambiguous(self) -> bool {
        matches!(
            self,
            Completeness::Truncated {
                evidence: TruncationEvidence::Heuristic
            }
        )
    }
}

pub fn detect_completion(text: &str, finish_reason: Option<FinishReason>) -> Completeness {
    if finish_reason == Some(FinishReason::Length) {
        return Completeness::Truncated {
            evidence: TruncationEvidence::ProviderReported,
        };
    }

    // Empty output has nothing to continue.
    if text.trim().is_empty() {
        return Completeness::Complete;
    }

    // Newlines are kept: a line break ends a list item or heading.
    let trimmed = text.trim_end_matches([' ', '\t', '\r']);
    match trimmed.chars().last() {
        Some(last) if TERMINAL_CHARS.contains(&last) => Completeness::Complete,
        _ => Completeness::Truncated {
            evidence: TruncationEvidence::Heuristic,
        },
    }
}
