use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::generation::{GenerationResult, Termination};

pub const DEFAULT_TARGET_LENGTH: u32 = 4_000;

fn default_target_length() -> u32 {
    DEFAULT_TARGET_LENGTH
}

/// Lecture metadata and course context supplied by the caller with each step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LectureInfo {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Minimum words for the draft and the revision.
    #[serde(default = "default_target_length")]
    pub target_length: u32,
    #[serde(default)]
    pub course_context: String,
    #[serde(default)]
    pub previous_lectures_summary: String,
}

/// What one generation step produced and where it was stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutput {
    pub step: String,
    pub text: String,
    pub word_count: u32,
    pub target_words: u32,
    pub finish_reason: Termination,
    pub iterations_used: u32,
    pub expansion_rounds: u32,
    pub warnings: Vec<String>,
    pub artifact: String,
    pub generated_at: DateTime<Utc>,
}

impl StepOutput {
    pub fn from_generation(step: &str, result: GenerationResult, artifact: String) -> Self {
        Self {
            step: step.to_string(),
            text: result.text,
            word_count: result.word_count,
            target_words: result.target_words,
            finish_reason: result.finish_reason,
            iterations_used: result.iterations_used,
            expansion_rounds: result.expansion_rounds,
            warnings: result.warnings,
            artifact,
            generated_at: Utc::now(),
        }
    }
}
