// Lecture pipeline: sources → bibliography → outline → draft → revision → glossary
// → presentation prompt, plus a standalone brief draft. Each LLM step goes through
// the length-guaranteed generator; each step's output is written to the artifact store.

pub mod handlers;
pub mod pipeline;
pub mod prompts;
pub mod store;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// One stored stage of a lecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LectureStep {
    Sources,
    Bibliography,
    BibliographySummary,
    Outline,
    Draft,
    Revision,
    Glossary,
    PresentationPrompt,
    Brief,
}

/// Generation parameters of an LLM step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepProfile {
    /// Words used to size the token budget.
    pub budget_words: u32,
    /// Minimum words; 0 never expands.
    pub target_words: u32,
    pub temperature: f32,
}

impl LectureStep {
    pub fn as_str(self) -> &'static str {
        match self {
            LectureStep::Sources => "sources",
            LectureStep::Bibliography => "bibliography",
            LectureStep::BibliographySummary => "bibliography_summary",
            LectureStep::Outline => "outline",
            LectureStep::Draft => "draft",
            LectureStep::Revision => "final",
            LectureStep::Glossary => "glossary",
            LectureStep::PresentationPrompt => "presentation_prompt",
            LectureStep::Brief => "brief",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            LectureStep::Sources | LectureStep::Bibliography => "json",
            _ => "md",
        }
    }

    /// `target_length` applies to the draft and the revision only.
    pub fn profile(self, target_length: u32) -> Option<StepProfile> {
        let fixed = |budget_words, temperature| StepProfile {
            budget_words,
            target_words: 0,
            temperature,
        };
        match self {
            LectureStep::BibliographySummary => Some(fixed(3_000, 0.6)),
            LectureStep::Outline => Some(fixed(2_000, 0.7)),
            LectureStep::Glossary => Some(fixed(2_000, 0.5)),
            LectureStep::Draft => Some(StepProfile {
                budget_words: target_length,
                target_words: target_length,
                temperature: 0.8,
            }),
            LectureStep::Revision => Some(StepProfile {
                budget_words: target_length,
                target_words: target_length,
                temperature: 0.7,
            }),
            LectureStep::Brief => Some(StepProfile {
                budget_words: 1_000,
                target_words: 1_000,
                temperature: 0.7,
            }),
            LectureStep::Sources | LectureStep::Bibliography | LectureStep::PresentationPrompt => {
                None
            }
        }
    }
}

/// Course and lecture ids become path components, so only a conservative charset is accepted.
pub fn validate_id(kind: &str, id: &str) -> Result<(), AppError> {
    let valid = !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "{kind} must be 1-128 characters of letters, digits, '-' or '_'"
        )))
    }
}
