//! Lecture Pipeline: runs one lecture step at a time and stores its artifact.
//!
//! Steps read the artifacts of earlier steps from the store when the caller does not
//! pass them explicitly, so a lecture can be built with a sequence of bare requests:
//! sources → bibliography → bibliography summary → outline → draft → revision →
//! glossary → presentation prompt.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::generation::{
    count_words, generate_with_providers, ExpansionPolicy, GenerationRequest, Termination,
};
use crate::lecture::prompts::{
    bullet_list, or_placeholder, render, BIBLIOGRAPHY_SUMMARY_TEMPLATE, BRIEF_TEMPLATE,
    DEFAULT_STYLE_REFERENCE, DRAFT_TEMPLATE, GLOSSARY_TEMPLATE, LECTURER_SYSTEM,
    LITERATURE_ANALYST_SYSTEM, NOT_AVAILABLE, NO_SOURCES, OUTLINE_TEMPLATE, PRESENTATION_TEMPLATE,
    REVISION_TEMPLATE, SOURCES_INJECTION,
};
use crate::lecture::store::ArtifactStore;
use crate::lecture::LectureStep;
use crate::llm_client::prompts::length_directive;
use crate::llm_client::{ProviderKind, ProviderSet};
use crate::models::lecture::{LectureInfo, StepOutput};
use crate::openalex::{Bibliography, BibliographyEntry, OpenAlexClient};
use crate::sources::extract::{extract_text, join_documents};
use crate::sources::summarizer::{summarize_sources, SourcesSummary};

/// Bibliography entries per list shown to the model.
const PROMPT_BIBLIOGRAPHY_ENTRIES: usize = 5;
const PROMPT_AUTHORS: usize = 3;

fn default_work_count() -> u32 {
    10
}

// ────────────────────────────────────────────────────────────────────────────
// Step inputs
// ────────────────────────────────────────────────────────────────────────────

/// A file received from a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BibliographyQuery {
    pub core_keywords: String,
    #[serde(default)]
    pub core_authors: String,
    /// Falls back to `core_keywords` when empty.
    #[serde(default)]
    pub recent_keywords: String,
    #[serde(default = "default_work_count")]
    pub core_count: u32,
    #[serde(default = "default_work_count")]
    pub recent_count: u32,
}

impl BibliographyQuery {
    fn core_query(&self) -> String {
        format!("{} {}", self.core_keywords.trim(), self.core_authors.trim())
            .trim()
            .to_string()
    }

    fn recent_query(&self) -> String {
        if self.recent_keywords.trim().is_empty() {
            self.core_keywords.trim().to_string()
        } else {
            self.recent_keywords.trim().to_string()
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BibliographySummaryInput {
    pub bibliography: Option<Bibliography>,
    pub provider: Option<ProviderKind>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutlineInput {
    pub lecture: LectureInfo,
    pub sources_summary: Option<String>,
    pub key_ideas: Option<Vec<String>>,
    pub bibliography_summary: Option<String>,
    pub provider: Option<ProviderKind>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DraftInput {
    pub lecture: LectureInfo,
    pub outline: Option<String>,
    pub key_ideas: Option<Vec<String>>,
    pub bibliography: Option<Bibliography>,
    pub sources_summary: Option<String>,
    pub provider: Option<ProviderKind>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RevisionInput {
    pub lecture: LectureInfo,
    pub draft: Option<String>,
    pub style_reference: Option<String>,
    pub sources_summary: Option<String>,
    pub provider: Option<ProviderKind>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GlossaryInput {
    pub lecture_text: Option<String>,
    pub provider: Option<ProviderKind>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PresentationInput {
    pub lecture_text: Option<String>,
    pub glossary: Option<String>,
    pub key_ideas: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BriefInput {
    pub lecture: LectureInfo,
    pub sources_summary: Option<String>,
    pub provider: Option<ProviderKind>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourcesOutput {
    pub files: Vec<String>,
    pub provider: ProviderKind,
    #[serde(flatten)]
    pub summary: SourcesSummary,
    pub artifact: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BibliographyOutput {
    #[serde(flatten)]
    pub bibliography: Bibliography,
    pub artifact: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct LecturePipeline {
    providers: ProviderSet,
    openalex: OpenAlexClient,
    store: ArtifactStore,
    policy: ExpansionPolicy,
}

impl LecturePipeline {
    pub fn new(
        providers: ProviderSet,
        openalex: OpenAlexClient,
        store: ArtifactStore,
        policy: ExpansionPolicy,
    ) -> Self {
        Self {
            providers,
            openalex,
            store,
            policy,
        }
    }

    /// Extracts, chunks and summarises uploaded files.
    pub async fn run_sources_step(
        &self,
        course_id: &str,
        lecture_id: &str,
        files: Vec<UploadedFile>,
    ) -> Result<SourcesOutput, AppError> {
        if files.is_empty() {
            return Err(AppError::Validation("at least one file is required".to_string()));
        }

        let mut texts = Vec::with_capacity(files.len());
        for file in &files {
            texts.push(extract_upload(file).await?);
        }
        let combined = join_documents(&texts);
        if combined.is_empty() {
            return Err(AppError::Validation(
                "no text could be extracted from the uploaded files".to_string(),
            ));
        }

        let limits = ProviderKind::Standard.limits();
        let document_tokens = (count_words(&combined) as f64 * limits.tokens_per_word as f64) as u64;
        let provider = self.providers.for_document(document_tokens)?;
        info!(
            course_id,
            lecture_id,
            files = files.len(),
            document_tokens,
            provider = %provider.kind(),
            "Processing uploaded sources"
        );

        let summary = summarize_sources(provider.as_ref(), &combined).await?;
        let path = self
            .store
            .write_json(course_id, lecture_id, LectureStep::Sources, &summary)
            .await?;

        Ok(SourcesOutput {
            files: files.into_iter().map(|f| f.filename).collect(),
            provider: provider.kind(),
            summary,
            artifact: path.display().to_string(),
            generated_at: Utc::now(),
        })
    }

    /// Searches OpenAlex for the most cited and the newest works.
    pub async fn run_bibliography_step(
        &self,
        course_id: &str,
        lecture_id: &str,
        query: &BibliographyQuery,
    ) -> Result<BibliographyOutput, AppError> {
        let core_query = query.core_query();
        if core_query.is_empty() {
            return Err(AppError::Validation("core_keywords cannot be empty".to_string()));
        }

        let recent_query = query.recent_query();
        let bibliography = if recent_query == core_query {
            self.openalex
                .top_core_and_recent(&core_query, query.core_count, query.recent_count)
                .await?
        } else {
            self.openalex
                .core_and_recent(
                    &core_query,
                    &recent_query,
                    query.core_count,
                    query.recent_count,
                )
                .await?
        };
        if bibliography.is_empty() {
            warn!(course_id, lecture_id, query = %core_query, "OpenAlex returned no works");
        }
        info!(
            course_id,
            lecture_id,
            core = bibliography.core.len(),
            recent = bibliography.recent.len(),
            "Bibliography built"
        );

        let path = self
            .store
            .write_json(course_id, lecture_id, LectureStep::Bibliography, &bibliography)
            .await?;
        Ok(BibliographyOutput {
            bibliography,
            artifact: path.display().to_string(),
        })
    }

    pub async fn run_bibliography_summary_step(
        &self,
        course_id: &str,
        lecture_id: &str,
        input: BibliographySummaryInput,
    ) -> Result<StepOutput, AppError> {
        let bibliography = match input.bibliography {
            Some(b) => b,
            None => self
                .store
                .read_json(course_id, lecture_id, LectureStep::Bibliography)
                .await?
                .ok_or_else(|| missing(LectureStep::Bibliography))?,
        };

        let prompt = render(
            BIBLIOGRAPHY_SUMMARY_TEMPLATE,
            &[
                ("core_works", &summary_lines(&bibliography.core)),
                ("recent_works", &summary_lines(&bibliography.recent)),
            ],
        );
        self.run_llm_step(
            course_id,
            lecture_id,
            LectureStep::BibliographySummary,
            input.provider,
            0,
            LITERATURE_ANALYST_SYSTEM.to_string(),
            prompt,
        )
        .await
    }

    pub async fn run_outline_step(
        &self,
        course_id: &str,
        lecture_id: &str,
        input: OutlineInput,
    ) -> Result<StepOutput, AppError> {
        let sources = self.stored_sources(course_id, lecture_id).await?;
        let sources_summary = input
            .sources_summary
            .or_else(|| sources.as_ref().map(|s| s.full_summary.clone()))
            .unwrap_or_default();
        let key_ideas = input
            .key_ideas
            .or_else(|| sources.map(|s| s.key_ideas))
            .unwrap_or_default();
        let bibliography_summary = match input.bibliography_summary {
            Some(summary) => summary,
            None => self
                .store
                .read_text(course_id, lecture_id, LectureStep::BibliographySummary)
                .await?
                .unwrap_or_default(),
        };

        let lecture = &input.lecture;
        let prompt = render(
            OUTLINE_TEMPLATE,
            &[
                ("lecture_title", &lecture.title),
                ("course_context", or_placeholder(&lecture.course_context, NOT_AVAILABLE)),
                (
                    "previous_lectures_summary",
                    or_placeholder(&lecture.previous_lectures_summary, NOT_AVAILABLE),
                ),
                ("uploaded_sources_keypoints", &bullet_list(&key_ideas)),
                ("bibliography_summary", or_placeholder(&bibliography_summary, NOT_AVAILABLE)),
                ("uploaded_sources_summary", or_placeholder(&sources_summary, NO_SOURCES)),
            ],
        );
        self.run_llm_step(
            course_id,
            lecture_id,
            LectureStep::Outline,
            input.provider,
            lecture.target_length,
            LECTURER_SYSTEM.to_string(),
            prompt,
        )
        .await
    }

    /// Full lecture text of at least `lecture.target_length` words.
    pub async fn run_draft_step(
        &self,
        course_id: &str,
        lecture_id: &str,
        input: DraftInput,
    ) -> Result<StepOutput, AppError> {
        let outline = match input.outline {
            Some(outline) => outline,
            None => self
                .store
                .read_text(course_id, lecture_id, LectureStep::Outline)
                .await?
                .ok_or_else(|| missing(LectureStep::Outline))?,
        };
        let bibliography = match input.bibliography {
            Some(b) => b,
            None => self
                .store
                .read_json(course_id, lecture_id, LectureStep::Bibliography)
                .await?
                .unwrap_or_default(),
        };
        let sources = self.stored_sources(course_id, lecture_id).await?;
        let sources_summary = input
            .sources_summary
            .or_else(|| sources.as_ref().map(|s| s.full_summary.clone()))
            .unwrap_or_default();
        let key_ideas = input
            .key_ideas
            .or_else(|| sources.map(|s| s.key_ideas))
            .unwrap_or_default();

        let target = input.lecture.target_length;
        let body = render(
            DRAFT_TEMPLATE,
            &[
                ("target_length", &target.to_string()),
                ("uploaded_sources_keypoints", &bullet_list(&key_ideas)),
                ("core_bibliography", &title_lines(&bibliography.core)),
                ("recent_bibliography", &title_lines(&bibliography.recent)),
                ("outline_text", &outline),
            ],
        );
        let prompt = format!("{}{body}", length_directive(target));

        self.run_llm_step(
            course_id,
            lecture_id,
            LectureStep::Draft,
            input.provider,
            target,
            system_with_sources(&sources_summary),
            prompt,
        )
        .await
    }

    /// Style revision of the draft; stored as the final lecture text.
    pub async fn run_revision_step(
        &self,
        course_id: &str,
        lecture_id: &str,
        input: RevisionInput,
    ) -> Result<StepOutput, AppError> {
        let draft = match input.draft {
            Some(draft) => draft,
            None => self
                .store
                .read_text(course_id, lecture_id, LectureStep::Draft)
                .await?
                .ok_or_else(|| missing(LectureStep::Draft))?,
        };
        let sources_summary = match input.sources_summary {
            Some(summary) => summary,
            None => self
                .stored_sources(course_id, lecture_id)
                .await?
                .map(|s| s.full_summary)
                .unwrap_or_default(),
        };
        let style = input
            .style_reference
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STYLE_REFERENCE.to_string());

        let lecture = &input.lecture;
        let target = lecture.target_length;
        let body = render(
            REVISION_TEMPLATE,
            &[
                ("target_length", &target.to_string()),
                ("style_reference_text", &style),
                (
                    "previous_lectures_summary",
                    or_placeholder(&lecture.previous_lectures_summary, NOT_AVAILABLE),
                ),
                ("uploaded_sources_summary", or_placeholder(&sources_summary, NO_SOURCES)),
                ("raw_lecture_text", &draft),
            ],
        );
        let prompt = format!("{}{body}", length_directive(target));

        self.run_llm_step(
            course_id,
            lecture_id,
            LectureStep::Revision,
            input.provider,
            target,
            LECTURER_SYSTEM.to_string(),
            prompt,
        )
        .await
    }

    pub async fn run_glossary_step(
        &self,
        course_id: &str,
        lecture_id: &str,
        input: GlossaryInput,
    ) -> Result<StepOutput, AppError> {
        let lecture_text = match input.lecture_text {
            Some(text) => text,
            None => self.final_text(course_id, lecture_id).await?,
        };
        let prompt = render(GLOSSARY_TEMPLATE, &[("lecture_text", &lecture_text)]);
        self.run_llm_step(
            course_id,
            lecture_id,
            LectureStep::Glossary,
            input.provider,
            0,
            LECTURER_SYSTEM.to_string(),
            prompt,
        )
        .await
    }

    /// Renders the slide-deck prompt. No model call.
    pub async fn run_presentation_prompt_step(
        &self,
        course_id: &str,
        lecture_id: &str,
        input: PresentationInput,
    ) -> Result<StepOutput, AppError> {
        let lecture_text = match input.lecture_text {
            Some(text) => text,
            None => self.final_text(course_id, lecture_id).await?,
        };
        let glossary = match input.glossary {
            Some(text) => text,
            None => self
                .store
                .read_text(course_id, lecture_id, LectureStep::Glossary)
                .await?
                .unwrap_or_default(),
        };
        let key_ideas = match input.key_ideas {
            Some(ideas) => ideas,
            None => self
                .stored_sources(course_id, lecture_id)
                .await?
                .map(|s| s.key_ideas)
                .unwrap_or_default(),
        };

        let prompt = render(
            PRESENTATION_TEMPLATE,
            &[
                ("uploaded_sources_keypoints", &bullet_list(&key_ideas)),
                ("glossary_text", or_placeholder(&glossary, NOT_AVAILABLE)),
                ("final_lecture_text", &lecture_text),
            ],
        );
        let path = self
            .store
            .write_text(course_id, lecture_id, LectureStep::PresentationPrompt, &prompt)
            .await?;
        info!(course_id, lecture_id, "Presentation prompt rendered");

        Ok(StepOutput {
            step: LectureStep::PresentationPrompt.as_str().to_string(),
            word_count: count_words(&prompt),
            text: prompt,
            target_words: 0,
            finish_reason: Termination::Complete,
            iterations_used: 0,
            expansion_rounds: 0,
            warnings: Vec::new(),
            artifact: path.display().to_string(),
            generated_at: Utc::now(),
        })
    }

    /// Short standalone version of the lecture (800-1200 words).
    pub async fn run_brief_step(
        &self,
        course_id: &str,
        lecture_id: &str,
        input: BriefInput,
    ) -> Result<StepOutput, AppError> {
        let sources_summary = match input.sources_summary {
            Some(summary) => summary,
            None => self
                .stored_sources(course_id, lecture_id)
                .await?
                .map(|s| s.full_summary)
                .unwrap_or_default(),
        };
        let lecture = &input.lecture;
        let prompt = render(
            BRIEF_TEMPLATE,
            &[
                ("lecture_title", &lecture.title),
                ("lecture_subtitle", &lecture.subtitle),
                ("keywords", &lecture.keywords.join(", ")),
                ("sources_summary", or_placeholder(&sources_summary, NO_SOURCES)),
            ],
        );
        self.run_llm_step(
            course_id,
            lecture_id,
            LectureStep::Brief,
            input.provider,
            lecture.target_length,
            LECTURER_SYSTEM.to_string(),
            prompt,
        )
        .await
    }

    // ── helpers ─────────────────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    async fn run_llm_step(
        &self,
        course_id: &str,
        lecture_id: &str,
        step: LectureStep,
        provider: Option<ProviderKind>,
        target_length: u32,
        system: String,
        prompt: String,
    ) -> Result<StepOutput, AppError> {
        let profile = step.profile(target_length).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "step '{}' does not call the model",
                step.as_str()
            ))
        })?;
        let kind = provider.unwrap_or_else(|| self.providers.default_kind());
        let request = GenerationRequest::new(kind, system, prompt)
            .with_budget_words(profile.budget_words)
            .with_target_words(profile.target_words)
            .with_temperature(profile.temperature);

        info!(
            course_id,
            lecture_id,
            step = step.as_str(),
            provider = %kind,
            target_words = profile.target_words,
            "Running lecture step"
        );
        let result = generate_with_providers(&self.providers, &request, &self.policy).await?;

        let path = self
            .store
            .write_text(course_id, lecture_id, step, &result.text)
            .await?;
        info!(
            course_id,
            lecture_id,
            step = step.as_str(),
            word_count = result.word_count,
            iterations = result.iterations_used,
            "Lecture step stored"
        );
        Ok(StepOutput::from_generation(
            step.as_str(),
            result,
            path.display().to_string(),
        ))
    }

    async fn stored_sources(
        &self,
        course_id: &str,
        lecture_id: &str,
    ) -> Result<Option<SourcesSummary>, AppError> {
        Ok(self
            .store
            .read_json(course_id, lecture_id, LectureStep::Sources)
            .await?)
    }

    /// The revised lecture, falling back to the draft.
    async fn final_text(&self, course_id: &str, lecture_id: &str) -> Result<String, AppError> {
        if let Some(text) = self
            .store
            .read_text(course_id, lecture_id, LectureStep::Revision)
            .await?
        {
            return Ok(text);
        }
        self.store
            .read_text(course_id, lecture_id, LectureStep::Draft)
            .await?
            .ok_or_else(|| missing(LectureStep::Draft))
    }
}

/// PDF parsing is CPU-bound, so it runs on the blocking pool.
async fn extract_upload(file: &UploadedFile) -> Result<String, AppError> {
    let bytes = file.bytes.clone();
    let filename = file.filename.clone();
    tokio::task::spawn_blocking(move || extract_text(&bytes, &filename))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in extraction: {e}")))?
        .map_err(|e| AppError::Validation(e.to_string()))
}

fn missing(step: LectureStep) -> AppError {
    AppError::NotFound(format!(
        "no {} stored for this lecture; run that step first or pass it in the request",
        step.as_str()
    ))
}

fn system_with_sources(sources_summary: &str) -> String {
    if sources_summary.trim().is_empty() {
        LECTURER_SYSTEM.to_string()
    } else {
        format!(
            "{LECTURER_SYSTEM}{}",
            SOURCES_INJECTION.replace("{sources_summary}", sources_summary)
        )
    }
}

/// `- Title (year) - A, B, C` for the first entries.
fn summary_lines(entries: &[BibliographyEntry]) -> String {
    entries
        .iter()
        .take(PROMPT_BIBLIOGRAPHY_ENTRIES)
        .map(|e| {
            let authors: Vec<&str> = e
                .authors
                .iter()
                .take(PROMPT_AUTHORS)
                .map(String::as_str)
                .collect();
            format!("- {} ({}) - {}", e.title, e.year, authors.join(", "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn title_lines(entries: &[BibliographyEntry]) -> String {
    entries
        .iter()
        .take(PROMPT_BIBLIOGRAPHY_ENTRIES)
        .map(|e| format!("- {} ({})", e.title, e.year))
        .collect::<Vec<_>>()
        .join("\n")
}
