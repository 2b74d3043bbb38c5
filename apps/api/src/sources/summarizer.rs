//! Source summarisation: per-chunk summaries, a combined summary and key ideas.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::generation::{
    generate_with_length_guarantee, ExpansionPolicy, GenerationError, GenerationRequest,
};
use crate::llm_client::ChatProvider;
use crate::sources::chunking::{split_into_chunks, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
use crate::sources::extract::DOCUMENT_SEPARATOR;
use crate::sources::prompts::{
    build_chunk_prompt, build_combined_prompt, build_key_ideas_prompt, SOURCE_ANALYST_SYSTEM,
};

// Budgets in words; 625 words ≈ 1000 tokens at 1.6 tokens/word.
const CHUNK_SUMMARY_WORDS: u32 = 625;
const COMBINED_SUMMARY_WORDS: u32 = 1_250;
const KEY_IDEAS_WORDS: u32 = 625;

const CHUNK_PREVIEW_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkSummary {
    pub chunk_index: usize,
    /// First characters of the chunk, for display.
    pub chunk_preview: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcesSummary {
    pub full_summary: String,
    pub key_ideas: Vec<String>,
    pub chunks: Vec<ChunkSummary>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Summarises `text` chunk by chunk, then merges the summaries and pulls out key ideas.
pub async fn summarize_sources(
    provider: &dyn ChatProvider,
    text: &str,
) -> Result<SourcesSummary, GenerationError> {
    let chunks = split_into_chunks(text, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP);
    info!(provider = %provider.kind(), chunks = chunks.len(), "Summarising sources");

    let mut warnings = Vec::new();
    let mut summaries = Vec::with_capacity(chunks.len());

    for (chunk_index, chunk) in chunks.iter().enumerate() {
        let (summary, chunk_warnings) =
            run(provider, build_chunk_prompt(chunk), CHUNK_SUMMARY_WORDS, 0.5).await?;
        warnings.extend(chunk_warnings);
        summaries.push(ChunkSummary {
            chunk_index,
            chunk_preview: preview(chunk),
            summary,
        });
    }

    let joined = summaries
        .iter()
        .map(|s| s.summary.as_str())
        .collect::<Vec<_>>()
        .join(DOCUMENT_SEPARATOR);
    let (full_summary, combined_warnings) =
        run(provider, build_combined_prompt(&joined), COMBINED_SUMMARY_WORDS, 0.5).await?;
    warnings.extend(combined_warnings);

    let (ideas_text, idea_warnings) =
        run(provider, build_key_ideas_prompt(&full_summary), KEY_IDEAS_WORDS, 0.3).await?;
    warnings.extend(idea_warnings);

    let key_ideas = parse_bullets(&ideas_text);
    info!(key_ideas = key_ideas.len(), "Sources summarised");

    Ok(SourcesSummary {
        full_summary,
        key_ideas,
        chunks: summaries,
        warnings,
    })
}

async fn run(
    provider: &dyn ChatProvider,
    prompt: String,
    budget_words: u32,
    temperature: f32,
) -> Result<(String, Vec<String>), GenerationError> {
    let request = GenerationRequest::new(provider.kind(), SOURCE_ANALYST_SYSTEM, prompt)
        .with_budget_words(budget_words)
        .with_temperature(temperature);
    let result =
        generate_with_length_guarantee(provider, &request, &ExpansionPolicy::default()).await?;
    Ok((result.text, result.warnings))
}

/// Lines that start with `-` or `•`, with the marker stripped.
pub fn parse_bullets(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| line.starts_with('-') || line.starts_with('•'))
        .map(|line| line.trim_start_matches(['-', '•']).trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

fn preview(chunk: &str) -> String {
    if chunk.chars().count() > CHUNK_PREVIEW_CHARS {
        let head: String = chunk.chars().take(CHUNK_PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        chunk.to_string()
    }
}
