//! Axum route handlers for the Lecture API.
//!
//! Every route is scoped to `/api/v1/courses/:course_id/lectures/:lecture_id`.

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::lecture::pipeline::{
    BibliographyOutput, BibliographyQuery, BibliographySummaryInput, BriefInput, DraftInput,
    GlossaryInput, OutlineInput, PresentationInput, RevisionInput, SourcesOutput, UploadedFile,
};
use crate::lecture::validate_id;
use crate::models::lecture::{LectureInfo, StepOutput};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LecturePath {
    pub course_id: String,
    pub lecture_id: String,
}

impl LecturePath {
    fn validate(&self) -> Result<(), AppError> {
        validate_id("course_id", &self.course_id)?;
        validate_id("lecture_id", &self.lecture_id)
    }
}

fn validate_lecture(lecture: &LectureInfo) -> Result<(), AppError> {
    if lecture.title.trim().is_empty() {
        return Err(AppError::Validation("lecture.title cannot be empty".to_string()));
    }
    if lecture.target_length == 0 {
        return Err(AppError::Validation(
            "lecture.target_length must be positive".to_string(),
        ));
    }
    Ok(())
}

/// POST .../sources
///
/// Multipart upload of PDF, TXT or Markdown files; every file field is processed.
pub async fn handle_upload_sources(
    State(state): State<AppState>,
    Path(path): Path<LecturePath>,
    mut multipart: Multipart,
) -> Result<Json<SourcesOutput>, AppError> {
    path.validate()?;

    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("failed to read '{filename}': {e}")))?;
        files.push(UploadedFile { filename, bytes });
    }

    let output = state
        .pipeline
        .run_sources_step(&path.course_id, &path.lecture_id, files)
        .await?;
    Ok(Json(output))
}

/// POST .../bibliography
pub async fn handle_bibliography(
    State(state): State<AppState>,
    Path(path): Path<LecturePath>,
    Json(query): Json<BibliographyQuery>,
) -> Result<Json<BibliographyOutput>, AppError> {
    path.validate()?;
    let output = state
        .pipeline
        .run_bibliography_step(&path.course_id, &path.lecture_id, &query)
        .await?;
    Ok(Json(output))
}

/// POST .../bibliography/summary
pub async fn handle_bibliography_summary(
    State(state): State<AppState>,
    Path(path): Path<LecturePath>,
    Json(input): Json<BibliographySummaryInput>,
) -> Result<Json<StepOutput>, AppError> {
    path.validate()?;
    let output = state
        .pipeline
        .run_bibliography_summary_step(&path.course_id, &path.lecture_id, input)
        .await?;
    Ok(Json(output))
}

/// POST .../outline
pub async fn handle_outline(
    State(state): State<AppState>,
    Path(path): Path<LecturePath>,
    Json(input): Json<OutlineInput>,
) -> Result<Json<StepOutput>, AppError> {
    path.validate()?;
    validate_lecture(&input.lecture)?;
    let output = state
        .pipeline
        .run_outline_step(&path.course_id, &path.lecture_id, input)
        .await?;
    Ok(Json(output))
}

/// POST .../draft
///
/// Length-guaranteed: the response reports whether `lecture.target_length` was reached.
pub async fn handle_draft(
    State(state): State<AppState>,
    Path(path): Path<LecturePath>,
    Json(input): Json<DraftInput>,
) -> Result<Json<StepOutput>, AppError> {
    path.validate()?;
    validate_lecture(&input.lecture)?;
    let output = state
        .pipeline
        .run_draft_step(&path.course_id, &path.lecture_id, input)
        .await?;
    Ok(Json(output))
}

/// POST .../revision
pub async fn handle_revision(
    State(state): State<AppState>,
    Path(path): Path<LecturePath>,
    Json(input): Json<RevisionInput>,
) -> Result<Json<StepOutput>, AppError> {
    path.validate()?;
    validate_lecture(&input.lecture)?;
    let output = state
        .pipeline
        .run_revision_step(&path.course_id, &path.lecture_id, input)
        .await?;
    Ok(Json(output))
}

/// POST .../glossary
pub async fn handle_glossary(
    State(state): State<AppState>,
    Path(path): Path<LecturePath>,
    Json(input): Json<GlossaryInput>,
) -> Result<Json<StepOutput>, AppError> {
    path.validate()?;
    let output = state
        .pipeline
        .run_glossary_step(&path.course_id, &path.lecture_id, input)
        .await?;
    Ok(Json(output))
}

/// POST .../presentation-prompt
pub async fn handle_presentation_prompt(
    State(state): State<AppState>,
    Path(path): Path<LecturePath>,
    Json(input): Json<PresentationInput>,
) -> Result<Json<StepOutput>, AppError> {
    path.validate()?;
    let output = state
        .pipeline
        .run_presentation_prompt_step(&path.course_id, &path.lecture_id, input)
        .await?;
    Ok(Json(output))
}

/// POST .../brief
pub async fn handle_brief(
    State(state): State<AppState>,
    Path(path): Path<LecturePath>,
    Json(input): Json<BriefInput>,
) -> Result<Json<StepOutput>, AppError> {
    path.validate()?;
    validate_lecture(&input.lecture)?;
    let output = state
        .pipeline
        .run_brief_step(&path.course_id, &path.lecture_id, input)
        .await?;
    Ok(Json(output))
}
