//! Artifact store: one file per lecture step under `<root>/<course_id>/`.

use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::lecture::LectureStep;

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<course_id>/<lecture_id>_<step>.<ext>`
    pub fn path_for(&self, course_id: &str, lecture_id: &str, step: LectureStep) -> PathBuf {
        self.root
            .join(course_id)
            .join(format!("{lecture_id}_{}.{}", step.as_str(), step.extension()))
    }

    pub async fn write_text(
        &self,
        course_id: &str,
        lecture_id: &str,
        step: LectureStep,
        text: &str,
    ) -> io::Result<PathBuf> {
        let path = self.path_for(course_id, lecture_id, step);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&path, text).await?;
        debug!(path = %path.display(), bytes = text.len(), "Artifact written");
        Ok(path)
    }

    pub async fn write_json<T: Serialize>(
        &self,
        course_id: &str,
        lecture_id: &str,
        step: LectureStep,
        value: &T,
    ) -> io::Result<PathBuf> {
        let json = serde_json::to_string_pretty(value)?;
        self.write_text(course_id, lecture_id, step, &json).await
    }

    /// The stored text, or `None` when the step has not run yet.
    pub async fn read_text(
        &self,
        course_id: &str,
        lecture_id: &str,
        step: LectureStep,
    ) -> io::Result<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(course_id, lecture_id, step)).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn read_json<T: DeserializeOwned>(
        &self,
        course_id: &str,
        lecture_id: &str,
        step: LectureStep,
    ) -> io::Result<Option<T>> {
        match self.read_text(course_id, lecture_id, step).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openalex::Bibliography;

    #[tokio::test]
    async fn test_write_then_read_text() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        let path = store
            .write_text("lit-101", "lec1", LectureStep::Outline, "# Outline")
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("lit-101").join("lec1_outline.md"));

        let text = store
            .read_text("lit-101", "lec1", LectureStep::Outline)
            .await
            .unwrap();
        assert_eq!(text.as_deref(), Some("# Outline"));
    }

    #[tokio::test]
    async fn test_missing_artifact_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let text = store
            .read_text("lit-101", "lec1", LectureStep::Draft)
            .await
            .unwrap();
        assert!(text.is_none());
    }

    #[tokio::test]
    async fn test_json_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let path = store
            .write_json("c", "l", LectureStep::Bibliography, &Bibliography::default())
            .await
            .unwrap();
        assert!(path.ends_with("c/l_bibliography.json"));

        let back: Option<Bibliography> = store
            .read_json("c", "l", LectureStep::Bibliography)
            .await
            .unwrap();
        assert_eq!(back, Some(Bibliography::default()));
    }
}
