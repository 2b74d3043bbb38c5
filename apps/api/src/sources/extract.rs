//! Text extraction from uploaded source files.

use std::path::Path;

use thiserror::Error;
use tracing::{info, warn};

/// Joiner between documents when several files are uploaded together.
pub const DOCUMENT_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported file type: {0}")]
    Unsupported(String),

    #[error("Failed to extract text from PDF '{file}': {message}")]
    Pdf { file: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Pdf,
    PlainText,
}

impl SourceFormat {
    pub fn from_filename(filename: &str) -> Result<Self, ExtractError> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => Ok(SourceFormat::Pdf),
            "txt" | "md" | "markdown" => Ok(SourceFormat::PlainText),
            "" => Err(ExtractError::Unsupported(format!("'{filename}' has no extension"))),
            other => Err(ExtractError::Unsupported(format!(".{other}"))),
        }
    }
}

/// Extracts and normalises the text of one uploaded file.
pub fn extract_text(bytes: &[u8], filename: &str) -> Result<String, ExtractError> {
    let raw = match SourceFormat::from_filename(filename)? {
        SourceFormat::Pdf => pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
            ExtractError::Pdf {
                file: filename.to_string(),
                message: e.to_string(),
            }
        })?,
        SourceFormat::PlainText => match String::from_utf8(bytes.to_vec()) {
            Ok(text) => text,
            Err(_) => {
                warn!(file = filename, "Source is not valid UTF-8, decoding lossily");
                String::from_utf8_lossy(bytes).into_owned()
            }
        },
    };

    let text = normalize_text(&raw);
    if text.is_empty() {
        // Scanned PDFs extract to nothing; OCR is out of scope.
        warn!(file = filename, "No text extracted");
    } else {
        info!(file = filename, chars = text.chars().count(), "Source text extracted");
    }
    Ok(text)
}

/// Collapses runs of spaces, keeps at most one blank line between paragraphs,
/// strips trailing whitespace per line and removes zero-width characters.
pub fn normalize_text(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0usize;

    for line in text.split('\n') {
        let mut cleaned = String::with_capacity(line.len());
        let mut prev_space = false;
        for ch in line.chars() {
            if is_zero_width(ch) {
                continue;
            }
            if ch == ' ' {
                if prev_space {
                    continue;
                }
                prev_space = true;
            } else {
                prev_space = false;
            }
            cleaned.push(ch);
        }
        let cleaned = cleaned.trim_end();

        if cleaned.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(cleaned);
        out.push('\n');
    }

    out.trim().to_string()
}

fn is_zero_width(ch: char) -> bool {
    matches!(ch, '\u{200b}'..='\u{200f}' | '\u{feff}')
}

/// Joins extracted documents, skipping empty ones.
pub fn join_documents<S: AsRef<str>>(documents: &[S]) -> String {
    documents
        .iter()
        .map(|d| d.as_ref().trim())
        .filter(|d| !d.is_empty())
        .collect::<Vec<_>>()
        .join(DOCUMENT_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_filename() {
        assert_eq!(SourceFormat::from_filename("paper.PDF").unwrap(), SourceFormat::Pdf);
        assert_eq!(
            SourceFormat::from_filename("notes.md").unwrap(),
            SourceFormat::PlainText
        );
        assert!(matches!(
            SourceFormat::from_filename("slides.pptx"),
            Err(ExtractError::Unsupported(_))
        ));
        assert!(SourceFormat::from_filename("README").is_err());
    }

    #[test]
    fn test_normalize_collapses_spaces_and_blank_lines() {
        let raw = "First   line  \r\n\n\n\nSecond\u{200b} line\n\n\nThird";
        assert_eq!(normalize_text(raw), "First line\n\nSecond line\n\nThird");
    }

    #[test]
    fn test_normalize_strips_bom() {
        assert_eq!(normalize_text("\u{feff}Title"), "Title");
    }

    #[test]
    fn test_extract_plain_text() {
        let text = extract_text("Привет,   мир.\n".as_bytes(), "notes.txt").unwrap();
        assert_eq!(text, "Привет, мир.");
    }

    #[test]
    fn test_extract_invalid_pdf_is_error() {
        let err = extract_text(b"not a pdf", "broken.pdf").unwrap_err();
        assert!(matches!(err, ExtractError::Pdf { .. }));
    }

    #[test]
    fn test_join_documents_skips_empty() {
        assert_eq!(join_documents(&["one", "  ", "two"]), "one\n\n---\n\ntwo");
    }
}
