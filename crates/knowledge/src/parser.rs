//! Source file parsing and text extraction.
//!
//! Ingestion accepts plain text and markdown. PDF extraction is out of
//! scope; upload callers pass already-extracted text.

use scholar_core::{AppError, AppResult};
use std::fs;
use std::path::Path;

/// Content type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Markdown,
    PlainText,
    Unknown,
}

impl ContentType {
    /// Detect content type from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("md") | Some("markdown") => Self::Markdown,
            Some("txt") | Some("text") => Self::PlainText,
            _ => Self::Unknown,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::PlainText => "text",
            Self::Unknown => "unknown",
        }
    }
}

/// Parse a source file and extract clean text.
pub fn parse_file(path: &Path) -> AppResult<String> {
    let content_type = ContentType::from_path(path);

    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e)))?;

    let cleaned = match content_type {
        ContentType::Markdown => clean_markdown(&raw),
        ContentType::PlainText => raw,
        ContentType::Unknown => {
            if is_likely_text(&raw) {
                raw
            } else {
                tracing::warn!("Skipping likely binary file: {:?}", path);
                return Err(AppError::Knowledge("Binary file not supported".to_string()));
            }
        }
    };

    Ok(cleaned)
}

/// Clean markdown by stripping structural noise that adds no retrieval value.
fn clean_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_code_fence = false;

    for line in text.lines() {
        let trimmed = line.trim();

        // Code fences toggle, and their contents are kept verbatim
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_code_fence = !in_code_fence;
            continue;
        }

        if in_code_fence {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        // Skip horizontal rules
        if trimmed == "---" || trimmed == "***" {
            continue;
        }

        // Headers keep their text without the marker
        let cleaned = trimmed.trim_start_matches('#').trim_start();
        result.push_str(cleaned);
        result.push('\n');
    }

    result
}

/// Heuristic check for text content (absence of NUL bytes).
fn is_likely_text(content: &str) -> bool {
    !content.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_content_type_detection() {
        assert_eq!(
            ContentType::from_path(Path::new("notes.md")),
            ContentType::Markdown
        );
        assert_eq!(
            ContentType::from_path(Path::new("paper.txt")),
            ContentType::PlainText
        );
        assert_eq!(
            ContentType::from_path(Path::new("data.bin")),
            ContentType::Unknown
        );
    }

    #[test]
    fn test_parse_markdown_strips_headers() {
        let mut file = NamedTempFile::with_suffix(".md").unwrap();
        writeln!(file, "# Title\n\nBody text\n\n---\n\nMore text").unwrap();

        let text = parse_file(file.path()).unwrap();
        assert!(text.contains("Title"));
        assert!(!text.contains('#'));
        assert!(!text.contains("---"));
        assert!(text.contains("Body text"));
    }

    #[test]
    fn test_markdown_keeps_code_fence_contents() {
        let mut file = NamedTempFile::with_suffix(".md").unwrap();
        writeln!(file, "intro\n```\nlet x = 1;\n```\noutro").unwrap();

        let text = parse_file(file.path()).unwrap();
        assert!(text.contains("let x = 1;"));
        assert!(!text.contains("```"));
    }

    #[test]
    fn test_parse_plain_text_verbatim() {
        let mut file = NamedTempFile::with_suffix(".txt").unwrap();
        writeln!(file, "# not a header in txt").unwrap();

        let text = parse_file(file.path()).unwrap();
        assert!(text.contains("# not a header in txt"));
    }
}
