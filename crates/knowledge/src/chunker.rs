//! Text chunking with configurable size and overlap.

use crate::types::ChunkCandidate;

/// Chunk text into overlapping segments.
///
/// Character-based chunking with UTF-8 boundary handling. Defaults elsewhere
/// are 1000 characters with a 200-character overlap, the standard settings
/// for paper abstracts and document Q&A.
pub fn chunk_text(
    source_id: &str,
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Vec<ChunkCandidate> {
    if text.is_empty() || chunk_size == 0 {
        return vec![];
    }

    let mut chunks = Vec::new();
    let mut position = 0u32;
    let mut start = 0;

    while start < text.len() {
        // Find valid UTF-8 boundary for end position
        let mut end = (start + chunk_size).min(text.len());
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }

        let chunk_text = &text[start..end];

        // Skip trailing fragments under 10% of chunk_size
        if chunk_text.len() < chunk_size / 10 {
            break;
        }

        chunks.push(ChunkCandidate {
            source_id: source_id.to_string(),
            position,
            text: chunk_text.trim().to_string(),
            metadata: serde_json::json!({
                "start": start,
                "end": end,
            }),
        });

        position += 1;

        // Move forward by (chunk_size - overlap)
        let step = if chunk_size > overlap {
            chunk_size - overlap
        } else {
            chunk_size
        };

        // Find valid UTF-8 boundary for next start position
        let mut next_start = start + step;
        while next_start < text.len() && !text.is_char_boundary(next_start) {
            next_start += 1;
        }
        start = next_start;
    }

    tracing::debug!(
        "Chunked text into {} chunks (size: {}, overlap: {})",
        chunks.len(),
        chunk_size,
        overlap
    );

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_text_basic() {
        let text = "a".repeat(1000);
        let chunks = chunk_text("test-source", &text, 200, 50);

        assert!(!chunks.is_empty());
        assert_eq!(chunks[0].position, 0);
        assert_eq!(chunks[1].position, 1);
    }

    #[test]
    fn test_chunk_text_no_overlap() {
        let text = "a".repeat(300);
        let chunks = chunk_text("test-source", &text, 100, 0);

        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn test_chunk_text_empty() {
        let chunks = chunk_text("test-source", "", 100, 10);
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_chunk_text_with_overlap() {
        let text = "abcdefghij".repeat(30);
        let chunks = chunk_text("test-source", &text, 100, 20);

        assert!(chunks.len() >= 2);
        // Adjacent chunks share the overlap region
        let first = &chunks[0].text;
        let second = &chunks[1].text;
        let tail: String = first.chars().skip(first.len() - 20).collect();
        assert!(second.starts_with(&tail));
    }

    #[test]
    fn test_chunk_text_utf8_boundaries() {
        let text = "héllo wörld ünïcode ".repeat(50);
        let chunks = chunk_text("test-source", &text, 97, 13);

        // Must not panic on multi-byte boundaries, and all chunks are valid
        for chunk in &chunks {
            assert!(!chunk.text.is_empty());
        }
    }

    #[test]
    fn test_small_trailing_fragment_dropped() {
        let text = "a".repeat(105);
        let chunks = chunk_text("test-source", &text, 100, 0);

        // Trailing 5 chars are under the 10% floor
        assert_eq!(chunks.len(), 1);
    }
}
