//! Text chunking module
//!
//! Splits extracted resume text into sentence-level chunks for embedding.
//! Fragments shorter than the minimum are dropped and the surviving chunks
//! are re-indexed so indices stay contiguous from zero.

use pitchforge_common::vector::MIN_CHUNK_CHARS;
use tracing::debug;

/// A text chunk with its position in the document
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    /// The chunk content, trimmed
    pub content: String,
    /// Index of this chunk among the surviving chunks
    pub index: i32,
}

/// Split text into sentence chunks
///
/// Sentences end at '.', '!', '?', or a blank line. Each surviving chunk is a
/// trimmed sentence of at least [`MIN_CHUNK_CHARS`] characters, and chunk
/// order follows document order.
pub fn chunk_text(text: &str) -> Vec<TextChunk> {
    let mut sentences = Vec::new();

    // Blank lines act as hard sentence boundaries in resumes, so headings
    // without punctuation still become their own chunks.
    for paragraph in text.split("\n\n") {
        let paragraph = paragraph.replace('\n', " ");
        let mut current = String::new();

        for ch in paragraph.chars() {
            current.push(ch);
            if matches!(ch, '.' | '!' | '?') {
                sentences.push(std::mem::take(&mut current));
            }
        }
        if !current.trim().is_empty() {
            sentences.push(current);
        }
    }

    let chunks: Vec<TextChunk> = sentences
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| s.chars().count() >= MIN_CHUNK_CHARS)
        .enumerate()
        .map(|(i, content)| TextChunk {
            content,
            index: i as i32,
        })
        .collect();

    debug!(
        input_len = text.len(),
        chunk_count = chunks.len(),
        "Text chunked"
    );

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_chunking() {
        let text = "Led a team of five engineers. Shipped a payments platform in Rust. \
                    Reduced API latency by forty percent.";
        let chunks = chunk_text(text);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content, "Led a team of five engineers.");
        assert_eq!(chunks[1].content, "Shipped a payments platform in Rust.");
        assert_eq!(chunks[2].content, "Reduced API latency by forty percent.");
    }

    #[test]
    fn test_indices_are_contiguous_after_filtering() {
        // Short fragments between real sentences are dropped
        let text = "Yes. Built distributed ingestion pipelines at scale. No. \
                    Maintained high-throughput gRPC services in production.";
        let chunks = chunk_text(text);

        assert_eq!(chunks.len(), 2);
        let indices: Vec<i32> = chunks.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn test_chunks_preserve_document_order() {
        let text = "First achievement described here. Second achievement described here. \
                    Third achievement described here.";
        let chunks = chunk_text(text);

        let positions: Vec<usize> = chunks
            .iter()
            .map(|c| text.find(c.content.as_str()).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_every_chunk_meets_minimum_length() {
        let text = "Hi. Ok. A genuinely substantial sentence about backend work. X.";
        let chunks = chunk_text(text);

        assert_eq!(chunks.len(), 1);
        for chunk in &chunks {
            assert!(chunk.content.chars().count() >= MIN_CHUNK_CHARS);
        }
    }

    #[test]
    fn test_blank_lines_split_headings() {
        let text = "PROFESSIONAL EXPERIENCE SECTION\n\nDesigned event-driven systems on AWS.";
        let chunks = chunk_text(text);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "PROFESSIONAL EXPERIENCE SECTION");
    }

    #[test]
    fn test_empty_text() {
        assert!(chunk_text("").is_empty());
        assert!(chunk_text("   \n\n  ").is_empty());
    }
}
