//! Word-window chunking
//!
//! Splits a document's whitespace-delimited word sequence into overlapping
//! fixed-size windows. Ingestion and query-time text recovery both go
//! through these functions; identical inputs must yield byte-identical
//! windows on both sides or retrieved text will not align with embeddings.

use serde::{Deserialize, Serialize};

use bioastra_common::config::ChunkingConfig;

/// Chunking parameters, pinned alongside the index by the manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingParams {
    /// Window size in words
    pub chunk_size: usize,
    /// Word overlap between consecutive windows
    pub overlap: usize,
}

impl Default for ChunkingParams {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            overlap: 50,
        }
    }
}

impl From<&ChunkingConfig> for ChunkingParams {
    fn from(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            overlap: config.overlap,
        }
    }
}

impl ChunkingParams {
    /// Words the window start advances by each step
    pub fn stride(&self) -> usize {
        self.chunk_size.saturating_sub(self.overlap).max(1)
    }
}

/// Split `text` into overlapping word windows. Every start position below
/// the word count produces a window; the last windows may be shorter than
/// `chunk_size`. Joining with single spaces normalizes whitespace.
pub fn chunk_words(text: &str, params: &ChunkingParams) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let stride = params.stride();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < words.len() {
        let end = (start + params.chunk_size).min(words.len());
        chunks.push(words[start..end].join(" "));
        start += stride;
    }

    chunks
}

/// Return the window at `index` without materializing the full sequence,
/// or `None` when `index` is out of range
pub fn get_chunk(text: &str, index: usize, params: &ChunkingParams) -> Option<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let start = index.checked_mul(params.stride())?;
    if start >= words.len() {
        return None;
    }

    let end = (start + params.chunk_size).min(words.len());
    Some(words[start..end].join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_window_arithmetic() {
        let params = ChunkingParams {
            chunk_size: 4,
            overlap: 1,
        };
        let chunks = chunk_words(&words(10), &params);

        // stride 3: starts at 0, 3, 6, 9
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0], "w0 w1 w2 w3");
        assert_eq!(chunks[1], "w3 w4 w5 w6");
        assert_eq!(chunks[2], "w6 w7 w8 w9");
        assert_eq!(chunks[3], "w9");
    }

    #[test]
    fn test_chunking_is_deterministic() {
        let text = words(2000);
        let params = ChunkingParams::default();
        assert_eq!(chunk_words(&text, &params), chunk_words(&text, &params));
    }

    #[test]
    fn test_get_chunk_matches_full_enumeration() {
        let text = words(1200);
        let params = ChunkingParams {
            chunk_size: 512,
            overlap: 50,
        };
        let chunks = chunk_words(&text, &params);

        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(get_chunk(&text, i, &params).as_ref(), Some(chunk));
        }
        assert_eq!(get_chunk(&text, chunks.len(), &params), None);
    }

    #[test]
    fn test_empty_text() {
        let params = ChunkingParams::default();
        assert!(chunk_words("", &params).is_empty());
        assert!(chunk_words("   \n\t ", &params).is_empty());
        assert_eq!(get_chunk("", 0, &params), None);
    }

    #[test]
    fn test_whitespace_normalization() {
        let params = ChunkingParams {
            chunk_size: 8,
            overlap: 0,
        };
        let chunks = chunk_words("alpha\tbeta\n\ngamma  delta", &params);
        assert_eq!(chunks, vec!["alpha beta gamma delta"]);
    }

    #[test]
    fn test_short_document_single_window() {
        let params = ChunkingParams::default();
        let chunks = chunk_words(&words(100), &params);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].split_whitespace().count(), 100);
    }
}
