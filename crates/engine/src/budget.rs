//! Greedy context assembly under a token budget.
//!
//! Chunks are taken in rank order and the walk stops at the first chunk
//! that would overflow the budget; nothing is truncated and nothing after
//! the first overflow is considered, even if it would fit. The separator
//! does not count against the budget, only chunk text does.

use tracing::debug;

use crate::reranker::RankedChunk;

/// Separator between chunks in the assembled context.
pub const CHUNK_SEPARATOR: &str = "\n\n---\n\n";

/// The budget-constrained concatenation of top chunks, with the distinct
/// source files that contributed to it.
#[derive(Debug, Clone, Default)]
pub struct ContextWindow {
    pub context: String,
    pub sources: Vec<String>,
}

impl ContextWindow {
    pub fn is_empty(&self) -> bool {
        self.context.is_empty()
    }
}

/// Word-count size approximation, used when no backend tokenizer is
/// wired in.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Assemble the context window from `ranked`, in order, including each
/// chunk only while the running total stays within `limit` as measured
/// by `size_fn`. Source files are deduplicated in first-appearance
/// order. An empty result is a normal outcome.
pub fn build_context<F>(ranked: &[RankedChunk], limit: usize, size_fn: F) -> ContextWindow
where
    F: Fn(&str) -> usize,
{
    let mut included: Vec<&str> = Vec::new();
    let mut sources: Vec<String> = Vec::new();
    let mut total = 0usize;

    for entry in ranked {
        let contribution = size_fn(&entry.chunk.text);
        if total + contribution > limit {
            break;
        }
        total += contribution;
        included.push(&entry.chunk.text);
        if !sources.contains(&entry.chunk.source_file) {
            sources.push(entry.chunk.source_file.clone());
        }
    }

    debug!(
        chunks = included.len(),
        size = total,
        limit,
        "Context window assembled"
    );
    ContextWindow {
        context: included.join(CHUNK_SEPARATOR),
        sources,
    }
}
