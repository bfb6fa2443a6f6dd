//! Cross-encoder reranking of retrieval candidates.
//!
//! Every candidate that survived the retrieval cascade is re-scored
//! against the query in a single batch, then sorted by score. A scorer
//! failure degrades to the coarse retrieval order instead of failing the
//! request; the generation step can still work with distance-ordered
//! context.

use std::cmp::Ordering;
use std::sync::Arc;

use bioastra_common::config::RetrievalConfig;
use bioastra_common::Scorer;
use tracing::{debug, warn};

use crate::retriever::CandidateChunk;

/// A candidate with its cross-encoder relevance score.
#[derive(Debug, Clone)]
pub struct RankedChunk {
    pub chunk: CandidateChunk,
    pub score: f32,
}

/// Reorders candidates by pairwise query relevance.
pub struct Reranker {
    scorer: Arc<dyn Scorer>,
    k_reranker: usize,
}

impl Reranker {
    pub fn new(scorer: Arc<dyn Scorer>, config: &RetrievalConfig) -> Self {
        Self {
            scorer,
            k_reranker: config.k_reranker,
        }
    }

    /// Score all candidates and return the top `k_reranker` sorted by
    /// score descending. Ties keep their retrieval order. On scorer
    /// failure the retrieval order stands, with zeroed scores.
    pub async fn rerank(&self, query: &str, candidates: Vec<CandidateChunk>) -> Vec<RankedChunk> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
        let scores = match self.scorer.score(query, &texts).await {
            Ok(scores) if scores.len() == candidates.len() => scores,
            Ok(scores) => {
                warn!(
                    expected = candidates.len(),
                    got = scores.len(),
                    "Scorer returned wrong score count; keeping retrieval order"
                );
                vec![0.0; candidates.len()]
            }
            Err(e) => {
                warn!(error = %e, "Reranking failed; keeping retrieval order");
                vec![0.0; candidates.len()]
            }
        };

        let mut ranked: Vec<RankedChunk> = candidates
            .into_iter()
            .zip(scores)
            .map(|(chunk, score)| RankedChunk { chunk, score })
            .collect();
        // Stable sort: equal scores retain retrieval order.
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        ranked.truncate(self.k_reranker);

        debug!(kept = ranked.len(), "Reranking complete");
        ranked
    }
}
