//! Candidate retrieval over the vector index.
//!
//! Retrieval is a filter cascade, applied in a fixed order:
//! 1. Embed the query and take the `k_retriever` nearest neighbors
//! 2. Drop sentinel ids and ids with no metadata record
//! 3. Recover chunk text from the corpus at the recorded window position
//! 4. Keep only requested sections (case-insensitive, when requested)
//! 5. Drop chunks below the minimum-length threshold
//!
//! Every drop is logged with its reason; an empty result is a normal
//! outcome that the pipeline answers with the fixed not-found response.

use std::sync::Arc;

use bioastra_common::config::RetrievalConfig;
use bioastra_common::{Embedder, Result};
use bioastra_index::{CorpusStore, MetadataStore, VectorIndex, NO_MATCH_ID};
use tracing::{debug, instrument, warn};

/// A retrieval candidate with resolved text and provenance.
#[derive(Debug, Clone)]
pub struct CandidateChunk {
    /// Vector id the candidate was retrieved under
    pub vector_id: i64,
    /// Document the chunk was cut from
    pub source_file: String,
    /// Window position within the document
    pub chunk_index: usize,
    /// Section tag, `"unknown"` when the record carries none
    pub section: String,
    /// Chunk text re-derived from the corpus
    pub text: String,
    /// Squared L2 distance reported by the index (lower is closer)
    pub distance: f32,
}

/// Retrieves and filters nearest-neighbor candidates for a query.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<VectorIndex>,
    metadata: Arc<MetadataStore>,
    corpus: CorpusStore,
    k_retriever: usize,
    min_chunk_chars: usize,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<VectorIndex>,
        metadata: Arc<MetadataStore>,
        corpus: CorpusStore,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            metadata,
            corpus,
            k_retriever: config.k_retriever,
            min_chunk_chars: config.min_chunk_chars,
        }
    }

    /// Run the retrieval cascade for `query`, optionally restricted to
    /// `sections`.
    #[instrument(skip(self, query), fields(k = self.k_retriever, sections = sections.len()))]
    pub async fn retrieve(&self, query: &str, sections: &[String]) -> Result<Vec<CandidateChunk>> {
        let embedding = self.embedder.embed(query).await?;
        let (distances, ids) = self.index.search(&embedding, self.k_retriever)?;

        let mut candidates = Vec::new();
        for (id, distance) in ids.into_iter().zip(distances) {
            if id == NO_MATCH_ID {
                continue;
            }
            let record = match self.metadata.lookup(id) {
                Some(record) => record,
                None => {
                    warn!(vector_id = id, "Dropping candidate: no metadata record");
                    continue;
                }
            };
            let text = match self.corpus.chunk_of(&record.source_file, record.chunk_index) {
                Some(text) => text,
                // chunk_of logs the reason
                None => continue,
            };
            let section = record.section_tag().to_string();
            if !sections.is_empty()
                && !sections
                    .iter()
                    .any(|wanted| wanted.eq_ignore_ascii_case(&section))
            {
                debug!(
                    vector_id = id,
                    section = %section,
                    "Dropping candidate: section not requested"
                );
                continue;
            }
            let char_count = text.chars().count();
            if char_count < self.min_chunk_chars {
                debug!(
                    vector_id = id,
                    chars = char_count,
                    "Dropping candidate: below minimum length"
                );
                continue;
            }
            candidates.push(CandidateChunk {
                vector_id: id,
                source_file: record.source_file.clone(),
                chunk_index: record.chunk_index,
                section,
                text,
                distance,
            });
        }

        debug!(candidates = candidates.len(), "Retrieval cascade complete");
        Ok(candidates)
    }
}
