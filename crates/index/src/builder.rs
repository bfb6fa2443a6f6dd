//! Index builder
//!
//! The offline pass producing the three artifacts the request pipeline
//! serves from: vector index, metadata JSON, and manifest. Documents are
//! walked in alphabetical order so vector ids stay stable across rebuilds
//! of an unchanged corpus.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, instrument, warn};

use bioastra_common::backend::Embedder;
use bioastra_common::errors::{AppError, Result};
use bioastra_common::metrics::{record_embedding, record_index_build};

use crate::chunker::chunk_words;
use crate::corpus::CorpusStore;
use crate::manifest::{compute_corpus_checksum, IndexManifest, MANIFEST_SCHEMA_VERSION};
use crate::metadata::{ChunkMetadata, MetadataStore};
use crate::vector::VectorIndex;

/// The three in-memory artifacts of one build pass
pub struct BuildArtifacts {
    pub index: VectorIndex,
    pub metadata: MetadataStore,
    pub manifest: IndexManifest,
}

/// Offline index builder
pub struct IndexBuilder {
    embedder: Arc<dyn Embedder>,
    corpus: CorpusStore,
    sections: HashMap<String, String>,
}

impl IndexBuilder {
    pub fn new(embedder: Arc<dyn Embedder>, corpus: CorpusStore) -> Self {
        Self {
            embedder,
            corpus,
            sections: HashMap::new(),
        }
    }

    /// Attach a source-file to section-tag mapping
    pub fn with_sections(mut self, sections: HashMap<String, String>) -> Self {
        self.sections = sections;
        self
    }

    /// Load the optional sections sidecar file
    pub fn load_sections(path: impl AsRef<Path>) -> Result<HashMap<String, String>> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(AppError::Configuration {
                message: format!("sections file not found: {}", path.display()),
            });
        }
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Chunk and embed the whole corpus
    #[instrument(skip(self), fields(corpus_dir = %self.corpus.dir().display()))]
    pub async fn build(&self) -> Result<BuildArtifacts> {
        let started = Instant::now();

        let documents = self.corpus.list_documents()?;
        if documents.is_empty() {
            return Err(AppError::Configuration {
                message: format!(
                    "no .txt documents in corpus directory {}",
                    self.corpus.dir().display()
                ),
            });
        }

        let mut index = VectorIndex::new(self.embedder.dimension());
        let mut metadata = MetadataStore::new();
        let mut next_id: i64 = 0;
        let mut document_count = 0;
        let mut chunk_count = 0;

        for source_file in &documents {
            let text = self.corpus.read_document(source_file)?;
            let chunks = chunk_words(&text, self.corpus.params());
            if chunks.is_empty() {
                warn!(source_file = %source_file, "Skipping document with no words");
                continue;
            }

            let embed_started = Instant::now();
            let embeddings = match self.embedder.embed_batch(&chunks).await {
                Ok(embeddings) => {
                    record_embedding(
                        embed_started.elapsed().as_secs_f64(),
                        self.embedder.model_name(),
                        true,
                    );
                    embeddings
                }
                Err(e) => {
                    record_embedding(
                        embed_started.elapsed().as_secs_f64(),
                        self.embedder.model_name(),
                        false,
                    );
                    return Err(e);
                }
            };

            let section = self.sections.get(source_file).cloned();
            for (chunk_index, embedding) in embeddings.iter().enumerate() {
                index.add(next_id, embedding)?;
                metadata.insert(
                    next_id,
                    ChunkMetadata {
                        source_file: source_file.clone(),
                        chunk_index,
                        section: section.clone(),
                    },
                );
                next_id += 1;
            }

            document_count += 1;
            chunk_count += chunks.len();
            info!(
                source_file = %source_file,
                chunks = chunks.len(),
                "Document indexed"
            );
        }

        let manifest = IndexManifest {
            schema_version: MANIFEST_SCHEMA_VERSION.to_string(),
            built_at: Utc::now(),
            embedding_model: self.embedder.model_name().to_string(),
            dimension: self.embedder.dimension(),
            chunk_size: self.corpus.params().chunk_size,
            chunk_overlap: self.corpus.params().overlap,
            document_count,
            vector_count: index.len(),
            corpus_checksum: compute_corpus_checksum(&self.corpus)?,
        };

        record_index_build(started.elapsed().as_secs_f64(), document_count, chunk_count);
        info!(
            documents = document_count,
            vectors = index.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Index build complete"
        );

        Ok(BuildArtifacts {
            index,
            metadata,
            manifest,
        })
    }

    /// Build and persist all three artifacts
    pub async fn build_and_write(
        &self,
        index_path: impl AsRef<Path>,
        metadata_path: impl AsRef<Path>,
        manifest_path: impl AsRef<Path>,
    ) -> Result<IndexManifest> {
        let artifacts = self.build().await?;
        artifacts.index.save(index_path)?;
        artifacts.metadata.save(metadata_path)?;
        artifacts.manifest.write(manifest_path)?;
        Ok(artifacts.manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::ChunkingParams;
    use bioastra_common::backend::MockEmbedder;

    fn corpus_with(docs: &[(&str, &str)]) -> (tempfile::TempDir, CorpusStore) {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in docs {
            fs::write(dir.path().join(name), content).unwrap();
        }
        let store = CorpusStore::new(
            dir.path(),
            ChunkingParams {
                chunk_size: 8,
                overlap: 2,
            },
        );
        (dir, store)
    }

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[tokio::test]
    async fn test_build_assigns_sequential_ids() {
        // 20 words at stride 6: starts 0, 6, 12, 18 -> 4 chunks
        // 10 words at stride 6: starts 0, 6 -> 2 chunks
        let (_dir, store) = corpus_with(&[("a.txt", &words(20)), ("b.txt", &words(10))]);
        let builder = IndexBuilder::new(Arc::new(MockEmbedder::new(16)), store);

        let artifacts = builder.build().await.unwrap();

        assert_eq!(artifacts.index.len(), 6);
        assert_eq!(artifacts.metadata.len(), 6);
        assert_eq!(artifacts.manifest.document_count, 2);
        assert_eq!(artifacts.manifest.vector_count, 6);

        let first = artifacts.metadata.lookup(0).unwrap();
        assert_eq!(first.source_file, "a.txt");
        assert_eq!(first.chunk_index, 0);

        let fifth = artifacts.metadata.lookup(4).unwrap();
        assert_eq!(fifth.source_file, "b.txt");
        assert_eq!(fifth.chunk_index, 0);
    }

    #[tokio::test]
    async fn test_build_skips_empty_documents() {
        let (_dir, store) = corpus_with(&[("a.txt", "   \n  "), ("b.txt", &words(5))]);
        let builder = IndexBuilder::new(Arc::new(MockEmbedder::new(16)), store);

        let artifacts = builder.build().await.unwrap();
        assert_eq!(artifacts.manifest.document_count, 1);
        assert_eq!(artifacts.index.len(), 1);
        assert_eq!(artifacts.metadata.lookup(0).unwrap().source_file, "b.txt");
    }

    #[tokio::test]
    async fn test_build_empty_corpus_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path(), ChunkingParams::default());
        let builder = IndexBuilder::new(Arc::new(MockEmbedder::new(16)), store);

        let err = builder.build().await.err().unwrap();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_build_applies_sections() {
        let (_dir, store) = corpus_with(&[("a.txt", &words(5))]);
        let mut sections = HashMap::new();
        sections.insert("a.txt".to_string(), "results".to_string());

        let builder =
            IndexBuilder::new(Arc::new(MockEmbedder::new(16)), store).with_sections(sections);
        let artifacts = builder.build().await.unwrap();

        assert_eq!(artifacts.metadata.lookup(0).unwrap().section_tag(), "results");
    }

    #[tokio::test]
    async fn test_build_and_write_persists_artifacts() {
        let (dir, store) = corpus_with(&[("a.txt", &words(12))]);
        let builder = IndexBuilder::new(Arc::new(MockEmbedder::new(16)), store);

        let index_path = dir.path().join("index.bin");
        let metadata_path = dir.path().join("metadata.json");
        let manifest_path = dir.path().join("manifest.json");

        let manifest = builder
            .build_and_write(&index_path, &metadata_path, &manifest_path)
            .await
            .unwrap();

        assert!(index_path.is_file());
        assert!(metadata_path.is_file());
        assert!(manifest_path.is_file());

        let loaded = VectorIndex::load(&index_path).unwrap();
        assert_eq!(loaded.len(), manifest.vector_count);
        assert_eq!(MetadataStore::load(&metadata_path).unwrap().len(), loaded.len());
    }
}
