//! Startup context and the per-request ask pipeline.
//!
//! `ServiceContext` is built once at startup: it loads the index
//! artifacts, cross-checks them against the manifest and configuration,
//! and wires up the generation backend. Any failure there is fatal; the
//! process must not serve requests over a misaligned index.
//!
//! `Pipeline::ask` runs one request: retrieve, rerank, budget, then
//! either serve the fixed not-found response or stream generated tokens
//! followed by the parsed graph, the source list, and the done marker.
//! Backend failures mid-request surface as an error event on the stream;
//! they never crash the process and are never retried.

use std::sync::Arc;
use std::time::Instant;

use bioastra_common::backend::{create_backend, BackendHandles};
use bioastra_common::config::AppConfig;
use bioastra_common::metrics::{record_generation, record_retrieval, RequestMetrics};
use bioastra_common::{AppError, Generator, Result};
use bioastra_index::manifest::compute_corpus_checksum;
use bioastra_index::{ChunkingParams, CorpusStore, IndexManifest, MetadataStore, VectorIndex};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::budget::{build_context, word_count};
use crate::events::{AskRequest, StreamEvent};
use crate::parser::parse_answer;
use crate::prompt::{build_prompt, REFUSAL_ANSWER};
use crate::reranker::Reranker;
use crate::retriever::Retriever;

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Immutable startup state shared by every request.
pub struct ServiceContext {
    pub config: AppConfig,
    pub manifest: IndexManifest,
    pub index: Arc<VectorIndex>,
    pub metadata: Arc<MetadataStore>,
    pub corpus: CorpusStore,
    pub backends: BackendHandles,
}

impl ServiceContext {
    /// Load the index artifacts and cross-check them against the manifest
    /// and the configuration.
    pub fn initialize(config: AppConfig) -> Result<Self> {
        config.validate()?;

        let params = ChunkingParams::from(&config.chunking);
        let manifest = IndexManifest::read(&config.paths.manifest_file)?;
        manifest.verify(
            &params,
            &config.backend.embedding_model,
            config.backend.embedding_dimension,
        )?;

        let index = VectorIndex::load(&config.paths.index_file)?;
        let metadata = MetadataStore::load(&config.paths.metadata_file)?;

        if index.dimension() != manifest.dimension {
            return Err(AppError::Index {
                message: format!(
                    "index file has dimension {} but manifest records {}",
                    index.dimension(),
                    manifest.dimension
                ),
            });
        }
        if index.len() != manifest.vector_count {
            return Err(AppError::Index {
                message: format!(
                    "index file holds {} vectors but manifest records {}",
                    index.len(),
                    manifest.vector_count
                ),
            });
        }
        if metadata.len() != manifest.vector_count {
            return Err(AppError::Index {
                message: format!(
                    "metadata store holds {} records but manifest records {} vectors",
                    metadata.len(),
                    manifest.vector_count
                ),
            });
        }

        // Chunk text is re-derived from the corpus at query time, so a
        // corpus edited after the build would silently misalign with the
        // stored embeddings.
        let corpus = CorpusStore::new(config.paths.corpus_dir.clone(), params);
        let checksum = compute_corpus_checksum(&corpus)?;
        if checksum != manifest.corpus_checksum {
            return Err(AppError::Index {
                message: "corpus directory has changed since the index was built".to_string(),
            });
        }

        let backends = create_backend(&config.backend)?;

        info!(
            documents = manifest.document_count,
            vectors = manifest.vector_count,
            embedding_model = %manifest.embedding_model,
            provider = %config.backend.provider,
            "Service context initialized"
        );

        Ok(Self {
            config,
            manifest,
            index: Arc::new(index),
            metadata: Arc::new(metadata),
            corpus,
            backends,
        })
    }
}

/// The per-request ask pipeline.
pub struct Pipeline {
    retriever: Retriever,
    reranker: Reranker,
    generator: Arc<dyn Generator>,
    token_limit: usize,
}

impl Pipeline {
    pub fn new(ctx: &ServiceContext) -> Self {
        let retriever = Retriever::new(
            ctx.backends.embedder.clone(),
            ctx.index.clone(),
            ctx.metadata.clone(),
            ctx.corpus.clone(),
            &ctx.config.retrieval,
        );
        let reranker = Reranker::new(ctx.backends.scorer.clone(), &ctx.config.retrieval);
        Self {
            retriever,
            reranker,
            generator: ctx.backends.generator.clone(),
            token_limit: ctx.config.context.token_limit,
        }
    }

    /// Process one ask request and return the event stream for it.
    ///
    /// Failures before the stream exists (validation, retrieval) are
    /// returned as errors; everything after is reported on the stream
    /// itself, which always ends with the done marker.
    pub async fn ask(&self, request: AskRequest) -> Result<mpsc::Receiver<StreamEvent>> {
        request.validate().map_err(|e| AppError::Validation {
            message: e.to_string(),
            field: None,
        })?;

        let request_id = Uuid::new_v4();
        let mode = request.mode();
        let request_start = Instant::now();
        let request_metrics = RequestMetrics::start(mode.as_tag());
        info!(
            request_id = %request_id,
            mode = mode.as_tag(),
            sections = request.sections.len(),
            "Ask request received"
        );

        let retrieve_start = Instant::now();
        let candidates = match self
            .retriever
            .retrieve(&request.query, &request.sections)
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(request_id = %request_id, error = %e, "Retrieval failed");
                request_metrics.finish("backend_error");
                return Err(e);
            }
        };
        record_retrieval(retrieve_start.elapsed().as_secs_f64(), candidates.len());

        let ranked = self.reranker.rerank(&request.query, candidates).await;
        let window = build_context(&ranked, self.token_limit, word_count);

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        if window.is_empty() {
            info!(request_id = %request_id, "Empty context; serving the fixed response");
            let _ = tx.send(StreamEvent::Token(REFUSAL_ANSWER.to_string())).await;
            let _ = tx.send(StreamEvent::Done).await;
            request_metrics.finish("empty_context");
            return Ok(rx);
        }

        let prompt = build_prompt(&request.query, &window.context, mode);
        let generator = self.generator.clone();
        let sources = window.sources;

        tokio::spawn(async move {
            let generation_start = Instant::now();
            let mut token_stream = match generator.generate_stream(&prompt).await {
                Ok(stream) => stream,
                Err(e) => {
                    error!(request_id = %request_id, error = %e, "Generation backend refused the request");
                    record_generation(generation_start.elapsed().as_secs_f64(), 0, false);
                    let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                    let _ = tx.send(StreamEvent::Done).await;
                    request_metrics.finish("backend_error");
                    return;
                }
            };

            let mut full_text = String::new();
            let mut token_count = 0usize;
            while let Some(item) = token_stream.recv().await {
                match item {
                    Ok(token) => {
                        full_text.push_str(&token);
                        token_count += 1;
                        if tx.send(StreamEvent::Token(token)).await.is_err() {
                            // Receiver gone; dropping the token stream
                            // cancels the backend task.
                            info!(request_id = %request_id, "Client went away mid-stream");
                            record_generation(
                                generation_start.elapsed().as_secs_f64(),
                                token_count,
                                false,
                            );
                            request_metrics.finish("cancelled");
                            return;
                        }
                    }
                    Err(e) => {
                        error!(request_id = %request_id, error = %e, "Generation failed mid-stream");
                        record_generation(
                            generation_start.elapsed().as_secs_f64(),
                            token_count,
                            false,
                        );
                        let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                        let _ = tx.send(StreamEvent::Done).await;
                        request_metrics.finish("backend_error");
                        return;
                    }
                }
            }
            record_generation(generation_start.elapsed().as_secs_f64(), token_count, true);

            let parsed = parse_answer(&full_text);
            // Any parsed payload is emitted, even an empty edge list;
            // clients key graph rendering off the event's presence.
            if let Some(graph) = parsed.graph {
                if tx.send(StreamEvent::Graph(graph)).await.is_err() {
                    request_metrics.finish("cancelled");
                    return;
                }
            }
            let _ = tx.send(StreamEvent::Sources(sources)).await;
            let _ = tx.send(StreamEvent::Done).await;

            info!(
                request_id = %request_id,
                tokens = token_count,
                latency_ms = request_start.elapsed().as_millis() as u64,
                "Ask request complete"
            );
            request_metrics.finish("answered");
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bioastra_common::backend::MockGenerator;
    use bioastra_common::config::{BackendConfig, PathsConfig};
    use bioastra_index::IndexBuilder;
    use std::fs;
    use tempfile::TempDir;

    /// Write a small corpus and build real index artifacts for it with
    /// the mock backend, returning a config wired to the temp paths.
    async fn build_fixture(dir: &TempDir) -> AppConfig {
        let corpus_dir = dir.path().join("processed");
        fs::create_dir(&corpus_dir).unwrap();
        fs::write(
            corpus_dir.join("bone_loss.txt"),
            vec!["microgravity reduces bone density in long missions"; 20].join(" "),
        )
        .unwrap();
        fs::write(
            corpus_dir.join("radiation.txt"),
            vec!["cosmic radiation damages cellular structures over time"; 20].join(" "),
        )
        .unwrap();

        let config = AppConfig {
            paths: PathsConfig {
                corpus_dir: corpus_dir.to_string_lossy().into_owned(),
                index_file: dir.path().join("index.bin").to_string_lossy().into_owned(),
                metadata_file: dir
                    .path()
                    .join("metadata.json")
                    .to_string_lossy()
                    .into_owned(),
                manifest_file: dir
                    .path()
                    .join("manifest.json")
                    .to_string_lossy()
                    .into_owned(),
                sections_file: None,
            },
            backend: BackendConfig {
                provider: "mock".to_string(),
                embedding_model: "mock-embedding".to_string(),
                embedding_dimension: 8,
                ..BackendConfig::default()
            },
            ..AppConfig::default()
        };

        let backends = create_backend(&config.backend).unwrap();
        let corpus = CorpusStore::new(
            config.paths.corpus_dir.clone(),
            ChunkingParams::from(&config.chunking),
        );
        IndexBuilder::new(backends.embedder.clone(), corpus)
            .build_and_write(
                &config.paths.index_file,
                &config.paths.metadata_file,
                &config.paths.manifest_file,
            )
            .await
            .unwrap();
        config
    }

    async fn collect(mut rx: mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_initialize_loads_built_artifacts() {
        let dir = TempDir::new().unwrap();
        let config = build_fixture(&dir).await;

        let ctx = ServiceContext::initialize(config).unwrap();
        assert_eq!(ctx.index.len(), ctx.manifest.vector_count);
        assert_eq!(ctx.metadata.len(), ctx.manifest.vector_count);
        assert_eq!(ctx.manifest.document_count, 2);
    }

    #[tokio::test]
    async fn test_initialize_rejects_chunking_drift() {
        let dir = TempDir::new().unwrap();
        let mut config = build_fixture(&dir).await;
        config.chunking.chunk_size = 256;

        let err = ServiceContext::initialize(config).err().unwrap();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_initialize_rejects_edited_corpus() {
        let dir = TempDir::new().unwrap();
        let config = build_fixture(&dir).await;
        fs::write(
            dir.path().join("processed").join("bone_loss.txt"),
            "rewritten after the build",
        )
        .unwrap();

        let err = ServiceContext::initialize(config).err().unwrap();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_initialize_rejects_missing_manifest() {
        let dir = TempDir::new().unwrap();
        let mut config = build_fixture(&dir).await;
        config.paths.manifest_file = dir
            .path()
            .join("missing.json")
            .to_string_lossy()
            .into_owned();

        assert!(ServiceContext::initialize(config).is_err());
    }

    #[tokio::test]
    async fn test_ask_streams_tokens_graph_sources_done() {
        let dir = TempDir::new().unwrap();
        let config = build_fixture(&dir).await;
        let ctx = ServiceContext::initialize(config).unwrap();
        let pipeline = Pipeline::new(&ctx);

        let rx = pipeline
            .ask(AskRequest::new("How does microgravity affect bone?"))
            .await
            .unwrap();
        let events = collect(rx).await;

        assert!(matches!(events.first(), Some(StreamEvent::Token(_))));
        assert!(matches!(events.last(), Some(StreamEvent::Done)));
        let graph_at = events
            .iter()
            .position(|e| matches!(e, StreamEvent::Graph(_)))
            .unwrap();
        let sources_at = events
            .iter()
            .position(|e| matches!(e, StreamEvent::Sources(_)))
            .unwrap();
        assert!(graph_at < sources_at);
        if let StreamEvent::Sources(sources) = &events[sources_at] {
            assert!(!sources.is_empty());
        }
    }

    #[tokio::test]
    async fn test_empty_graph_payload_still_emits_graph_event() {
        let dir = TempDir::new().unwrap();
        let config = build_fixture(&dir).await;
        let mut ctx = ServiceContext::initialize(config).unwrap();
        ctx.backends.generator = Arc::new(MockGenerator::with_tokens(vec![
            "No relationships here.".to_string(),
            "\n{\"graph_data\": []}".to_string(),
        ]));
        let pipeline = Pipeline::new(&ctx);

        let rx = pipeline.ask(AskRequest::new("Anything")).await.unwrap();
        let events = collect(rx).await;

        assert!(events
            .iter()
            .any(|e| matches!(e, StreamEvent::Graph(edges) if edges.is_empty())));
        assert!(matches!(events.last(), Some(StreamEvent::Done)));
    }

    #[tokio::test]
    async fn test_ask_with_unmatched_sections_serves_fixed_response() {
        let dir = TempDir::new().unwrap();
        let config = build_fixture(&dir).await;
        let ctx = ServiceContext::initialize(config).unwrap();
        let pipeline = Pipeline::new(&ctx);

        let mut request = AskRequest::new("Anything");
        request.sections = vec!["nonexistent-section".to_string()];
        let rx = pipeline.ask(request).await.unwrap();
        let events = collect(rx).await;

        assert_eq!(
            events,
            vec![
                StreamEvent::Token(REFUSAL_ANSWER.to_string()),
                StreamEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_ask_rejects_empty_query() {
        let dir = TempDir::new().unwrap();
        let config = build_fixture(&dir).await;
        let ctx = ServiceContext::initialize(config).unwrap();
        let pipeline = Pipeline::new(&ctx);

        let err = pipeline.ask(AskRequest::new("")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_mid_stream_failure_emits_error_then_done() {
        let dir = TempDir::new().unwrap();
        let config = build_fixture(&dir).await;
        let mut ctx = ServiceContext::initialize(config).unwrap();
        ctx.backends.generator = Arc::new(MockGenerator::failing_after(
            vec![
                "Partial ".to_string(),
                "answer".to_string(),
                "never sent".to_string(),
            ],
            2,
        ));
        let pipeline = Pipeline::new(&ctx);

        let rx = pipeline.ask(AskRequest::new("Anything at all")).await.unwrap();
        let events = collect(rx).await;

        assert_eq!(events.len(), 4);
        assert!(matches!(&events[0], StreamEvent::Token(t) if t == "Partial "));
        assert!(matches!(&events[1], StreamEvent::Token(t) if t == "answer"));
        assert!(matches!(&events[2], StreamEvent::Error(_)));
        assert_eq!(events[3], StreamEvent::Done);
        // No sources after a failed generation.
        assert!(!events
            .iter()
            .any(|e| matches!(e, StreamEvent::Sources(_))));
    }

    #[tokio::test]
    async fn test_manifest_records_fixture_dimension() {
        let dir = TempDir::new().unwrap();
        let config = build_fixture(&dir).await;
        let dimension = config.backend.embedding_dimension;
        let ctx = ServiceContext::initialize(config).unwrap();
        assert_eq!(ctx.manifest.dimension, dimension);
        assert_eq!(ctx.index.dimension(), dimension);
    }
}
