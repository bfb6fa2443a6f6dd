//! Generation backend abstractions
//!
//! The pipeline depends on three backend capabilities, each behind a trait:
//! - `Embedder` - text to fixed-dimension vectors
//! - `Scorer` - cross-encoder relevance of (query, text) pairs
//! - `Generator` - streamed token-by-token text completion
//!
//! One remote OpenAI-compatible client implements all three (hosted APIs and
//! local llama.cpp/Ollama servers speak the same protocol); mocks back the
//! tests.

mod mock;
mod remote;

pub use mock::{MockEmbedder, MockGenerator, MockScorer};
pub use remote::RemoteBackend;

use crate::config::BackendConfig;
use crate::errors::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Stream of generated tokens. Mid-stream backend failures arrive as an
/// `Err` item; the channel closing marks the end of generation. Dropping
/// the receiver cancels the backend call at its next send.
pub type TokenStream = mpsc::Receiver<Result<String>>;

/// Channel capacity for token streams; generation is slower than any
/// consumer, so a small buffer is enough
pub(crate) const TOKEN_CHANNEL_CAPACITY: usize = 32;

/// Trait for embedding generation
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (batch)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;
}

/// Trait for cross-encoder relevance scoring
#[async_trait]
pub trait Scorer: Send + Sync {
    /// Score the relevance of each text against the query; returned scores
    /// are in input order, higher = more relevant
    async fn score(&self, query: &str, texts: &[String]) -> Result<Vec<f32>>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Trait for streamed text generation
#[async_trait]
pub trait Generator: Send + Sync {
    /// Start a completion for `prompt` and return the token stream. The
    /// stream is finite and not restartable; generation failures after the
    /// stream opens arrive as an `Err` item on the channel.
    async fn generate_stream(&self, prompt: &str) -> Result<TokenStream>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Backend handle bundle shared by the pipeline
#[derive(Clone)]
pub struct BackendHandles {
    pub embedder: Arc<dyn Embedder>,
    pub scorer: Arc<dyn Scorer>,
    pub generator: Arc<dyn Generator>,
}

/// Create backend handles based on configuration
pub fn create_backend(config: &BackendConfig) -> Result<BackendHandles> {
    match config.provider.as_str() {
        "openai" => {
            let remote = Arc::new(RemoteBackend::new(config)?);
            Ok(BackendHandles {
                embedder: remote.clone(),
                scorer: remote.clone(),
                generator: remote,
            })
        }
        "mock" => Ok(mock_handles(config.embedding_dimension)),
        other => {
            tracing::warn!(provider = other, "Unknown backend provider, using mock");
            Ok(mock_handles(config.embedding_dimension))
        }
    }
}

fn mock_handles(dimension: usize) -> BackendHandles {
    BackendHandles {
        embedder: Arc::new(MockEmbedder::new(dimension)),
        scorer: Arc::new(MockScorer::new()),
        generator: Arc::new(MockGenerator::answering()),
    }
}
