//! Configuration management for BioAstra
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/local.toml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::AppError;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Index and corpus file locations
    pub paths: PathsConfig,

    /// Chunking parameters (must match the ingestion pass, see manifest)
    pub chunking: ChunkingConfig,

    /// Retrieval parameters
    pub retrieval: RetrievalConfig,

    /// Context assembly parameters
    pub context: ContextConfig,

    /// Generation backend configuration
    pub backend: BackendConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Directory holding the plain-text corpus documents
    #[serde(default = "default_corpus_dir")]
    pub corpus_dir: String,

    /// Serialized vector index file
    #[serde(default = "default_index_file")]
    pub index_file: String,

    /// Metadata JSON file mapping vector ids to chunk descriptors
    #[serde(default = "default_metadata_file")]
    pub metadata_file: String,

    /// Manifest recording the parameters the index was built with
    #[serde(default = "default_manifest_file")]
    pub manifest_file: String,

    /// Optional sidecar mapping source files to section tags
    pub sections_file: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChunkingConfig {
    /// Window size in whitespace-delimited words
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Word overlap between consecutive windows
    #[serde(default = "default_chunk_overlap")]
    pub overlap: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Nearest-neighbor candidates fetched per query
    #[serde(default = "default_k_retriever")]
    pub k_retriever: usize,

    /// Reranked candidates passed on to context assembly
    #[serde(default = "default_k_reranker")]
    pub k_reranker: usize,

    /// Minimum chunk text length in characters; shorter chunks are noise
    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContextConfig {
    /// Token budget for the assembled context
    #[serde(default = "default_token_limit")]
    pub token_limit: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Backend provider: openai (any OpenAI-compatible host) or mock
    #[serde(default = "default_backend_provider")]
    pub provider: String,

    /// API base URL (hosted API or a local llama.cpp/Ollama server)
    pub api_base: Option<String>,

    /// API key for the backend
    pub api_key: Option<String>,

    /// Embedding model
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Embedding dimension
    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,

    /// Cross-encoder model for reranking
    #[serde(default = "default_rerank_model")]
    pub rerank_model: String,

    /// Generation model
    #[serde(default = "default_generation_model")]
    pub generation_model: String,

    /// Maximum tokens to generate per answer
    #[serde(default = "default_max_generation_tokens")]
    pub max_generation_tokens: u32,

    /// Request timeout in seconds
    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries for idempotent calls
    #[serde(default = "default_backend_retries")]
    pub max_retries: u32,

    /// Batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_corpus_dir() -> String { "data/processed".to_string() }
fn default_index_file() -> String { "data/index.bin".to_string() }
fn default_metadata_file() -> String { "data/metadata.json".to_string() }
fn default_manifest_file() -> String { "data/manifest.json".to_string() }
fn default_chunk_size() -> usize { 512 }
fn default_chunk_overlap() -> usize { 50 }
fn default_k_retriever() -> usize { 15 }
fn default_k_reranker() -> usize { 5 }
fn default_min_chunk_chars() -> usize { 150 }
fn default_token_limit() -> usize { 1500 }
fn default_backend_provider() -> String { "openai".to_string() }
fn default_embedding_model() -> String { "all-MiniLM-L6-v2".to_string() }
fn default_embedding_dimension() -> usize { 384 }
fn default_rerank_model() -> String { "cross-encoder/ms-marco-MiniLM-L-6-v2".to_string() }
fn default_generation_model() -> String { "tinyllama-1.1b-chat".to_string() }
fn default_max_generation_tokens() -> u32 { 256 }
fn default_backend_timeout() -> u64 { 120 }
fn default_backend_retries() -> u32 { 3 }
fn default_batch_size() -> usize { 32 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { false }
fn default_service_name() -> String { "bioastra".to_string() }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__RETRIEVAL__K_RETRIEVER=20
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Startup sanity checks on parameter relationships
    pub fn validate(&self) -> crate::errors::Result<()> {
        if self.chunking.overlap >= self.chunking.chunk_size {
            return Err(AppError::Configuration {
                message: format!(
                    "chunk overlap ({}) must be smaller than chunk size ({})",
                    self.chunking.overlap, self.chunking.chunk_size
                ),
            });
        }
        if self.backend.embedding_dimension == 0 {
            return Err(AppError::Configuration {
                message: "embedding dimension must be non-zero".to_string(),
            });
        }
        if self.context.token_limit == 0 {
            return Err(AppError::Configuration {
                message: "context token limit must be non-zero".to_string(),
            });
        }
        if self.retrieval.k_retriever == 0 {
            return Err(AppError::Configuration {
                message: "k_retriever must be non-zero".to_string(),
            });
        }
        Ok(())
    }

    /// Get backend request timeout as Duration
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            context: ContextConfig::default(),
            backend: BackendConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            corpus_dir: default_corpus_dir(),
            index_file: default_index_file(),
            metadata_file: default_metadata_file(),
            manifest_file: default_manifest_file(),
            sections_file: None,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_chunk_overlap(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k_retriever: default_k_retriever(),
            k_reranker: default_k_reranker(),
            min_chunk_chars: default_min_chunk_chars(),
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            token_limit: default_token_limit(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: default_backend_provider(),
            api_base: None,
            api_key: None,
            embedding_model: default_embedding_model(),
            embedding_dimension: default_embedding_dimension(),
            rerank_model: default_rerank_model(),
            generation_model: default_generation_model(),
            max_generation_tokens: default_max_generation_tokens(),
            timeout_secs: default_backend_timeout(),
            max_retries: default_backend_retries(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            service_name: default_service_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.chunking.chunk_size, 512);
        assert_eq!(config.chunking.overlap, 50);
        assert_eq!(config.retrieval.min_chunk_chars, 150);
        assert_eq!(config.context.token_limit, 1500);
        assert_eq!(config.backend.embedding_model, "all-MiniLM-L6-v2");
    }

    #[test]
    fn test_default_config_validates() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_overlap_ge_chunk_size() {
        let mut config = AppConfig::default();
        config.chunking.overlap = config.chunking.chunk_size;
        let err = config.validate().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_validate_rejects_zero_budget() {
        let mut config = AppConfig::default();
        config.context.token_limit = 0;
        assert!(config.validate().is_err());
    }
}
