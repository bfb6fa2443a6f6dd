//! Error types for BioAstra components
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - Severity classification (fatal at startup vs recovered per request)
//! - Error codes for machine-readable handling

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    MissingField,
    InvalidFormat,

    // Resource errors (4xxx)
    NotFound,
    DocumentNotFound,
    ChunkOutOfRange,

    // Index errors (5xxx)
    IndexError,
    DimensionMismatch,
    ManifestMismatch,

    // Generation backend errors (8xxx)
    UpstreamError,
    EmbeddingError,
    RerankError,
    GenerationError,
    BackendTimeout,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::MissingField => 1002,
            ErrorCode::InvalidFormat => 1003,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,
            ErrorCode::DocumentNotFound => 4002,
            ErrorCode::ChunkOutOfRange => 4003,

            // Index (5xxx)
            ErrorCode::IndexError => 5001,
            ErrorCode::DimensionMismatch => 5002,
            ErrorCode::ManifestMismatch => 5003,

            // Backend (8xxx)
            ErrorCode::UpstreamError => 8001,
            ErrorCode::EmbeddingError => 8002,
            ErrorCode::RerankError => 8003,
            ErrorCode::GenerationError => 8004,
            ErrorCode::BackendTimeout => 8005,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Document not found in corpus: {source_file}")]
    DocumentNotFound { source_file: String },

    #[error("Chunk index {chunk_index} out of range for document {source_file}")]
    ChunkOutOfRange {
        source_file: String,
        chunk_index: usize,
    },

    // Index errors
    #[error("Index error: {message}")]
    Index { message: String },

    #[error("Embedding dimension mismatch: index expects {expected}, embedder produces {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Index manifest mismatch on {field}: index built with {built}, configured {configured}")]
    ManifestMismatch {
        field: String,
        built: String,
        configured: String,
    },

    // Generation backend errors
    #[error("Embedding backend error: {message}")]
    Embedding { message: String },

    #[error("Rerank backend error: {message}")]
    Rerank { message: String },

    #[error("Generation backend error: {message}")]
    Generation { message: String },

    #[error("Backend timeout after {timeout_ms}ms")]
    BackendTimeout { timeout_ms: u64 },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::MissingField { .. } => ErrorCode::MissingField,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::DocumentNotFound { .. } => ErrorCode::DocumentNotFound,
            AppError::ChunkOutOfRange { .. } => ErrorCode::ChunkOutOfRange,
            AppError::Index { .. } => ErrorCode::IndexError,
            AppError::DimensionMismatch { .. } => ErrorCode::DimensionMismatch,
            AppError::ManifestMismatch { .. } => ErrorCode::ManifestMismatch,
            AppError::Embedding { .. } => ErrorCode::EmbeddingError,
            AppError::Rerank { .. } => ErrorCode::RerankError,
            AppError::Generation { .. } => ErrorCode::GenerationError,
            AppError::BackendTimeout { .. } => ErrorCode::BackendTimeout,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Errors that must abort startup; the process never serves after one
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Configuration { .. }
                | AppError::ManifestMismatch { .. }
                | AppError::DimensionMismatch { .. }
                | AppError::Index { .. }
        )
    }

    /// Errors from the generation backend, recovered per request as an
    /// error event on the response stream
    pub fn is_backend_error(&self) -> bool {
        matches!(
            self,
            AppError::Embedding { .. }
                | AppError::Rerank { .. }
                | AppError::Generation { .. }
                | AppError::BackendTimeout { .. }
                | AppError::HttpClient(_)
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}
