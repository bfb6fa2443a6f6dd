//! BioAstra Common Library
//!
//! Shared code for the BioAstra question-answering pipeline including:
//! - Generation backend abstractions (embedding, scoring, streaming generation)
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod backend;
pub mod config;
pub mod errors;
pub mod metrics;

// Re-export commonly used types
pub use backend::{Embedder, Generator, Scorer};
pub use config::AppConfig;
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";

/// Default embedding dimension
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;
