//! Index manifest
//!
//! The chunking parameters and embedding model used at build time decide
//! what every vector id means; serving with different ones silently
//! misaligns retrieved text and embeddings. The manifest pins them beside
//! the index artifacts and startup refuses to serve on any mismatch.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use bioastra_common::errors::{AppError, Result};

use crate::chunker::ChunkingParams;
use crate::corpus::CorpusStore;

pub const MANIFEST_SCHEMA_VERSION: &str = "1";

/// Build-time parameters recorded beside the index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexManifest {
    pub schema_version: String,

    /// When the build pass finished
    pub built_at: DateTime<Utc>,

    /// Embedding model the vectors were produced with
    pub embedding_model: String,

    /// Embedding dimension
    pub dimension: usize,

    /// Chunk window size in words
    pub chunk_size: usize,

    /// Word overlap between windows
    pub chunk_overlap: usize,

    /// Documents indexed
    pub document_count: usize,

    /// Vectors written
    pub vector_count: usize,

    /// Checksum over corpus file names and sizes at build time
    pub corpus_checksum: String,
}

impl IndexManifest {
    /// Check the live configuration against the recorded build parameters
    pub fn verify(&self, params: &ChunkingParams, model: &str, dimension: usize) -> Result<()> {
        if self.chunk_size != params.chunk_size {
            return Err(mismatch("chunk_size", self.chunk_size, params.chunk_size));
        }
        if self.chunk_overlap != params.overlap {
            return Err(mismatch("chunk_overlap", self.chunk_overlap, params.overlap));
        }
        if self.embedding_model != model {
            return Err(AppError::ManifestMismatch {
                field: "embedding_model".to_string(),
                built: self.embedding_model.clone(),
                configured: model.to_string(),
            });
        }
        if self.dimension != dimension {
            return Err(mismatch("dimension", self.dimension, dimension));
        }
        Ok(())
    }

    /// Read from the manifest JSON file; missing file aborts startup
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(AppError::Configuration {
                message: format!("manifest file not found: {}", path.display()),
            });
        }
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Persist to the manifest JSON file
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        Ok(())
    }
}

fn mismatch(field: &str, built: usize, configured: usize) -> AppError {
    AppError::ManifestMismatch {
        field: field.to_string(),
        built: built.to_string(),
        configured: configured.to_string(),
    }
}

/// Checksum over the corpus listing (sorted names and byte sizes), enough
/// to flag a corpus swapped out from under an index
pub fn compute_corpus_checksum(store: &CorpusStore) -> Result<String> {
    let mut hasher = Sha256::new();
    for name in store.list_documents()? {
        let len = fs::metadata(store.dir().join(&name))?.len();
        hasher.update(name.as_bytes());
        hasher.update(b"\0");
        hasher.update(len.to_le_bytes());
        hasher.update(b"\n");
    }
    Ok(hex::encode(hasher.finalize()))
}
