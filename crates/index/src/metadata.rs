//! Metadata store
//!
//! Immutable mapping from vector id to chunk descriptor, loaded once at
//! startup from a JSON document keyed by stringified vector ids.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use bioastra_common::errors::{AppError, Result};

/// Section tag used when a record carries no section
pub const UNKNOWN_SECTION: &str = "unknown";

/// Descriptor locating one chunk in the corpus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Corpus document the chunk was cut from
    pub source_file: String,

    /// 0-based window position under the pinned chunking parameters
    pub chunk_index: usize,

    /// Optional section tag assigned at ingest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

impl ChunkMetadata {
    /// Section tag for filter matching; absent sections match as "unknown"
    pub fn section_tag(&self) -> &str {
        self.section.as_deref().unwrap_or(UNKNOWN_SECTION)
    }
}

/// Read-only vector-id to chunk-descriptor mapping
#[derive(Debug, Default)]
pub struct MetadataStore {
    records: HashMap<String, ChunkMetadata>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Register a record; build-time only
    pub fn insert(&mut self, vector_id: i64, record: ChunkMetadata) {
        self.records.insert(vector_id.to_string(), record);
    }

    /// Resolve a vector id. Missing entries return `None`; the caller
    /// skips such ids rather than failing the request.
    pub fn lookup(&self, vector_id: i64) -> Option<&ChunkMetadata> {
        self.records.get(vector_id.to_string().as_str())
    }

    /// Load from the metadata JSON file; missing file aborts startup
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(AppError::Configuration {
                message: format!("metadata file not found: {}", path.display()),
            });
        }

        let raw = fs::read_to_string(path)?;
        let records: HashMap<String, ChunkMetadata> = serde_json::from_str(&raw)?;
        Ok(Self { records })
    }

    /// Persist to the metadata JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.records)?;
        fs::write(path.as_ref(), json)?;
        Ok(())
    }
}
