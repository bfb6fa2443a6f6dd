//! BioAstra Index Library
//!
//! The read-only index layer the request pipeline serves from, plus the
//! offline pass that builds it:
//! - Word-window chunking shared by ingestion and query-time text recovery
//! - Flat nearest-neighbor vector index with file persistence
//! - Metadata store mapping vector ids to chunk descriptors
//! - Manifest pinning the parameters the index was built with
//! - Index builder walking a corpus directory

pub mod builder;
pub mod chunker;
pub mod corpus;
pub mod manifest;
pub mod metadata;
pub mod vector;

pub use builder::IndexBuilder;
pub use chunker::ChunkingParams;
pub use corpus::CorpusStore;
pub use manifest::IndexManifest;
pub use metadata::{ChunkMetadata, MetadataStore};
pub use vector::VectorIndex;

/// Sentinel id returned by nearest-neighbor search when fewer than `k`
/// vectors exist; never resolves to a chunk
pub const NO_MATCH_ID: i64 = -1;
