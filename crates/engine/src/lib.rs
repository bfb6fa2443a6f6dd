//! BioAstra Query Engine
//!
//! The online half of the system: everything that happens between an
//! incoming question and the last streamed event.
//! - Retrieval over the vector index with metadata and length filtering
//! - Cross-encoder reranking of retrieval candidates
//! - Greedy context assembly under a token budget
//! - Prompt construction per analysis mode
//! - Streaming generation with trailing graph extraction
//! - The pipeline orchestrating the full request lifecycle

pub mod budget;
pub mod events;
pub mod parser;
pub mod pipeline;
pub mod prompt;
pub mod reranker;
pub mod retriever;

pub use budget::{build_context, word_count, ContextWindow, CHUNK_SEPARATOR};
pub use events::{AnalysisMode, AskRequest, GraphEdge, StreamEvent, DONE_MARKER};
pub use parser::{parse_answer, ParsedAnswer};
pub use pipeline::{Pipeline, ServiceContext};
pub use prompt::{build_prompt, REFUSAL_ANSWER};
pub use reranker::{RankedChunk, Reranker};
pub use retriever::{CandidateChunk, Retriever};
