//! Corpus store
//!
//! Chunk text is not persisted in the index; it is re-derived at query time
//! by re-reading the source document and cutting the window at the recorded
//! chunk index. Documents are small plain-text files, so reads are uncached.

use std::fs;
use std::path::{Path, PathBuf};

use bioastra_common::errors::{AppError, Result};

use crate::chunker::{self, ChunkingParams};

/// Read-only view over the corpus directory
#[derive(Debug, Clone)]
pub struct CorpusStore {
    corpus_dir: PathBuf,
    params: ChunkingParams,
}

impl CorpusStore {
    pub fn new(corpus_dir: impl Into<PathBuf>, params: ChunkingParams) -> Self {
        Self {
            corpus_dir: corpus_dir.into(),
            params,
        }
    }

    pub fn params(&self) -> &ChunkingParams {
        &self.params
    }

    pub fn dir(&self) -> &Path {
        &self.corpus_dir
    }

    /// Read a document's full text
    pub fn read_document(&self, source_file: &str) -> Result<String> {
        let path = self.corpus_dir.join(source_file);
        if !path.is_file() {
            return Err(AppError::DocumentNotFound {
                source_file: source_file.to_string(),
            });
        }
        Ok(fs::read_to_string(&path)?)
    }

    /// Recover the text of one chunk. Unreadable documents and
    /// out-of-range indices yield `None`; the caller drops the candidate
    /// and continues.
    pub fn chunk_of(&self, source_file: &str, chunk_index: usize) -> Option<String> {
        let text = match self.read_document(source_file) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    source_file = source_file,
                    error = %e,
                    "Dropping candidate: document unreadable"
                );
                return None;
            }
        };

        let chunk = chunker::get_chunk(&text, chunk_index, &self.params);
        if chunk.is_none() {
            tracing::warn!(
                source_file = source_file,
                chunk_index = chunk_index,
                "Dropping candidate: chunk index out of range"
            );
        }
        chunk
    }

    /// List corpus documents in alphabetical order. The builder relies on
    /// this order for stable vector id assignment across rebuilds.
    pub fn list_documents(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.corpus_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::chunk_words;

    fn store_with_doc(content: &str) -> (tempfile::TempDir, CorpusStore) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("doc-a.txt"), content).unwrap();
        let store = CorpusStore::new(
            dir.path(),
            ChunkingParams {
                chunk_size: 8,
                overlap: 2,
            },
        );
        (dir, store)
    }

    #[test]
    fn test_chunk_of_matches_chunker() {
        let content = (0..40).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let (_dir, store) = store_with_doc(&content);

        let expected = chunk_words(&content, store.params());
        for (i, chunk) in expected.iter().enumerate() {
            assert_eq!(store.chunk_of("doc-a.txt", i).as_ref(), Some(chunk));
        }
    }

    #[test]
    fn test_chunk_of_missing_document() {
        let (_dir, store) = store_with_doc("some words here");
        assert_eq!(store.chunk_of("missing.txt", 0), None);
    }

    #[test]
    fn test_chunk_of_out_of_range() {
        let (_dir, store) = store_with_doc("just a few words");
        assert_eq!(store.chunk_of("doc-a.txt", 99), None);
    }

    #[test]
    fn test_list_documents_sorted_txt_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("notes.md"), "skip").unwrap();
        let store = CorpusStore::new(dir.path(), ChunkingParams::default());

        assert_eq!(store.list_documents().unwrap(), vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_read_document_not_found() {
        let (_dir, store) = store_with_doc("content");
        let err = store.read_document("ghost.txt").unwrap_err();
        assert!(matches!(err, AppError::DocumentNotFound { .. }));
    }
}
