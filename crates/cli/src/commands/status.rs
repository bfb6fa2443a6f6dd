//! Index artifact inspection.

use std::fs;
use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};

use bioastra_common::config::AppConfig;
use bioastra_index::IndexManifest;

pub fn run(config: AppConfig) -> Result<()> {
    let manifest_path = Path::new(&config.paths.manifest_file);
    if manifest_path.exists() {
        let manifest = IndexManifest::read(manifest_path)?;
        info!(
            schema_version = %manifest.schema_version,
            built_at = %manifest.built_at,
            embedding_model = %manifest.embedding_model,
            dimension = manifest.dimension,
            chunk_size = manifest.chunk_size,
            chunk_overlap = manifest.chunk_overlap,
            documents = manifest.document_count,
            vectors = manifest.vector_count,
            corpus_checksum = %manifest.corpus_checksum,
            "Manifest loaded"
        );
    } else {
        warn!(path = %manifest_path.display(), "Manifest missing; run build-index first");
    }

    report_artifact("index", &config.paths.index_file);
    report_artifact("metadata", &config.paths.metadata_file);

    match fs::read_dir(&config.paths.corpus_dir) {
        Ok(entries) => {
            let documents = entries
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "txt"))
                .count();
            info!(dir = %config.paths.corpus_dir, documents, "Corpus directory");
        }
        Err(e) => {
            warn!(dir = %config.paths.corpus_dir, error = %e, "Corpus directory unreadable");
        }
    }

    Ok(())
}

fn report_artifact(name: &str, path: &str) {
    match fs::metadata(path) {
        Ok(meta) => info!(artifact = name, path, bytes = meta.len(), "Artifact present"),
        Err(_) => warn!(artifact = name, path, "Artifact missing"),
    }
}
