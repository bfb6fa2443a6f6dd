//! Offline index build.

use anyhow::Result;
use tracing::info;

use bioastra_common::backend::create_backend;
use bioastra_common::config::AppConfig;
use bioastra_index::{ChunkingParams, CorpusStore, IndexBuilder};

use crate::cli::BuildIndexArgs;

pub async fn run(args: BuildIndexArgs, mut config: AppConfig) -> Result<()> {
    if let Some(dir) = args.corpus_dir {
        config.paths.corpus_dir = dir.to_string_lossy().into_owned();
    }
    if let Some(path) = args.sections_file {
        config.paths.sections_file = Some(path.to_string_lossy().into_owned());
    }
    config.validate()?;

    let backends = create_backend(&config.backend)?;
    let corpus = CorpusStore::new(
        config.paths.corpus_dir.clone(),
        ChunkingParams::from(&config.chunking),
    );

    let mut builder = IndexBuilder::new(backends.embedder.clone(), corpus);
    if let Some(path) = &config.paths.sections_file {
        builder = builder.with_sections(IndexBuilder::load_sections(path)?);
    }

    let manifest = builder
        .build_and_write(
            &config.paths.index_file,
            &config.paths.metadata_file,
            &config.paths.manifest_file,
        )
        .await?;

    info!(
        documents = manifest.document_count,
        vectors = manifest.vector_count,
        embedding_model = %manifest.embedding_model,
        index_file = %config.paths.index_file,
        "Index build complete"
    );
    Ok(())
}
