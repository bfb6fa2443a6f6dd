//! Retrieval diagnostics without generation.

use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;

use bioastra_common::config::AppConfig;
use bioastra_engine::{Reranker, Retriever, ServiceContext};

use crate::cli::QueryArgs;

const SNIPPET_CHARS: usize = 160;

#[derive(Debug, Serialize)]
struct QueryResult {
    rank: usize,
    score: f32,
    distance: f32,
    source_file: String,
    chunk_index: usize,
    section: String,
    snippet: String,
}

pub async fn run(args: QueryArgs, config: AppConfig) -> Result<()> {
    let ctx = ServiceContext::initialize(config)?;
    let retriever = Retriever::new(
        ctx.backends.embedder.clone(),
        ctx.index.clone(),
        ctx.metadata.clone(),
        ctx.corpus.clone(),
        &ctx.config.retrieval,
    );
    let reranker = Reranker::new(ctx.backends.scorer.clone(), &ctx.config.retrieval);

    let candidates = retriever.retrieve(&args.query, &args.sections).await?;
    let ranked = reranker.rerank(&args.query, candidates).await;

    let results: Vec<QueryResult> = ranked
        .iter()
        .enumerate()
        .map(|(i, entry)| QueryResult {
            rank: i + 1,
            score: entry.score,
            distance: entry.chunk.distance,
            source_file: entry.chunk.source_file.clone(),
            chunk_index: entry.chunk.chunk_index,
            section: entry.chunk.section.clone(),
            snippet: snippet(&entry.chunk.text),
        })
        .collect();

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        serde_json::to_writer_pretty(&mut output, &results)
            .context("failed to serialize query output")?;
        writeln!(output)?;
    } else {
        writeln!(output, "Query: {}", args.query)?;
        writeln!(output, "Candidates: {}", results.len())?;
        for result in &results {
            writeln!(
                output,
                "{:>2}. score={:.4} distance={:.4} {}#{} [{}]",
                result.rank,
                result.score,
                result.distance,
                result.source_file,
                result.chunk_index,
                result.section,
            )?;
            writeln!(output, "    {}", result.snippet)?;
        }
    }
    output.flush()?;
    Ok(())
}

fn snippet(text: &str) -> String {
    let mut snippet: String = text.chars().take(SNIPPET_CHARS).collect();
    if text.chars().count() > SNIPPET_CHARS {
        snippet.push_str("...");
    }
    snippet
}
