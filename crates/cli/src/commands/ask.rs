//! One-shot question answering.

use std::io::Write;

use anyhow::Result;
use tokio::sync::mpsc;

use bioastra_common::config::AppConfig;
use bioastra_engine::{AskRequest, Pipeline, ServiceContext, StreamEvent};

use crate::cli::AskArgs;

pub async fn run(args: AskArgs, config: AppConfig) -> Result<()> {
    let ctx = ServiceContext::initialize(config)?;
    let pipeline = Pipeline::new(&ctx);

    let mut request = AskRequest::new(args.query);
    request.sections = args.sections;
    request.analysis_type = args.mode;

    let rx = pipeline.ask(request).await?;
    stream_to_stdout(rx, args.json).await
}

/// Drain a response stream to stdout, either as raw wire events or as
/// formatted text with tokens flushed as they arrive.
pub(crate) async fn stream_to_stdout(
    mut rx: mpsc::Receiver<StreamEvent>,
    json: bool,
) -> Result<()> {
    let mut stdout = std::io::stdout();
    while let Some(event) = rx.recv().await {
        if json {
            writeln!(stdout, "{}", event.wire_json())?;
            stdout.flush()?;
            continue;
        }
        match event {
            StreamEvent::Token(token) => {
                write!(stdout, "{token}")?;
                stdout.flush()?;
            }
            StreamEvent::Graph(edges) => {
                writeln!(stdout)?;
                writeln!(stdout)?;
                writeln!(stdout, "Concept graph:")?;
                for edge in edges {
                    writeln!(
                        stdout,
                        "  {} -[{}]-> {}",
                        edge.source, edge.relationship, edge.target
                    )?;
                }
            }
            StreamEvent::Sources(sources) => {
                writeln!(stdout)?;
                writeln!(stdout, "Sources: {}", sources.join(", "))?;
            }
            StreamEvent::Error(message) => {
                writeln!(stdout)?;
                writeln!(stdout, "Generation failed: {message}")?;
            }
            StreamEvent::Done => {
                writeln!(stdout)?;
            }
        }
    }
    Ok(())
}
