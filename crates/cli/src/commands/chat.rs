//! Interactive question loop.

use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use bioastra_common::config::AppConfig;
use bioastra_engine::{AskRequest, Pipeline, ServiceContext};

use crate::cli::ChatArgs;
use crate::commands::ask::stream_to_stdout;

pub async fn run(args: ChatArgs, config: AppConfig) -> Result<()> {
    let ctx = ServiceContext::initialize(config)?;
    let pipeline = Pipeline::new(&ctx);

    println!(
        "Serving {} documents ({} chunks). Type a question, or \"exit\" to leave.",
        ctx.manifest.document_count, ctx.manifest.vector_count
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }

        let mut request = AskRequest::new(question);
        request.sections = args.sections.clone();
        request.analysis_type = args.mode.clone();

        // A failed request ends one question, not the session.
        match pipeline.ask(request).await {
            Ok(rx) => stream_to_stdout(rx, false).await?,
            Err(e) => eprintln!("request failed: {e}"),
        }
    }
    Ok(())
}
