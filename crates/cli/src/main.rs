//! BioAstra CLI
//!
//! Entry point for the question-answering tooling:
//! - `ask` / `chat` run the full retrieval-and-generation pipeline
//! - `build-index` runs the offline embedding and index build
//! - `query` and `status` are retrieval and artifact diagnostics

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use bioastra_common::config::{AppConfig, ObservabilityConfig};
use bioastra_common::metrics::register_metrics;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            std::process::exit(1);
        }
    };

    init_tracing(&config.observability);
    register_metrics();

    if let Err(err) = run(cli, config).await {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let config = match &cli.config {
        Some(path) => AppConfig::from_file(&path.to_string_lossy())?,
        None => AppConfig::load()?,
    };
    Ok(config)
}

async fn run(cli: Cli, config: AppConfig) -> Result<()> {
    match cli.command {
        Commands::Ask(args) => commands::ask::run(args, config).await,
        Commands::Chat(args) => commands::chat::run(args, config).await,
        Commands::BuildIndex(args) => commands::build_index::run(args, config).await,
        Commands::Query(args) => commands::query::run(args, config).await,
        Commands::Status => commands::status::run(config),
    }
}

fn init_tracing(observability: &ObservabilityConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&observability.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}
