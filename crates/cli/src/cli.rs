use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "bioastra",
    version,
    about = "Question answering over a space-biology document corpus"
)]
pub struct Cli {
    /// Configuration file used instead of the config/ directory layering
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask one question and stream the answer
    Ask(AskArgs),
    /// Interactive question loop
    Chat(ChatArgs),
    /// Build the vector index from the corpus directory
    BuildIndex(BuildIndexArgs),
    /// Run retrieval and reranking without generation
    Query(QueryArgs),
    /// Show index artifacts and manifest state
    Status,
}

#[derive(Args, Debug, Clone)]
pub struct AskArgs {
    /// The question to ask
    pub query: String,

    /// Restrict retrieval to a section tag; repeatable
    #[arg(long = "section")]
    pub sections: Vec<String>,

    /// Analysis mode tag: default, progress_areas, knowledge_gaps,
    /// or consensus_disagreement
    #[arg(long)]
    pub mode: Option<String>,

    /// Emit raw wire events as JSON lines instead of formatted text
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ChatArgs {
    /// Restrict retrieval to a section tag; repeatable
    #[arg(long = "section")]
    pub sections: Vec<String>,

    /// Analysis mode tag applied to every question in the session
    #[arg(long)]
    pub mode: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct BuildIndexArgs {
    /// Corpus directory override
    #[arg(long)]
    pub corpus_dir: Option<PathBuf>,

    /// JSON sidecar mapping source file names to section tags
    #[arg(long)]
    pub sections_file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// The query to retrieve candidates for
    #[arg(long)]
    pub query: String,

    /// Restrict retrieval to a section tag; repeatable
    #[arg(long = "section")]
    pub sections: Vec<String>,

    /// Emit results as JSON instead of formatted text
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
