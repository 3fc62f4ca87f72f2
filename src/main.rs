//! # docrag CLI (`rag`)
//!
//! The `rag` binary drives the pipeline: offline index builds, one-shot
//! questions, an interactive loop, and judged evaluation runs.
//!
//! ## Usage
//!
//! ```bash
//! rag --config ./config/rag.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rag ingest` | Build (or skip) the persisted index for the configured corpus |
//! | `rag query "<question>"` | Answer one question grounded in retrieved chunks |
//! | `rag chat` | Interactive question loop |
//! | `rag eval` | Score the pipeline's answers with an LLM judge |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use docrag::{config, eval, ingest, query};

/// docrag — retrieval-augmented question answering over local documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file holding the corpus paths, chunking parameters, provider settings,
/// and prompt templates.
#[derive(Parser)]
#[command(
    name = "rag",
    about = "docrag — retrieval-augmented question answering over local documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/rag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Ingest the document corpus and build the index.
    ///
    /// Walks the configured docs directory, chunks every supported file,
    /// embeds all chunks, and writes the chunk table and embedding matrix
    /// to the data directory. A no-op when both artifacts already exist,
    /// unless --force is given.
    Ingest {
        /// Rebuild the index even if existing artifacts are present.
        #[arg(long)]
        force: bool,
    },

    /// Answer a single question grounded in the indexed documents.
    ///
    /// Retrieves the top-K most similar chunks, assembles them into a
    /// context block, and asks the configured chat model. Prints the
    /// answer together with the ranked source list.
    Query {
        /// The question to answer.
        question: String,

        /// Override the configured number of chunks to retrieve.
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Interactive question loop over the indexed documents.
    ///
    /// Reads questions from stdin until `exit` or `quit`.
    Chat,

    /// Evaluate answer quality with an LLM judge.
    ///
    /// Answers every question in the given file through the full
    /// pipeline and scores each answer 1-5 for correctness,
    /// groundedness, and completeness. Writes eval_results.json to the
    /// data directory.
    Eval {
        /// Path to a JSON array of {"question": "..."} objects.
        #[arg(long)]
        questions: PathBuf,

        /// Override the configured number of chunks to retrieve.
        #[arg(long)]
        top_k: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ingest { force } => {
            ingest::run_ingest(&cfg, force).await?;
        }
        Commands::Query { question, top_k } => {
            query::run_query(&cfg, &question, top_k).await?;
        }
        Commands::Chat => {
            query::run_chat(&cfg).await?;
        }
        Commands::Eval { questions, top_k } => {
            eval::run_eval(&cfg, &questions, top_k).await?;
        }
    }

    Ok(())
}
