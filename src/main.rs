//! # Stimulus Harness CLI (`stim`)
//!
//! Retrieves real-world context for a topic from public sources and turns
//! it into a critical-thinking scenario.
//!
//! ## Usage
//!
//! ```bash
//! stim --config ./config/stim.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `stim sources` | List enabled adapters and the context store state |
//! | `stim retrieve "<query>"` | Fan a query out to every adapter |
//! | `stim context "<topic>"` | Run context selection and show the chosen tier |
//! | `stim generate "<topic>"` | Generate a stimulus scenario |
//! | `stim ask "<question>"` | Answer a question from retrieved context, with citations |
//! | `stim topics` | Print the scenario topic catalogue |
//! | `stim serve` | Start the JSON HTTP API |
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`
//! (default `info`).

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use stimulus_harness::config::{self, Config};
use stimulus_harness::{generate, retrieve, server, sources};

/// Stimulus Harness: context retrieval and scenario generation for
/// critical-thinking studies.
#[derive(Parser)]
#[command(name = "stim", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// When the file does not exist, built-in defaults are used.
    #[arg(long, global = true, default_value = "./config/stim.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List enabled source adapters and the context store state.
    Sources,

    /// Query every enabled adapter once and print what each returned.
    Retrieve {
        /// The search phrase sent to each adapter.
        query: String,
    },

    /// Select context for a topic without generating.
    Context {
        topic: String,
    },

    /// Generate a stimulus scenario for a topic.
    Generate {
        topic: String,

        /// Append an opening Socratic question.
        #[arg(long)]
        question: bool,

        /// Print the full report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Answer a question from retrieved context, citing the sources.
    Ask {
        question: String,

        /// Print the full report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print scenario topics.
    Topics {
        /// Concepts to combine with the situation catalogue. When omitted,
        /// concepts are extracted from retrieved document titles.
        #[arg(long = "concept")]
        concepts: Vec<String>,

        /// Maximum number of topics to print.
        #[arg(long, default_value_t = 15)]
        limit: usize,
    },

    /// Start the JSON HTTP API.
    Serve {
        /// Override `[server].bind`.
        #[arg(long)]
        bind: Option<String>,
    },
}

fn load(path: &Path) -> anyhow::Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        info!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::default())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cfg = load(&cli.config)?;

    match cli.command {
        Commands::Sources => {
            sources::list_sources(&cfg)?;
        }
        Commands::Retrieve { query } => {
            retrieve::run_retrieve(&cfg, &query).await?;
        }
        Commands::Context { topic } => {
            retrieve::run_context(&cfg, &topic).await?;
        }
        Commands::Generate {
            topic,
            question,
            json,
        } => {
            generate::run_generate(&cfg, &topic, question, json).await?;
        }
        Commands::Ask { question, json } => {
            generate::run_ask(&cfg, &question, json).await?;
        }
        Commands::Topics { concepts, limit } => {
            generate::run_topics(&cfg, &concepts, limit).await?;
        }
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| cfg.server.bind.clone());
            server::run_server(&cfg, &bind).await?;
        }
    }

    Ok(())
}
