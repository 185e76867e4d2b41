//! CLI argument definitions for fastpath.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// fastpath -- resolve commands locally before reaching for an LLM.
#[derive(Parser)]
#[command(
    name = "fastpath",
    version,
    about = "fastpath -- cascading intent router",
    long_about = "Routes free-text commands through deterministic patterns and a statistical \
                  classifier, executing the matching tool or reporting that the query needs \
                  LLM fallback."
)]
pub struct Cli {
    /// Router configuration file (TOML).  Defaults to `config/fastpath.toml`
    /// when present.
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Default log level when `RUST_LOG` is not set.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Route a single query and print the result as JSON.
    Route {
        /// The query text.
        query: String,
    },

    /// Read queries from stdin interactively.
    Repl,

    /// List the built-in intents.
    Intents,

    /// Load a model artifact and report its labels.
    Model {
        /// Path to the JSON artifact.
        path: PathBuf,

        /// Classify this text with the loaded model.
        #[arg(long, short)]
        query: Option<String>,
    },
}
