//! Command-line arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for lumen
#[derive(Debug, Parser)]
#[command(name = "lumen")]
#[command(about = "Persistent semantic search over your documents", long_about = None)]
pub struct Cli {
    /// Path to a TOML config file [default: lumen.toml if present]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Store directory (overrides config and `RAG_STORE_DIR`)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Ingest a JSON array of documents
    Ingest {
        /// JSON file holding `[{id?, title, content, source?, tags?}]`
        file: PathBuf,

        /// Store each document as a single chunk
        #[arg(long)]
        no_chunk: bool,
    },

    /// Retrieve the chunks most similar to a query
    Query {
        /// The text to search for
        text: String,

        /// Maximum number of results [default: from config]
        #[arg(short = 'k', long = "top-k")]
        top_k: Option<usize>,

        /// Drop results scoring below this [default: from config]
        #[arg(long)]
        min_score: Option<f32>,

        /// Rank by score only, without MMR diversity
        #[arg(long)]
        no_mmr: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete every store file
    Clear,

    /// Show the store location and its manifest
    Status {
        /// Print status as JSON
        #[arg(long)]
        json: bool,
    },
}
