//! lumen - persistent semantic search over local documents
#![cfg_attr(
    test,
    allow(
        dead_code,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        clippy::print_stdout,
        clippy::print_stderr,
        reason = "Allow for tests"
    )
)]

use anyhow::Result;
use clap::Parser as _;
use std::io::stderr;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

use cli::{Cli, Commands};

mod cli;
mod handlers;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so `--json` output stays parseable.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "lumen=info".into()))
        .with(fmt::layer().with_writer(stderr))
        .init();

    let cli = Cli::parse();
    let config = handlers::load_config(cli.config.as_deref(), cli.store)?;

    match cli.command {
        Commands::Ingest { file, no_chunk } => {
            handlers::handle_ingest(config, &file, !no_chunk).await?;
        }
        Commands::Query {
            text,
            top_k,
            min_score,
            no_mmr,
            json,
        } => {
            handlers::handle_query(config, &text, top_k, min_score, !no_mmr, json).await?;
        }
        Commands::Clear => handlers::handle_clear(config).await?,
        Commands::Status { json } => handlers::handle_status(config, json).await?,
    }

    Ok(())
}
