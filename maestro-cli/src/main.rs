//! Entry point for the `maestro` binary (spec §6's CLI surface), grounded
//! on `llmspell-cli::main`'s parse -> configure-tracing -> dispatch shape.

mod chunking;
mod cli;
mod commands;
mod embedder;
mod runtime;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, TraceLevel};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_tracing(cli.trace);

    let succeeded = commands::execute_command(cli).await?;
    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

/// `RUST_LOG` takes priority over `--trace` when set, matching the
/// teacher's stated best practice of keeping tracing output on stderr so
/// stdout stays usable for program output (e.g. piping a rendered report).
fn setup_tracing(trace_level: TraceLevel) {
    use std::io;
    use tracing_subscriber::EnvFilter;

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(io::stderr)
            .with_target(false)
            .init();
    } else {
        let level: tracing::Level = trace_level.into();
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(io::stderr)
            .with_target(false)
            .init();
    }
}
