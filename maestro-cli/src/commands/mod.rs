//! Command dispatch, grounded on `llmspell-cli::commands::execute_command`'s
//! match-over-`Commands`-variants shape, narrowed to spec §6's four
//! subcommands.

pub mod ingest;
pub mod inspect_store;
pub mod query;
pub mod run_research;

use anyhow::Result;

use crate::cli::{Cli, Commands};

/// Runs the parsed subcommand to completion. Returns `Ok(false)` for a
/// mission that failed (spec §6: "Exit code 0 on success, 1 on any failed
/// mission") so `main` can choose the process exit code without every
/// command needing to know about `std::process::exit`.
pub async fn execute_command(cli: Cli) -> Result<bool> {
    let config_path = cli.config.clone();
    match cli.command {
        cmd @ Commands::Ingest { .. } => {
            ingest::run(cmd).await?;
            Ok(true)
        }
        cmd @ Commands::Query { .. } => {
            query::run(cmd).await?;
            Ok(true)
        }
        cmd @ Commands::InspectStore { .. } => {
            inspect_store::run(cmd).await?;
            Ok(true)
        }
        cmd @ Commands::RunResearch { .. } => run_research::run(cmd, config_path.as_deref()).await,
    }
}
