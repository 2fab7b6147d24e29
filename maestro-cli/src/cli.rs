//! Argument parsing (spec §6's CLI surface: `ingest`, `query`,
//! `inspect-store`, `run-research`), grounded on the teacher's
//! `llmspell-cli::cli::Cli`/`Commands` derive shape. Flag names and
//! defaults otherwise follow the original `main_cli.py`'s typer options.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TraceLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<TraceLevel> for tracing::Level {
    fn from(level: TraceLevel) -> Self {
        match level {
            TraceLevel::Off | TraceLevel::Error => tracing::Level::ERROR,
            TraceLevel::Warn => tracing::Level::WARN,
            TraceLevel::Info => tracing::Level::INFO,
            TraceLevel::Debug => tracing::Level::DEBUG,
            TraceLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// `all` expands to every other variant at the call site (spec §6's
/// `--format markdown|pdf|docx|all`, repeatable). PDF/DOCX rendering is a
/// front-end concern out of scope per spec §1; those variants write the
/// same markdown text under the requested extension (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Markdown,
    Pdf,
    Docx,
    All,
}

#[derive(Parser, Debug)]
#[command(name = "maestro")]
#[command(version)]
#[command(about = "Maestro: a multi-agent deep research and report orchestrator")]
pub struct Cli {
    /// Path to a maestro.toml settings file (GLOBAL).
    #[arg(short = 'c', long, global = true, env = "MAESTRO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Trace verbosity. Overridden by RUST_LOG when it's set.
    #[arg(long, global = true, value_enum, default_value = "info")]
    pub trace: TraceLevel,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Embed and store documents in the pgvector-backed document store.
    Ingest {
        #[arg(long)]
        pdf_dir: Option<PathBuf>,
        #[arg(long)]
        markdown_dir: Option<PathBuf>,
        #[arg(long)]
        metadata_dir: Option<PathBuf>,
        #[arg(long, env = "DATABASE_URL")]
        db_url: String,
        #[arg(long, default_value_t = 32)]
        batch_size_embed: usize,
        #[arg(long, default_value_t = 64)]
        batch_size_store: usize,
        /// Re-embed and overwrite chunks that already exist for a doc_id.
        #[arg(long, default_value_t = false)]
        force_reembed: bool,
    },

    /// Run a single hybrid search query against the document store.
    Query {
        query_text: String,
        #[arg(long, env = "DATABASE_URL")]
        db_url: String,
        #[arg(long, short = 'k', default_value_t = 5)]
        n_results: usize,
        #[arg(long)]
        filter_doc_id: Option<String>,
        #[arg(long, default_value_t = 0.5)]
        dense_weight: f32,
        #[arg(long, default_value_t = 0.5)]
        sparse_weight: f32,
    },

    /// Report store-wide statistics, or list distinct documents.
    InspectStore {
        #[arg(long, env = "DATABASE_URL")]
        db_url: String,
        #[arg(long, short = 'l')]
        list_docs: bool,
    },

    /// Run a mission end to end and write the rendered report.
    RunResearch {
        #[arg(long, short = 'q', conflicts_with = "input_file")]
        question: Option<String>,
        #[arg(long, short = 'f', conflicts_with = "question")]
        input_file: Option<PathBuf>,
        #[arg(long, short = 'o', default_value = "./output")]
        output_dir: PathBuf,
        /// Omit to run web-search-only (no document retrieval).
        #[arg(long, env = "DATABASE_URL")]
        db_url: Option<String>,
        #[arg(long, default_value_t = true)]
        use_local_rag: bool,
        #[arg(long, default_value_t = true)]
        use_web_search: bool,
        #[arg(long = "format", short = 'F', value_enum, default_values_t = vec![OutputFormat::Markdown])]
        output_formats: Vec<OutputFormat>,
        /// Overrides the `writing_passes` setting for this mission only.
        #[arg(long)]
        writing_passes: Option<i64>,
    },
}
