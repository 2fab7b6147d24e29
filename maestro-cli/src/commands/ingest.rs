//! `ingest`: walks `--markdown-dir`/`--pdf-dir`, chunks each file, embeds
//! the chunks through the same `QueryEmbedder` seam `document_search`
//! queries through, and upserts them into the pgvector store. File
//! ingestion is an out-of-scope external collaborator per spec §1; this is
//! the minimal path that exercises `DocumentVectorStore::upsert_chunks`
//! end to end, grounded on `llmspell-rag::pipeline::ingestion::
//! DocumentProcessor::process_document`'s chunk-then-embed-then-store
//! shape.

use std::path::Path;

use anyhow::{Context, Result};
use maestro_tools::document_search::QueryEmbedder;
use maestro_tools::vector_store::{DocumentVectorStore, NewChunk, PgVectorStore};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::chunking::{chunk_text, ChunkingConfig};
use crate::cli::Commands;
use crate::embedder::HashingEmbedder;
use crate::runtime::build_pool;

pub async fn run(command: Commands) -> Result<()> {
    let Commands::Ingest { pdf_dir, markdown_dir, metadata_dir, db_url, batch_size_embed, batch_size_store, force_reembed } =
        command
    else {
        unreachable!("commands::mod only dispatches Ingest here");
    };

    let pool = build_pool(&db_url)?;
    let store = PgVectorStore::new(pool);
    let embedder = HashingEmbedder;
    let chunking = ChunkingConfig::default();

    if let Some(dir) = &pdf_dir {
        for entry in WalkDir::new(dir).into_iter().filter_map(Result::ok).filter(|e| e.file_type().is_file()) {
            warn!(
                path = %entry.path().display(),
                "PDF text extraction is not wired into this build (see arxiv_fetcher's documented PDF limitation); skipping"
            );
        }
    }

    let mut total_chunks = 0usize;
    if let Some(dir) = &markdown_dir {
        for entry in WalkDir::new(dir)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter(|e| matches!(e.path().extension().and_then(|x| x.to_str()), Some("md" | "markdown" | "txt")))
        {
            let doc_id = doc_id_for(entry.path());
            let text = std::fs::read_to_string(entry.path())
                .with_context(|| format!("reading {}", entry.path().display()))?;
            let metadata = load_metadata(metadata_dir.as_deref(), &doc_id, entry.path());

            if !force_reembed {
                let existing = store.list_documents().await.unwrap_or_default();
                if existing.iter().any(|(id, _)| id == &doc_id) {
                    info!(doc_id, "already ingested, skipping (pass --force-reembed to overwrite)");
                    continue;
                }
            }

            let text_chunks = chunk_text(&text, &chunking);
            let mut new_chunks = Vec::with_capacity(text_chunks.len());
            for batch in text_chunks.chunks(batch_size_embed.max(1)) {
                for chunk in batch {
                    let (dense, sparse) = embedder.embed(&chunk.content).await?;
                    new_chunks.push(NewChunk {
                        doc_id: doc_id.clone(),
                        chunk_id: format!("{doc_id}_{}", chunk.chunk_index),
                        chunk_index: chunk.chunk_index,
                        text: chunk.content.clone(),
                        dense_embedding: dense,
                        sparse_embedding: sparse,
                        metadata: metadata.clone(),
                    });
                }
            }

            for batch in new_chunks.chunks(batch_size_store.max(1)) {
                store.upsert_chunks(batch).await?;
            }
            total_chunks += new_chunks.len();
            info!(doc_id, chunks = new_chunks.len(), "ingested");
        }
    }

    if pdf_dir.is_none() && markdown_dir.is_none() {
        anyhow::bail!("ingest requires at least one of --pdf-dir or --markdown-dir");
    }

    println!("ingested {total_chunks} chunks");
    Ok(())
}

/// The first 8 hex chars of SHA1(path) — same `ref_id` derivation shape as
/// web sources (spec §3) so a document's id is stable across re-ingestion
/// runs of the same file.
fn doc_id_for(path: &Path) -> String {
    maestro_utils::refid::sha1_hex8(&path.to_string_lossy())
}

fn load_metadata(metadata_dir: Option<&Path>, doc_id: &str, source_path: &Path) -> serde_json::Value {
    let mut metadata = serde_json::json!({
        "source_path": source_path.to_string_lossy(),
        "title": source_path.file_stem().map(|s| s.to_string_lossy().to_string()),
    });
    if let Some(dir) = metadata_dir {
        let candidate = dir.join(format!("{doc_id}.json"));
        if let Ok(text) = std::fs::read_to_string(&candidate) {
            if let Ok(extra) = serde_json::from_str::<serde_json::Value>(&text) {
                if let (Some(base), Some(extra)) = (metadata.as_object_mut(), extra.as_object()) {
                    for (k, v) in extra {
                        base.insert(k.clone(), v.clone());
                    }
                }
            }
        }
    }
    metadata
}
