//! `query`: a single raw hybrid search against the document store, bypassing
//! the full `document_search` tool's strategist/preparer/rerank pipeline —
//! a low-level probe of `DocumentVectorStore::hybrid_search` for operators
//! inspecting what's actually in the store.

use anyhow::Result;
use maestro_tools::document_search::QueryEmbedder;
use maestro_tools::vector_store::{DocFilter, DocumentVectorStore, PgVectorStore};

use crate::cli::Commands;
use crate::embedder::HashingEmbedder;
use crate::runtime::build_pool;

pub async fn run(command: Commands) -> Result<()> {
    let Commands::Query { query_text, db_url, n_results, filter_doc_id, dense_weight, sparse_weight } = command else {
        unreachable!("commands::mod only dispatches Query here");
    };

    let pool = build_pool(&db_url)?;
    let store = PgVectorStore::new(pool);
    let embedder = HashingEmbedder;
    let (dense, sparse) = embedder.embed(&query_text).await?;
    let filter = match filter_doc_id {
        Some(id) => DocFilter::DocId(id),
        None => DocFilter::None,
    };

    let chunks = store.hybrid_search(&dense, &sparse, &filter, dense_weight, sparse_weight, n_results).await?;
    if chunks.is_empty() {
        println!("no results");
        return Ok(());
    }
    for (rank, chunk) in chunks.iter().enumerate() {
        println!(
            "{:>2}. [{:.4}] {} (chunk {})\n    {}",
            rank + 1,
            chunk.score,
            chunk.doc_id,
            chunk.chunk_index,
            truncate(&chunk.text, 200)
        );
    }
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    let flattened = text.replace('\n', " ");
    if flattened.chars().count() <= max {
        flattened
    } else {
        format!("{}…", flattened.chars().take(max).collect::<String>())
    }
}
