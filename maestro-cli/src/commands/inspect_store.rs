//! `inspect-store`: reports chunk/document counts, or (with `--list-docs`)
//! every distinct `doc_id` currently in the store.

use anyhow::Result;
use maestro_tools::vector_store::{DocumentVectorStore, PgVectorStore};

use crate::cli::Commands;
use crate::runtime::build_pool;

pub async fn run(command: Commands) -> Result<()> {
    let Commands::InspectStore { db_url, list_docs } = command else {
        unreachable!("commands::mod only dispatches InspectStore here");
    };

    let pool = build_pool(&db_url)?;
    let store = PgVectorStore::new(pool);

    let total_chunks = store.count_chunks().await?;
    let documents = store.list_documents().await?;
    println!("documents: {}", documents.len());
    println!("chunks:    {total_chunks}");

    if list_docs {
        for (doc_id, metadata) in &documents {
            let title = metadata.get("title").and_then(|v| v.as_str()).unwrap_or("(untitled)");
            println!("  {doc_id}  {title}");
        }
    }
    Ok(())
}
