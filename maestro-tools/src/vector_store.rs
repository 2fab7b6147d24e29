//! Vector store adapter (SPEC_FULL §[EXPANSION], spec §6): PostgreSQL with
//! the pgvector extension, `doc_id, chunk_id, chunk_index, chunk_text,
//! dense_embedding (vector), sparse_embedding (jsonb), chunk_metadata
//! (jsonb)`. Hybrid query is a weighted sum of cosine similarity (dense,
//! via pgvector's `<=>`) and sparse similarity (computed in-app from
//! `int -> float` dicts); weights normalize to 1.
//!
//! Embedding generation is out of scope (spec §1's "explicitly out of
//! scope: embedding/rerank models"); the trait accepts pre-computed query
//! vectors.

use async_trait::async_trait;
use deadpool_postgres::Pool;
use pgvector::Vector;
use std::collections::HashMap;

use crate::error::ToolError;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Chunk {
    pub doc_id: String,
    pub chunk_id: String,
    pub chunk_index: i32,
    pub text: String,
    pub metadata: serde_json::Value,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub enum DocFilter {
    None,
    DocId(String),
    DocIds(Vec<String>),
}

/// A chunk ready to be written to the store, with its embeddings already
/// computed by the caller's `QueryEmbedder` (ingestion reuses the same
/// narrow embedding seam a search query uses).
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub doc_id: String,
    pub chunk_id: String,
    pub chunk_index: i32,
    pub text: String,
    pub dense_embedding: Vec<f32>,
    pub sparse_embedding: HashMap<u32, f32>,
    pub metadata: serde_json::Value,
}

#[async_trait]
pub trait DocumentVectorStore: Send + Sync {
    async fn hybrid_search(
        &self,
        query_dense: &[f32],
        query_sparse: &HashMap<u32, f32>,
        filter: &DocFilter,
        dense_weight: f32,
        sparse_weight: f32,
        n: usize,
    ) -> Result<Vec<Chunk>, ToolError>;

    /// Inserts or replaces chunks, keyed by `(doc_id, chunk_id)`.
    async fn upsert_chunks(&self, chunks: &[NewChunk]) -> Result<(), ToolError>;

    /// Distinct `doc_id`s currently in the store, each paired with one
    /// representative chunk's metadata (for `inspect-store --list-docs`).
    async fn list_documents(&self) -> Result<Vec<(String, serde_json::Value)>, ToolError>;

    /// Total chunk count in the store (for `inspect-store`).
    async fn count_chunks(&self) -> Result<i64, ToolError>;
}

/// Normalize `(dense_weight, sparse_weight)` so they sum to 1, falling back
/// to an even split when both are zero (spec §6's "weights normalize to
/// 1").
pub fn normalize_weights(dense_weight: f32, sparse_weight: f32) -> (f32, f32) {
    let total = dense_weight + sparse_weight;
    if total <= 0.0 {
        (0.5, 0.5)
    } else {
        (dense_weight / total, sparse_weight / total)
    }
}

/// Cosine similarity between a dense query vector and a sparse
/// `index -> weight` map representation, computed app-side since pgvector
/// has no native sparse-vector type in the column layout this store uses.
pub fn sparse_cosine_similarity(query: &HashMap<u32, f32>, candidate: &HashMap<u32, f32>) -> f32 {
    let mut dot = 0.0f32;
    for (idx, q_weight) in query {
        if let Some(c_weight) = candidate.get(idx) {
            dot += q_weight * c_weight;
        }
    }
    let query_norm: f32 = query.values().map(|v| v * v).sum::<f32>().sqrt();
    let candidate_norm: f32 = candidate.values().map(|v| v * v).sum::<f32>().sqrt();
    if query_norm == 0.0 || candidate_norm == 0.0 {
        return 0.0;
    }
    dot / (query_norm * candidate_norm)
}

pub struct PgVectorStore {
    pool: Pool,
}

impl PgVectorStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentVectorStore for PgVectorStore {
    async fn hybrid_search(
        &self,
        query_dense: &[f32],
        query_sparse: &HashMap<u32, f32>,
        filter: &DocFilter,
        dense_weight: f32,
        sparse_weight: f32,
        n: usize,
    ) -> Result<Vec<Chunk>, ToolError> {
        let (dense_weight, sparse_weight) = normalize_weights(dense_weight, sparse_weight);
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| ToolError::storage_unavailable(format!("pgvector pool checkout failed: {e}")))?;

        let query_vector = Vector::from(query_dense.to_vec());

        let (where_clause, doc_ids): (&str, Vec<String>) = match filter {
            DocFilter::None => ("TRUE", vec![]),
            DocFilter::DocId(id) => ("doc_id = $2", vec![id.clone()]),
            DocFilter::DocIds(ids) => ("doc_id = ANY($2)", ids.clone()),
        };

        // Over-fetch on the dense-only ordering so the app-side sparse
        // rescoring has a meaningful candidate pool to re-rank within.
        let candidate_limit = (n * 5).max(n) as i64;
        let sql = format!(
            "SELECT doc_id, chunk_id, chunk_index, chunk_text, sparse_embedding, chunk_metadata, \
             1 - (dense_embedding <=> $1) AS dense_similarity \
             FROM document_chunks WHERE {where_clause} \
             ORDER BY dense_embedding <=> $1 LIMIT {candidate_limit}"
        );

        let rows = if doc_ids.is_empty() {
            client
                .query(&sql, &[&query_vector])
                .await
                .map_err(|e| ToolError::storage_unavailable(format!("hybrid search query failed: {e}")))?
        } else {
            client
                .query(&sql, &[&query_vector, &doc_ids])
                .await
                .map_err(|e| ToolError::storage_unavailable(format!("hybrid search query failed: {e}")))?
        };

        let mut chunks: Vec<Chunk> = rows
            .iter()
            .map(|row| {
                let sparse_json: serde_json::Value = row.get("sparse_embedding");
                let sparse_map: HashMap<u32, f32> = serde_json::from_value(sparse_json).unwrap_or_default();
                let dense_similarity: f64 = row.get("dense_similarity");
                let sparse_similarity = sparse_cosine_similarity(query_sparse, &sparse_map);
                let score = dense_weight * dense_similarity as f32 + sparse_weight * sparse_similarity;
                Chunk {
                    doc_id: row.get("doc_id"),
                    chunk_id: row.get("chunk_id"),
                    chunk_index: row.get("chunk_index"),
                    text: row.get("chunk_text"),
                    metadata: row.get("chunk_metadata"),
                    score,
                }
            })
            .collect();

        chunks.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        chunks.truncate(n);
        Ok(chunks)
    }

    async fn upsert_chunks(&self, chunks: &[NewChunk]) -> Result<(), ToolError> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| ToolError::storage_unavailable(format!("pgvector pool checkout failed: {e}")))?;

        for chunk in chunks {
            let dense = Vector::from(chunk.dense_embedding.clone());
            let sparse_json = serde_json::to_value(&chunk.sparse_embedding).unwrap_or(serde_json::Value::Null);
            client
                .execute(
                    "INSERT INTO document_chunks \
                     (doc_id, chunk_id, chunk_index, chunk_text, dense_embedding, sparse_embedding, chunk_metadata) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7) \
                     ON CONFLICT (doc_id, chunk_id) DO UPDATE SET \
                     chunk_index = EXCLUDED.chunk_index, chunk_text = EXCLUDED.chunk_text, \
                     dense_embedding = EXCLUDED.dense_embedding, sparse_embedding = EXCLUDED.sparse_embedding, \
                     chunk_metadata = EXCLUDED.chunk_metadata",
                    &[
                        &chunk.doc_id,
                        &chunk.chunk_id,
                        &chunk.chunk_index,
                        &chunk.text,
                        &dense,
                        &sparse_json,
                        &chunk.metadata,
                    ],
                )
                .await
                .map_err(|e| ToolError::storage_unavailable(format!("chunk upsert failed: {e}")))?;
        }
        Ok(())
    }

    async fn list_documents(&self) -> Result<Vec<(String, serde_json::Value)>, ToolError> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| ToolError::storage_unavailable(format!("pgvector pool checkout failed: {e}")))?;
        let rows = client
            .query(
                "SELECT DISTINCT ON (doc_id) doc_id, chunk_metadata FROM document_chunks ORDER BY doc_id, chunk_index",
                &[],
            )
            .await
            .map_err(|e| ToolError::storage_unavailable(format!("document listing failed: {e}")))?;
        Ok(rows.iter().map(|row| (row.get("doc_id"), row.get("chunk_metadata"))).collect())
    }

    async fn count_chunks(&self) -> Result<i64, ToolError> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| ToolError::storage_unavailable(format!("pgvector pool checkout failed: {e}")))?;
        let row = client
            .query_one("SELECT COUNT(*) AS n FROM document_chunks", &[])
            .await
            .map_err(|e| ToolError::storage_unavailable(format!("chunk count failed: {e}")))?;
        Ok(row.get("n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_normalize_to_one() {
        let (d, s) = normalize_weights(3.0, 1.0);
        assert!((d + s - 1.0).abs() < 1e-6);
        assert!((d - 0.75).abs() < 1e-6);
    }

    #[test]
    fn zero_weights_fall_back_to_even_split() {
        let (d, s) = normalize_weights(0.0, 0.0);
        assert_eq!(d, 0.5);
        assert_eq!(s, 0.5);
    }

    #[test]
    fn sparse_cosine_similarity_identical_vectors_is_one() {
        let mut map = HashMap::new();
        map.insert(1u32, 1.0f32);
        map.insert(2u32, 2.0f32);
        let sim = sparse_cosine_similarity(&map, &map);
        assert!((sim - 1.0).abs() < 1e-5);
    }

    #[test]
    fn sparse_cosine_similarity_disjoint_vectors_is_zero() {
        let mut a = HashMap::new();
        a.insert(1u32, 1.0f32);
        let mut b = HashMap::new();
        b.insert(2u32, 1.0f32);
        assert_eq!(sparse_cosine_similarity(&a, &b), 0.0);
    }
}
