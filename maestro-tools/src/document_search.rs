//! **document_search** (spec §4.3): hybrid dense+sparse retrieval over the
//! document vector store, decomposed into strategist -> preparer ->
//! parallel-retriever -> optional-rerank stages.

use async_trait::async_trait;
use maestro_providers::{AgentRole, ModelDispatcher};
use maestro_utils::json_extract::extract_first_json;
use maestro_utils::refid::sha1_hex8;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::ToolError;
use crate::registry::Tool;
use crate::schema::{ToolCategory, ToolSchema};
use crate::vector_store::{Chunk, DocFilter, DocumentVectorStore};

/// Converts free text into the dense/sparse query representation the
/// vector store expects. Embedding generation is an external collaborator
/// (spec §1); this is the narrow seam a concrete embedding client plugs
/// into.
#[async_trait]
pub trait QueryEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<(Vec<f32>, HashMap<u32, f32>), ToolError>;
}

const RETRIEVAL_TECHNIQUES: &[&str] = &["sub_query", "step_back"];

pub struct DocumentSearchTool {
    store: Arc<dyn DocumentVectorStore>,
    embedder: Arc<dyn QueryEmbedder>,
    dispatcher: Arc<ModelDispatcher>,
}

impl DocumentSearchTool {
    pub fn new(
        store: Arc<dyn DocumentVectorStore>,
        embedder: Arc<dyn QueryEmbedder>,
        dispatcher: Arc<ModelDispatcher>,
    ) -> Self {
        Self {
            store,
            embedder,
            dispatcher,
        }
    }

    /// Step 1: ask the fast model which retrieval techniques to use for this
    /// query. Falls back to every known technique if the model's response
    /// isn't parseable JSON (spec §4.4's decomposition fallback philosophy
    /// applied here to strategy selection).
    async fn strategize(&self, query: &str) -> Vec<String> {
        let prompt = format!(
            "Choose retrieval techniques for this query from {RETRIEVAL_TECHNIQUES:?}. \
             Respond with a JSON array of technique names.\n\nQuery: {query}"
        );
        let input = maestro_core::traits::AgentInput::from_prompt(prompt);
        let Ok(output) = self.dispatcher.dispatch(AgentRole::QueryStrategy, input).await else {
            return RETRIEVAL_TECHNIQUES.iter().map(|s| s.to_string()).collect();
        };
        match extract_first_json(&output.content).and_then(|raw| serde_json::from_str::<Vec<String>>(&raw).ok()) {
            Some(techniques) if !techniques.is_empty() => techniques,
            _ => RETRIEVAL_TECHNIQUES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Step 2: rewrite the query once per chosen technique.
    async fn prepare_queries(&self, query: &str, techniques: &[String]) -> Vec<String> {
        let mut prepared = Vec::new();
        for technique in techniques {
            let prompt = format!(
                "Rewrite this search query using the '{technique}' technique. \
                 Respond with only the rewritten query text.\n\nQuery: {query}"
            );
            let input = maestro_core::traits::AgentInput::from_prompt(prompt);
            match self.dispatcher.dispatch(AgentRole::QueryPreparation, input).await {
                Ok(output) => prepared.push(output.content.trim().to_string()),
                Err(_) => prepared.push(query.to_string()),
            }
        }
        if prepared.is_empty() {
            prepared.push(query.to_string());
        }
        prepared
    }

    /// Step 3: run every prepared query's retrieval concurrently, then
    /// aggregate and dedupe by chunk id (falling back to `no_id_<hash>`
    /// when a chunk carries no id).
    async fn retrieve_all(
        &self,
        prepared_queries: &[String],
        filter: &DocFilter,
        dense_weight: f32,
        sparse_weight: f32,
        n_results: usize,
    ) -> Result<Vec<Chunk>, ToolError> {
        let futures = prepared_queries.iter().map(|query| {
            let store = self.store.clone();
            let embedder = self.embedder.clone();
            let filter = filter.clone();
            let query = query.clone();
            async move {
                let (dense, sparse) = embedder.embed(&query).await?;
                store
                    .hybrid_search(&dense, &sparse, &filter, dense_weight, sparse_weight, n_results)
                    .await
            }
        });

        let results = futures::future::join_all(futures).await;

        let mut seen = HashSet::new();
        let mut aggregated = Vec::new();
        for result in results {
            for chunk in result? {
                let key = if chunk.chunk_id.is_empty() {
                    format!("no_id_{}", sha1_hex8(&chunk.text))
                } else {
                    chunk.chunk_id.clone()
                };
                if seen.insert(key) {
                    aggregated.push(chunk);
                }
            }
        }
        Ok(aggregated)
    }

    /// Step 4: optional re-rank of the aggregated set against the
    /// **original** query (not any rewritten form), returning top-n.
    async fn rerank(&self, original_query: &str, chunks: Vec<Chunk>, n: usize) -> Vec<Chunk> {
        if chunks.is_empty() {
            return chunks;
        }
        let listing: String = chunks
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{i}: {}", c.text.chars().take(300).collect::<String>()))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Rank these passages by relevance to the query \"{original_query}\". \
             Respond with a JSON array of indices, most relevant first.\n\n{listing}"
        );
        let input = maestro_core::traits::AgentInput::from_prompt(prompt);
        let Ok(output) = self.dispatcher.dispatch(AgentRole::Research, input).await else {
            return chunks.into_iter().take(n).collect();
        };
        let Some(order) =
            extract_first_json(&output.content).and_then(|raw| serde_json::from_str::<Vec<usize>>(&raw).ok())
        else {
            return chunks.into_iter().take(n).collect();
        };

        let mut by_index: HashMap<usize, Chunk> = chunks.into_iter().enumerate().collect();
        let mut reranked = Vec::new();
        for index in order {
            if let Some(chunk) = by_index.remove(&index) {
                reranked.push(chunk);
            }
        }
        reranked.truncate(n);
        reranked
    }
}

fn parse_filter(args: &serde_json::Value) -> DocFilter {
    if let Some(id) = args.get("filter_doc_id").and_then(|v| v.as_str()) {
        return DocFilter::DocId(id.to_string());
    }
    if let Some(ids) = args.get("filter_doc_ids").and_then(|v| v.as_array()) {
        let ids: Vec<String> = ids.iter().filter_map(|v| v.as_str().map(str::to_string)).collect();
        if !ids.is_empty() {
            return DocFilter::DocIds(ids);
        }
    }
    DocFilter::None
}

#[async_trait]
impl Tool for DocumentSearchTool {
    fn name(&self) -> &str {
        "document_search"
    }

    fn description(&self) -> &str {
        "Hybrid dense+sparse search over the document vector store"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Retrieval
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "n_results": {"type": "integer"},
                    "filter_doc_id": {"type": "string"},
                    "filter_doc_ids": {"type": "array", "items": {"type": "string"}},
                    "dense_weight": {"type": "number"},
                    "sparse_weight": {"type": "number"},
                    "use_reranker": {"type": "boolean"}
                }
            }),
            ["query"],
        )
    }

    #[tracing::instrument(skip(self, args, context))]
    async fn invoke(
        &self,
        args: serde_json::Value,
        context: &maestro_core::context::ExecutionContext,
    ) -> Result<serde_json::Value, ToolError> {
        context.check_cancelled().map_err(ToolError::from)?;
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::input_invalid("'query' must be a string"))?;
        let n_results = args.get("n_results").and_then(|v| v.as_u64()).unwrap_or(10) as usize;
        let dense_weight = args.get("dense_weight").and_then(|v| v.as_f64()).unwrap_or(0.5) as f32;
        let sparse_weight = args.get("sparse_weight").and_then(|v| v.as_f64()).unwrap_or(0.5) as f32;
        let use_reranker = args.get("use_reranker").and_then(|v| v.as_bool()).unwrap_or(false);
        let filter = parse_filter(&args);

        let techniques = self.strategize(query).await;
        context.check_cancelled().map_err(ToolError::from)?;
        let prepared_queries = self.prepare_queries(query, &techniques).await;
        context.check_cancelled().map_err(ToolError::from)?;

        let over_fetch = if use_reranker { n_results * 2 } else { n_results };
        let aggregated = self
            .retrieve_all(&prepared_queries, &filter, dense_weight, sparse_weight, over_fetch)
            .await?;

        let results = if use_reranker {
            self.rerank(query, aggregated, n_results).await
        } else {
            aggregated.into_iter().take(n_results).collect()
        };

        let chunk_dicts: Vec<serde_json::Value> = results
            .into_iter()
            .map(|c| json!({"text": c.text, "doc_id": c.doc_id, "chunk_id": c.chunk_id, "metadata": c.metadata}))
            .collect();
        Ok(json!({ "results": chunk_dicts }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_prefers_single_doc_id_over_list() {
        let args = json!({"filter_doc_id": "doc-1", "filter_doc_ids": ["doc-2"]});
        assert!(matches!(parse_filter(&args), DocFilter::DocId(id) if id == "doc-1"));
    }

    #[test]
    fn filter_falls_back_to_none() {
        let args = json!({});
        assert!(matches!(parse_filter(&args), DocFilter::None));
    }
}
