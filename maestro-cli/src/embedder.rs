//! A deterministic, hash-based stand-in for a real embedding model, behind
//! the same `QueryEmbedder` seam `document_search` dispatches through
//! (spec §1: embedding models are an external collaborator). A production
//! deployment swaps this out for a real embedder behind the same trait;
//! nothing upstream of `QueryEmbedder` needs to change.

use async_trait::async_trait;
use sha1::{Digest, Sha1};
use std::collections::HashMap;

use maestro_tools::document_search::QueryEmbedder;
use maestro_tools::error::ToolError;

const DENSE_DIMS: usize = 256;
const SPARSE_BUCKETS: u32 = 4096;

pub struct HashingEmbedder;

#[async_trait]
impl QueryEmbedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<(Vec<f32>, HashMap<u32, f32>), ToolError> {
        if text.trim().is_empty() {
            return Err(ToolError::input_invalid("cannot embed empty text"));
        }
        Ok((dense_embedding(text), sparse_embedding(text)))
    }
}

/// Hashes `(text, i)` for each of `DENSE_DIMS` components into a
/// deterministic pseudo-random unit vector. Stable across runs and
/// processes; not a learned representation.
fn dense_embedding(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; DENSE_DIMS];
    for (i, slot) in vector.iter_mut().enumerate() {
        let mut hasher = Sha1::new();
        hasher.update(text.as_bytes());
        hasher.update((i as u32).to_le_bytes());
        let digest = hasher.finalize();
        let raw = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]);
        *slot = (raw as f32 / u32::MAX as f32) * 2.0 - 1.0;
    }
    normalize(&mut vector);
    vector
}

fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

/// Bag-of-words sparse representation: each lowercased token hashes into a
/// fixed bucket, weighted by term frequency within `text`.
fn sparse_embedding(text: &str) -> HashMap<u32, f32> {
    let mut weights: HashMap<u32, f32> = HashMap::new();
    for token in text.split_whitespace() {
        let normalized = token.to_lowercase();
        let mut hasher = Sha1::new();
        hasher.update(normalized.as_bytes());
        let digest = hasher.finalize();
        let bucket = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]) % SPARSE_BUCKETS;
        *weights.entry(bucket).or_insert(0.0) += 1.0;
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embeds_deterministically() {
        let embedder = HashingEmbedder;
        let (a, _) = embedder.embed("hello world").await.unwrap();
        let (b, _) = embedder.embed("hello world").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn rejects_empty_text() {
        let embedder = HashingEmbedder;
        assert!(embedder.embed("   ").await.is_err());
    }

    #[tokio::test]
    async fn dense_vector_is_unit_normalized() {
        let embedder = HashingEmbedder;
        let (dense, _) = embedder.embed("some query text").await.unwrap();
        let norm: f32 = dense.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }
}
