//! Similarity-ranked retrieval over a loaded index.
//!
//! Embeds the query through the same gateway the index was built with,
//! scores every chunk by cosine similarity, and returns the top-K most
//! similar chunks with their scores attached.

use anyhow::Result;

use crate::embedding::{embed_query, EmbeddingClient};
use crate::index::Index;
use crate::models::RetrievedChunk;

/// Guards against division by zero for degenerate all-zero vectors.
const NORM_EPSILON: f32 = 1e-8;

/// Embed `query` and return the `k` most similar chunks, best first.
///
/// `k` larger than the index is clamped, never an error. Ties keep the
/// chunk table's original order.
pub async fn retrieve_top_k(
    index: &Index,
    client: &dyn EmbeddingClient,
    query: &str,
    k: usize,
) -> Result<Vec<RetrievedChunk>> {
    let query_vec = embed_query(client, query).await?;
    Ok(rank_by_similarity(index, &query_vec, k))
}

/// Rank all chunks against an already-embedded query vector.
pub fn rank_by_similarity(index: &Index, query_vec: &[f32], k: usize) -> Vec<RetrievedChunk> {
    let q = normalize(query_vec);
    let sims: Vec<f32> = index
        .embeddings
        .iter()
        .map(|row| dot(&normalize(row), &q))
        .collect();

    let mut order: Vec<usize> = (0..sims.len()).collect();
    // Stable sort: equal similarities keep table order.
    order.sort_by(|&a, &b| {
        sims[b]
            .partial_cmp(&sims[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order.truncate(k.min(sims.len()));

    order
        .into_iter()
        .map(|i| RetrievedChunk {
            record: index.records[i].clone(),
            similarity: sims[i],
        })
        .collect()
}

fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm + NORM_EPSILON;
    v.iter().map(|x| x / denom).collect()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
