//! Core data models used throughout the pipeline.
//!
//! These types represent the chunks that flow through ingestion, the
//! retrieval results attached at query time, and the scores produced
//! by the evaluation judge.

use serde::{Deserialize, Serialize};

/// One contiguous slice of a source document after chunking.
///
/// `(source, chunk_id)` pairs are unique across an index; `chunk_id`
/// is zero-based and follows document order within its source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Path of the originating document, relative to the corpus root.
    pub source: String,
    /// Zero-based sequence number of this chunk within its source.
    pub chunk_id: usize,
    /// The chunk's text content (non-empty after trimming).
    pub text: String,
}

/// A chunk selected by retrieval, with its similarity score attached.
///
/// Exists only within a single retrieval call's result; never persisted.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub record: ChunkRecord,
    /// Cosine similarity between the query vector and this chunk's embedding.
    pub similarity: f32,
}

/// Scores assigned by the LLM judge to one answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeScores {
    pub correctness: f64,
    pub groundedness: f64,
    pub completeness: f64,
    pub comment: String,
}
