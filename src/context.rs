//! Context assembly: render retrieved chunks into the text block handed
//! to the chat model.
//!
//! Each chunk keeps its provenance (source, chunk id, similarity) in a
//! header line; chunks are emitted in ranked order, untruncated.

use crate::models::RetrievedChunk;

/// Render the retrieved chunks as a single formatted context block.
///
/// Per chunk: a `Source: <source> (chunk <id>, sim=<sim>)` header, the
/// raw chunk text, and a `-----` separator line. Blocks are joined with
/// a blank line.
pub fn build_context(chunks: &[RetrievedChunk]) -> String {
    let parts: Vec<String> = chunks
        .iter()
        .map(|c| {
            format!(
                "Source: {} (chunk {}, sim={:.3})\n{}\n-----",
                c.record.source, c.record.chunk_id, c.similarity, c.record.text
            )
        })
        .collect();
    parts.join("\n\n")
}

/// Interpolate the question and context block into the user prompt
/// template. The question is inserted verbatim.
pub fn build_user_prompt(template: &str, question: &str, context: &str) -> String {
    template
        .replace("{question}", question)
        .replace("{context}", context)
}
