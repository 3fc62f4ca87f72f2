//! # docrag
//!
//! A retrieval-augmented question answering pipeline for local document
//! collections.
//!
//! docrag ingests heterogeneous documents (plain text, PDF, DOCX),
//! splits them into overlapping character windows, embeds each chunk
//! through a pluggable gateway, and persists the chunk table and
//! embedding matrix as a two-file index. At query time it embeds the
//! question through the same gateway, ranks all chunks by cosine
//! similarity, and asks a chat model to answer grounded in the top-K
//! chunks.
//!
//! ## Quick Start
//!
//! ```bash
//! rag ingest                    # build the index from the configured docs dir
//! rag query "What is the delivery deadline?"
//! rag chat                      # interactive question loop
//! rag eval --questions eval_questions.json
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Core data types |
//! | [`loader`] | Multi-format document loading (txt/md, PDF, DOCX) |
//! | [`chunk`] | Overlapping sliding-window chunker |
//! | [`embedding`] | Embedding gateway trait and backends |
//! | [`chat`] | Chat-completion trait and backends |
//! | [`index`] | Index persistence (atomic chunk-table/matrix pair) |
//! | [`ingest`] | Index build orchestration |
//! | [`retrieve`] | Cosine-similarity top-K retrieval |
//! | [`context`] | Context block assembly and prompt interpolation |
//! | [`query`] | One-shot query and interactive chat flows |
//! | [`eval`] | LLM-as-judge evaluation runs |

pub mod chat;
pub mod chunk;
pub mod config;
pub mod context;
pub mod embedding;
pub mod eval;
pub mod index;
pub mod ingest;
pub mod loader;
pub mod models;
pub mod query;
pub mod retrieve;
