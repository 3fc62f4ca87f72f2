//! Ingestion pipeline orchestration.
//!
//! Walks the corpus, loads and chunks every eligible document, embeds
//! all chunk texts through the gateway in sequential batches, and
//! persists the resulting chunk table / embedding matrix pair.
//!
//! A file that fails to parse is skipped with a warning; a corpus that
//! produces zero chunks is an input error. If both index artifacts
//! already exist the build is skipped unless forced.

use anyhow::{bail, Result};
use std::path::Path;
use walkdir::WalkDir;

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::embedding::{self, EmbeddingClient};
use crate::index::{self, Index, IndexPaths};
use crate::loader::load_document;
use crate::models::ChunkRecord;

/// Build and persist the index for the configured corpus.
///
/// Skips the build when both artifacts already exist and `force` is
/// false (a stat check, not a content check).
pub async fn run_ingest(config: &Config, force: bool) -> Result<()> {
    let paths = IndexPaths::new(&config.paths.data_dir);

    if paths.both_exist() && !force {
        println!(
            "Index already exists at:\n  {}\n  {}",
            paths.index.display(),
            paths.embeddings.display()
        );
        println!("Use --force to rebuild the index.");
        return Ok(());
    }

    println!("Docs dir: {}", config.paths.docs_dir.display());
    println!("Data dir: {}", config.paths.data_dir.display());

    let client = embedding::create_embedding_client(&config.embedding)?;
    let built = build_index(config, client.as_ref()).await?;

    index::save_index(&built, &paths)?;

    println!("\nSaved chunk table to: {}", paths.index.display());
    println!("Saved embeddings to:  {}", paths.embeddings.display());
    println!("\nIngest complete.");
    Ok(())
}

/// Walk the corpus, chunk every document, and embed all chunks.
///
/// Fails with an input error when the corpus root is missing or no file
/// contributes any chunk — an index over nothing is a caller mistake
/// worth surfacing, not a valid empty index.
pub async fn build_index(config: &Config, client: &dyn EmbeddingClient) -> Result<Index> {
    let records = collect_chunks(
        &config.paths.docs_dir,
        config.chunking.chunk_size,
        config.chunking.chunk_overlap,
    )?;

    println!("\nTotal chunks: {}", records.len());
    println!("\nGenerating embeddings with {}...", client.model_name());

    let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
    let embeddings =
        embedding::embed_in_batches(client, &texts, config.embedding.batch_size).await?;

    println!(
        "Done generating embeddings ({} rows x {} dims).",
        embeddings.len(),
        embeddings.first().map(|v| v.len()).unwrap_or(0)
    );

    Index::new(records, embeddings)
}

/// Enumerate regular files under `docs_dir` in sorted order and chunk
/// each one. Unreadable files are warned about and skipped; empty files
/// contribute nothing.
fn collect_chunks(docs_dir: &Path, chunk_size: usize, overlap: usize) -> Result<Vec<ChunkRecord>> {
    if !docs_dir.exists() {
        bail!("Docs folder not found at: {}", docs_dir.display());
    }

    let mut files: Vec<_> = WalkDir::new(docs_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();

    if files.is_empty() {
        bail!("No files found under docs dir at {}", docs_dir.display());
    }

    println!("Found {} files under {}", files.len(), docs_dir.display());

    let mut records = Vec::new();

    for path in &files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        println!("Loading {}...", name);

        let text = match load_document(path) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("Warning: skipping {}: {}", name, e);
                continue;
            }
        };

        if text.trim().is_empty() {
            println!("  Skipping empty or unreadable file: {}", name);
            continue;
        }

        let chunks = chunk_text(&text, chunk_size, overlap)?;
        println!("  Created {} chunks.", chunks.len());

        let source = path
            .strip_prefix(docs_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string();

        for (idx, chunk) in chunks.into_iter().enumerate() {
            records.push(ChunkRecord {
                source: source.clone(),
                chunk_id: idx,
                text: chunk,
            });
        }
    }

    if records.is_empty() {
        bail!(
            "No ingestible documents found under {} (all files empty, unsupported, or unreadable)",
            docs_dir.display()
        );
    }

    Ok(records)
}
