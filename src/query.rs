//! Query-time orchestration: load index, retrieve, assemble context,
//! generate an answer, and report the ranked sources alongside it.

use anyhow::Result;
use std::io::Write;

use crate::chat;
use crate::config::Config;
use crate::context::{build_context, build_user_prompt};
use crate::embedding;
use crate::index::{self, IndexPaths};
use crate::models::RetrievedChunk;
use crate::retrieve::retrieve_top_k;

/// Answer a single question and print the answer plus ranked sources.
pub async fn run_query(config: &Config, question: &str, top_k: Option<usize>) -> Result<()> {
    let paths = IndexPaths::new(&config.paths.data_dir);
    let loaded = index::load_index(&paths)?;
    println!(
        "Loaded index with {} chunks ({} dims).",
        loaded.len(),
        loaded.dims()
    );

    let embedder = embedding::create_embedding_client(&config.embedding)?;
    let chatter = chat::create_chat_client(&config.llm)?;

    let k = top_k.unwrap_or(config.retrieval.top_k);

    println!("\nRetrieving relevant chunks...");
    let chunks = retrieve_top_k(&loaded, embedder.as_ref(), question, k).await?;
    let context = build_context(&chunks);

    println!("Generating answer...\n");
    let user_prompt = build_user_prompt(&config.prompts.user, question, &context);
    let answer = chatter.chat(&config.prompts.system, &user_prompt).await?;

    println!("=== Answer ===");
    println!("{}", answer);
    print_sources(&chunks);

    Ok(())
}

/// Interactive loop: read questions from stdin until `exit` or `quit`.
pub async fn run_chat(config: &Config) -> Result<()> {
    let paths = IndexPaths::new(&config.paths.data_dir);
    let loaded = index::load_index(&paths)?;
    println!(
        "Loaded index with {} chunks ({} dims).",
        loaded.len(),
        loaded.dims()
    );

    let embedder = embedding::create_embedding_client(&config.embedding)?;
    let chatter = chat::create_chat_client(&config.llm)?;

    println!("\nRAG assistant ready. Ask questions about your documents.");
    println!("Type 'exit' or 'quit' to stop.\n");

    loop {
        print!("Your question> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if std::io::stdin().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            println!("Goodbye.");
            break;
        }
        if question.is_empty() {
            continue;
        }

        println!("\nRetrieving relevant chunks...");
        let chunks =
            retrieve_top_k(&loaded, embedder.as_ref(), question, config.retrieval.top_k).await?;
        let context = build_context(&chunks);

        println!("Generating answer...\n");
        let user_prompt = build_user_prompt(&config.prompts.user, question, &context);
        let answer = chatter.chat(&config.prompts.system, &user_prompt).await?;

        println!("=== Answer ===");
        println!("{}", answer);
        print_sources(&chunks);
        println!();
    }

    Ok(())
}

fn print_sources(chunks: &[RetrievedChunk]) {
    println!("\n--- Retrieved sources (top chunks) ---");
    for c in chunks {
        println!(
            "  {} (chunk {})  sim={:.3}",
            c.record.source, c.record.chunk_id, c.similarity
        );
    }
}
