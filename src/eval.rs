//! LLM-as-judge evaluation over a fixed question set.
//!
//! Runs each question through the full retrieve/answer pipeline, then
//! asks the chat model — acting as an impartial judge — to score the
//! answer 1–5 for correctness, groundedness, and completeness, replying
//! as a JSON object. A reply that does not parse is a soft failure: the
//! scores fall back to zero and the raw reply is retained as the
//! comment, so one malformed judgement never aborts the run.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::chat::{self, ChatClient};
use crate::config::Config;
use crate::context::{build_context, build_user_prompt};
use crate::embedding;
use crate::index::{self, IndexPaths};
use crate::models::JudgeScores;
use crate::retrieve::retrieve_top_k;

const JUDGE_SYSTEM_PROMPT: &str = "You are an impartial evaluator for a retrieval-augmented \
    question answering system. You will be given a question, the retrieved context, and the \
    system's answer. Score the answer on a 1-5 scale for:\n\
    - correctness: is the answer factually correct given the context?\n\
    - groundedness: does the answer stay within the context (no hallucinations)?\n\
    - completeness: does the answer fully address the question, given the context?\n\
    Reply with a single JSON object: {\"correctness\": <1-5>, \"groundedness\": <1-5>, \
    \"completeness\": <1-5>, \"comment\": \"<short explanation>\"}";

/// One entry of the evaluation question file (a JSON array of these).
#[derive(Debug, Deserialize)]
pub struct EvalQuestion {
    pub question: String,
}

/// Result row written to `eval_results.json`.
#[derive(Debug, Serialize)]
pub struct EvalResult {
    pub question: String,
    pub answer: String,
    pub correctness: f64,
    pub groundedness: f64,
    pub completeness: f64,
    pub comment: String,
}

/// Answer and judge every question in `questions_path`, printing scores
/// and writing the full results next to the index artifacts.
pub async fn run_eval(
    config: &Config,
    questions_path: &std::path::Path,
    top_k: Option<usize>,
) -> Result<()> {
    let questions = load_questions(questions_path)?;

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

    let mut results: Vec<EvalResult> = Vec::with_capacity(questions.len());

    for (i, q) in questions.iter().enumerate() {
        println!("\n[{}/{}] {}", i + 1, questions.len(), q.question);

        let chunks = retrieve_top_k(&loaded, embedder.as_ref(), &q.question, k).await?;
        let context = build_context(&chunks);
        let user_prompt = build_user_prompt(&config.prompts.user, &q.question, &context);
        let answer = chatter.chat(&config.prompts.system, &user_prompt).await?;

        let scores = judge_answer(chatter.as_ref(), &q.question, &context, &answer).await?;
        println!(
            "  correctness={:.1} groundedness={:.1} completeness={:.1}",
            scores.correctness, scores.groundedness, scores.completeness
        );

        results.push(EvalResult {
            question: q.question.clone(),
            answer,
            correctness: scores.correctness,
            groundedness: scores.groundedness,
            completeness: scores.completeness,
            comment: scores.comment,
        });
    }

    let n = results.len() as f64;
    println!("\n=== Averages over {} questions ===", results.len());
    println!(
        "  correctness:  {:.2}",
        results.iter().map(|r| r.correctness).sum::<f64>() / n
    );
    println!(
        "  groundedness: {:.2}",
        results.iter().map(|r| r.groundedness).sum::<f64>() / n
    );
    println!(
        "  completeness: {:.2}",
        results.iter().map(|r| r.completeness).sum::<f64>() / n
    );

    let out_path = config.paths.data_dir.join("eval_results.json");
    std::fs::write(&out_path, serde_json::to_vec_pretty(&results)?)
        .with_context(|| format!("Failed to write {}", out_path.display()))?;
    println!("\nWrote results to: {}", out_path.display());

    Ok(())
}

fn load_questions(path: &std::path::Path) -> Result<Vec<EvalQuestion>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read questions file: {}", path.display()))?;
    let questions: Vec<EvalQuestion> = serde_json::from_slice(&bytes)
        .with_context(|| format!("Questions file must be a JSON array of {{\"question\": ...}} objects: {}", path.display()))?;
    if questions.is_empty() {
        bail!("Questions file is empty: {}", path.display());
    }
    Ok(questions)
}

/// Ask the judge to score one answer.
async fn judge_answer(
    chatter: &dyn ChatClient,
    question: &str,
    context: &str,
    answer: &str,
) -> Result<JudgeScores> {
    let user = format!(
        "Question:\n{}\n\nContext:\n{}\n\nAnswer:\n{}\n\n\
         Provide your evaluation as a single JSON object.",
        question, context, answer
    );
    let reply = chatter.chat(JUDGE_SYSTEM_PROMPT, &user).await?;
    Ok(parse_judge_reply(&reply))
}

/// Parse the judge's reply, tolerating surrounding prose or code fences.
///
/// On any parse failure the scores fall back to 0.0 and the raw reply is
/// kept verbatim in `comment` for diagnostics.
pub fn parse_judge_reply(reply: &str) -> JudgeScores {
    let fallback = || JudgeScores {
        correctness: 0.0,
        groundedness: 0.0,
        completeness: 0.0,
        comment: reply.to_string(),
    };

    let start = match reply.find('{') {
        Some(i) => i,
        None => return fallback(),
    };
    let end = match reply.rfind('}') {
        Some(i) if i > start => i,
        _ => return fallback(),
    };

    #[derive(Deserialize)]
    struct RawScores {
        correctness: f64,
        groundedness: f64,
        completeness: f64,
        #[serde(default)]
        comment: String,
    }

    match serde_json::from_str::<RawScores>(&reply[start..=end]) {
        Ok(raw) => JudgeScores {
            correctness: raw.correctness,
            groundedness: raw.groundedness,
            completeness: raw.completeness,
            comment: raw.comment,
        },
        Err(_) => fallback(),
    }
}
