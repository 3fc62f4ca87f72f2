//! Embedding gateway abstraction and backends.
//!
//! Defines the [`EmbeddingClient`] trait — a batch of strings in, one
//! fixed-length `f32` vector per string out, order preserved — plus two
//! concrete backends:
//! - **[`OpenAiEmbeddings`]** — calls the OpenAI embeddings API.
//! - **[`OllamaEmbeddings`]** — calls a local Ollama `/api/embed` endpoint.
//!
//! Both backends retry transient failures with exponential backoff:
//! HTTP 429 and 5xx and network errors are retried (1s, 2s, 4s, ...
//! capped at 2^5); other 4xx responses fail immediately.
//!
//! [`embed_in_batches`] is the ingestion entry point: it feeds texts to a
//! client in fixed-size sequential batches and validates that every
//! response keeps one-vector-per-input alignment and a consistent
//! dimensionality, so a partial or malformed batch can never silently
//! corrupt the index.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::EmbeddingConfig;

/// A capability that maps a batch of strings to equal-length float
/// vectors, one per input, in input order.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a batch of texts. The result has exactly one vector per
    /// input text, in the same order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;
}

/// Instantiate the embedding backend named by the configuration.
pub fn create_embedding_client(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingClient>> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAiEmbeddings::new(config)?)),
        "ollama" => Ok(Box::new(OllamaEmbeddings::new(config))),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

/// Embed `texts` in sequential batches of `batch_size`, concatenating the
/// results in input order.
///
/// Batching is purely a payload-size concern: the concatenated output is
/// identical to a single call on the full list. Any batch whose response
/// is missing vectors or mixes dimensionalities is an error — continuing
/// would break row alignment between chunks and vectors.
pub async fn embed_in_batches(
    client: &dyn EmbeddingClient,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    let batch_size = batch_size.max(1);
    let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
    let mut dims: Option<usize> = None;

    for batch in texts.chunks(batch_size) {
        let batch_vectors = client.embed(batch).await?;
        if batch_vectors.len() != batch.len() {
            bail!(
                "Embedding backend returned {} vectors for {} inputs",
                batch_vectors.len(),
                batch.len()
            );
        }
        for vec in &batch_vectors {
            match dims {
                None => dims = Some(vec.len()),
                Some(d) if d != vec.len() => bail!(
                    "Embedding backend returned inconsistent dimensions ({} vs {})",
                    vec.len(),
                    d
                ),
                _ => {}
            }
        }
        vectors.extend(batch_vectors);
    }

    Ok(vectors)
}

/// Embed a single query string.
///
/// Convenience wrapper for retrieval: a one-item batch through the same
/// gateway the index was built with.
pub async fn embed_query(client: &dyn EmbeddingClient, text: &str) -> Result<Vec<f32>> {
    let vectors = client.embed(&[text.to_string()]).await?;
    vectors
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("Empty embedding response"))
}

// ============ OpenAI backend ============

/// Embedding backend using the OpenAI embeddings API.
///
/// Requires the `OPENAI_API_KEY` environment variable.
pub struct OpenAiEmbeddings {
    model: String,
    max_retries: u32,
    timeout_secs: u64,
}

impl OpenAiEmbeddings {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        if std::env::var("OPENAI_API_KEY").is_err() {
            bail!("OPENAI_API_KEY environment variable not set");
        }
        Ok(Self {
            model: config.model.clone(),
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddings {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("OPENAI_API_KEY not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post("https://api.openai.com/v1/embeddings")
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_openai_embeddings(&json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err =
                            Some(anyhow!("OpenAI API error {}: {}", status, body_text));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("OpenAI API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("Embedding failed after retries")))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn parse_openai_embeddings(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing data array"))?;

    let mut embeddings = Vec::with_capacity(data.len());

    for item in data {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| anyhow!("Invalid OpenAI response: missing embedding"))?;

        let vec: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();

        embeddings.push(vec);
    }

    Ok(embeddings)
}

// ============ Ollama backend ============

/// Embedding backend using a local Ollama instance's `/api/embed` endpoint.
pub struct OllamaEmbeddings {
    model: String,
    url: String,
    max_retries: u32,
    timeout_secs: u64,
}

impl OllamaEmbeddings {
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self {
            model: config.model.clone(),
            url: config
                .url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
        }
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddings {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post(format!("{}/api/embed", self.url))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_ollama_embeddings(&json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err =
                            Some(anyhow!("Ollama API error {}: {}", status, body_text));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Ollama API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(anyhow!(
                        "Ollama connection error (is Ollama running at {}?): {}",
                        self.url,
                        e
                    ));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("Ollama embedding failed after retries")))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn parse_ollama_embeddings(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow!("Invalid Ollama response: missing embeddings array"))?;

    let mut result = Vec::with_capacity(embeddings.len());

    for embedding in embeddings {
        let vec: Vec<f32> = embedding
            .as_array()
            .ok_or_else(|| anyhow!("Invalid Ollama response: embedding is not an array"))?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        result.push(vec);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic in-memory backend used to exercise batching.
    struct CountingClient {
        dims: usize,
        calls: std::sync::Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl EmbeddingClient for CountingClient {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.lock().unwrap().push(texts.len());
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0f32; self.dims];
                    v[t.len() % self.dims] = 1.0;
                    v
                })
                .collect())
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    struct RaggedClient;

    #[async_trait]
    impl EmbeddingClient for RaggedClient {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            // Vector length varies per input, which must be rejected.
            Ok(texts
                .iter()
                .enumerate()
                .map(|(i, _)| vec![0.5f32; 3 + i])
                .collect())
        }

        fn model_name(&self) -> &str {
            "ragged"
        }
    }

    #[tokio::test]
    async fn test_batching_matches_single_call() {
        let client = CountingClient {
            dims: 8,
            calls: std::sync::Mutex::new(Vec::new()),
        };
        let texts: Vec<String> = (0..10).map(|i| "x".repeat(i + 1)).collect();

        let batched = embed_in_batches(&client, &texts, 3).await.unwrap();
        let single = embed_in_batches(&client, &texts, 100).await.unwrap();
        assert_eq!(batched, single);

        let calls = client.calls.lock().unwrap();
        assert_eq!(&calls[..4], &[3, 3, 3, 1]);
    }

    #[tokio::test]
    async fn test_inconsistent_dims_rejected() {
        let texts: Vec<String> = vec!["a".into(), "b".into()];
        assert!(embed_in_batches(&RaggedClient, &texts, 64).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_input_yields_empty_output() {
        let client = CountingClient {
            dims: 4,
            calls: std::sync::Mutex::new(Vec::new()),
        };
        let out = embed_in_batches(&client, &[], 64).await.unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_parse_openai_embeddings() {
        let json = serde_json::json!({
            "data": [
                { "embedding": [0.1, 0.2] },
                { "embedding": [0.3, 0.4] }
            ]
        });
        let vecs = parse_openai_embeddings(&json).unwrap();
        assert_eq!(vecs.len(), 2);
        assert!((vecs[1][0] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_parse_openai_missing_data_is_error() {
        let json = serde_json::json!({ "oops": [] });
        assert!(parse_openai_embeddings(&json).is_err());
    }

    #[test]
    fn test_parse_ollama_embeddings() {
        let json = serde_json::json!({ "embeddings": [[1.0, 0.0], [0.0, 1.0]] });
        let vecs = parse_ollama_embeddings(&json).unwrap();
        assert_eq!(vecs, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }
}
