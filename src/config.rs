use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub paths: PathsConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    /// Corpus root: every regular file under it is an ingestion candidate.
    pub docs_dir: PathBuf,
    /// Directory holding the persisted index artifacts.
    pub data_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embed_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub url: Option<String>,
}

fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_embed_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_chat_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub url: Option<String>,
}

fn default_temperature() -> f64 {
    0.2
}
fn default_chat_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct PromptsConfig {
    #[serde(default = "default_system_prompt")]
    pub system: String,
    /// User prompt template; `{question}` and `{context}` are interpolated.
    #[serde(default = "default_user_prompt")]
    pub user: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            system: default_system_prompt(),
            user: default_user_prompt(),
        }
    }
}

fn default_system_prompt() -> String {
    "You are an assistant that answers questions about the user's documents. \
     Use ONLY the provided context to answer. If something is not in the \
     context, say you don't know."
        .to_string()
}

fn default_user_prompt() -> String {
    "Question:\n{question}\n\nContext from documents:\n{context}\n\n\
     Answer the question using ONLY the context above. If the context does \
     not contain enough information, say so explicitly."
        .to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate chunking
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        anyhow::bail!(
            "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
            config.chunking.chunk_overlap,
            config.chunking.chunk_size
        );
    }

    // Validate retrieval
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    // Validate providers
    match config.embedding.provider.as_str() {
        "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be openai or ollama.",
            other
        ),
    }
    match config.llm.provider.as_str() {
        "openai" | "ollama" => {}
        other => anyhow::bail!("Unknown llm provider: '{}'. Must be openai or ollama.", other),
    }

    if config.embedding.model.trim().is_empty() {
        anyhow::bail!("embedding.model must not be empty");
    }
    if config.llm.model.trim().is_empty() {
        anyhow::bail!("llm.model must not be empty");
    }
    if !config.prompts.user.contains("{question}") || !config.prompts.user.contains("{context}") {
        anyhow::bail!("prompts.user must contain {{question}} and {{context}} placeholders");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("rag.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        (tmp, path)
    }

    const MINIMAL: &str = r#"
[paths]
docs_dir = "docs"
data_dir = "data"

[embedding]
provider = "openai"
model = "text-embedding-3-small"

[llm]
provider = "openai"
model = "gpt-4.1-mini"
"#;

    #[test]
    fn test_minimal_config_defaults() {
        let (_tmp, path) = write_config(MINIMAL);
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.chunking.chunk_size, 1000);
        assert_eq!(cfg.chunking.chunk_overlap, 200);
        assert_eq!(cfg.retrieval.top_k, 5);
        assert_eq!(cfg.embedding.batch_size, 64);
        assert!((cfg.llm.temperature - 0.2).abs() < 1e-9);
        assert!(cfg.prompts.user.contains("{question}"));
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk_size() {
        let body = format!(
            "{}\n[chunking]\nchunk_size = 100\nchunk_overlap = 100\n",
            MINIMAL
        );
        let (_tmp, path) = write_config(&body);
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_top_k_must_be_positive() {
        let body = format!("{}\n[retrieval]\ntop_k = 0\n", MINIMAL);
        let (_tmp, path) = write_config(&body);
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let body = MINIMAL.replace("provider = \"openai\"", "provider = \"mystery\"");
        let (_tmp, path) = write_config(&body);
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_user_prompt_requires_placeholders() {
        let body = format!("{}\n[prompts]\nuser = \"no placeholders here\"\n", MINIMAL);
        let (_tmp, path) = write_config(&body);
        assert!(load_config(&path).is_err());
    }
}
