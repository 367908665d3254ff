//! Configuration for the answering backends and the evaluation runner.
//!
//! Supports both environment variables and YAML config file.
//! Environment variables take precedence over config file values.

use crate::corpus::ChunkConfig;
use crate::error::{RagEvalError, Result};
use crate::retrieve::FusionConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// LLM configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL for the LLM API (e.g., "https://api.openai.com")
    pub api_base: String,

    /// API key for authentication
    pub api_key: String,

    /// Model name (e.g., "gpt-4o-mini")
    pub model: String,

    /// Maximum tokens for response
    pub max_tokens: u32,

    /// Temperature for generation
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 1024,
            temperature: 0.0,
        }
    }
}

/// Embedding provider configuration.
///
/// Empty `api_base` / `api_key` fall back to the LLM settings, since most
/// deployments serve chat and embeddings from the same endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    /// Number of texts sent per embedding request during index construction.
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            api_key: String::new(),
            model: "text-embedding-3-small".to_string(),
            batch_size: 64,
        }
    }
}

/// Retrieval tuning shared by all backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Passage chunking applied when the index is first built.
    pub chunk: ChunkConfig,
    /// Number of passages the baseline backend retrieves.
    pub baseline_top_k: usize,
    /// Reciprocal-rank fusion and query expansion parameters.
    pub fusion: FusionConfig,
    /// Language the corpus is written in; query expansions are generated
    /// in it.
    pub corpus_language: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk: ChunkConfig::default(),
            baseline_top_k: 2,
            fusion: FusionConfig::default(),
            corpus_language: "Vietnamese".to_string(),
        }
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory of source documents used to build the index.
    pub corpus_dir: PathBuf,
    /// Directory where the built index is persisted.
    pub storage_dir: PathBuf,
    /// Root of `<grade>/<subject>/dataset.json` files.
    pub dataset_root: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            corpus_dir: PathBuf::from("data"),
            storage_dir: PathBuf::from(".index_storage"),
            dataset_root: PathBuf::from("eval_data"),
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub paths: PathsConfig,
}

impl Config {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (LLM_API_BASE, LLM_API_KEY, LLM_MODEL, ...)
    /// 2. Config file (~/.config/rag-mcq-eval/config.yaml)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_file_path() {
            Some(path) if path.exists() => Self::load_from_file(&path)?,
            _ => Config::default(),
        };

        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a specific file path, without env overrides.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RagEvalError::io(path, e))?;

        serde_yaml::from_str(&content)
            .map_err(|e| RagEvalError::Config(format!("Failed to parse config file: {}", e)))
    }

    fn apply_env(&mut self) {
        override_string(&mut self.llm.api_base, "LLM_API_BASE");
        override_string(&mut self.llm.api_key, "LLM_API_KEY");
        override_string(&mut self.llm.model, "LLM_MODEL");
        override_parsed(&mut self.llm.max_tokens, "LLM_MAX_TOKENS");
        override_parsed(&mut self.llm.temperature, "LLM_TEMPERATURE");

        override_string(&mut self.embedding.api_base, "EMBEDDING_API_BASE");
        override_string(&mut self.embedding.api_key, "EMBEDDING_API_KEY");
        override_string(&mut self.embedding.model, "EMBEDDING_MODEL");

        override_string(&mut self.retrieval.corpus_language, "RAG_CORPUS_LANGUAGE");

        if let Ok(dir) = env::var("RAG_CORPUS_DIR") {
            self.paths.corpus_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = env::var("RAG_STORAGE_DIR") {
            self.paths.storage_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = env::var("RAG_DATASET_ROOT") {
            self.paths.dataset_root = PathBuf::from(dir);
        }
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "rag-mcq-eval")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate that required configuration is present.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_base.is_empty() {
            return Err(RagEvalError::Config(
                "LLM API base URL is required. Set LLM_API_BASE environment variable or add to config file.".to_string()
            ));
        }

        if self.llm.api_key.is_empty() {
            return Err(RagEvalError::Config(
                "LLM API key is required. Set LLM_API_KEY environment variable or add to config file.".to_string()
            ));
        }

        if self.llm.model.is_empty() {
            return Err(RagEvalError::Config(
                "LLM model is required. Set LLM_MODEL environment variable or add to config file."
                    .to_string(),
            ));
        }

        let fusion = &self.retrieval.fusion;
        if fusion.num_queries == 0 || fusion.retriever_top_k == 0 || fusion.final_top_k == 0 {
            return Err(RagEvalError::Config(
                "fusion num_queries, retriever_top_k and final_top_k must be positive".to_string(),
            ));
        }

        if self.retrieval.chunk.chunk_overlap >= self.retrieval.chunk.chunk_size {
            return Err(RagEvalError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.retrieval.chunk.chunk_overlap, self.retrieval.chunk.chunk_size
            )));
        }

        Ok(())
    }

    /// Embedding settings with the LLM endpoint filled in where unset.
    pub fn resolved_embedding(&self) -> EmbeddingConfig {
        let mut embedding = self.embedding.clone();
        if embedding.api_base.is_empty() {
            embedding.api_base = self.llm.api_base.clone();
        }
        if embedding.api_key.is_empty() {
            embedding.api_key = self.llm.api_key.clone();
        }
        embedding
    }

    /// Create a config from explicit values (useful for testing).
    pub fn with_llm(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            llm: LlmConfig {
                api_base: api_base.into(),
                api_key: api_key.into(),
                model: model.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

fn override_string(slot: &mut String, var: &str) {
    if let Ok(value) = env::var(var) {
        *slot = value;
    }
}

fn override_parsed<T: std::str::FromStr>(slot: &mut T, var: &str) {
    if let Some(value) = env::var(var).ok().and_then(|v| v.parse().ok()) {
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.llm.api_base.is_empty());
        assert!(config.llm.api_key.is_empty());
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.temperature, 0.0);
        assert_eq!(config.retrieval.fusion.rank_constant, 60.0);
        assert_eq!(config.retrieval.baseline_top_k, 2);
        assert_eq!(config.retrieval.corpus_language, "Vietnamese");
    }

    #[test]
    fn test_validate_fails_without_required_fields() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_with_llm() {
        let config = Config::with_llm("https://api.example.com", "test-key", "gpt-4");
        assert_eq!(config.llm.api_base, "https://api.example.com");
        assert_eq!(config.llm.api_key, "test-key");
        assert_eq!(config.llm.model, "gpt-4");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_fusion_queries() {
        let mut config = Config::with_llm("https://api.example.com", "k", "m");
        config.retrieval.fusion.num_queries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_embedding_falls_back_to_llm_endpoint() {
        let config = Config::with_llm("https://api.example.com", "key", "m");
        let embedding = config.resolved_embedding();
        assert_eq!(embedding.api_base, "https://api.example.com");
        assert_eq!(embedding.api_key, "key");
        assert_eq!(embedding.model, "text-embedding-3-small");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "llm:\n  model: gpt-4o\nretrieval:\n  fusion:\n    num_queries: 6\n",
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.max_tokens, 1024);
        assert_eq!(config.retrieval.fusion.num_queries, 6);
        assert_eq!(config.retrieval.fusion.rank_constant, 60.0);
        assert_eq!(config.paths.storage_dir, PathBuf::from(".index_storage"));
        assert_eq!(config.retrieval.corpus_language, "Vietnamese");
    }

    #[test]
    fn test_corpus_language_from_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "retrieval:\n  corpus_language: English\n").unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.retrieval.corpus_language, "English");
        assert_eq!(config.retrieval.baseline_top_k, 2);
    }
}
