//! Error types for retrieval, answering and evaluation.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, RagEvalError>;

/// Errors that can occur while building indexes, answering questions or
/// running an evaluation.
#[derive(Error, Debug)]
pub enum RagEvalError {
    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error during serialization/deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The corpus directory does not exist or is not a directory.
    #[error("Corpus path '{0}' does not exist or is not a directory")]
    InvalidCorpusPath(PathBuf),

    /// No documents found in the corpus.
    #[error("No documents found in corpus at '{0}'")]
    EmptyCorpus(PathBuf),

    /// The persisted index is missing or incomplete.
    #[error("Index not found at '{0}'")]
    IndexNotFound(PathBuf),

    /// The grade or subject directory does not exist.
    #[error("Dataset not found at '{0}'")]
    DatasetNotFound(PathBuf),

    /// The dataset file exists but is not a valid question list.
    #[error("Malformed dataset at '{path}': {reason}")]
    MalformedDataset { path: PathBuf, reason: String },

    /// Configuration file error or missing credentials.
    #[error("Configuration error: {0}")]
    Config(String),

    /// LLM API error.
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// LLM response parsing error.
    #[error("Failed to parse LLM response: {0}")]
    LlmParse(String),

    /// Embedding provider error.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// HTTP request error.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Building or querying the lexical index failed.
    #[error("Lexical index error: {0}")]
    LexicalIndex(String),
}

impl RagEvalError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for RagEvalError {
    fn from(err: reqwest::Error) -> Self {
        RagEvalError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for RagEvalError {
    fn from(err: serde_json::Error) -> Self {
        RagEvalError::LlmParse(err.to_string())
    }
}

impl From<tantivy::TantivyError> for RagEvalError {
    fn from(err: tantivy::TantivyError) -> Self {
        RagEvalError::LexicalIndex(err.to_string())
    }
}
