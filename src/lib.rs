//! Retrieval-augmented answering of multiple-choice questions, and an
//! evaluation harness that measures how often each answering strategy
//! picks the right letter.
//!
//! # Overview
//!
//! A corpus of textbook documents is chunked into passages and embedded
//! once; the resulting passage store is persisted and shared by every
//! backend. Three backends answer questions from it:
//!
//! 1. **Baseline**: dense top-k retrieval, one LLM call
//! 2. **Sub-Question**: LLM decomposition, per-sub-question retrieval, synthesis
//! 3. **Hybrid**: BM25 + dense over LLM-expanded queries, fused by reciprocal rank
//!
//! The evaluation pipeline runs a backend over a grade/subject dataset and
//! scores each reply by its first letter.
//!
//! # Quick Start
//!
//! ```no_run
//! use rag_mcq_eval::{
//!     backend::{BackendKind, MultipleChoiceWrapper, build_backend},
//!     config::Config,
//!     embed::HttpEmbedder,
//!     eval::EvaluationPipeline,
//!     llm::LlmClient,
//!     persistence::{SaveFormat, ensure_index},
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     config.validate()?;
//!
//!     let llm = Arc::new(LlmClient::new(config.llm.clone()));
//!     let embedder = Arc::new(HttpEmbedder::new(config.resolved_embedding()));
//!
//!     let index = ensure_index(
//!         &config.paths.storage_dir,
//!         &config.paths.corpus_dir,
//!         &config.retrieval.chunk,
//!         embedder.as_ref(),
//!         SaveFormat::Bincode,
//!     )
//!     .await?;
//!
//!     let backend = build_backend(BackendKind::Hybrid, &config.retrieval, &index, llm, embedder)?;
//!     let pipeline = EvaluationPipeline::new(MultipleChoiceWrapper::new(backend));
//!
//!     let report = pipeline
//!         .evaluate_dataset(&config.paths.dataset_root, "grade_10", Some("toan"), Some(10))
//!         .await?;
//!     report.print_summary();
//!
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod corpus;
pub mod embed;
pub mod error;
pub mod eval;
pub mod llm;
pub mod persistence;
pub mod retrieve;
pub mod store;

// Re-export commonly used types
pub use backend::{AnswerBackend, BackendKind, MultipleChoiceWrapper, build_backend};
pub use config::Config;
pub use error::{RagEvalError, Result};
pub use eval::{EvalReport, EvaluationPipeline, McqEvaluator};
pub use llm::{LanguageModel, LlmClient};
pub use persistence::{IndexHandle, ensure_index};
pub use store::{Passage, PassageStore};
