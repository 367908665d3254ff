//! Answering backends: question in, free-form answer out.
//!
//! Every backend answers from the same persisted passage store
//! ([`IndexHandle`]); they differ in how they gather context:
//!
//! - [`BaselineBackend`]: one dense retrieval, one LLM call.
//! - [`SubQuestionBackend`]: LLM decomposition, one retrieval-backed answer
//!   per sub-question, then a synthesis call.
//! - [`HybridBackend`]: lexical + dense retrieval over expanded queries,
//!   fused by reciprocal rank, then one LLM call.
//!
//! [`MultipleChoiceWrapper`] decorates any of them for A/B/C/D questions.

mod baseline;
mod hybrid;
mod mcq;
mod sub_question;

pub use baseline::BaselineBackend;
pub use hybrid::HybridBackend;
pub use mcq::MultipleChoiceWrapper;
pub use sub_question::{DOCUMENT_SEARCH_TOOL, SubQuestion, SubQuestionBackend};

use crate::config::RetrievalConfig;
use crate::embed::Embedder;
use crate::error::Result;
use crate::llm::{LanguageModel, Prompts};
use crate::persistence::IndexHandle;
use crate::retrieve::{RankedResult, format_context};
use crate::store::PassageStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Anything that can answer a question.
#[async_trait]
pub trait AnswerBackend: Send + Sync {
    /// Name recorded in evaluation metrics.
    fn name(&self) -> &str;

    /// Answer `question`. Errors are returned as-is; nothing is retried.
    async fn get_answer(&self, question: &str) -> Result<String>;
}

#[async_trait]
impl<B: AnswerBackend + ?Sized> AnswerBackend for Box<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn get_answer(&self, question: &str) -> Result<String> {
        (**self).get_answer(question).await
    }
}

/// Selectable backend strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Baseline,
    Subquestion,
    Hybrid,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Baseline => "baseline",
            BackendKind::Subquestion => "subquestion",
            BackendKind::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Construct a backend of the given kind over an already loaded index.
///
/// The hybrid backend builds its lexical index here, which is the only
/// step that can fail.
pub fn build_backend(
    kind: BackendKind,
    retrieval: &RetrievalConfig,
    index: &IndexHandle,
    llm: Arc<dyn LanguageModel>,
    embedder: Arc<dyn Embedder>,
) -> Result<Box<dyn AnswerBackend>> {
    let backend: Box<dyn AnswerBackend> = match kind {
        BackendKind::Baseline => Box::new(BaselineBackend::new(
            index,
            llm,
            embedder,
            retrieval.baseline_top_k,
        )),
        BackendKind::Subquestion => Box::new(SubQuestionBackend::new(
            index,
            llm,
            embedder,
            retrieval.baseline_top_k,
        )),
        BackendKind::Hybrid => Box::new(HybridBackend::new(
            index,
            llm,
            embedder,
            &retrieval.corpus_language,
            retrieval.fusion.clone(),
        )?),
    };
    Ok(backend)
}

/// Fill the answer prompt with the retrieved passages and ask the model.
pub(crate) async fn answer_with_context(
    llm: &dyn LanguageModel,
    store: &PassageStore,
    results: &[RankedResult],
    question: &str,
) -> Result<String> {
    let context = format_context(store, results);
    let prompt = Prompts::fill(
        Prompts::rag_answer(),
        &[("context", context.as_str()), ("question", question)],
    );
    llm.complete(&prompt).await
}
