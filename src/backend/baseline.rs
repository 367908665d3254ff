//! Dense top-k retrieval plus a single answer call.

use super::{AnswerBackend, answer_with_context};
use crate::embed::Embedder;
use crate::error::Result;
use crate::llm::LanguageModel;
use crate::persistence::IndexHandle;
use crate::retrieve::{DenseRetriever, Retriever};
use crate::store::PassageStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub struct BaselineBackend {
    llm: Arc<dyn LanguageModel>,
    store: Arc<PassageStore>,
    retriever: DenseRetriever,
    top_k: usize,
}

impl BaselineBackend {
    pub fn new(
        index: &IndexHandle,
        llm: Arc<dyn LanguageModel>,
        embedder: Arc<dyn Embedder>,
        top_k: usize,
    ) -> Self {
        Self {
            llm,
            store: index.store.clone(),
            retriever: DenseRetriever::new(index.store.clone(), embedder),
            top_k,
        }
    }
}

#[async_trait]
impl AnswerBackend for BaselineBackend {
    fn name(&self) -> &str {
        "baseline"
    }

    async fn get_answer(&self, question: &str) -> Result<String> {
        let results = self.retriever.retrieve(question, self.top_k).await?;
        debug!(passages = results.len(), "baseline context retrieved");
        answer_with_context(self.llm.as_ref(), &self.store, &results, question).await
    }
}
