//! Hybrid lexical + dense retrieval with reciprocal-rank fusion.

use super::{AnswerBackend, answer_with_context};
use crate::embed::Embedder;
use crate::error::Result;
use crate::llm::LanguageModel;
use crate::persistence::IndexHandle;
use crate::retrieve::{
    DenseRetriever, FusionConfig, FusionRetriever, LexicalRetriever, QueryExpander, Retriever,
};
use crate::store::PassageStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub struct HybridBackend {
    llm: Arc<dyn LanguageModel>,
    store: Arc<PassageStore>,
    fusion: FusionRetriever,
}

impl HybridBackend {
    /// Builds the in-RAM BM25 index over the store up front. Expansions
    /// are requested in `corpus_language`.
    pub fn new(
        index: &IndexHandle,
        llm: Arc<dyn LanguageModel>,
        embedder: Arc<dyn Embedder>,
        corpus_language: &str,
        config: FusionConfig,
    ) -> Result<Self> {
        let retrievers: Vec<Arc<dyn Retriever>> = vec![
            Arc::new(LexicalRetriever::new(&index.store)?),
            Arc::new(DenseRetriever::new(index.store.clone(), embedder)),
        ];
        let expander = QueryExpander::new(llm.clone(), corpus_language);
        Ok(Self {
            llm,
            store: index.store.clone(),
            fusion: FusionRetriever::new(retrievers, expander, config),
        })
    }
}

#[async_trait]
impl AnswerBackend for HybridBackend {
    fn name(&self) -> &str {
        "hybrid"
    }

    async fn get_answer(&self, question: &str) -> Result<String> {
        let k = self.fusion.config().final_top_k;
        let results = self.fusion.retrieve(question, k).await?;
        debug!(passages = results.len(), "fused context retrieved");
        answer_with_context(self.llm.as_ref(), &self.store, &results, question).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::tests::{KeywordEmbedder, ScriptedModel, test_index};

    fn config(num_queries: usize, final_top_k: usize) -> FusionConfig {
        FusionConfig {
            num_queries,
            final_top_k,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_hybrid_expands_then_answers_once() {
        let llm = ScriptedModel::new(vec![
            Ok("laws of motion by Newton".into()),
            Ok("D".into()),
        ]);
        let backend = HybridBackend::new(
            &test_index(),
            llm.clone(),
            Arc::new(KeywordEmbedder),
            "English",
            config(2, 2),
        )
        .unwrap();

        let answer = backend.get_answer("Who was Newton?").await.unwrap();

        assert_eq!(answer, "D");
        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("Query: Who was Newton?"));
        assert!(prompts[0].contains("Write the queries in English."));
        assert!(prompts[1].contains("Newton formulated the laws of motion."));
        assert!(prompts[1].contains("Query: Who was Newton?"));
    }

    #[tokio::test]
    async fn test_hybrid_single_query_makes_one_call() {
        let llm = ScriptedModel::new(vec![Ok("A".into())]);
        let backend = HybridBackend::new(
            &test_index(),
            llm.clone(),
            Arc::new(KeywordEmbedder),
            "English",
            config(1, 1),
        )
        .unwrap();

        assert_eq!(backend.get_answer("photosynthesis").await.unwrap(), "A");
        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Photosynthesis turns light"));
    }
}
