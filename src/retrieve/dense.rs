//! Dense retrieval by cosine similarity to stored passage embeddings.

use super::{RankedResult, Retriever, rank_scores};
use crate::embed::{Embedder, cosine_similarity};
use crate::error::{RagEvalError, Result};
use crate::store::PassageStore;
use async_trait::async_trait;
use std::sync::Arc;

/// Brute-force vector search over the passage store.
pub struct DenseRetriever {
    store: Arc<PassageStore>,
    embedder: Arc<dyn Embedder>,
}

impl DenseRetriever {
    pub fn new(store: Arc<PassageStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }
}

#[async_trait]
impl Retriever for DenseRetriever {
    fn name(&self) -> &str {
        "dense"
    }

    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RankedResult>> {
        let Some(dimension) = self.store.dimension() else {
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        if query_embedding.len() != dimension {
            return Err(RagEvalError::Embedding(format!(
                "query embedding has {} dimensions, index has {}",
                query_embedding.len(),
                dimension
            )));
        }

        let scored = self
            .store
            .embedded()
            .map(|(passage, embedding)| (passage.id, cosine_similarity(&query_embedding, embedding)))
            .collect();

        Ok(rank_scores(scored, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::passage;

    /// Maps a few keywords onto fixed axes.
    struct KeywordEmbedder;

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![
                if text.contains("cat") { 1.0 } else { 0.0 },
                if text.contains("dog") { 1.0 } else { 0.0 },
                0.1,
            ])
        }
    }

    fn store() -> Arc<PassageStore> {
        Arc::new(
            PassageStore::new(
                vec![passage(0, "dog"), passage(1, "cat"), passage(2, "other")],
                vec![vec![0.0, 1.0, 0.1], vec![1.0, 0.0, 0.1], vec![0.0, 0.0, 1.0]],
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_dense_ranks_by_similarity() {
        let retriever = DenseRetriever::new(store(), Arc::new(KeywordEmbedder));
        let results = retriever.retrieve("a cat", 2).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].passage_id, 1);
        assert_eq!(results[0].rank, 1);
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn test_dense_empty_store_and_zero_k() {
        let empty = Arc::new(PassageStore::new(vec![], vec![]).unwrap());
        let retriever = DenseRetriever::new(empty, Arc::new(KeywordEmbedder));
        assert!(retriever.retrieve("cat", 3).await.unwrap().is_empty());

        let retriever = DenseRetriever::new(store(), Arc::new(KeywordEmbedder));
        assert!(retriever.retrieve("cat", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dense_dimension_mismatch_is_error() {
        let store = Arc::new(
            PassageStore::new(vec![passage(0, "x")], vec![vec![1.0, 0.0]]).unwrap(),
        );
        let retriever = DenseRetriever::new(store, Arc::new(KeywordEmbedder));
        assert!(matches!(
            retriever.retrieve("cat", 1).await,
            Err(RagEvalError::Embedding(_))
        ));
    }
}
