//! Passage store: the chunked corpus plus one embedding per passage.
//!
//! Passages are created once at ingestion and never mutated. The lexical
//! view is derived from the passage text when a retriever is built; the
//! dense view is the stored embedding matrix.

use crate::embed::Embedder;
use crate::error::{RagEvalError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Identifier of a passage: its position in the store.
pub type PassageId = usize;

/// Immutable unit of retrievable text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub id: PassageId,
    pub text: String,
    /// Name of the document the passage was cut from.
    pub source: String,
    /// Position of this passage among its document's chunks.
    pub source_chunk_index: usize,
}

/// All passages of a corpus with their dense vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassageStore {
    passages: Vec<Passage>,
    embeddings: Vec<Vec<f32>>,
}

impl PassageStore {
    /// Create a store, checking that every passage has an embedding and
    /// that ids match positions.
    pub fn new(passages: Vec<Passage>, embeddings: Vec<Vec<f32>>) -> Result<Self> {
        if passages.len() != embeddings.len() {
            return Err(RagEvalError::Embedding(format!(
                "{} passages but {} embeddings",
                passages.len(),
                embeddings.len()
            )));
        }
        if let Some(p) = passages.iter().enumerate().find(|(i, p)| p.id != *i) {
            return Err(RagEvalError::Serialization(format!(
                "passage at position {} has id {}",
                p.0, p.1.id
            )));
        }
        if let Some(first) = embeddings.first() {
            let dim = first.len();
            if embeddings.iter().any(|e| e.len() != dim) {
                return Err(RagEvalError::Embedding(
                    "embeddings have inconsistent dimensions".to_string(),
                ));
            }
        }
        Ok(Self {
            passages,
            embeddings,
        })
    }

    /// Embed every passage and assemble the store.
    pub async fn build(passages: Vec<Passage>, embedder: &dyn Embedder) -> Result<Self> {
        let texts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
        info!(passages = texts.len(), "embedding passages");
        let embeddings = embedder.embed_batch(&texts).await?;
        Self::new(passages, embeddings)
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    pub fn get(&self, id: PassageId) -> Option<&Passage> {
        self.passages.get(id)
    }

    /// Passage/vector pairs in id order.
    pub fn embedded(&self) -> impl Iterator<Item = (&Passage, &[f32])> {
        self.passages
            .iter()
            .zip(self.embeddings.iter().map(Vec::as_slice))
    }

    /// Dimension of the stored vectors, `None` for an empty store.
    pub fn dimension(&self) -> Option<usize> {
        self.embeddings.first().map(Vec::len)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn passage(id: usize, text: &str) -> Passage {
        Passage {
            id,
            text: text.to_string(),
            source: "test.txt".to_string(),
            source_chunk_index: id,
        }
    }

    #[test]
    fn test_store_rejects_length_mismatch() {
        let result = PassageStore::new(vec![passage(0, "a")], vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn test_store_rejects_misnumbered_ids() {
        let result = PassageStore::new(vec![passage(1, "a")], vec![vec![1.0]]);
        assert!(result.is_err());
    }

    #[test]
    fn test_store_rejects_mixed_dimensions() {
        let result = PassageStore::new(
            vec![passage(0, "a"), passage(1, "b")],
            vec![vec![1.0, 0.0], vec![1.0]],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_store_accessors() {
        let store = PassageStore::new(
            vec![passage(0, "a"), passage(1, "b")],
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        )
        .unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.dimension(), Some(2));
        assert_eq!(store.get(1).unwrap().text, "b");
        assert!(store.get(2).is_none());
        assert_eq!(store.embedded().count(), 2);
    }
}
