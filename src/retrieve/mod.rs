//! Passage retrieval: lexical (BM25), dense (embedding similarity), and
//! reciprocal-rank fusion of both over LLM-expanded queries.

mod dense;
mod expansion;
mod fusion;
mod lexical;

pub use dense::DenseRetriever;
pub use expansion::QueryExpander;
pub use fusion::{FusedResult, FusionConfig, FusionRetriever, reciprocal_rank_fusion};
pub use lexical::LexicalRetriever;

#[cfg(test)]
pub(crate) use expansion::tests::FixedModel;

use crate::error::Result;
use crate::store::{PassageId, PassageStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One passage in a ranked list produced for a single query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub passage_id: PassageId,
    pub score: f32,
    /// 1-based position after sorting by descending score.
    pub rank: usize,
}

/// Ranks passages of a store for a query.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Return at most `k` results sorted by descending score.
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RankedResult>>;
}

/// Sort `(passage, score)` pairs by descending score, keep the first `k`
/// and number them from 1. Equal scores keep their input order.
pub fn rank_scores(mut scored: Vec<(PassageId, f32)>, k: usize) -> Vec<RankedResult> {
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored
        .into_iter()
        .take(k)
        .enumerate()
        .map(|(i, (passage_id, score))| RankedResult {
            passage_id,
            score,
            rank: i + 1,
        })
        .collect()
}

/// Join retrieved passages into a context block for answer prompts.
pub fn format_context(store: &PassageStore, results: &[RankedResult]) -> String {
    results
        .iter()
        .filter_map(|r| store.get(r.passage_id))
        .map(|p| format!("[Source: {}]\n{}", p.source, p.text))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::passage;

    #[test]
    fn test_rank_scores_orders_and_truncates() {
        let ranked = rank_scores(vec![(0, 0.1), (1, 0.9), (2, 0.5)], 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].passage_id, 1);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].passage_id, 2);
        assert_eq!(ranked[1].rank, 2);
    }

    #[test]
    fn test_rank_scores_ties_keep_input_order() {
        let ranked = rank_scores(vec![(3, 1.0), (1, 1.0), (2, 1.0)], 10);
        let ids: Vec<_> = ranked.iter().map(|r| r.passage_id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_format_context() {
        let store = PassageStore::new(
            vec![passage(0, "first"), passage(1, "second")],
            vec![vec![1.0], vec![1.0]],
        )
        .unwrap();
        let results = rank_scores(vec![(1, 2.0), (0, 1.0)], 2);
        let context = format_context(&store, &results);
        assert!(context.starts_with("[Source: test.txt]\nsecond"));
        assert!(context.contains("---"));
        assert!(format_context(&store, &[]).is_empty());
    }
}
