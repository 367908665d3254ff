//! Reciprocal-rank fusion over several retrievers and expanded queries.
//!
//! RRF score = Σ 1 / (rank + C) over every ranked list a passage appears
//! in. Working on ranks rather than raw scores means BM25 and cosine
//! scores never need calibrating against each other.

use super::{QueryExpander, RankedResult, Retriever};
use crate::error::Result;
use crate::store::PassageId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Fusion and query-expansion parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Rank offset `C` in `1 / (rank + C)`.
    pub rank_constant: f32,
    /// Total queries per search, the original included.
    pub num_queries: usize,
    /// Results requested from each retriever for each query.
    pub retriever_top_k: usize,
    /// Results returned after fusion.
    pub final_top_k: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            rank_constant: 60.0,
            num_queries: 4,
            retriever_top_k: 5,
            final_top_k: 5,
        }
    }
}

/// A passage after fusion.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedResult {
    pub passage_id: PassageId,
    /// Accumulated reciprocal-rank score.
    pub score: f32,
    /// Best (smallest) rank in any single input list.
    pub best_rank: usize,
    /// Number of input lists the passage appeared in.
    pub hits: usize,
}

/// Merge ranked lists into one.
///
/// Every passage of every input list appears exactly once in the output,
/// ordered by fused score, then best single-list rank, then passage id.
pub fn reciprocal_rank_fusion(lists: &[Vec<RankedResult>], rank_constant: f32) -> Vec<FusedResult> {
    let mut fused: HashMap<PassageId, FusedResult> = HashMap::new();

    for list in lists {
        for result in list {
            let contribution = 1.0 / (result.rank as f32 + rank_constant);
            fused
                .entry(result.passage_id)
                .and_modify(|f| {
                    f.score += contribution;
                    f.best_rank = f.best_rank.min(result.rank);
                    f.hits += 1;
                })
                .or_insert(FusedResult {
                    passage_id: result.passage_id,
                    score: contribution,
                    best_rank: result.rank,
                    hits: 1,
                });
        }
    }

    let mut out: Vec<FusedResult> = fused.into_values().collect();
    out.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.best_rank.cmp(&b.best_rank))
            .then(a.passage_id.cmp(&b.passage_id))
    });
    out
}

/// Runs every retriever over the original and expanded queries and fuses
/// all resulting lists.
pub struct FusionRetriever {
    retrievers: Vec<Arc<dyn Retriever>>,
    expander: QueryExpander,
    config: FusionConfig,
}

impl FusionRetriever {
    pub fn new(
        retrievers: Vec<Arc<dyn Retriever>>,
        expander: QueryExpander,
        config: FusionConfig,
    ) -> Self {
        Self {
            retrievers,
            expander,
            config,
        }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// The original query followed by up to `num_queries - 1` distinct
    /// paraphrases.
    pub async fn queries(&self, query: &str) -> Vec<String> {
        let mut queries = vec![query.to_string()];
        if self.config.num_queries > 1 {
            for q in self.expander.expand(query, self.config.num_queries - 1).await {
                if !queries.contains(&q) {
                    queries.push(q);
                }
            }
        }
        queries
    }

    /// Fused results for `query`, truncated to `k_final`.
    pub async fn search(&self, query: &str, k_final: usize) -> Result<Vec<FusedResult>> {
        let queries = self.queries(query).await;

        let mut lists = Vec::with_capacity(queries.len() * self.retrievers.len());
        for q in &queries {
            for retriever in &self.retrievers {
                let list = retriever.retrieve(q, self.config.retriever_top_k).await?;
                debug!(
                    retriever = retriever.name(),
                    query = %q,
                    results = list.len(),
                    "retrieved"
                );
                lists.push(list);
            }
        }

        let mut fused = reciprocal_rank_fusion(&lists, self.config.rank_constant);
        fused.truncate(k_final);
        Ok(fused)
    }
}

#[async_trait]
impl Retriever for FusionRetriever {
    fn name(&self) -> &str {
        "fusion"
    }

    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RankedResult>> {
        Ok(self
            .search(query, k)
            .await?
            .into_iter()
            .enumerate()
            .map(|(i, f)| RankedResult {
                passage_id: f.passage_id,
                score: f.score,
                rank: i + 1,
            })
            .collect())
    }
}
