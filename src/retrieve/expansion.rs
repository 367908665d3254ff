//! LLM query expansion for broader recall.

use crate::llm::{LanguageModel, Prompts};
use std::sync::Arc;
use tracing::{debug, warn};

/// Generates paraphrases of a query with a language model, written in
/// the corpus language so they can match its passages.
#[derive(Clone)]
pub struct QueryExpander {
    llm: Arc<dyn LanguageModel>,
    language: String,
}

impl QueryExpander {
    pub fn new(llm: Arc<dyn LanguageModel>, language: impl Into<String>) -> Self {
        Self {
            llm,
            language: language.into(),
        }
    }

    /// Ask for `n` related queries.
    ///
    /// Never fails: a model error or an empty reply yields `[query]`, and a
    /// short reply is used as-is without padding.
    pub async fn expand(&self, query: &str, n: usize) -> Vec<String> {
        if n == 0 {
            return Vec::new();
        }

        let num_queries = n.to_string();
        let prompt = Prompts::fill(
            Prompts::query_expansion(),
            &[
                ("num_queries", num_queries.as_str()),
                ("language", self.language.as_str()),
                ("query", query),
            ],
        );

        let queries = match self.llm.complete(&prompt).await {
            Ok(response) => parse_queries(&response, n),
            Err(e) => {
                warn!(error = %e, "query expansion failed, using original query");
                Vec::new()
            }
        };

        if queries.is_empty() {
            return vec![query.to_string()];
        }

        debug!(requested = n, generated = queries.len(), "expanded query");
        queries
    }
}

/// One query per non-empty line, list markers and quotes removed,
/// duplicates dropped, at most `n`.
fn parse_queries(response: &str, n: usize) -> Vec<String> {
    let mut queries: Vec<String> = Vec::new();
    for line in response.lines() {
        let cleaned = strip_list_marker(line.trim())
            .trim_matches(|c| c == '"' || c == '\'')
            .trim();
        if cleaned.is_empty() || queries.iter().any(|q| q == cleaned) {
            continue;
        }
        queries.push(cleaned.to_string());
        if queries.len() == n {
            break;
        }
    }
    queries
}

/// Remove a leading "1.", "2)", "-", "*" or "•" marker.
fn strip_list_marker(line: &str) -> &str {
    let without_digits = line.trim_start_matches(|c: char| c.is_ascii_digit());
    if without_digits.len() < line.len() {
        if let Some(rest) = without_digits
            .strip_prefix('.')
            .or_else(|| without_digits.strip_prefix(')'))
        {
            return rest.trim_start();
        }
        return line;
    }
    line.strip_prefix(['-', '*', '•'])
        .map(str::trim_start)
        .unwrap_or(line)
}
