//! Question decomposition over a single document-search tool.
//!
//! 1. The model splits the question into `{sub_question, tool_name}` pairs.
//! 2. Each sub-question is answered by the tool (dense retrieval + answer).
//! 3. A final call synthesizes the answer from the sub-answers.

use super::{AnswerBackend, answer_with_context};
use crate::embed::Embedder;
use crate::error::Result;
use crate::llm::{LanguageModel, Prompts};
use crate::persistence::IndexHandle;
use crate::retrieve::{DenseRetriever, Retriever};
use crate::store::PassageStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Name of the only tool offered to the decomposition step.
pub const DOCUMENT_SEARCH_TOOL: &str = "document_search";

/// One step of a decomposed question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubQuestion {
    pub sub_question: String,
    pub tool_name: String,
}

/// Retrieval plus answer over the passage store, as offered to the planner.
struct DocumentSearchTool {
    llm: Arc<dyn LanguageModel>,
    store: Arc<PassageStore>,
    retriever: DenseRetriever,
    top_k: usize,
}

impl DocumentSearchTool {
    async fn answer(&self, question: &str) -> Result<String> {
        let results = self.retriever.retrieve(question, self.top_k).await?;
        answer_with_context(self.llm.as_ref(), &self.store, &results, question).await
    }
}

pub struct SubQuestionBackend {
    llm: Arc<dyn LanguageModel>,
    tool: DocumentSearchTool,
}

impl SubQuestionBackend {
    pub fn new(
        index: &IndexHandle,
        llm: Arc<dyn LanguageModel>,
        embedder: Arc<dyn Embedder>,
        top_k: usize,
    ) -> Self {
        let tool = DocumentSearchTool {
            llm: llm.clone(),
            store: index.store.clone(),
            retriever: DenseRetriever::new(index.store.clone(), embedder),
            top_k,
        };
        Self { llm, tool }
    }

    /// Ask the model for sub-questions, falling back to the question
    /// itself when the reply cannot be parsed.
    pub async fn decompose(&self, question: &str) -> Result<Vec<SubQuestion>> {
        let tools = format!(
            "- {}: {}",
            DOCUMENT_SEARCH_TOOL,
            Prompts::document_search_tool()
        );
        let prompt = Prompts::fill(
            Prompts::sub_question_decompose(),
            &[("tools", tools.as_str()), ("question", question)],
        );

        let response = self.llm.complete(&prompt).await?;
        match parse_sub_questions(&response) {
            Some(subs) => Ok(subs),
            None => {
                warn!("unparseable decomposition, answering the question directly");
                Ok(vec![SubQuestion {
                    sub_question: question.to_string(),
                    tool_name: DOCUMENT_SEARCH_TOOL.to_string(),
                }])
            }
        }
    }
}

#[async_trait]
impl AnswerBackend for SubQuestionBackend {
    fn name(&self) -> &str {
        "subquestion"
    }

    async fn get_answer(&self, question: &str) -> Result<String> {
        let subs = self.decompose(question).await?;
        debug!(count = subs.len(), "decomposed question");

        let mut sub_answers = Vec::with_capacity(subs.len());
        for sub in &subs {
            if sub.tool_name != DOCUMENT_SEARCH_TOOL {
                warn!(tool = %sub.tool_name, "unknown tool, using {}", DOCUMENT_SEARCH_TOOL);
            }
            let answer = self.tool.answer(&sub.sub_question).await?;
            debug!(sub_question = %sub.sub_question, "answered sub-question");
            sub_answers.push(format!(
                "Sub question: {}\nResponse: {}",
                sub.sub_question,
                answer.trim()
            ));
        }

        let sub_answers = sub_answers.join("\n\n");
        let prompt = Prompts::fill(
            Prompts::sub_question_synthesize(),
            &[("sub_answers", sub_answers.as_str()), ("question", question)],
        );
        self.llm.complete(&prompt).await
    }
}

/// Parse the decomposition reply. `None` when it is not a non-empty JSON
/// list of sub-questions.
fn parse_sub_questions(response: &str) -> Option<Vec<SubQuestion>> {
    let subs: Vec<SubQuestion> = serde_json::from_str(&extract_json(response)).ok()?;
    let subs: Vec<SubQuestion> = subs
        .into_iter()
        .filter(|s| !s.sub_question.trim().is_empty())
        .collect();
    (!subs.is_empty()).then_some(subs)
}

/// Strip code fences and surrounding prose from a JSON reply.
fn extract_json(response: &str) -> String {
    let response = response.trim();

    if let Some(rest) = response.strip_prefix("```") {
        let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or(rest);
        if let Some(end) = body.rfind("```") {
            return body[..end].trim().to_string();
        }
    }

    if let (Some(start), Some(end)) = (response.find('['), response.rfind(']')) {
        if end > start {
            return response[start..=end].to_string();
        }
    }

    response.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::tests::{KeywordEmbedder, ScriptedModel, test_index};

    fn backend(llm: Arc<ScriptedModel>) -> SubQuestionBackend {
        SubQuestionBackend::new(&test_index(), llm, Arc::new(KeywordEmbedder), 1)
    }

    #[test]
    fn test_extract_json_variants() {
        let fenced = "```json\n[{\"a\": 1}]\n```";
        assert_eq!(extract_json(fenced), "[{\"a\": 1}]");

        let prose = "Here you go: [1, 2] hope it helps";
        assert_eq!(extract_json(prose), "[1, 2]");

        assert_eq!(extract_json("  plain  "), "plain");
    }

    #[test]
    fn test_parse_sub_questions() {
        let reply = r#"```json
[
  {"sub_question": "What is Hanoi?", "tool_name": "document_search"},
  {"sub_question": "  ", "tool_name": "document_search"}
]
```"#;
        let subs = parse_sub_questions(reply).unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].sub_question, "What is Hanoi?");

        assert!(parse_sub_questions("[]").is_none());
        assert!(parse_sub_questions("I cannot do that").is_none());
    }

    #[tokio::test]
    async fn test_sub_question_flow() {
        let llm = ScriptedModel::new(vec![
            Ok(r#"[{"sub_question": "Where is Hanoi?", "tool_name": "document_search"},
                  {"sub_question": "Who is Newton?", "tool_name": "document_search"}]"#
                .into()),
            Ok("Hanoi is in Vietnam".into()),
            Ok("Newton was a physicist".into()),
            Ok("C".into()),
        ]);
        let answer = backend(llm.clone()).get_answer("Hanoi and Newton?").await.unwrap();

        assert_eq!(answer, "C");
        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 4);
        assert!(prompts[0].contains(DOCUMENT_SEARCH_TOOL));
        assert!(prompts[1].contains("capital of Vietnam"));
        assert!(prompts[2].contains("laws of motion"));
        assert!(prompts[3].contains("Sub question: Where is Hanoi?\nResponse: Hanoi is in Vietnam"));
        assert!(prompts[3].contains("Query: Hanoi and Newton?"));
    }

    #[tokio::test]
    async fn test_unparseable_decomposition_uses_question() {
        let llm = ScriptedModel::new(vec![
            Ok("not json at all".into()),
            Ok("photosynthesis answer".into()),
            Ok("A".into()),
        ]);
        let answer = backend(llm.clone()).get_answer("What is photosynthesis?").await.unwrap();

        assert_eq!(answer, "A");
        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[1].contains("Query: What is photosynthesis?"));
    }

    #[tokio::test]
    async fn test_sub_answer_placeholders_are_not_filled() {
        let llm = ScriptedModel::new(vec![
            Ok(r#"[{"sub_question": "Where is Hanoi?", "tool_name": "document_search"}]"#.into()),
            Ok("The template says {question}".into()),
            Ok("B".into()),
        ]);
        backend(llm.clone()).get_answer("SECRET_Q").await.unwrap();

        let prompts = llm.prompts();
        assert!(prompts[0].contains(Prompts::document_search_tool()));
        assert_eq!(prompts[0].matches("SECRET_Q").count(), 1);
        assert!(prompts[2].contains("Response: The template says {question}"));
        assert_eq!(prompts[2].matches("SECRET_Q").count(), 1);
    }

    #[tokio::test]
    async fn test_decomposition_error_propagates() {
        let llm = ScriptedModel::new(vec![]);
        assert!(backend(llm).get_answer("anything").await.is_err());
    }
}
