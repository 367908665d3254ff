//! Prompt templates for retrieval-augmented answering.
//!
//! Templates use `{name}` placeholders filled by [`Prompts::fill`].

/// Collection of prompts used by the answering backends.
pub struct Prompts;

impl Prompts {
    /// Substitute `{name}` placeholders in a single pass.
    ///
    /// Inserted values are never rescanned, so passage text or a model
    /// reply containing `{question}` stays as written. Braces that do not
    /// name a supplied value (such as JSON in a template) are kept.
    pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let hit = after.find('}').and_then(|close| {
                let name = &after[..close];
                values
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| (close, *value))
            });
            match hit {
                Some((close, value)) => {
                    out.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }

        out.push_str(rest);
        out
    }

    /// Answer a question from retrieved passages.
    pub fn rag_answer() -> &'static str {
        r#"Context information is below.
---------------------
{context}
---------------------
Given the context information and not prior knowledge, answer the query.
Query: {question}
Answer: "#
    }

    /// Generate paraphrased search queries for broader recall.
    pub fn query_expansion() -> &'static str {
        r#"You are a helpful assistant that generates multiple search queries based on a single input query.
Generate {num_queries} search queries, one on each line, related to the following input query.
Write the queries in {language}. Do not number them and do not add any other text.
Query: {query}
Queries:
"#
    }

    /// Decompose a question into sub-questions routed to the available tools.
    pub fn sub_question_decompose() -> &'static str {
        r#"You have access to the following tools for answering questions:
{tools}

Break the user question below into the smallest set of sub-questions that, once answered with the tools, are enough to answer the user question.
Each sub-question must be answerable by exactly one tool.

User question: {question}

Reply in JSON format:
[
    {
        "sub_question": "<sub-question text>",
        "tool_name": "<name of the tool>"
    },
    ...
]
Directly return the final JSON structure. Do not output anything else."#
    }

    /// Combine sub-question answers into a final answer.
    pub fn sub_question_synthesize() -> &'static str {
        r#"Context information from answering sub-questions is below.
---------------------
{sub_answers}
---------------------
Given the context information and not prior knowledge, answer the query.
Query: {question}
Answer: "#
    }

    /// Constrain a backend to a single multiple-choice letter.
    pub fn multiple_choice() -> &'static str {
        "Hãy chỉ trả lời câu hỏi Multiple choice sau bằng một trong các đáp án A, B, C, D.\n Câu hỏi: {question}\n Đáp án:"
    }

    /// Description of the retrieval tool offered during decomposition.
    pub fn document_search_tool() -> &'static str {
        "Công cụ này để tìm kiếm thông tin trong sách giáo khoa cấp trung học phổ thông."
    }
}
