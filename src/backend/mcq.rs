//! Multiple-choice prompt decorator.

use super::AnswerBackend;
use crate::error::Result;
use crate::llm::Prompts;
use async_trait::async_trait;

/// Rewrites each question into a "reply with A, B, C or D" instruction
/// before handing it to the inner backend.
pub struct MultipleChoiceWrapper<B> {
    inner: B,
}

impl<B: AnswerBackend> MultipleChoiceWrapper<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }

    pub fn wrap_question(question: &str) -> String {
        Prompts::fill(Prompts::multiple_choice(), &[("question", question)])
    }
}

#[async_trait]
impl<B: AnswerBackend> AnswerBackend for MultipleChoiceWrapper<B> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get_answer(&self, question: &str) -> Result<String> {
        self.inner.get_answer(&Self::wrap_question(question)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct EchoBackend {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AnswerBackend for EchoBackend {
        fn name(&self) -> &str {
            "echo"
        }

        async fn get_answer(&self, question: &str) -> Result<String> {
            self.seen.lock().unwrap().push(question.to_string());
            Ok("B".to_string())
        }
    }

    #[tokio::test]
    async fn test_wrapper_rewrites_question_and_keeps_name() {
        let wrapper = MultipleChoiceWrapper::new(EchoBackend {
            seen: Mutex::new(Vec::new()),
        });

        assert_eq!(wrapper.name(), "echo");
        assert_eq!(wrapper.get_answer("2 + 2 = ?").await.unwrap(), "B");

        let seen = wrapper.inner.seen.lock().unwrap();
        assert!(seen[0].contains("Câu hỏi: 2 + 2 = ?"));
        assert!(seen[0].contains("A, B, C, D"));
        assert!(seen[0].ends_with("Đáp án:"));
    }

    #[test]
    fn test_wrap_question_leaves_braces_in_question() {
        let wrapped = MultipleChoiceWrapper::<Box<dyn AnswerBackend>>::wrap_question(
            "Tập {question} có bao nhiêu phần tử?",
        );
        assert!(wrapped.contains("Câu hỏi: Tập {question} có bao nhiêu phần tử?"));
        assert_eq!(wrapped.matches("Câu hỏi:").count(), 1);
    }

    #[tokio::test]
    async fn test_wrapper_over_boxed_backend() {
        let boxed: Box<dyn AnswerBackend> = Box::new(EchoBackend {
            seen: Mutex::new(Vec::new()),
        });
        let wrapper = MultipleChoiceWrapper::new(boxed);
        assert_eq!(wrapper.name(), "echo");
        assert_eq!(wrapper.get_answer("q").await.unwrap(), "B");
    }
}
