//! Strict first-letter scoring of multiple-choice responses.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Verdict for one response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub score: f64,
    pub passing: bool,
    pub feedback: String,
}

impl EvaluationResult {
    fn failed(feedback: &str) -> Self {
        Self {
            score: 0.0,
            passing: false,
            feedback: feedback.to_string(),
        }
    }
}

/// Compares the upper-cased first character of a response against the
/// expected letters. The response is not trimmed, so leading whitespace
/// fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct McqEvaluator;

impl McqEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(
        &self,
        _query: &str,
        response: Option<&str>,
        reference_answer: Option<&str>,
        reference_answers: Option<&[String]>,
    ) -> EvaluationResult {
        let Some(first) = response.and_then(|r| r.chars().next()) else {
            return EvaluationResult::failed("no response");
        };
        if reference_answer.is_none() && reference_answers.is_none() {
            return EvaluationResult::failed("no reference");
        }

        let letter: String = first.to_uppercase().collect();

        let expected: BTreeSet<&str> = reference_answer
            .into_iter()
            .filter(|r| !r.is_empty())
            .chain(reference_answers.unwrap_or_default().iter().map(String::as_str))
            .collect();

        let passing = expected.contains(letter.as_str());
        let feedback = format!(
            "Response '{}' {} one of the expected options: {:?}",
            letter,
            if passing {
                "strictly matched"
            } else {
                "did not strictly match"
            },
            expected
        );

        EvaluationResult {
            score: if passing { 1.0 } else { 0.0 },
            passing,
            feedback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(response: Option<&str>, reference: Option<&str>) -> EvaluationResult {
        McqEvaluator::new().evaluate("q", response, reference, None)
    }

    #[test]
    fn test_first_letter_case_insensitive() {
        for response in ["B", "b", "b) four", "B. Because"] {
            let result = eval(Some(response), Some("B"));
            assert!(result.passing, "{response}");
            assert_eq!(result.score, 1.0);
        }
        let result = eval(Some("A"), Some("B"));
        assert!(!result.passing);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_no_trimming() {
        assert!(!eval(Some(" B"), Some("B")).passing);
        assert!(!eval(Some("Answer: B"), Some("B")).passing);
    }

    #[test]
    fn test_missing_response() {
        for response in [None, Some("")] {
            let result = eval(response, Some("A"));
            assert!(!result.passing);
            assert_eq!(result.score, 0.0);
            assert_eq!(result.feedback, "no response");
        }
    }

    #[test]
    fn test_missing_reference() {
        let result = eval(Some("A"), None);
        assert!(!result.passing);
        assert_eq!(result.feedback, "no reference");
    }

    #[test]
    fn test_reference_set_union_in_feedback() {
        let extra = vec!["C".to_string(), "A".to_string()];
        let result = McqEvaluator::new().evaluate("q", Some("c"), Some("A"), Some(&extra));
        assert!(result.passing);
        assert_eq!(
            result.feedback,
            "Response 'C' strictly matched one of the expected options: {\"A\", \"C\"}"
        );

        let only_list = McqEvaluator::new().evaluate("q", Some("D"), None, Some(&extra));
        assert!(!only_list.passing);
        assert!(only_list.feedback.contains("did not strictly match"));
    }
}
