//! Sequential evaluation of an answering backend over a dataset.

use super::dataset::{Dataset, QaItem};
use super::evaluator::McqEvaluator;
use crate::backend::AnswerBackend;
use crate::error::{RagEvalError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info};

/// Outcome for a single question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalResult {
    /// Position of the item in the evaluated dataset.
    pub question_id: usize,
    pub question: String,
    pub correct_answer: String,
    #[serde(rename = "rag_response")]
    pub raw_response: String,
    pub is_correct: bool,
    pub score: f64,
    pub feedback: String,
}

/// Aggregate numbers for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_questions: usize,
    pub correct_answers: usize,
    pub accuracy: f64,
    pub grade: String,
    pub subject: Option<String>,
    #[serde(rename = "rag_system")]
    pub backend_name: String,
    pub elapsed_secs: f64,
}

/// Metrics plus per-item results, as written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalReport {
    pub metrics: Metrics,
    pub results: Vec<EvalResult>,
}

impl EvalReport {
    /// Write the report as pretty-printed UTF-8 JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| RagEvalError::io(parent, e))?;
            }
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| RagEvalError::Serialization(e.to_string()))?;
        fs::write(path, content).map_err(|e| RagEvalError::io(path, e))
    }

    /// Print summary to stdout.
    pub fn print_summary(&self) {
        let m = &self.metrics;
        let subject = m
            .subject
            .as_deref()
            .map(|s| format!("/{}", s))
            .unwrap_or_default();

        println!("\n{}", "=".repeat(60));
        println!("MULTIPLE CHOICE EVALUATION SUMMARY");
        println!("{}", "=".repeat(60));
        println!("Dataset: {}{}", m.grade, subject);
        println!("Backend: {}", m.backend_name);
        println!(
            "Accuracy: {:.4} ({}/{})",
            m.accuracy, m.correct_answers, m.total_questions
        );
        println!("Time: {:.1}s", m.elapsed_secs);
        println!("{}\n", "=".repeat(60));
    }
}

/// Runs one backend over a dataset, one question at a time.
pub struct EvaluationPipeline<B> {
    backend: B,
    evaluator: McqEvaluator,
}

impl<B: AnswerBackend> EvaluationPipeline<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            evaluator: McqEvaluator::new(),
        }
    }

    /// Load `<root>/<grade>[/<subject>]`, cap it at `max_questions` and
    /// evaluate. Dataset errors abort before any question is asked.
    pub async fn evaluate_dataset(
        &self,
        root: &Path,
        grade: &str,
        subject: Option<&str>,
        max_questions: Option<usize>,
    ) -> Result<EvalReport> {
        let dataset = Dataset::load_capped(root, grade, subject, max_questions)?;
        Ok(self.run(&dataset.items, grade, subject).await)
    }

    /// Evaluate every item. A backend error is recorded against its item
    /// and the run continues.
    pub async fn run(&self, items: &[QaItem], grade: &str, subject: Option<&str>) -> EvalReport {
        let start = Instant::now();
        let mut results = Vec::with_capacity(items.len());
        let mut correct = 0;

        for (i, item) in items.iter().enumerate() {
            let result = match self.backend.get_answer(&item.question).await {
                Ok(response) => {
                    let verdict = self.evaluator.evaluate(
                        &item.question,
                        Some(&response),
                        Some(&item.answer),
                        None,
                    );
                    debug!(
                        question_id = i,
                        passing = verdict.passing,
                        "[{}/{}] evaluated",
                        i + 1,
                        items.len()
                    );
                    EvalResult {
                        question_id: i,
                        question: item.question.clone(),
                        correct_answer: item.answer.clone(),
                        raw_response: response,
                        is_correct: verdict.passing,
                        score: verdict.score,
                        feedback: verdict.feedback,
                    }
                }
                Err(e) => {
                    error!(question_id = i, error = %e, "error evaluating question");
                    EvalResult {
                        question_id: i,
                        question: item.question.clone(),
                        correct_answer: item.answer.clone(),
                        raw_response: "ERROR".to_string(),
                        is_correct: false,
                        score: 0.0,
                        feedback: format!("Error: {}", e),
                    }
                }
            };
            if result.is_correct {
                correct += 1;
            }
            results.push(result);
        }

        let total = items.len();
        let accuracy = if total > 0 {
            correct as f64 / total as f64
        } else {
            0.0
        };
        info!(accuracy, correct, total, "evaluation complete");

        EvalReport {
            metrics: Metrics {
                total_questions: total,
                correct_answers: correct,
                accuracy,
                grade: grade.to_string(),
                subject: subject.map(str::to_string),
                backend_name: self.backend.name().to_string(),
                elapsed_secs: start.elapsed().as_secs_f64(),
            },
            results,
        }
    }
}
