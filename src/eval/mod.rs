//! Multiple-choice evaluation of answering backends.
//!
//! - Dataset loading from `<root>/<grade>/<subject>/dataset.json`
//! - Strict first-letter scoring
//! - A sequential pipeline that isolates per-question failures

pub mod dataset;
pub mod evaluator;
pub mod pipeline;

pub use dataset::{Dataset, QaItem, load_grade, load_subject};
pub use evaluator::{EvaluationResult, McqEvaluator};
pub use pipeline::{EvalReport, EvalResult, EvaluationPipeline, Metrics};
