//! Multiple-choice dataset loading.
//!
//! Layout: `<root>/<grade>/<subject>/dataset.json`, each file a JSON array
//! of `{"question": ..., "answer": "A" | "B" | "C" | "D"}`.

use crate::error::{RagEvalError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of a subject's question list.
pub const DATASET_FILE: &str = "dataset.json";

/// Letters an item's `answer` may take.
pub const ANSWER_LETTERS: [&str; 4] = ["A", "B", "C", "D"];

/// One question with its correct letter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaItem {
    pub question: String,
    pub answer: String,
}

/// A collection of evaluation items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    /// `<grade>` or `<grade>/<subject>`.
    pub name: String,
    pub items: Vec<QaItem>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Keep only the first `n` items.
    pub fn truncate(&mut self, n: usize) {
        self.items.truncate(n);
    }

    /// [`Dataset::load`], then keep the first `max_questions` items. `None`
    /// and `Some(0)` both mean every item.
    pub fn load_capped(
        root: &Path,
        grade: &str,
        subject: Option<&str>,
        max_questions: Option<usize>,
    ) -> Result<Self> {
        let mut dataset = Self::load(root, grade, subject)?;
        if let Some(max) = max_questions.filter(|&max| max > 0) {
            dataset.truncate(max);
        }
        info!(dataset = %dataset.name, questions = dataset.len(), "dataset loaded");
        Ok(dataset)
    }

    /// Load one subject, or every subject of the grade when `subject` is
    /// `None`.
    pub fn load(root: &Path, grade: &str, subject: Option<&str>) -> Result<Self> {
        match subject {
            Some(subject) => Ok(Self {
                name: format!("{}/{}", grade, subject),
                items: load_subject(root, grade, subject)?,
            }),
            None => Ok(Self {
                name: grade.to_string(),
                items: load_grade(root, grade)?,
            }),
        }
    }
}

/// Path of a subject's dataset file.
pub fn subject_path(root: &Path, grade: &str, subject: &str) -> PathBuf {
    root.join(grade).join(subject).join(DATASET_FILE)
}

/// Load a single subject's questions.
pub fn load_subject(root: &Path, grade: &str, subject: &str) -> Result<Vec<QaItem>> {
    let path = subject_path(root, grade, subject);
    if !path.is_file() {
        return Err(RagEvalError::DatasetNotFound(path));
    }

    let content = fs::read_to_string(&path).map_err(|e| RagEvalError::io(&path, e))?;
    let items: Vec<QaItem> =
        serde_json::from_str(&content).map_err(|e| RagEvalError::MalformedDataset {
            path: path.clone(),
            reason: e.to_string(),
        })?;

    if let Some((i, item)) = items
        .iter()
        .enumerate()
        .find(|(_, item)| !ANSWER_LETTERS.contains(&item.answer.as_str()))
    {
        return Err(RagEvalError::MalformedDataset {
            path,
            reason: format!("item {}: answer {:?} is not one of A, B, C, D", i, item.answer),
        });
    }

    debug!(path = %path.display(), items = items.len(), "loaded subject");
    Ok(items)
}

/// Concatenate every subject directory of a grade, in subject-name order.
pub fn load_grade(root: &Path, grade: &str) -> Result<Vec<QaItem>> {
    let grade_dir = root.join(grade);
    if !grade_dir.is_dir() {
        return Err(RagEvalError::DatasetNotFound(grade_dir));
    }

    let mut subjects = Vec::new();
    for entry in fs::read_dir(&grade_dir).map_err(|e| RagEvalError::io(&grade_dir, e))? {
        let entry = entry.map_err(|e| RagEvalError::io(&grade_dir, e))?;
        if entry.path().is_dir() {
            subjects.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    subjects.sort();

    let mut items = Vec::new();
    for subject in &subjects {
        items.extend(load_subject(root, grade, subject)?);
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_subject(root: &Path, grade: &str, subject: &str, json: &str) {
        let dir = root.join(grade).join(subject);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(DATASET_FILE), json).unwrap();
    }

    #[test]
    fn test_load_subject() {
        let root = TempDir::new().unwrap();
        write_subject(
            root.path(),
            "grade_10",
            "toan",
            r#"[{"question": "1 + 1 = ?", "answer": "B"}, {"question": "Thủ đô?", "answer": "A"}]"#,
        );

        let items = load_subject(root.path(), "grade_10", "toan").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].question, "Thủ đô?");
        assert_eq!(items[1].answer, "A");
    }

    #[test]
    fn test_load_grade_concatenates_sorted_subjects() {
        let root = TempDir::new().unwrap();
        write_subject(root.path(), "grade_11", "vat_ly", r#"[{"question": "v", "answer": "C"}]"#);
        write_subject(root.path(), "grade_11", "hoa_hoc", r#"[{"question": "h", "answer": "D"}]"#);
        // stray files next to subject directories are ignored
        fs::write(root.path().join("grade_11").join("notes.txt"), "x").unwrap();

        let items = load_grade(root.path(), "grade_11").unwrap();
        let questions: Vec<_> = items.iter().map(|i| i.question.as_str()).collect();
        assert_eq!(questions, vec!["h", "v"]);

        let dataset = Dataset::load(root.path(), "grade_11", None).unwrap();
        assert_eq!(dataset.name, "grade_11");
        assert_eq!(dataset.len(), 2);
    }

    #[test]
    fn test_missing_dataset() {
        let root = TempDir::new().unwrap();
        assert!(matches!(
            load_subject(root.path(), "grade_10", "toan"),
            Err(RagEvalError::DatasetNotFound(_))
        ));
        assert!(matches!(
            load_grade(root.path(), "grade_12"),
            Err(RagEvalError::DatasetNotFound(_))
        ));
    }

    #[test]
    fn test_malformed_dataset() {
        let root = TempDir::new().unwrap();
        write_subject(root.path(), "grade_10", "toan", r#"{"question": "not a list"}"#);
        assert!(matches!(
            load_subject(root.path(), "grade_10", "toan"),
            Err(RagEvalError::MalformedDataset { .. })
        ));
    }

    #[test]
    fn test_answer_must_be_a_letter() {
        for bad in ["E", "b", ""] {
            let root = TempDir::new().unwrap();
            let json = format!(
                r#"[{{"question": "ok", "answer": "C"}}, {{"question": "bad", "answer": "{}"}}]"#,
                bad
            );
            write_subject(root.path(), "grade_10", "sinh_hoc", &json);

            match load_subject(root.path(), "grade_10", "sinh_hoc") {
                Err(RagEvalError::MalformedDataset { reason, .. }) => {
                    assert!(reason.starts_with("item 1:"), "{reason}")
                }
                other => panic!("answer {bad:?} accepted: {other:?}"),
            }
        }
    }

    #[test]
    fn test_truncate() {
        let mut dataset = Dataset {
            name: "d".into(),
            items: vec![
                QaItem { question: "a".into(), answer: "A".into() },
                QaItem { question: "b".into(), answer: "B".into() },
            ],
        };
        dataset.truncate(1);
        assert_eq!(dataset.len(), 1);
        dataset.truncate(5);
        assert_eq!(dataset.len(), 1);
    }
}
