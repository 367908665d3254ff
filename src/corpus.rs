//! Corpus ingestion: documents on disk to overlapping text passages.
//!
//! Only plain text and markdown files are read. Converting PDFs or HTML
//! into text happens upstream of this crate.

use crate::error::{RagEvalError, Result};
use crate::store::Passage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

const CORPUS_EXTENSIONS: &[&str] = &["txt", "md", "markdown"];

/// Configuration for text chunking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkConfig {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            chunk_overlap: 200,
        }
    }
}

/// A source document read from the corpus directory.
#[derive(Debug, Clone)]
pub struct Document {
    /// Path relative to the corpus root, used as the document name.
    pub name: String,
    pub path: PathBuf,
    pub content: String,
}

impl Document {
    /// Create a document from raw text content.
    pub fn from_text(name: impl Into<String>, content: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            path: PathBuf::from(&name),
            name,
            content: content.into(),
        }
    }
}

/// Read every supported document under `dir`, in path order.
pub fn load_corpus(dir: &Path) -> Result<Vec<Document>> {
    if !dir.is_dir() {
        return Err(RagEvalError::InvalidCorpusPath(dir.to_path_buf()));
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            RagEvalError::io(path, std::io::Error::other(e.to_string()))
        })?;

        if !entry.file_type().is_file() || !has_corpus_extension(entry.path()) {
            continue;
        }

        let path = entry.path();
        let content = std::fs::read_to_string(path).map_err(|e| RagEvalError::io(path, e))?;
        if content.trim().is_empty() {
            debug!(path = %path.display(), "skipping empty document");
            continue;
        }

        let name = path
            .strip_prefix(dir)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned();
        documents.push(Document {
            name,
            path: path.to_path_buf(),
            content,
        });
    }

    if documents.is_empty() {
        return Err(RagEvalError::EmptyCorpus(dir.to_path_buf()));
    }

    info!(count = documents.len(), dir = %dir.display(), "loaded corpus documents");
    Ok(documents)
}

fn has_corpus_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| CORPUS_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Split documents into passages with store-wide sequential ids.
pub fn chunk_documents(documents: &[Document], config: &ChunkConfig) -> Vec<Passage> {
    let mut passages = Vec::new();
    for document in documents {
        for (source_chunk_index, text) in chunk_text(&document.content, config)
            .into_iter()
            .enumerate()
        {
            passages.push(Passage {
                id: passages.len(),
                text,
                source: document.name.clone(),
                source_chunk_index,
            });
        }
    }
    passages
}

/// Chunk text into overlapping segments, preferring sentence boundaries.
pub fn chunk_text(text: &str, config: &ChunkConfig) -> Vec<String> {
    let mut chunks = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let text_len = chars.len();
    let chunk_size = config.chunk_size.max(1);

    let mut start = 0;
    while start < text_len {
        let end = (start + chunk_size).min(text_len);

        // Break at the last sentence end within the final 100 chars, if any.
        let mut final_end = end;
        if end < text_len {
            let search_start = end.saturating_sub(100).max(start);
            if let Some(pos) = chars[search_start..end]
                .iter()
                .rposition(|c| matches!(c, '.' | '!' | '?' | '\n'))
            {
                let candidate = search_start + pos + 1;
                if candidate > start {
                    final_end = candidate;
                }
            }
        }

        let chunk: String = chars[start..final_end].iter().collect();
        let trimmed = chunk.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        if final_end >= text_len {
            break;
        }

        let next_start = final_end.saturating_sub(config.chunk_overlap);
        start = if next_start <= start { start + 1 } else { next_start };
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_chunk_text() {
        let text = "This is a test. Another sentence here. And one more.";
        let config = ChunkConfig {
            chunk_size: 20,
            chunk_overlap: 5,
        };

        let chunks = chunk_text(text, &config);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(!chunk.is_empty());
            assert!(chunk.chars().count() <= 20);
        }
    }

    #[test]
    fn test_chunk_text_short_and_empty() {
        let config = ChunkConfig::default();
        assert_eq!(chunk_text("Short text.", &config), vec!["Short text."]);
        assert!(chunk_text("", &config).is_empty());
        assert!(chunk_text("   \n  ", &config).is_empty());
    }

    #[test]
    fn test_chunk_text_handles_multibyte() {
        let text = "Việt Nam nằm ở Đông Nam Á. Thủ đô là Hà Nội. ".repeat(10);
        let config = ChunkConfig {
            chunk_size: 30,
            chunk_overlap: 5,
        };
        let chunks = chunk_text(&text, &config);
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.chars().count() <= 30));
    }

    #[test]
    fn test_chunk_documents_assigns_sequential_ids() {
        let docs = vec![
            Document::from_text("a.txt", "One. Two. Three."),
            Document::from_text("b.txt", "Four."),
        ];
        let config = ChunkConfig {
            chunk_size: 6,
            chunk_overlap: 0,
        };
        let passages = chunk_documents(&docs, &config);

        for (i, passage) in passages.iter().enumerate() {
            assert_eq!(passage.id, i);
        }
        let last = passages.last().unwrap();
        assert_eq!(last.source, "b.txt");
        assert_eq!(last.source_chunk_index, 0);
        assert_eq!(passages[1].source_chunk_index, 1);
    }

    #[test]
    fn test_load_corpus_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("b.txt"), "beta").unwrap();
        std::fs::write(dir.path().join("sub").join("a.md"), "alpha").unwrap();
        std::fs::write(dir.path().join("image.png"), "binary").unwrap();
        std::fs::write(dir.path().join("empty.txt"), "  ").unwrap();

        let docs = load_corpus(dir.path()).unwrap();
        let names: Vec<_> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(docs.len(), 2);
        assert!(names.contains(&"b.txt"));
        assert!(docs.iter().any(|d| d.content == "alpha"));
    }

    #[test]
    fn test_load_corpus_errors() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_corpus(dir.path()),
            Err(RagEvalError::EmptyCorpus(_))
        ));
        assert!(matches!(
            load_corpus(&dir.path().join("missing")),
            Err(RagEvalError::InvalidCorpusPath(_))
        ));
    }
}
