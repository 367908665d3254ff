//! Persistence layer for the passage store.
//!
//! Supports both JSON (human-readable) and bincode (efficient binary)
//! formats. [`ensure_index`] is the build-or-load entry point used when a
//! backend is constructed.

use crate::corpus::{ChunkConfig, chunk_documents, load_corpus};
use crate::embed::Embedder;
use crate::error::{RagEvalError, Result};
use crate::store::PassageStore;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// File stem of the persisted store inside a storage directory.
pub const INDEX_FILE_STEM: &str = "passage_store";

/// Save format for passage stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveFormat {
    /// JSON format (human-readable, larger).
    #[default]
    Json,
    /// Bincode format (binary, compact).
    Bincode,
}

impl SaveFormat {
    /// Determine format from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("bin") | Some("bincode") => SaveFormat::Bincode,
            _ => SaveFormat::Json,
        }
    }

    fn extension(self) -> &'static str {
        match self {
            SaveFormat::Json => "json",
            SaveFormat::Bincode => "bin",
        }
    }
}

/// A loaded, shareable passage store and where it lives on disk.
#[derive(Debug, Clone)]
pub struct IndexHandle {
    pub store: Arc<PassageStore>,
    pub storage_dir: PathBuf,
}

/// Path of the store file for a storage directory and format.
pub fn index_path(storage_dir: &Path, format: SaveFormat) -> PathBuf {
    storage_dir.join(format!("{}.{}", INDEX_FILE_STEM, format.extension()))
}

/// Load the index in `storage_dir` if the directory exists, otherwise
/// build it from `corpus_dir` and persist it.
///
/// The existence check and the write are not atomic: two processes
/// building the same storage directory for the first time race. A single
/// writer per storage directory is assumed.
pub async fn ensure_index(
    storage_dir: &Path,
    corpus_dir: &Path,
    chunk: &ChunkConfig,
    embedder: &dyn Embedder,
    format: SaveFormat,
) -> Result<IndexHandle> {
    let store = if storage_dir.exists() {
        info!(dir = %storage_dir.display(), "loading existing index");
        load_index(storage_dir)?
    } else {
        info!(corpus = %corpus_dir.display(), "creating new index");
        let documents = load_corpus(corpus_dir)?;
        let passages = chunk_documents(&documents, chunk);
        let store = PassageStore::build(passages, embedder).await?;
        save_store(&store, &index_path(storage_dir, format))?;
        info!(
            passages = store.len(),
            dir = %storage_dir.display(),
            "index persisted"
        );
        store
    };

    Ok(IndexHandle {
        store: Arc::new(store),
        storage_dir: storage_dir.to_path_buf(),
    })
}

/// Load the store from a storage directory, preferring the binary file.
pub fn load_index(storage_dir: &Path) -> Result<PassageStore> {
    [SaveFormat::Bincode, SaveFormat::Json]
        .into_iter()
        .map(|format| index_path(storage_dir, format))
        .find(|path| path.is_file())
        .ok_or_else(|| RagEvalError::IndexNotFound(storage_dir.to_path_buf()))
        .and_then(|path| load_store(&path))
}

/// Save a PassageStore to a file, format chosen by extension.
pub fn save_store(store: &PassageStore, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| RagEvalError::io(parent, e))?;
        }
    }

    let data = match SaveFormat::from_path(path) {
        SaveFormat::Json => serde_json::to_vec(store)
            .map_err(|e| RagEvalError::Serialization(e.to_string()))?,
        SaveFormat::Bincode => {
            bincode::serde::encode_to_vec(store, bincode::config::standard())
                .map_err(|e| RagEvalError::Serialization(e.to_string()))?
        }
    };

    fs::write(path, &data).map_err(|e| RagEvalError::io(path, e))
}

/// Load a PassageStore from a file, format chosen by extension.
pub fn load_store(path: &Path) -> Result<PassageStore> {
    if !path.exists() {
        return Err(RagEvalError::IndexNotFound(path.to_path_buf()));
    }

    let data = fs::read(path).map_err(|e| RagEvalError::io(path, e))?;

    let store: PassageStore = match SaveFormat::from_path(path) {
        SaveFormat::Json => serde_json::from_slice(&data)
            .map_err(|e| RagEvalError::Serialization(e.to_string()))?,
        SaveFormat::Bincode => {
            let (store, _): (PassageStore, usize) =
                bincode::serde::decode_from_slice(&data, bincode::config::standard())
                    .map_err(|e| RagEvalError::Serialization(e.to_string()))?;
            store
        }
    };

    // Re-run the construction checks on whatever was on disk.
    let passages = store.passages().to_vec();
    let embeddings = store.embedded().map(|(_, v)| v.to_vec()).collect();
    PassageStore::new(passages, embeddings)
}
