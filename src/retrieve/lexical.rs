//! BM25 lexical search using an in-RAM tantivy index over the passage store.
//!
//! Text goes through tantivy's default analyzer (split on anything that is
//! not a letter or digit, lower-cased), after NFC composition so that
//! decomposed Vietnamese diacritics index the same as precomposed ones.

use super::{RankedResult, Retriever, rank_scores};
use crate::error::{RagEvalError, Result};
use crate::store::{PassageId, PassageStore};
use async_trait::async_trait;
use std::collections::HashSet;
use tantivy::{
    Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term,
    collector::TopDocs,
    query::BooleanQuery,
    schema::{Field, STORED, Schema, TEXT, Value},
    tokenizer::TokenStream,
};
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

/// Indexing buffer for the single writer thread.
const WRITER_MEMORY_BYTES: usize = 50_000_000;

/// Compose `text` to Unicode NFC.
fn normalize(text: &str) -> String {
    text.nfc().collect()
}

/// BM25 ranking over passage text.
pub struct LexicalRetriever {
    index: Index,
    reader: IndexReader,
    passage_id: Field,
    text: Field,
}

impl LexicalRetriever {
    /// Index every passage of the store. Nothing touches disk.
    pub fn new(store: &PassageStore) -> Result<Self> {
        let mut schema_builder = Schema::builder();
        let passage_id = schema_builder.add_u64_field("passage_id", STORED);
        let text = schema_builder.add_text_field("text", TEXT);
        let index = Index::create_in_ram(schema_builder.build());

        let mut writer: IndexWriter = index.writer_with_num_threads(1, WRITER_MEMORY_BYTES)?;
        for passage in store.passages() {
            let mut doc = TantivyDocument::new();
            doc.add_u64(passage_id, passage.id as u64);
            doc.add_text(text, normalize(&passage.text));
            writer.add_document(doc)?;
        }
        writer.commit()?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        debug!(passages = store.len(), "lexical index built");
        Ok(Self {
            index,
            reader,
            passage_id,
            text,
        })
    }

    /// Distinct analyzed terms of `query`, in first-seen order.
    fn query_terms(&self, query: &str) -> Result<Vec<Term>> {
        let mut analyzer = self.index.tokenizer_for_field(self.text)?;
        let normalized = normalize(query);
        let mut stream = analyzer.token_stream(&normalized);

        let mut seen = HashSet::new();
        let mut terms = Vec::new();
        stream.process(&mut |token| {
            if seen.insert(token.text.clone()) {
                terms.push(Term::from_field_text(self.text, &token.text));
            }
        });
        Ok(terms)
    }

    /// Every passage sharing at least one term with the query, with its
    /// BM25 score, in ascending passage-id order.
    pub fn search(&self, query: &str) -> Result<Vec<(PassageId, f32)>> {
        let terms = self.query_terms(query)?;
        let searcher = self.reader.searcher();
        let num_docs = searcher.num_docs() as usize;
        if terms.is_empty() || num_docs == 0 {
            return Ok(Vec::new());
        }

        let query = BooleanQuery::new_multiterms_query(terms);
        let top_docs = searcher.search(&query, &TopDocs::with_limit(num_docs))?;

        let mut scored = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let doc: TantivyDocument = searcher.doc(address)?;
            let id = doc
                .get_first(self.passage_id)
                .and_then(|v| v.as_u64())
                .ok_or_else(|| {
                    RagEvalError::LexicalIndex("indexed document has no passage id".to_string())
                })?;
            if score > 0.0 {
                scored.push((id as PassageId, score));
            }
        }
        scored.sort_by_key(|&(id, _)| id);
        Ok(scored)
    }
}

#[async_trait]
impl Retriever for LexicalRetriever {
    fn name(&self) -> &str {
        "bm25"
    }

    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RankedResult>> {
        Ok(rank_scores(self.search(query)?, k))
    }
}
