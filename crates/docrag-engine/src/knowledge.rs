use std::path::Path;
use std::sync::Arc;

use docrag_core::config::Settings;
use docrag_core::error::Result;
use docrag_core::traits::{DocumentRetriever, Embedder};
use docrag_core::types::{Retrieval, ScoredFragment};
use docrag_index::Corpus;

use crate::pipeline::Pipeline;
use crate::retrieve::{retrieve, retrieve_scored};

struct Loaded {
    corpus: Corpus,
    embedder: Arc<dyn Embedder>,
}

/// Retrieval handle over one document's corpus.
///
/// Opening never fails: if the embedder or the ingestion cannot be set up the
/// handle is unavailable and every query answers `Retrieval::Unavailable`, so
/// callers carry on without document context.
pub struct KnowledgeBase {
    loaded: Option<Loaded>,
    top_k: usize,
}

impl KnowledgeBase {
    pub fn from_corpus(corpus: Corpus, embedder: Arc<dyn Embedder>) -> Self {
        Self { loaded: Some(Loaded { corpus, embedder }), top_k: 3 }
    }

    pub fn unavailable() -> Self {
        Self { loaded: None, top_k: 3 }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Build or load the corpus for `document` through `pipeline`.
    pub fn open(pipeline: &Pipeline, document: &Path, cache_root: &Path, force_reprocess: bool) -> Self {
        match pipeline.build_or_load(document, cache_root, force_reprocess) {
            Ok(corpus) => {
                tracing::info!(source = corpus.source_key(), fragments = corpus.len(), "knowledge base ready");
                Self::from_corpus(corpus, Arc::clone(pipeline.embedder()))
            }
            Err(e) => {
                tracing::error!(document = %document.display(), error = %e, "document ingestion failed; retrieval unavailable");
                Self::unavailable()
            }
        }
    }

    /// Select the embedder and pipeline from settings, then [`open`](Self::open).
    pub fn open_with_settings(settings: &Settings, document: &Path) -> Self {
        let embedder = match docrag_embed::get_default_embedder(&settings.embedding) {
            Ok(e) => e,
            Err(e) => {
                tracing::error!(error = %e, "embedder unavailable; retrieval unavailable");
                return Self::unavailable();
            }
        };
        let pipeline = match Pipeline::new(settings, embedder) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "invalid pipeline settings; retrieval unavailable");
                return Self::unavailable();
            }
        };
        Self::open(&pipeline, document, &settings.cache.root_path(), settings.cache.force_reprocess)
            .with_top_k(settings.retrieval.top_k)
    }

    pub fn is_available(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn corpus(&self) -> Option<&Corpus> {
        self.loaded.as_ref().map(|l| &l.corpus)
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn query_document(&self, query: &str, k: usize) -> Result<Retrieval> {
        match &self.loaded {
            Some(l) => retrieve(Some(&l.corpus), l.embedder.as_ref(), query, k),
            None => Ok(Retrieval::Unavailable),
        }
    }

    /// Query with the configured default `k`.
    pub fn query(&self, query: &str) -> Result<Retrieval> {
        self.query_document(query, self.top_k)
    }

    pub fn query_scored(&self, query: &str, k: usize) -> Result<Option<Vec<ScoredFragment>>> {
        match &self.loaded {
            Some(l) => retrieve_scored(Some(&l.corpus), l.embedder.as_ref(), query, k),
            None => Ok(None),
        }
    }
}

impl DocumentRetriever for KnowledgeBase {
    fn is_available(&self) -> bool {
        KnowledgeBase::is_available(self)
    }

    fn query_document(&self, query: &str, k: usize) -> Result<Retrieval> {
        KnowledgeBase::query_document(self, query, k)
    }
}
