use docrag_core::error::{Error, Result};
use docrag_core::traits::{Embedder, VectorIndex};
use docrag_core::types::{Fragment, ScoredFragment};

use crate::flat::FlatL2Index;

/// Fragments of one source document with their vectors and search index.
///
/// Entry `i` of the index is the embedding of `fragments[i]`; construction
/// refuses any input that breaks this, and nothing mutates a corpus
/// afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    source_key: String,
    embedder_id: String,
    fragments: Vec<Fragment>,
    index: FlatL2Index,
}

impl Corpus {
    pub fn new(source_key: String, embedder_id: String, fragments: Vec<Fragment>, index: FlatL2Index) -> Result<Self> {
        if fragments.len() != index.len() {
            return Err(Error::CorpusMismatch { fragments: fragments.len(), vectors: index.len() });
        }
        Ok(Self { source_key, embedder_id, fragments, index })
    }

    /// Embed all fragments in one batch and index them.
    pub fn build(source_key: &str, embedder: &dyn Embedder, fragments: Vec<Fragment>) -> Result<Self> {
        let texts: Vec<String> = fragments.iter().map(|f| f.content().to_string()).collect();
        tracing::info!(source = source_key, fragments = texts.len(), embedder = embedder.id(), "embedding fragments");
        let vectors = embedder.embed_batch(&texts).map_err(Error::Embedding)?;
        if vectors.len() != texts.len() {
            return Err(Error::CorpusMismatch { fragments: texts.len(), vectors: vectors.len() });
        }
        let index = FlatL2Index::from_vectors(embedder.dim(), &vectors)?;
        Self::new(source_key.to_string(), embedder.id().to_string(), fragments, index)
    }

    pub fn source_key(&self) -> &str {
        &self.source_key
    }

    pub fn embedder_id(&self) -> &str {
        &self.embedder_id
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn fragment(&self, i: usize) -> Option<&Fragment> {
        self.fragments.get(i)
    }

    pub fn index(&self) -> &FlatL2Index {
        &self.index
    }

    pub fn dim(&self) -> usize {
        self.index.dim()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Nearest fragments to `query`, closest first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredFragment>> {
        let hits = self.index.search(query, k)?;
        Ok(hits
            .into_iter()
            .map(|hit| ScoredFragment {
                index: hit.index,
                distance: hit.distance,
                content: self.fragments[hit.index].content().to_string(),
            })
            .collect())
    }
}
