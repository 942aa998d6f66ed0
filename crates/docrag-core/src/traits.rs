use crate::error::Result;
use crate::types::{Retrieval, SearchHit};

/// Maps text to fixed-dimension vectors.
///
/// `embed_batch` returns one vector per input, in input order, each of
/// length `dim()`. `id()` names the model so persisted vectors are never
/// mixed with vectors from a different embedding function.
pub trait Embedder: Send + Sync {
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

pub trait VectorIndex: Send + Sync {
    fn dim(&self) -> usize;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>>;
}

/// The retrieval capability handed to downstream consumers.
pub trait DocumentRetriever: Send + Sync {
    fn is_available(&self) -> bool;
    fn query_document(&self, query: &str, k: usize) -> Result<Retrieval>;
}
