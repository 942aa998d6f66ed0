use anyhow::anyhow;

use docrag_core::error::{Error, Result};
use docrag_core::traits::Embedder;
use docrag_core::types::{Retrieval, ScoredFragment};
use docrag_index::Corpus;

/// Texts of the `k` fragments nearest to `query`, closest first.
///
/// With no corpus the result is `Retrieval::Unavailable`, not an error.
pub fn retrieve(corpus: Option<&Corpus>, embedder: &dyn Embedder, query: &str, k: usize) -> Result<Retrieval> {
    Ok(match retrieve_scored(corpus, embedder, query, k)? {
        Some(hits) => Retrieval::Fragments(hits.into_iter().map(|h| h.content).collect()),
        None => Retrieval::Unavailable,
    })
}

/// Like [`retrieve`] but keeps fragment positions and distances.
pub fn retrieve_scored(
    corpus: Option<&Corpus>,
    embedder: &dyn Embedder,
    query: &str,
    k: usize,
) -> Result<Option<Vec<ScoredFragment>>> {
    let Some(corpus) = corpus else {
        tracing::debug!("retrieval requested without a corpus");
        return Ok(None);
    };
    if corpus.embedder_id() != embedder.id() {
        return Err(Error::EmbedderMismatch { corpus: corpus.embedder_id().to_string(), query: embedder.id().to_string() });
    }
    let query_vec = embedder
        .embed_batch(&[query.to_string()])
        .map_err(Error::Embedding)?
        .into_iter()
        .next()
        .ok_or_else(|| Error::Embedding(anyhow!("embedder returned no vector for the query")))?;
    let hits = corpus.search(&query_vec, k)?;
    tracing::debug!(source = corpus.source_key(), k, returned = hits.len(), "retrieved fragments");
    Ok(Some(hits))
}
