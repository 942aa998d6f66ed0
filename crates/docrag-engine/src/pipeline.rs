use std::path::Path;
use std::sync::Arc;

use docrag_core::config::Settings;
use docrag_core::error::{Error, Result};
use docrag_core::traits::Embedder;
use docrag_extract::{Chunker, ContentExtractor};
use docrag_index::{fingerprint, source_key, CacheExpectation, CacheManager, Corpus};

/// Runs a document through extraction, chunking and embedding, with the
/// on-disk cache in front.
pub struct Pipeline {
    extractor: ContentExtractor,
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
}

impl Pipeline {
    pub fn new(settings: &Settings, embedder: Arc<dyn Embedder>) -> Result<Self> {
        Ok(Self {
            extractor: ContentExtractor::new(settings.tables)?,
            chunker: Chunker::new(settings.chunking)?,
            embedder,
        })
    }

    pub fn with_parts(extractor: ContentExtractor, chunker: Chunker, embedder: Arc<dyn Embedder>) -> Self {
        Self { extractor, chunker, embedder }
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Build a corpus from scratch, ignoring any cache.
    pub fn build(&self, path: &Path) -> Result<Corpus> {
        let key = source_key(path)?;
        let extraction = self.extractor.extract_path(path)?;
        let fragments = self.chunker.chunk_pages(&extraction.pages);
        if fragments.is_empty() {
            return Err(Error::EmptyDocument { path: path.to_path_buf() });
        }
        tracing::info!(
            source = %key,
            fragments = fragments.len(),
            tables = extraction.report.table_count(),
            "chunked document"
        );
        Corpus::build(&key, self.embedder.as_ref(), fragments)
    }

    /// What a cache entry for `fingerprint` must carry to stand in for a
    /// fresh build with this pipeline.
    pub fn cache_stamp(&self, fingerprint: String) -> CacheExpectation {
        CacheExpectation {
            fingerprint,
            embedder_id: self.embedder.id().to_string(),
            dim: self.embedder.dim(),
            chunking: self.chunker.settings(),
            tables: self.extractor.settings(),
        }
    }

    /// Load the corpus for `path` from `cache_root`, or build and cache it.
    ///
    /// A cache entry is reused only if it is complete and was built from the
    /// same document bytes with the same embedder and settings. Nothing is
    /// written unless the build succeeds; a document that no longer loads or
    /// has no content also loses its old entry.
    pub fn build_or_load(&self, path: &Path, cache_root: &Path, force_reprocess: bool) -> Result<Corpus> {
        let key = source_key(path)?;
        let stamp = self.cache_stamp(fingerprint(path)?);
        let cache = CacheManager::new(cache_root);

        if force_reprocess {
            tracing::info!(source = %key, "forced reprocess, skipping cache");
        } else if let Some(corpus) = cache.load(&key, &stamp) {
            return Ok(corpus);
        }

        let corpus = match self.build(path) {
            Ok(corpus) => corpus,
            Err(e) => {
                if matches!(e, Error::DocumentLoad { .. } | Error::EmptyDocument { .. }) {
                    match cache.invalidate(&key) {
                        Ok(true) => tracing::info!(source = %key, "dropped cache entry for unusable document"),
                        Ok(false) => {}
                        Err(err) => tracing::warn!(source = %key, error = %err, "failed to drop cache entry"),
                    }
                }
                return Err(e);
            }
        };
        if let Err(e) = cache.store(&key, &stamp, &corpus) {
            tracing::warn!(source = %key, error = %e, "failed to write cache; continuing with in-memory corpus");
        }
        Ok(corpus)
    }
}
