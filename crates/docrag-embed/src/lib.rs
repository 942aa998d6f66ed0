//! docrag-embed
//!
//! Embedding backends behind `docrag_core::traits::Embedder`: a candle BERT
//! sentence encoder for real runs and a hashing embedder for tests.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use docrag_core::config::{expand_path, EmbeddingSettings};
use docrag_core::traits::Embedder;

pub mod bert;
pub mod device;
pub mod hash;
pub mod pool;
pub mod tokenize;

pub use bert::BertEmbedder;
pub use hash::HashEmbedder;
pub use pool::masked_mean_l2;

pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";

/// The embedder selected by settings.
///
/// `APP_USE_FAKE_EMBEDDINGS=1` (or `embedding.use_fake`) selects the
/// `HashEmbedder`; otherwise the BERT model is loaded from the resolved
/// model directory.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    if settings.use_fake || fake_requested() {
        if settings.fake_dim == 0 {
            return Err(anyhow!("embedding.fake_dim must be positive for the hash embedder"));
        }
        tracing::info!(dim = settings.fake_dim, "using hash embedder");
        return Ok(Arc::new(HashEmbedder::new(settings.fake_dim)));
    }
    let model_dir = resolve_model_dir(settings.model_dir.as_deref())?;
    Ok(Arc::new(BertEmbedder::load(&model_dir, settings)?))
}

fn fake_requested() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    let candidates = configured
        .map(expand_path)
        .into_iter()
        .chain(std::env::var("APP_MODEL_DIR").ok().map(PathBuf::from))
        .chain(std::env::var("MODEL_DIR").ok().map(PathBuf::from))
        .chain([Path::new("models").join(DEFAULT_MODEL), Path::new("../models").join(DEFAULT_MODEL)]);
    for dir in candidates {
        if dir.exists() {
            tracing::debug!(dir = %dir.display(), "resolved model dir");
            return Ok(dir);
        }
    }
    Err(anyhow!("Could not locate the {} model directory; set embedding.model_dir or APP_MODEL_DIR", DEFAULT_MODEL))
}
