use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to load document {}: {source}", path.display())]
    DocumentLoad {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("no extractable content in {}", path.display())]
    EmptyDocument { path: PathBuf },

    #[error("cache entry is corrupt: {0}")]
    CacheCorruption(String),

    #[error("vector dimension mismatch: index has {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("corpus is misaligned: {fragments} fragments but {vectors} vectors")]
    CorpusMismatch { fragments: usize, vectors: usize },

    #[error("corpus was embedded with {corpus} but the query embedder is {query}")]
    EmbedderMismatch { corpus: String, query: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("embedding failed: {0}")]
    Embedding(#[source] anyhow::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A recoverable failure confined to one page of a document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("page {page}: text layer could not be decoded: {reason}")]
    Text { page: usize, reason: String },

    #[error("page {page}: {strategy} table detection failed: {reason}")]
    Tables {
        page: usize,
        strategy: &'static str,
        reason: String,
    },
}

impl PageError {
    pub fn page(&self) -> usize {
        match self {
            Self::Text { page, .. } | Self::Tables { page, .. } => *page,
        }
    }
}
