//! docrag-index
//!
//! Exact L2 vector index, the immutable `Corpus` that pairs it with fragment
//! text, and the on-disk cache for both.

pub mod cache;
pub mod corpus;
pub mod flat;

pub use cache::{fingerprint, source_key, CacheExpectation, CacheListing, CacheManager};
pub use corpus::Corpus;
pub use flat::FlatL2Index;
