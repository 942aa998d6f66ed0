//! docrag-engine
//!
//! Ingestion pipeline (extract, chunk, embed, index, cache), query-time
//! retrieval, and the `KnowledgeBase` handle handed to downstream consumers.

pub mod knowledge;
pub mod pipeline;
pub mod retrieve;

pub use knowledge::KnowledgeBase;
pub use pipeline::Pipeline;
pub use retrieve::{retrieve, retrieve_scored};
