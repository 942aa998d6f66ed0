//! docrag-extract
//!
//! Turns a paged source document into ordered fragments: page text and table
//! detection (`extractor`, `tables`), then word-window chunking and table
//! rendering (`chunker`).

pub mod chunker;
pub mod document;
pub mod extractor;
pub mod tables;

pub use chunker::Chunker;
pub use document::{open_document, PagedDocument, PdfDocument, TextDocument};
pub use extractor::{ContentExtractor, Extraction, ExtractionReport};
pub use tables::{AlignedTableDetector, RuledTableDetector, TableDetector};
