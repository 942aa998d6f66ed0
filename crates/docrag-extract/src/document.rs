//! Paged source documents.
//!
//! PDFs are parsed with `lopdf`; plain-text files are split into pages on the
//! form-feed character, the layout `pdftotext` produces.

use std::fs;
use std::path::{Path, PathBuf};

use docrag_core::error::{Error, PageError, Result};

const FORM_FEED: char = '\u{c}';

pub trait PagedDocument {
    fn source(&self) -> &Path;
    fn page_count(&self) -> usize;
    fn page_text(&self, index: usize) -> std::result::Result<String, PageError>;
}

/// Open a document, picking the parser from the file extension.
pub fn open_document(path: &Path) -> Result<Box<dyn PagedDocument>> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => Ok(Box::new(PdfDocument::open(path)?)),
        "txt" | "text" | "md" => Ok(Box::new(TextDocument::open(path)?)),
        other => Err(load_error(path, anyhow::anyhow!("unsupported document type '{}'", other))),
    }
}

fn load_error(path: &Path, source: anyhow::Error) -> Error {
    Error::DocumentLoad { path: path.to_path_buf(), source }
}

pub struct PdfDocument {
    path: PathBuf,
    doc: lopdf::Document,
    // lopdf numbers pages from 1
    page_numbers: Vec<u32>,
}

impl PdfDocument {
    pub fn open(path: &Path) -> Result<Self> {
        let doc = lopdf::Document::load(path).map_err(|e| load_error(path, anyhow::anyhow!("{}", e)))?;
        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        tracing::debug!(path = %path.display(), pages = page_numbers.len(), "opened PDF");
        Ok(Self { path: path.to_path_buf(), doc, page_numbers })
    }
}

impl PagedDocument for PdfDocument {
    fn source(&self) -> &Path {
        &self.path
    }

    fn page_count(&self) -> usize {
        self.page_numbers.len()
    }

    fn page_text(&self, index: usize) -> std::result::Result<String, PageError> {
        let number = self
            .page_numbers
            .get(index)
            .copied()
            .ok_or_else(|| PageError::Text { page: index, reason: "page out of range".to_string() })?;
        self.doc
            .extract_text(&[number])
            .map_err(|e| PageError::Text { page: index, reason: e.to_string() })
    }
}

pub struct TextDocument {
    path: PathBuf,
    pages: Vec<String>,
}

impl TextDocument {
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| load_error(path, e.into()))?;
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        };
        Ok(Self::from_text(path, &text))
    }

    pub fn from_text(path: &Path, text: &str) -> Self {
        let mut pages: Vec<String> = text.split(FORM_FEED).map(str::to_string).collect();
        // a trailing form feed closes the last page rather than opening a new one
        if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
            pages.pop();
        }
        Self::from_pages(path, pages)
    }

    pub fn from_pages(path: &Path, pages: Vec<String>) -> Self {
        Self { path: path.to_path_buf(), pages }
    }
}

impl PagedDocument for TextDocument {
    fn source(&self) -> &Path {
        &self.path
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, index: usize) -> std::result::Result<String, PageError> {
        self.pages
            .get(index)
            .cloned()
            .ok_or_else(|| PageError::Text { page: index, reason: "page out of range".to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_feed_separates_pages() {
        let doc = TextDocument::from_text(Path::new("h.txt"), "one\u{c}two\u{c}three\u{c}");
        assert_eq!(doc.page_count(), 3);
        assert_eq!(doc.page_text(1).unwrap(), "two");
        assert!(doc.page_text(3).is_err());
    }

    #[test]
    fn text_without_form_feed_is_one_page() {
        let doc = TextDocument::from_text(Path::new("h.txt"), "just text");
        assert_eq!(doc.page_count(), 1);
    }

    #[test]
    fn unknown_extension_is_a_load_error() {
        let err = open_document(Path::new("handbook.xyz")).err().unwrap();
        assert!(matches!(err, Error::DocumentLoad { .. }));
    }
}
