//! Domain types shared by extraction, indexing and retrieval.

use serde::{Deserialize, Serialize};

/// One page of a source document, 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub index: usize,
    pub text: String,
    pub tables: Vec<Table>,
}

/// A grid of cell strings detected on a page.
///
/// `ordinal` counts tables within the page, starting at 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub page: usize,
    pub ordinal: usize,
    pub rows: Vec<Vec<String>>,
}

/// The atomic retrievable unit.
///
/// Fragments live in one ordered sequence per corpus; the position in that
/// sequence is the fragment's index id and must line up with its vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fragment {
    Text {
        content: String,
    },
    Table {
        content: String,
        page: usize,
        ordinal: usize,
    },
}

impl Fragment {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text { content: content.into() }
    }

    pub fn content(&self) -> &str {
        match self {
            Self::Text { content } | Self::Table { content, .. } => content,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.content().trim().is_empty()
    }

    pub fn is_table(&self) -> bool {
        matches!(self, Self::Table { .. })
    }
}

/// A nearest-neighbor match: fragment position and squared L2 distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub index: usize,
    pub distance: f32,
}

/// A retrieved fragment with its distance, for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredFragment {
    pub index: usize,
    pub distance: f32,
    pub content: String,
}

/// Result of a retrieval request.
///
/// `Unavailable` means no corpus was ever built; callers proceed without
/// context instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Retrieval {
    Fragments(Vec<String>),
    Unavailable,
}

impl Retrieval {
    pub const UNAVAILABLE_MESSAGE: &'static str = "RAG system not initialized or document not processed.";

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Fragments(_))
    }

    /// Flatten into plain strings; the unavailable marker becomes a single
    /// explanatory line.
    pub fn into_texts(self) -> Vec<String> {
        match self {
            Self::Fragments(texts) => texts,
            Self::Unavailable => vec![Self::UNAVAILABLE_MESSAGE.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_serializes_with_kind_tag() {
        let f = Fragment::Table { content: "[Table 1, page 2]\na | b".into(), page: 1, ordinal: 0 };
        let json = serde_json::to_string(&f).unwrap();
        assert!(json.contains("\"kind\":\"table\""));
        let back: Fragment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, f);
    }

    #[test]
    fn unavailable_flattens_to_marker() {
        assert_eq!(Retrieval::Unavailable.into_texts(), vec![Retrieval::UNAVAILABLE_MESSAGE.to_string()]);
        assert!(!Retrieval::Unavailable.is_available());
    }
}
