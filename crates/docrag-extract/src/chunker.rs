use docrag_core::config::ChunkingSettings;
use docrag_core::error::Result;
use docrag_core::types::{Fragment, Page, Table};

/// Splits page text into overlapping word windows and renders tables as
/// single fragments.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    pub fn new(settings: ChunkingSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { chunk_size: settings.chunk_size, chunk_overlap: settings.chunk_overlap })
    }

    pub fn settings(&self) -> ChunkingSettings {
        ChunkingSettings { chunk_size: self.chunk_size, chunk_overlap: self.chunk_overlap }
    }

    pub fn stride(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }

    /// Fragments for every page, page by page: text windows first, then the
    /// page's tables.
    pub fn chunk_pages(&self, pages: &[Page]) -> Vec<Fragment> {
        let mut fragments = Vec::new();
        for page in pages {
            fragments.extend(self.chunk_page(page));
        }
        fragments
    }

    pub fn chunk_page(&self, page: &Page) -> Vec<Fragment> {
        let text = split_paragraphs(&page.text)
            .into_iter()
            .flat_map(|paragraph| self.word_windows(&paragraph))
            .map(Fragment::text);
        let tables = page.tables.iter().map(render_table);
        text.chain(tables).filter(|f| !f.is_blank()).collect()
    }

    /// Windows of `chunk_size` words advancing by `chunk_size - chunk_overlap`.
    /// The last window may be short; trailing words are never dropped.
    pub fn word_windows(&self, paragraph: &str) -> Vec<String> {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        let mut windows = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + self.chunk_size).min(words.len());
            windows.push(words[start..end].join(" "));
            if end == words.len() {
                break;
            }
            start += self.stride();
        }
        windows
    }
}

/// Split text into paragraphs on blank lines (lines empty after trimming).
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }
    paragraphs
}

/// Render a table as one fragment with a provenance header.
pub fn render_table(table: &Table) -> Fragment {
    let mut content = format!("[Table {}, page {}]", table.ordinal + 1, table.page + 1);
    for row in &table.rows {
        content.push('\n');
        content.push_str(&row.join(" | "));
    }
    Fragment::Table { content, page: table.page, ordinal: table.ordinal }
}
