use std::collections::BTreeMap;
use std::path::Path;

use docrag_core::config::TableSettings;
use docrag_core::error::{Error, PageError, Result};
use docrag_core::types::{Page, Table};

use crate::document::{open_document, PagedDocument};
use crate::tables::{AlignedTableDetector, Grid, RuledTableDetector, TableDetector};

/// Pages of a document plus what went wrong along the way.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub pages: Vec<Page>,
    pub report: ExtractionReport,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    pub pages_seen: usize,
    pub page_errors: Vec<PageError>,
    /// Tables found, keyed by detector name.
    pub tables_by_strategy: BTreeMap<&'static str, usize>,
}

impl ExtractionReport {
    pub fn table_count(&self) -> usize {
        self.tables_by_strategy.values().sum()
    }
}

/// Walks a paged document, collecting page text and tables per page.
///
/// Failures confined to a page are logged and recorded in the report; only a
/// document that cannot be opened, or one with no content at all, fails.
pub struct ContentExtractor {
    settings: TableSettings,
    primary: Box<dyn TableDetector>,
    fallback: Box<dyn TableDetector>,
}

impl ContentExtractor {
    pub fn new(settings: TableSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self::with_detectors(
            settings,
            Box::new(RuledTableDetector::new(settings)),
            Box::new(AlignedTableDetector::new(settings)),
        ))
    }

    /// Custom detectors; `settings` is what they were configured with and is
    /// recorded alongside cached output.
    pub fn with_detectors(settings: TableSettings, primary: Box<dyn TableDetector>, fallback: Box<dyn TableDetector>) -> Self {
        Self { settings, primary, fallback }
    }

    pub fn settings(&self) -> TableSettings {
        self.settings
    }

    pub fn extract_path(&self, path: &Path) -> Result<Extraction> {
        let doc = open_document(path)?;
        self.extract(doc.as_ref())
    }

    pub fn extract(&self, doc: &dyn PagedDocument) -> Result<Extraction> {
        let mut report = ExtractionReport { pages_seen: doc.page_count(), ..Default::default() };
        let mut pages = Vec::with_capacity(doc.page_count());

        for index in 0..doc.page_count() {
            let text = match doc.page_text(index) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable page");
                    report.page_errors.push(e);
                    pages.push(Page { index, text: String::new(), tables: Vec::new() });
                    continue;
                }
            };
            let tables = match self.detect_tables(index, &text) {
                Ok((strategy, grids)) => {
                    if !grids.is_empty() {
                        *report.tables_by_strategy.entry(strategy).or_default() += grids.len();
                    }
                    grids
                        .into_iter()
                        .enumerate()
                        .map(|(ordinal, rows)| Table { page: index, ordinal, rows })
                        .collect()
                }
                Err(e) => {
                    tracing::warn!(error = %e, "page contributes no tables");
                    report.page_errors.push(e);
                    Vec::new()
                }
            };
            tracing::debug!(page = index, chars = text.len(), tables = tables.len(), "extracted page");
            pages.push(Page { index, text, tables });
        }

        let has_text = pages.iter().any(|p| !p.text.trim().is_empty());
        let has_tables = pages.iter().any(|p| !p.tables.is_empty());
        if !has_text && !has_tables {
            return Err(Error::EmptyDocument { path: doc.source().to_path_buf() });
        }

        tracing::info!(
            path = %doc.source().display(),
            pages = report.pages_seen,
            tables = report.table_count(),
            page_errors = report.page_errors.len(),
            "extraction finished"
        );
        Ok(Extraction { pages, report })
    }

    fn detect_tables(&self, page: usize, text: &str) -> std::result::Result<(&'static str, Vec<Grid>), PageError> {
        let found = self.primary.detect(page, text)?;
        if !found.is_empty() {
            return Ok((self.primary.name(), found));
        }
        Ok((self.fallback.name(), self.fallback.detect(page, text)?))
    }
}
