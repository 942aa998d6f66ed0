use std::fs;
use std::path::Path;

use docrag_core::config::{ChunkingSettings, TableSettings};
use docrag_core::error::{Error, PageError};
use docrag_core::types::Fragment;
use docrag_extract::tables::Grid;
use docrag_extract::{Chunker, ContentExtractor, PagedDocument, RuledTableDetector, TableDetector, TextDocument};
use tempfile::TempDir;

fn table_settings() -> TableSettings {
    TableSettings { min_rows: 2, min_columns: 2 }
}

/// Delegates to the ruled detector but fails on one page.
struct FailsOnPage {
    page: usize,
    inner: RuledTableDetector,
}

impl TableDetector for FailsOnPage {
    fn name(&self) -> &'static str {
        "ruled"
    }

    fn detect(&self, page: usize, text: &str) -> Result<Vec<Grid>, PageError> {
        if page == self.page {
            return Err(PageError::Tables { page, strategy: "ruled", reason: "malformed page".into() });
        }
        self.inner.detect(page, text)
    }
}

fn twenty_pages() -> Vec<String> {
    (0..20)
        .map(|i| {
            if i % 3 == 0 {
                format!("Page {i} body text.\n\n| Property | Value |\n| rho | {i} |\n")
            } else {
                format!("Page {i} body text.")
            }
        })
        .collect()
}

#[test]
fn failing_page_does_not_abort_extraction() {
    let doc = TextDocument::from_pages(Path::new("handbook.txt"), twenty_pages());
    let extractor = ContentExtractor::with_detectors(
        table_settings(),
        Box::new(FailsOnPage { page: 6, inner: RuledTableDetector::new(table_settings()) }),
        Box::new(RuledTableDetector::new(table_settings())),
    );
    let extraction = extractor.extract(&doc).expect("extraction succeeds");
    assert_eq!(extraction.pages.len(), 20);
    assert_eq!(extraction.report.page_errors.len(), 1);
    assert_eq!(extraction.report.page_errors[0].page(), 6);
    assert!(extraction.pages[6].tables.is_empty());
    // every third page carries a table; the one on page 6 is lost
    assert_eq!(extraction.report.table_count(), 6);

    let chunker = Chunker::new(ChunkingSettings { chunk_size: 50, chunk_overlap: 5 }).unwrap();
    let fragments = chunker.chunk_pages(&extraction.pages);
    for i in (0..20).filter(|i| *i != 6) {
        let needle = format!("Page {i} body text.");
        assert!(fragments.iter().any(|f| f.content().starts_with(&needle)), "missing text of page {i}");
    }
    let tables: Vec<&Fragment> = fragments.iter().filter(|f| f.is_table()).collect();
    assert_eq!(tables.len(), 6);
    assert!(tables.iter().all(|f| !matches!(f, Fragment::Table { page: 6, .. })));
    assert!(tables[0].content().starts_with("[Table 1, page 1]"));
}

#[test]
fn text_file_with_form_feeds_is_paged() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("perry.txt");
    fs::write(&path, "Fluid flow basics.\u{c}Heat transfer basics.\u{c}").unwrap();
    let extraction = ContentExtractor::new(table_settings()).unwrap().extract_path(&path).unwrap();
    assert_eq!(extraction.pages.len(), 2);
    assert_eq!(extraction.pages[1].text, "Heat transfer basics.");
}

#[test]
fn whitespace_file_is_rejected_as_empty() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("blank.txt");
    fs::write(&path, "   \n\u{c}\n\t\n").unwrap();
    let err = ContentExtractor::new(table_settings()).unwrap().extract_path(&path).unwrap_err();
    assert!(matches!(err, Error::EmptyDocument { .. }));
}

#[test]
fn unparseable_pdf_is_a_load_error() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("broken.pdf");
    fs::write(&path, b"this is not a pdf").unwrap();
    match ContentExtractor::new(table_settings()).unwrap().extract_path(&path) {
        Err(Error::DocumentLoad { path: p, .. }) => assert_eq!(p, path),
        other => panic!("expected DocumentLoad, got {:?}", other.map(|e| e.pages.len())),
    }
}

#[test]
fn missing_file_is_a_load_error() {
    let err = ContentExtractor::new(table_settings()).unwrap().extract_path(Path::new("/nonexistent/handbook.txt")).unwrap_err();
    assert!(matches!(err, Error::DocumentLoad { .. }));
}

#[test]
fn generated_pdf_text_is_extracted() {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 24.into()]),
            Operation::new("Td", vec![100.into(), 600.into()]),
            Operation::new("Tj", vec![Object::string_literal("Hello World")]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("tiny.pdf");
    doc.save(&path).unwrap();

    let pdf = docrag_extract::PdfDocument::open(&path).unwrap();
    assert_eq!(pdf.page_count(), 1);
    assert!(pdf.page_text(0).unwrap().contains("Hello World"));
}
