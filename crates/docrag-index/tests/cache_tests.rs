use std::fs;

use docrag_core::config::{ChunkingSettings, TableSettings};
use docrag_core::traits::{Embedder, VectorIndex};
use docrag_core::types::Fragment;
use docrag_embed::HashEmbedder;
use docrag_index::{CacheExpectation, CacheManager, Corpus};
use tempfile::TempDir;

fn sample_fragments() -> Vec<Fragment> {
    vec![
        Fragment::text("Distillation separates components by volatility."),
        Fragment::text("Heat exchangers transfer energy between two fluids."),
        Fragment::Table { content: "[Table 1, page 4]\nFluid | Density\nwater | 998".into(), page: 3, ordinal: 0 },
        Fragment::text("Pump head depends on flow rate and impeller speed."),
    ]
}

fn build(embedder: &HashEmbedder) -> Corpus {
    Corpus::build("handbook.pdf", embedder, sample_fragments()).expect("build corpus")
}

fn expectation(embedder: &HashEmbedder, fingerprint: &str) -> CacheExpectation {
    CacheExpectation {
        fingerprint: fingerprint.into(),
        embedder_id: embedder.id().into(),
        dim: embedder.dim(),
        chunking: ChunkingSettings::default(),
        tables: TableSettings::default(),
    }
}

#[test]
fn stored_corpus_loads_back_identically() {
    let tmp = TempDir::new().unwrap();
    let cache = CacheManager::new(tmp.path());
    let embedder = HashEmbedder::new(64);
    let corpus = build(&embedder);

    cache.store("handbook.pdf", &expectation(&embedder, "abc"), &corpus).unwrap();
    let loaded = cache.load("handbook.pdf", &expectation(&embedder, "abc")).expect("cache hit");

    assert_eq!(loaded.fragments(), corpus.fragments());
    let a: Vec<u32> = loaded.index().as_flat().iter().map(|x| x.to_bits()).collect();
    let b: Vec<u32> = corpus.index().as_flat().iter().map(|x| x.to_bits()).collect();
    assert_eq!(a, b);

    let query = &embedder.embed_batch(&["heat exchangers".to_string()]).unwrap()[0];
    assert_eq!(loaded.search(query, 3).unwrap(), corpus.search(query, 3).unwrap());
}

#[test]
fn vectors_line_up_with_fragments() {
    let embedder = HashEmbedder::new(64);
    let corpus = build(&embedder);
    for (i, fragment) in corpus.fragments().iter().enumerate() {
        let v = &embedder.embed_batch(&[fragment.content().to_string()]).unwrap()[0];
        assert_eq!(corpus.index().vector(i), Some(v.as_slice()));
        let hits = corpus.index().search(v, 1).unwrap();
        assert_eq!(hits[0].index, i);
    }
}

#[test]
fn missing_entry_is_a_miss() {
    let tmp = TempDir::new().unwrap();
    let embedder = HashEmbedder::new(16);
    assert!(CacheManager::new(tmp.path()).load("handbook.pdf", &expectation(&embedder, "abc")).is_none());
}

#[test]
fn fragments_without_index_is_a_miss() {
    let tmp = TempDir::new().unwrap();
    let cache = CacheManager::new(tmp.path());
    let embedder = HashEmbedder::new(32);
    cache.store("handbook.pdf", &expectation(&embedder, "abc"), &build(&embedder)).unwrap();
    fs::remove_file(cache.index_path("handbook.pdf")).unwrap();
    assert!(cache.load("handbook.pdf", &expectation(&embedder, "abc")).is_none());
}

#[test]
fn index_from_another_store_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let cache = CacheManager::new(tmp.path());
    let embedder = HashEmbedder::new(32);
    let corpus = build(&embedder);

    cache.store("a.pdf", &expectation(&embedder, "abc"), &corpus).unwrap();
    cache.store("b.pdf", &expectation(&embedder, "abc"), &corpus).unwrap();
    // pair a's fragments with b's index: same shape, different digest
    fs::copy(cache.index_path("b.pdf"), cache.index_path("a.pdf")).unwrap();
    assert!(cache.load("a.pdf", &expectation(&embedder, "abc")).is_none());
}

#[test]
fn garbage_files_are_a_miss() {
    let tmp = TempDir::new().unwrap();
    let cache = CacheManager::new(tmp.path());
    let embedder = HashEmbedder::new(16);
    fs::write(cache.fragments_path("handbook.pdf"), "{ not json").unwrap();
    fs::write(cache.index_path("handbook.pdf"), b"DRFX").unwrap();
    assert!(cache.load("handbook.pdf", &expectation(&embedder, "abc")).is_none());
}

#[test]
fn changed_source_or_embedder_is_a_miss() {
    let tmp = TempDir::new().unwrap();
    let cache = CacheManager::new(tmp.path());
    let embedder = HashEmbedder::new(32);
    cache.store("handbook.pdf", &expectation(&embedder, "abc"), &build(&embedder)).unwrap();

    assert!(cache.load("handbook.pdf", &expectation(&embedder, "def")).is_none());
    let other = HashEmbedder::new(48);
    assert!(cache.load("handbook.pdf", &expectation(&other, "abc")).is_none());
    assert!(cache.load("handbook.pdf", &expectation(&embedder, "abc")).is_some());
}

#[test]
fn changed_chunking_or_tables_is_a_miss() {
    let tmp = TempDir::new().unwrap();
    let cache = CacheManager::new(tmp.path());
    let embedder = HashEmbedder::new(32);
    cache.store("handbook.pdf", &expectation(&embedder, "abc"), &build(&embedder)).unwrap();

    let mut rechunked = expectation(&embedder, "abc");
    rechunked.chunking = ChunkingSettings { chunk_size: 100, chunk_overlap: 10 };
    assert!(cache.load("handbook.pdf", &rechunked).is_none());

    let mut retabled = expectation(&embedder, "abc");
    retabled.tables = TableSettings { min_rows: 5, min_columns: 2 };
    assert!(cache.load("handbook.pdf", &retabled).is_none());
}

#[test]
fn stamp_must_describe_the_corpus() {
    let tmp = TempDir::new().unwrap();
    let cache = CacheManager::new(tmp.path());
    let embedder = HashEmbedder::new(32);
    let err = cache.store("handbook.pdf", &expectation(&HashEmbedder::new(16), "abc"), &build(&embedder)).unwrap_err();
    assert!(matches!(err, docrag_core::error::Error::EmbedderMismatch { .. }));
    assert!(cache.list().unwrap().is_empty());
}

#[test]
fn list_and_invalidate() {
    let tmp = TempDir::new().unwrap();
    let cache = CacheManager::new(tmp.path().join("nested"));
    assert!(cache.list().unwrap().is_empty());

    let embedder = HashEmbedder::new(16);
    let corpus = build(&embedder);
    cache.store("b.pdf", &expectation(&embedder, "1"), &corpus).unwrap();
    cache.store("a.pdf", &expectation(&embedder, "2"), &corpus).unwrap();

    let listed = cache.list().unwrap();
    let keys: Vec<&str> = listed.iter().map(|l| l.source_key.as_str()).collect();
    assert_eq!(keys, vec!["a.pdf", "b.pdf"]);
    assert_eq!(listed[0].fragments, 4);
    assert_eq!(listed[0].dim, 16);
    assert!(listed.iter().all(|l| l.complete));

    assert!(cache.invalidate("a.pdf").unwrap());
    assert!(!cache.invalidate("a.pdf").unwrap());
    assert!(!cache.fragments_path("a.pdf").exists());
    assert!(!cache.index_path("a.pdf").exists());
    assert_eq!(cache.list().unwrap().len(), 1);
}

#[test]
fn fingerprint_tracks_file_bytes() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("doc.txt");
    fs::write(&path, "one").unwrap();
    let first = docrag_index::fingerprint(&path).unwrap();
    assert_eq!(first, docrag_index::fingerprint(&path).unwrap());
    fs::write(&path, "two").unwrap();
    assert_ne!(first, docrag_index::fingerprint(&path).unwrap());
    assert!(docrag_index::fingerprint(&tmp.path().join("missing.txt")).is_err());
}
