//! On-disk corpus cache keyed by the source document's base file name.
//!
//! Each entry is a pair of files under the cache root:
//! - `<name>.fragments.json`: manifest (format version, source fingerprint,
//!   embedder id, dimension, chunking and table settings, creation time)
//!   plus the ordered fragments
//! - `<name>.index.bin`: magic, version, dimension, count, the blake3 digest
//!   of the fragments file, then little-endian `f32` vectors
//!
//! Both files are written to temporaries and renamed into place. A reader
//! trusts an entry only when the index header's digest matches the fragments
//! file it sits next to and every count agrees; anything else is a miss.

use std::borrow::Cow;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use docrag_core::config::{ChunkingSettings, TableSettings};
use docrag_core::error::{Error, Result};
use docrag_core::traits::VectorIndex;
use docrag_core::types::Fragment;

use crate::corpus::Corpus;
use crate::flat::FlatL2Index;

const FORMAT_VERSION: u32 = 1;
const INDEX_MAGIC: [u8; 4] = *b"DRFX";
const FRAGMENTS_SUFFIX: &str = ".fragments.json";
const INDEX_SUFFIX: &str = ".index.bin";

/// Cache key for a document: its base file name.
pub fn source_key(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::DocumentLoad { path: path.to_path_buf(), source: anyhow::anyhow!("path has no file name") })
}

/// blake3 hex digest of a file's bytes.
pub fn fingerprint(path: &Path) -> Result<String> {
    let load_err = |e: std::io::Error| Error::DocumentLoad { path: path.to_path_buf(), source: e.into() };
    let mut file = File::open(path).map_err(load_err)?;
    let mut hasher = blake3::Hasher::new();
    std::io::copy(&mut file, &mut hasher).map_err(load_err)?;
    Ok(hasher.finalize().to_hex().to_string())
}

/// What a cache entry must match to be reused: the source bytes, the
/// embedder, and the settings that shaped the fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheExpectation {
    pub fingerprint: String,
    pub embedder_id: String,
    pub dim: usize,
    pub chunking: ChunkingSettings,
    pub tables: TableSettings,
}

#[derive(Serialize, Deserialize)]
struct Manifest<'a> {
    format_version: u32,
    source_key: Cow<'a, str>,
    fingerprint: Cow<'a, str>,
    embedder_id: Cow<'a, str>,
    dim: usize,
    chunking: ChunkingSettings,
    tables: TableSettings,
    created_at: DateTime<Utc>,
    fragments: Cow<'a, [Fragment]>,
}

/// Summary of one cached entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheListing {
    pub source_key: String,
    pub fragments: usize,
    pub dim: usize,
    pub embedder_id: String,
    pub created_at: DateTime<Utc>,
    /// Whether the index half of the pair exists.
    pub complete: bool,
}

enum Lookup {
    Hit(Corpus),
    Absent,
    Stale(&'static str),
}

struct IndexHeader {
    dim: usize,
    count: usize,
    digest: [u8; 32],
}

pub struct CacheManager {
    root: PathBuf,
}

impl CacheManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn fragments_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}{FRAGMENTS_SUFFIX}"))
    }

    pub fn index_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}{INDEX_SUFFIX}"))
    }

    /// Reconstitute a corpus if a complete, consistent, current entry exists.
    ///
    /// Corrupt or stale entries are logged and reported as a miss.
    pub fn load(&self, key: &str, expect: &CacheExpectation) -> Option<Corpus> {
        match self.lookup(key, expect) {
            Ok(Lookup::Hit(corpus)) => {
                tracing::info!(source = key, fragments = corpus.len(), "cache hit");
                Some(corpus)
            }
            Ok(Lookup::Absent) => {
                tracing::info!(source = key, "cache miss");
                None
            }
            Ok(Lookup::Stale(reason)) => {
                tracing::info!(source = key, reason, "cache entry is stale");
                None
            }
            Err(e) => {
                tracing::warn!(source = key, error = %e, "ignoring unusable cache entry");
                None
            }
        }
    }

    fn lookup(&self, key: &str, expect: &CacheExpectation) -> Result<Lookup> {
        let fragments_path = self.fragments_path(key);
        let index_path = self.index_path(key);
        match (fragments_path.exists(), index_path.exists()) {
            (false, false) => return Ok(Lookup::Absent),
            (true, false) => return Err(corrupt("fragments file has no matching index file")),
            (false, true) => return Err(corrupt("index file has no matching fragments file")),
            (true, true) => {}
        }

        let fragments_bytes = fs::read(&fragments_path).map_err(|e| corrupt(format!("reading fragments: {e}")))?;
        let index_bytes = fs::read(&index_path).map_err(|e| corrupt(format!("reading index: {e}")))?;

        let (header, vectors) = decode_index(&index_bytes)?;
        if blake3::hash(&fragments_bytes).as_bytes() != &header.digest {
            return Err(corrupt("index was written for a different fragments file"));
        }
        let manifest: Manifest =
            serde_json::from_slice(&fragments_bytes).map_err(|e| corrupt(format!("parsing fragments: {e}")))?;
        if manifest.format_version != FORMAT_VERSION {
            return Ok(Lookup::Stale("cache format version changed"));
        }
        if manifest.fragments.len() != header.count || manifest.dim != header.dim {
            return Err(corrupt(format!(
                "fragments file has {} entries of dim {}, index has {} of dim {}",
                manifest.fragments.len(),
                manifest.dim,
                header.count,
                header.dim
            )));
        }
        if manifest.fingerprint != expect.fingerprint {
            return Ok(Lookup::Stale("source document changed"));
        }
        if manifest.embedder_id != expect.embedder_id || manifest.dim != expect.dim {
            return Ok(Lookup::Stale("built with a different embedder"));
        }
        if manifest.chunking != expect.chunking || manifest.tables != expect.tables {
            return Ok(Lookup::Stale("built with different chunking or table settings"));
        }

        let index = FlatL2Index::from_flat(header.dim, vectors).map_err(|e| corrupt(e.to_string()))?;
        let corpus = Corpus::new(
            manifest.source_key.into_owned(),
            manifest.embedder_id.into_owned(),
            manifest.fragments.into_owned(),
            index,
        )
        .map_err(|e| corrupt(e.to_string()))?;
        Ok(Lookup::Hit(corpus))
    }

    /// Persist a corpus as a fragments/index pair, replacing any previous entry.
    ///
    /// `stamp` records what the corpus was built from; its embedder fields
    /// must describe `corpus`.
    pub fn store(&self, key: &str, stamp: &CacheExpectation, corpus: &Corpus) -> Result<()> {
        if stamp.embedder_id != corpus.embedder_id() || stamp.dim != corpus.dim() {
            return Err(Error::EmbedderMismatch { corpus: corpus.embedder_id().to_string(), query: stamp.embedder_id.clone() });
        }
        fs::create_dir_all(&self.root)?;
        let manifest = Manifest {
            format_version: FORMAT_VERSION,
            source_key: Cow::Borrowed(key),
            fingerprint: Cow::Borrowed(stamp.fingerprint.as_str()),
            embedder_id: Cow::Borrowed(corpus.embedder_id()),
            dim: corpus.dim(),
            chunking: stamp.chunking,
            tables: stamp.tables,
            created_at: Utc::now(),
            fragments: Cow::Borrowed(corpus.fragments()),
        };
        let fragments_bytes = serde_json::to_vec(&manifest)?;
        let digest = blake3::hash(&fragments_bytes);
        let index_bytes = encode_index(corpus.index(), digest.as_bytes());

        // index first: until the fragments file lands, its digest disagrees
        // with whatever fragments file is on disk and readers see a miss
        self.write_atomic(&self.index_path(key), &index_bytes)?;
        self.write_atomic(&self.fragments_path(key), &fragments_bytes)?;
        tracing::info!(source = key, fragments = corpus.len(), root = %self.root.display(), "cache written");
        Ok(())
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Remove both files of an entry. Returns whether anything was removed.
    pub fn invalidate(&self, key: &str) -> Result<bool> {
        let mut removed = false;
        for path in [self.fragments_path(key), self.index_path(key)] {
            match fs::remove_file(&path) {
                Ok(()) => removed = true,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        if removed {
            tracing::info!(source = key, "cache entry removed");
        }
        Ok(removed)
    }

    /// Entries under the cache root, sorted by source key.
    pub fn list(&self) -> Result<Vec<CacheListing>> {
        let dir = match fs::read_dir(&self.root) {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut listings = Vec::new();
        for entry in dir {
            let name = entry?.file_name().to_string_lossy().into_owned();
            let Some(key) = name.strip_suffix(FRAGMENTS_SUFFIX) else { continue };
            let bytes = fs::read(self.fragments_path(key))?;
            let manifest: Manifest = match serde_json::from_slice(&bytes) {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(source = key, error = %e, "unreadable cache manifest");
                    continue;
                }
            };
            listings.push(CacheListing {
                source_key: key.to_string(),
                fragments: manifest.fragments.len(),
                dim: manifest.dim,
                embedder_id: manifest.embedder_id.into_owned(),
                created_at: manifest.created_at,
                complete: self.index_path(key).exists(),
            });
        }
        listings.sort_by(|a, b| a.source_key.cmp(&b.source_key));
        Ok(listings)
    }
}

fn corrupt(msg: impl Into<String>) -> Error {
    Error::CacheCorruption(msg.into())
}

fn encode_index(index: &FlatL2Index, digest: &[u8; 32]) -> Vec<u8> {
    let flat = index.as_flat();
    let mut out = Vec::with_capacity(52 + flat.len() * 4);
    out.extend_from_slice(&INDEX_MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&(index.dim() as u32).to_le_bytes());
    out.extend_from_slice(&(index.len() as u64).to_le_bytes());
    out.extend_from_slice(digest);
    for x in flat {
        out.extend_from_slice(&x.to_le_bytes());
    }
    out
}

fn take<const N: usize>(bytes: &[u8], at: &mut usize) -> Result<[u8; N]> {
    let end = *at + N;
    let slice = bytes.get(*at..end).ok_or_else(|| corrupt("index file is truncated"))?;
    *at = end;
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    Ok(out)
}

fn decode_index(bytes: &[u8]) -> Result<(IndexHeader, Vec<f32>)> {
    let mut at = 0;
    if take::<4>(bytes, &mut at)? != INDEX_MAGIC {
        return Err(corrupt("index file has the wrong magic"));
    }
    let version = u32::from_le_bytes(take(bytes, &mut at)?);
    if version != FORMAT_VERSION {
        return Err(corrupt(format!("index format version {version} is not supported")));
    }
    let dim = u32::from_le_bytes(take(bytes, &mut at)?) as usize;
    let count = usize::try_from(u64::from_le_bytes(take(bytes, &mut at)?)).map_err(|e| corrupt(e.to_string()))?;
    let digest: [u8; 32] = take(bytes, &mut at)?;

    let body = &bytes[at..];
    let expected = count.checked_mul(dim).and_then(|n| n.checked_mul(4));
    if expected != Some(body.len()) {
        return Err(corrupt(format!("index body is {} bytes, header promises {count} x {dim} floats", body.len())));
    }
    let vectors = body
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Ok((IndexHeader { dim, count, digest }, vectors))
}
