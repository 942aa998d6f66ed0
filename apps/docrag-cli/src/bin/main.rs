use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docrag_core::config::{Config, Settings};
use docrag_embed::get_default_embedder;
use docrag_engine::{retrieve_scored, Pipeline};
use docrag_index::{source_key, CacheManager};

#[derive(Parser)]
#[command(name = "docrag", about = "Retrieval over a PDF or text handbook", version)]
struct Cli {
    /// Cache directory (overrides cache.root)
    #[arg(long, global = true)]
    cache_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract, chunk and embed a document, then cache the result
    Ingest {
        document: PathBuf,
        /// Rebuild even when a valid cache entry exists
        #[arg(long)]
        force: bool,
    },

    /// Print the fragments nearest to a query
    Query {
        document: PathBuf,
        text: String,
        /// Number of fragments (defaults to retrieval.top_k)
        #[arg(short, long)]
        k: Option<usize>,
    },

    /// Inspect or clear cached corpora
    #[command(subcommand)]
    Cache(CacheCommand),
}

#[derive(Subcommand)]
enum CacheCommand {
    /// List cached documents
    List,
    /// Remove the cache entry for a document
    Clear { document: PathBuf },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = Config::load()?.settings().context("loading settings")?;
    let cache_root = cli.cache_root.clone().unwrap_or_else(|| settings.cache.root_path());

    match cli.command {
        Command::Ingest { document, force } => ingest(&settings, &document, &cache_root, force || settings.cache.force_reprocess),
        Command::Query { document, text, k } => query(&settings, &document, &cache_root, &text, k.unwrap_or(settings.retrieval.top_k)),
        Command::Cache(CacheCommand::List) => list(&cache_root),
        Command::Cache(CacheCommand::Clear { document }) => clear(&cache_root, &document),
    }
}

fn pipeline(settings: &Settings) -> anyhow::Result<Pipeline> {
    let embedder = get_default_embedder(&settings.embedding)?;
    Ok(Pipeline::new(settings, embedder)?)
}

fn ingest(settings: &Settings, document: &Path, cache_root: &Path, force: bool) -> anyhow::Result<()> {
    let corpus = pipeline(settings)?
        .build_or_load(document, cache_root, force)
        .with_context(|| format!("ingesting {}", document.display()))?;
    let tables = corpus.fragments().iter().filter(|f| f.is_table()).count();
    println!(
        "{}: {} fragments ({} tables), dim {}, cached under {}",
        corpus.source_key(),
        corpus.len(),
        tables,
        corpus.dim(),
        cache_root.display()
    );
    Ok(())
}

fn query(settings: &Settings, document: &Path, cache_root: &Path, text: &str, k: usize) -> anyhow::Result<()> {
    let pipeline = pipeline(settings)?;
    let corpus = pipeline
        .build_or_load(document, cache_root, settings.cache.force_reprocess)
        .with_context(|| format!("loading {}", document.display()))?;
    let hits = retrieve_scored(Some(&corpus), pipeline.embedder().as_ref(), text, k)?.unwrap_or_default();
    if hits.is_empty() {
        println!("No fragments found.");
    }
    for (rank, hit) in hits.iter().enumerate() {
        println!("#{} fragment {} (distance {:.4})", rank + 1, hit.index, hit.distance);
        println!("{}\n", hit.content);
    }
    Ok(())
}

fn list(cache_root: &Path) -> anyhow::Result<()> {
    let entries = CacheManager::new(cache_root).list()?;
    if entries.is_empty() {
        println!("No cached documents in {}", cache_root.display());
    }
    for e in entries {
        let state = if e.complete { "" } else { " [incomplete]" };
        println!(
            "{}\t{} fragments\tdim {}\t{}\t{}{}",
            e.source_key,
            e.fragments,
            e.dim,
            e.embedder_id,
            e.created_at.format("%Y-%m-%d %H:%M:%S"),
            state
        );
    }
    Ok(())
}

fn clear(cache_root: &Path, document: &Path) -> anyhow::Result<()> {
    let key = source_key(document)?;
    if CacheManager::new(cache_root).invalidate(&key)? {
        println!("Removed cache entry for {key}");
    } else {
        println!("No cache entry for {key}");
    }
    Ok(())
}
