use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ragkb_core::config::{Config, KbSettings};
use ragkb_core::ScoredResult;
use ragkb_embed::get_default_embedder;
use ragkb_hybrid::{ingest_directory, HybridRetriever};

const LOG_TARGETS: &[&str] = &["ragkb", "ragkb_core", "ragkb_text", "ragkb_embed", "ragkb_vector", "ragkb_hybrid"];

#[derive(Parser)]
#[command(name = "ragkb", version, about = "Hybrid semantic + keyword search over a local knowledge base")]
struct Cli {
    /// Directory holding metadata.json and embeddings.npy (overrides data.artifacts_dir)
    #[arg(long, global = true)]
    artifacts: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a hybrid search
    Search {
        query: String,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        #[arg(short, long)]
        threshold: Option<f32>,
        #[arg(long)]
        json: bool,
    },
    /// Show corpus statistics
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Chunk, embed and append a text file to the knowledge base
    Add {
        file: PathBuf,
        /// Label used as category and chunk id prefix (defaults to the file stem)
        #[arg(long)]
        source: Option<String>,
    },
    /// Rebuild the knowledge base from a directory of .txt/.md files
    Ingest { dir: Option<PathBuf> },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = std::iter::once("warn".to_string())
        .chain(LOG_TARGETS.iter().map(|t| format!("{t}={level}")))
        .collect::<Vec<_>>()
        .join(",");
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load().context("loading configuration")?;
    let settings = config.settings()?;
    let artifacts = cli.artifacts.clone().unwrap_or_else(|| settings.data.artifacts_path());

    match cli.command {
        Command::Search { query, top_k, threshold, json } => {
            let retriever = open_retriever(&artifacts, &settings)?;
            let mut options = settings.search;
            if let Some(k) = top_k { options.top_k = k; }
            if let Some(t) = threshold { options.similarity_threshold = t; }
            let results = retriever.search(&query, options)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print_results(&results);
            }
        }
        Command::Stats { json } => {
            let stats = open_retriever(&artifacts, &settings)?.stats()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("chunks:     {}", stats.total_chunks);
                println!("categories: {}", stats.total_categories);
                println!("methods:    {}", stats.search_methods.into_iter().collect::<Vec<_>>().join(", "));
            }
        }
        Command::Add { file, source } => {
            let text = fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
            let source = source.unwrap_or_else(|| {
                file.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
            });
            let retriever = open_retriever(&artifacts, &settings)?;
            let added = retriever.add_document(&text, &source)?;
            println!("Added {added} chunks from '{source}' to {}", artifacts.display());
        }
        Command::Ingest { dir } => {
            let raw = dir.unwrap_or_else(|| settings.data.raw_path());
            info!(from = %raw.display(), to = %artifacts.display(), "ingesting");
            let embedder = get_default_embedder(&settings.embedding)?;
            let n = ingest_directory(&raw, &artifacts, embedder.as_ref(), &settings)?;
            println!("Ingest complete ({n} chunks)");
        }
    }
    Ok(())
}

fn open_retriever(artifacts: &Path, settings: &KbSettings) -> Result<HybridRetriever> {
    let embedder = get_default_embedder(&settings.embedding).context("knowledge base unavailable")?;
    HybridRetriever::from_artifacts(artifacts, embedder, settings.clone()).context("knowledge base unavailable")
}

fn print_results(results: &[ScoredResult]) {
    if results.is_empty() {
        println!("No relevant information found.");
        return;
    }
    for (rank, r) in results.iter().enumerate() {
        println!(
            "{}. [{}] similarity {:.3} (semantic {:.3}, keyword {:.3})",
            rank + 1,
            r.chunk.category,
            r.similarity,
            r.semantic_score,
            r.keyword_score
        );
        let preview: String = r.chunk.content.chars().take(200).collect();
        println!("   {preview}");
    }
}
