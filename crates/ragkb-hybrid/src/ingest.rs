use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tracing::info;

use ragkb_core::config::KbSettings;
use ragkb_core::data_processor::DataProcessor;
use ragkb_core::traits::Embedder;
use ragkb_core::{Error, Result};
use ragkb_vector::{CorpusArtifacts, EmbeddingMatrix};

/// Chunk every document under `raw_dir`, embed the chunks in batches and
/// write fresh artifacts to `artifacts_dir`. Returns the chunk count.
pub fn ingest_directory(
    raw_dir: &Path,
    artifacts_dir: &Path,
    embedder: &dyn Embedder,
    settings: &KbSettings,
) -> Result<usize> {
    let chunks = DataProcessor::with_config(settings.chunking.clone()).process_directory(raw_dir)?;
    if chunks.is_empty() {
        return Err(Error::EmptyCorpus);
    }

    let pb = ProgressBar::new(chunks.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }

    let mut matrix = EmbeddingMatrix::new(embedder.dim());
    for batch in chunks.chunks(settings.embedding.batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        let vectors = embedder.embed_batch(&texts).map_err(Error::Embedding)?;
        for v in &vectors {
            matrix.push_row(v)?;
        }
        pb.inc(batch.len() as u64);
    }
    pb.finish_with_message("embedded");

    CorpusArtifacts::new(artifacts_dir).save(&chunks, &matrix)?;
    info!(chunks = chunks.len(), dir = %artifacts_dir.display(), "ingestion complete");
    Ok(chunks.len())
}
