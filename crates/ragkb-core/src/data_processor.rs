use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::types::Chunk;

const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "markdown"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_words: usize,
    pub overlap_words: usize,
    /// Texts shorter than this (in characters) produce no chunks.
    pub min_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_words: 200, overlap_words: 50, min_chars: 50 }
    }
}

#[derive(Default)]
pub struct DataProcessor {
    chunking_config: ChunkingConfig,
}

impl DataProcessor {
    pub fn new() -> Self { Self::default() }

    pub fn with_config(chunking_config: ChunkingConfig) -> Self { Self { chunking_config } }

    /// Chunk every supported file under `data_dir`. The category of a file is
    /// its parent directory relative to `data_dir`, or its stem for top-level files.
    pub fn process_directory(&self, data_dir: &Path) -> Result<Vec<Chunk>> {
        if !data_dir.is_dir() {
            return Err(Error::NotFound(format!("data directory {}", data_dir.display())));
        }
        let files = self.list_source_files(data_dir);
        if files.is_empty() {
            warn!(dir = %data_dir.display(), "no source files found");
            return Ok(vec![]);
        }
        let mut all_chunks = Vec::new();
        for file_path in &files {
            let content = self.read_file_content(file_path)?;
            let source = file_path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
            let category = self.get_category_from_path(file_path, data_dir);
            let chunks = self.chunk_text(&content, &source, &category);
            info!(file = %file_path.display(), chunks = chunks.len(), "processed file");
            all_chunks.extend(chunks);
        }
        info!(files = files.len(), chunks = all_chunks.len(), "processed directory");
        Ok(all_chunks)
    }

    /// Split `text` into overlapping word windows labelled with `category`.
    pub fn chunk_text(&self, text: &str, source: &str, category: &str) -> Vec<Chunk> {
        let text = text.trim();
        if text.chars().count() < self.chunking_config.min_chars {
            return vec![];
        }
        let source = sanitize_source_name(source);
        let words: Vec<&str> = text.split_whitespace().collect();
        let size = self.chunking_config.chunk_words.max(1);
        let step = size.saturating_sub(self.chunking_config.overlap_words).max(1);

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + size).min(words.len());
            let content = words[start..end].join(" ");
            let mut chunk = Chunk::new(content, category);
            chunk.extra.insert("source".into(), source.clone().into());
            chunk.extra.insert("chunk_id".into(), chunk_id(&source, chunks.len() + 1).into());
            chunk.extra.insert("word_count".into(), (end - start).into());
            chunk.extra.insert("char_count".into(), chunk.content.chars().count().into());
            chunks.push(chunk);
            if end >= words.len() { break; }
            start += step;
        }
        chunks
    }

    fn read_file_content(&self, file_path: &Path) -> Result<String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(_) => {
                let bytes = fs::read(file_path).map_err(|e| Error::io(file_path, e))?;
                Ok(String::from_utf8_lossy(&bytes).to_string())
            }
        }
    }

    fn get_category_from_path(&self, file_path: &Path, data_dir: &Path) -> String {
        let relative_path = file_path.strip_prefix(data_dir).unwrap_or(file_path);
        if let Some(parent) = relative_path.parent().and_then(|p| p.to_str()) {
            if !parent.is_empty() { return parent.replace('\\', "/"); }
        }
        relative_path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_else(|| "misc".to_string())
    }

    fn list_source_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
            let path = entry.path();
            let ext = path.extension().and_then(|s| s.to_str()).map(str::to_ascii_lowercase);
            if ext.is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.as_str())) { files.push(path.to_path_buf()); }
        }
        files.sort(); files
    }
}

pub fn chunk_id(source: &str, number: usize) -> String {
    format!("{source}_chunk_{number}")
}

/// Highest `n` among the `<source>_chunk_<n>` ids in `chunks`, 0 when none.
pub fn last_chunk_number(chunks: &[Chunk], source: &str) -> usize {
    let prefix = format!("{source}_chunk_");
    chunks
        .iter()
        .filter_map(|c| c.extra.get("chunk_id")?.as_str()?.strip_prefix(&prefix)?.parse::<usize>().ok())
        .max()
        .unwrap_or(0)
}

/// Keep alphanumerics, space, `-` and `_`; fall back to `unnamed_document`.
pub fn sanitize_source_name(source: &str) -> String {
    let safe: String = source.chars().filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_')).collect();
    let safe = safe.trim();
    if safe.is_empty() { "unnamed_document".to_string() } else { safe.to_string() }
}
