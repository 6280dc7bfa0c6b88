//! Domain types shared by the dense and sparse search paths.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Position of a chunk in the corpus. Row `i` of the embedding matrix and
/// row `i` of the sparse matrix both describe chunk `i`.
pub type ChunkId = usize;
pub type Meta = serde_json::Map<String, serde_json::Value>;

/// A unit of retrievable text plus its category label.
///
/// - `content`: the text payload, immutable once loaded
/// - `category`: label used by the diversity cap
/// - `extra`: any other keys found in the metadata record (source, chunk_id, ...),
///   preserved verbatim so artifacts round-trip through load and save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub category: String,
    #[serde(flatten)]
    pub extra: Meta,
}

impl Chunk {
    pub fn new(content: impl Into<String>, category: impl Into<String>) -> Self {
        Self { content: content.into(), category: category.into(), extra: Meta::new() }
    }
}

/// Indicates which search path produced a hit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Semantic,
    Keyword,
}

impl SourceKind {
    pub fn label(self) -> &'static str {
        match self {
            SourceKind::Semantic => "semantic",
            SourceKind::Keyword => "keyword",
        }
    }
}

/// The minimal surface returned by both search paths.
///
/// `score` is path-specific (cosine for semantic, linear kernel for keyword)
/// but higher is always better.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: ChunkId,
    pub score: f32,
    pub source: SourceKind,
}

/// A single-path hit joined with its chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedChunk {
    pub id: ChunkId,
    #[serde(flatten)]
    pub chunk: Chunk,
    pub score: f32,
}

/// One entry of a hybrid search result. Created per call, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredResult {
    pub id: ChunkId,
    #[serde(flatten)]
    pub chunk: Chunk,
    pub semantic_score: f32,
    pub keyword_score: f32,
    pub similarity: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KbStats {
    pub total_chunks: usize,
    pub total_categories: usize,
    pub search_methods: BTreeSet<String>,
}
