//! The hybrid retriever: owns the corpus and runs
//! normalize -> {dense, sparse} -> fuse -> filter.
//!
//! A retriever only exists once its corpus has loaded; construction errors
//! are fatal and there is no partially-initialised state. Searches share a
//! read lock on the corpus, `add_document` takes the write lock.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

use ragkb_core::config::KbSettings;
use ragkb_core::data_processor::{chunk_id, last_chunk_number, sanitize_source_name, DataProcessor};
use ragkb_core::traits::{Embedder, SearchEngine};
use ragkb_core::{Chunk, Error, KbStats, RankedChunk, Result, ScoredResult, SearchHit, SearchOptions, SourceKind};
use ragkb_text::{QueryNormalizer, SparseIndex};
use ragkb_vector::{CorpusArtifacts, DenseIndex, EmbeddingMatrix};

use crate::filter;
use crate::fusion::fuse;

struct Corpus {
    chunks: Vec<Chunk>,
    dense: DenseIndex,
    sparse: SparseIndex,
}

impl Corpus {
    fn ranked(&self, hits: Vec<SearchHit>) -> Vec<RankedChunk> {
        hits.into_iter()
            .filter_map(|h| self.chunks.get(h.id).map(|c| RankedChunk { id: h.id, chunk: c.clone(), score: h.score }))
            .collect()
    }
}

pub struct HybridRetriever {
    corpus: RwLock<Corpus>,
    embedder: Box<dyn Embedder>,
    normalizer: QueryNormalizer,
    settings: KbSettings,
    artifacts: Option<CorpusArtifacts>,
}

impl HybridRetriever {
    /// Build a retriever over an in-memory corpus. Row `i` of `embeddings`
    /// must be the embedding of `chunks[i]`.
    pub fn new(
        chunks: Vec<Chunk>,
        embeddings: EmbeddingMatrix,
        embedder: Box<dyn Embedder>,
        settings: KbSettings,
    ) -> Result<Self> {
        settings.validate()?;
        if chunks.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        if chunks.len() != embeddings.rows() {
            return Err(Error::RowCountMismatch { chunks: chunks.len(), rows: embeddings.rows() });
        }
        if embeddings.dim() != embedder.dim() {
            return Err(Error::DimensionMismatch { expected: embedder.dim(), actual: embeddings.dim() });
        }

        let normalizer = QueryNormalizer::new(&settings.normalizer)?;
        let sparse = SparseIndex::fit(&contents(&chunks), settings.sparse);
        let dense = DenseIndex::new(embeddings);
        info!(
            chunks = chunks.len(),
            dim = dense.dim(),
            vocabulary = sparse.vocabulary_size(),
            "hybrid retriever ready"
        );
        Ok(Self {
            corpus: RwLock::new(Corpus { chunks, dense, sparse }),
            embedder,
            normalizer,
            settings,
            artifacts: None,
        })
    }

    /// Load `metadata.json` + `embeddings.npy` from `dir`. Documents added
    /// later are persisted back to the same directory.
    pub fn from_artifacts(dir: &Path, embedder: Box<dyn Embedder>, settings: KbSettings) -> Result<Self> {
        let artifacts = CorpusArtifacts::new(dir);
        let (chunks, embeddings) = artifacts.load()?;
        let mut retriever = Self::new(chunks, embeddings, embedder, settings)?;
        retriever.artifacts = Some(artifacts);
        Ok(retriever)
    }

    pub fn settings(&self) -> &KbSettings { &self.settings }

    /// Hybrid search. Empty queries and `top_k == 0` return no results;
    /// nothing clearing the quality bar is also an empty list, not an error.
    pub fn search(&self, query: &str, options: SearchOptions) -> Result<Vec<ScoredResult>> {
        if query.trim().is_empty() || options.top_k == 0 {
            return Ok(vec![]);
        }
        let tunables = &self.settings.fusion;
        let normalized = self.normalizer.normalize(query);
        let query_vec = self.embedder.embed(&normalized).map_err(Error::Embedding)?;
        let candidates = options.top_k.saturating_mul(tunables.candidate_multiplier);

        let fused = {
            let corpus = self.read()?;
            let semantic = corpus.dense.search_vec(&query_vec, candidates)?;
            let keyword = corpus.sparse.search(&normalized, candidates);
            debug!(semantic = semantic.len(), keyword = keyword.len(), "candidates gathered");
            fuse(&semantic, &keyword, query, tunables)
                .into_iter()
                .filter_map(|h| {
                    corpus.chunks.get(h.id).map(|c| ScoredResult {
                        id: h.id,
                        chunk: c.clone(),
                        semantic_score: h.semantic_score,
                        keyword_score: h.keyword_score,
                        similarity: h.similarity,
                    })
                })
                .collect::<Vec<_>>()
        };

        let fused_len = fused.len();
        let (kept, effective_threshold) = filter::quality_pass(fused, options.similarity_threshold, tunables);
        let results = filter::diversify(kept, options.top_k, tunables);
        debug!(query = %normalized, fused = fused_len, effective_threshold, returned = results.len(), "hybrid search");
        Ok(results)
    }

    /// Dense path only, best first.
    pub fn semantic_search(&self, query: &str, top_k: usize) -> Result<Vec<RankedChunk>> {
        if query.trim().is_empty() || top_k == 0 {
            return Ok(vec![]);
        }
        let normalized = self.normalizer.normalize(query);
        let query_vec = self.embedder.embed(&normalized).map_err(Error::Embedding)?;
        let corpus = self.read()?;
        let hits = corpus.dense.search_vec(&query_vec, top_k)?;
        Ok(corpus.ranked(hits))
    }

    /// Sparse path only, best first. Only strictly positive scores are returned.
    pub fn keyword_search(&self, query: &str, top_k: usize) -> Result<Vec<RankedChunk>> {
        if query.trim().is_empty() || top_k == 0 {
            return Ok(vec![]);
        }
        let normalized = self.normalizer.normalize(query);
        let corpus = self.read()?;
        let hits = corpus.sparse.search(&normalized, top_k);
        Ok(corpus.ranked(hits))
    }

    pub fn stats(&self) -> Result<KbStats> {
        let corpus = self.read()?;
        let categories: BTreeSet<&str> = corpus.chunks.iter().map(|c| c.category.as_str()).collect();
        Ok(KbStats {
            total_chunks: corpus.chunks.len(),
            total_categories: categories.len(),
            search_methods: [SourceKind::Keyword, SourceKind::Semantic]
                .into_iter()
                .map(|s| s.label().to_string())
                .collect(),
        })
    }

    /// Chunk `text`, embed it and append it to the corpus under the label
    /// `source`. Returns the number of chunks added.
    ///
    /// When the retriever was loaded from disk, the combined artifacts are
    /// saved before memory is touched; a failed save leaves both unchanged.
    pub fn add_document(&self, text: &str, source: &str) -> Result<usize> {
        if text.trim().is_empty() {
            return Err(Error::Operation("no content provided".into()));
        }
        let source = sanitize_source_name(source);
        let chunker = DataProcessor::with_config(self.settings.chunking.clone());
        let new_chunks = chunker.chunk_text(text, &source, &source);
        if new_chunks.is_empty() {
            return Err(Error::Operation("no chunks were created from the document".into()));
        }

        let vectors = self.embedder.embed_batch(&contents(&new_chunks)).map_err(Error::Embedding)?;
        let new_rows = EmbeddingMatrix::from_rows(vectors, self.embedder.dim())?;
        if new_rows.rows() != new_chunks.len() {
            return Err(Error::RowCountMismatch { chunks: new_chunks.len(), rows: new_rows.rows() });
        }

        let mut corpus = self.write()?;
        // Chunk numbering continues after earlier additions from the same source.
        let offset = last_chunk_number(&corpus.chunks, &source);
        let mut chunks = corpus.chunks.clone();
        chunks.extend(new_chunks.into_iter().enumerate().map(|(i, mut chunk)| {
            chunk.extra.insert("chunk_id".into(), chunk_id(&source, offset + i + 1).into());
            chunk
        }));
        if let Some(artifacts) = &self.artifacts {
            let mut matrix = corpus.dense.matrix().clone();
            matrix.extend(&new_rows)?;
            artifacts.save(&chunks, &matrix)?;
            debug!(dir = %artifacts.dir().display(), "persisted added chunks");
        }
        corpus.dense.append(&new_rows)?;
        corpus.sparse = SparseIndex::fit(&contents(&chunks), self.settings.sparse);
        corpus.chunks = chunks;

        let added = new_rows.rows();
        info!(source = %source, added, total = corpus.dense.len(), "document added");
        Ok(added)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Corpus>> {
        self.corpus.read().map_err(|_| Error::Operation("corpus lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Corpus>> {
        self.corpus.write().map_err(|_| Error::Operation("corpus lock poisoned".into()))
    }
}

impl SearchEngine for HybridRetriever {
    fn search(&self, query: &str, options: SearchOptions) -> Result<Vec<ScoredResult>> {
        Self::search(self, query, options)
    }

    fn stats(&self) -> Result<KbStats> { Self::stats(self) }
}

fn contents(chunks: &[Chunk]) -> Vec<String> {
    chunks.iter().map(|c| c.content.clone()).collect()
}
