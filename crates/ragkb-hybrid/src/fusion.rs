//! Weighted score fusion of the semantic and keyword rankings.
//!
//! fused = w_sem * semantic + w_kw * keyword, times `consensus_boost` when
//! both paths scored the chunk above zero. Weights depend on the length of
//! the caller's original query, see [`QueryWeights::for_query`].

use std::collections::BTreeMap;

use ragkb_core::{ChunkId, FusionTunables, SearchHit, SourceKind};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryWeights {
    pub semantic: f32,
    pub keyword: f32,
}

impl QueryWeights {
    /// Short queries (by whitespace token count of the raw query) lean on
    /// exact keyword matches, longer ones on the semantic path.
    pub fn for_query(original_query: &str, tunables: &FusionTunables) -> Self {
        let tokens = original_query.split_whitespace().count();
        let w = if tokens <= tunables.short_query_max_tokens {
            tunables.short_query_weights
        } else {
            tunables.long_query_weights
        };
        Self { semantic: w.semantic, keyword: w.keyword }
    }
}

/// A chunk after fusion, still identified by position only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusedHit {
    pub id: ChunkId,
    pub semantic_score: f32,
    pub keyword_score: f32,
    pub similarity: f32,
}

impl FusedHit {
    pub fn is_consensus(&self) -> bool {
        self.semantic_score > 0.0 && self.keyword_score > 0.0
    }
}

/// Merge both result lists into one record per chunk, sorted by descending
/// fused score. Ties are broken by ascending chunk id.
pub fn fuse(
    semantic: &[SearchHit],
    keyword: &[SearchHit],
    original_query: &str,
    tunables: &FusionTunables,
) -> Vec<FusedHit> {
    let weights = QueryWeights::for_query(original_query, tunables);

    let mut scores: BTreeMap<ChunkId, (f32, f32)> = BTreeMap::new();
    for hit in semantic.iter().chain(keyword) {
        let entry = scores.entry(hit.id).or_insert((0.0, 0.0));
        match hit.source {
            SourceKind::Semantic => entry.0 = entry.0.max(hit.score),
            SourceKind::Keyword => entry.1 = entry.1.max(hit.score),
        }
    }

    let mut fused: Vec<FusedHit> = scores
        .into_iter()
        .map(|(id, (semantic_score, keyword_score))| {
            let mut hit = FusedHit {
                id,
                semantic_score,
                keyword_score,
                similarity: weights.semantic * semantic_score + weights.keyword * keyword_score,
            };
            if hit.is_consensus() {
                hit.similarity *= tunables.consensus_boost;
            }
            hit
        })
        .collect();

    // BTreeMap order is ascending id, and sort_by is stable.
    fused.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: ChunkId, score: f32, source: SourceKind) -> SearchHit {
        SearchHit { id, score, source }
    }

    #[test]
    fn weights_switch_on_token_count() {
        let t = FusionTunables::default();
        assert_eq!(QueryWeights::for_query("home dialysis options", &t), QueryWeights { semantic: 0.6, keyword: 0.4 });
        assert_eq!(QueryWeights::for_query("what are home dialysis options", &t), QueryWeights { semantic: 0.8, keyword: 0.2 });
        assert_eq!(QueryWeights::for_query("", &t), QueryWeights { semantic: 0.6, keyword: 0.4 });
    }

    #[test]
    fn consensus_chunks_get_boosted() {
        let t = FusionTunables::default();
        let semantic = [hit(0, 0.5, SourceKind::Semantic), hit(1, 0.5, SourceKind::Semantic)];
        let keyword = [hit(0, 0.5, SourceKind::Keyword)];
        let fused = fuse(&semantic, &keyword, "hd", &t);
        assert_eq!(fused[0].id, 0);
        assert!((fused[0].similarity - 0.6).abs() < 1e-6);
        assert_eq!(fused[1].id, 1);
        assert!((fused[1].similarity - 0.3).abs() < 1e-6);
        assert_eq!(fused[1].keyword_score, 0.0);
    }

    #[test]
    fn zero_semantic_score_gets_no_boost() {
        let t = FusionTunables::default();
        let semantic = [hit(2, 0.0, SourceKind::Semantic)];
        let keyword = [hit(2, 0.5, SourceKind::Keyword)];
        let fused = fuse(&semantic, &keyword, "a b", &t);
        assert!((fused[0].similarity - 0.2).abs() < 1e-6);
    }

    #[test]
    fn ties_break_by_id() {
        let t = FusionTunables::default();
        let semantic = [hit(7, 0.4, SourceKind::Semantic), hit(3, 0.4, SourceKind::Semantic)];
        let ids: Vec<_> = fuse(&semantic, &[], "x", &t).into_iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![3, 7]);
    }
}
