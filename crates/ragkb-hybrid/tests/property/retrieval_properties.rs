use std::collections::HashMap;

use proptest::prelude::*;
use ragkb_core::config::KbSettings;
use ragkb_core::traits::Embedder;
use ragkb_core::{Chunk, FusionTunables, ScoredResult, SearchHit, SearchOptions, SourceKind};
use ragkb_embed::HashingEmbedder;
use ragkb_hybrid::{diversify, filter, fuse, quality_pass, HybridRetriever};
use ragkb_vector::EmbeddingMatrix;

const WORDS: &[&str] = &[
    "home", "dialysis", "hemodialysis", "peritoneal", "kidney", "diet", "potassium", "fistula",
    "catheter", "nurse", "schedule", "contact", "phone", "insurance", "transplant", "fluid",
];

fn sentence() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(WORDS), 1..8).prop_map(|w| w.join(" "))
}

fn hits(source: SourceKind) -> impl Strategy<Value = Vec<SearchHit>> {
    prop::collection::btree_map(0usize..40, 0.0f32..1.0, 0..20).prop_map(move |m| {
        m.into_iter().map(|(id, score)| SearchHit { id, score, source }).collect()
    })
}

fn scored() -> impl Strategy<Value = Vec<ScoredResult>> {
    prop::collection::vec((0usize..4, 0.0f32..1.0), 0..25).prop_map(|rows| {
        let mut out: Vec<ScoredResult> = rows
            .into_iter()
            .enumerate()
            .map(|(id, (cat, similarity))| ScoredResult {
                id,
                chunk: Chunk::new(format!("chunk {id}"), format!("cat{cat}")),
                semantic_score: similarity,
                keyword_score: 0.0,
                similarity,
            })
            .collect();
        out.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        out
    })
}

fn retriever(docs: &[String]) -> HybridRetriever {
    let embedder = HashingEmbedder::new(32);
    let chunks: Vec<Chunk> = docs.iter().enumerate().map(|(i, d)| Chunk::new(d.clone(), format!("cat{}", i % 3))).collect();
    let rows = embedder.embed_batch(docs).unwrap();
    let matrix = EmbeddingMatrix::from_rows(rows, 32).unwrap();
    HybridRetriever::new(chunks, matrix, Box::new(embedder), KbSettings::default()).unwrap()
}

proptest! {
    #[test]
    fn fused_output_is_sorted_and_unique(sem in hits(SourceKind::Semantic), kw in hits(SourceKind::Keyword), q in sentence()) {
        let fused = fuse(&sem, &kw, &q, &FusionTunables::default());
        prop_assert!(fused.windows(2).all(|w| w[0].similarity >= w[1].similarity));
        let mut ids: Vec<_> = fused.iter().map(|h| h.id).collect();
        ids.sort_unstable();
        ids.dedup();
        prop_assert_eq!(ids.len(), fused.len());
    }

    #[test]
    fn consensus_never_lowers_the_weighted_sum(sem in hits(SourceKind::Semantic), kw in hits(SourceKind::Keyword), q in sentence()) {
        let t = FusionTunables::default();
        let w = if q.split_whitespace().count() <= t.short_query_max_tokens {
            t.short_query_weights
        } else {
            t.long_query_weights
        };
        for h in fuse(&sem, &kw, &q, &t) {
            let weighted = w.semantic * h.semantic_score + w.keyword * h.keyword_score;
            prop_assert!(h.similarity >= w.semantic * h.semantic_score - 1e-6);
            prop_assert!(h.similarity >= weighted - 1e-6);
            if !h.is_consensus() {
                prop_assert!((h.similarity - weighted).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn short_queries_give_keywords_more_weight(semantic in 0.0f32..1.0, keyword in 0.0f32..1.0) {
        prop_assume!(keyword > semantic);
        let t = FusionTunables::default();
        let sem = [SearchHit { id: 0, score: semantic, source: SourceKind::Semantic }];
        let kw = [SearchHit { id: 0, score: keyword, source: SourceKind::Keyword }];
        let short = fuse(&sem, &kw, "home dialysis", &t)[0].similarity;
        let long = fuse(&sem, &kw, "what are the home dialysis options", &t)[0].similarity;
        prop_assert!(short >= long - 1e-6);
    }

    #[test]
    fn backoff_threshold_is_relaxed_by_one_step(results in scored(), threshold in 0.0f32..1.0) {
        let t = FusionTunables::default();
        let passing = results.iter().filter(|r| r.similarity >= threshold).count();
        let was_empty = results.is_empty();
        let (kept, effective) = quality_pass(results, threshold, &t);
        if passing < t.min_results && !was_empty {
            prop_assert_eq!(effective, (threshold - t.backoff_step).max(t.backoff_floor));
        } else {
            prop_assert_eq!(effective, threshold);
        }
        prop_assert!(kept.iter().all(|r| r.similarity >= effective));
    }

    #[test]
    fn diversity_cap_holds(results in scored(), top_k in 0usize..10) {
        let t = FusionTunables::default();
        let out = diversify(results, top_k, &t);
        prop_assert!(out.len() <= top_k);
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for r in &out {
            *counts.entry(r.chunk.category.as_str()).or_default() += 1;
        }
        prop_assert!(counts.values().all(|&c| c <= t.per_category_cap.max(t.min_results)));
        prop_assert!(out.windows(2).all(|w| w[0].similarity >= w[1].similarity));
    }

    #[test]
    fn filter_respects_top_k(results in scored(), threshold in 0.0f32..1.0, top_k in 0usize..10) {
        prop_assert!(filter(results, threshold, top_k, &FusionTunables::default()).len() <= top_k);
    }

    #[test]
    fn search_is_bounded_sorted_and_repeatable(
        docs in prop::collection::vec(sentence(), 1..12),
        q in sentence(),
        top_k in 0usize..6,
    ) {
        let r = retriever(&docs);
        let opts = SearchOptions { top_k, similarity_threshold: 0.3 };
        let first = r.search(&q, opts).unwrap();
        prop_assert!(first.len() <= top_k);
        prop_assert!(first.windows(2).all(|w| w[0].similarity >= w[1].similarity));
        prop_assert_eq!(r.search(&q, opts).unwrap(), first);

        let semantic = r.semantic_search(&q, docs.len()).unwrap();
        prop_assert!(semantic.windows(2).all(|w| w[0].score >= w[1].score));
        let keyword = r.keyword_search(&q, docs.len()).unwrap();
        prop_assert!(keyword.windows(2).all(|w| w[0].score >= w[1].score));
        prop_assert!(keyword.iter().all(|k| k.score > 0.0));
    }
}
