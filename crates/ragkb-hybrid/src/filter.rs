//! Quality threshold with backoff, then a per-category diversity cap.

use std::collections::HashMap;
use tracing::debug;

use ragkb_core::{FusionTunables, ScoredResult};

/// Keep results with `similarity >= threshold`. When fewer than
/// `min_results` survive a non-empty input, retry once at
/// `max(backoff_floor, threshold - backoff_step)`.
///
/// Returns the survivors and the threshold actually applied.
pub fn quality_pass(
    results: Vec<ScoredResult>,
    threshold: f32,
    tunables: &FusionTunables,
) -> (Vec<ScoredResult>, f32) {
    let survivors = results.iter().filter(|r| r.similarity >= threshold).count();
    let effective = if survivors < tunables.min_results && !results.is_empty() {
        let relaxed = (threshold - tunables.backoff_step).max(tunables.backoff_floor);
        debug!(threshold, relaxed, survivors, "backing off similarity threshold");
        relaxed
    } else {
        threshold
    };
    let kept = results.into_iter().filter(|r| r.similarity >= effective).collect();
    (kept, effective)
}

/// Walk score-ordered results admitting at most `per_category_cap` per
/// category, except that the first `min_results` admissions ignore the cap.
pub fn diversify(results: Vec<ScoredResult>, top_k: usize, tunables: &FusionTunables) -> Vec<ScoredResult> {
    let mut per_category: HashMap<String, usize> = HashMap::new();
    let mut admitted = Vec::with_capacity(top_k.min(results.len()));
    for r in results {
        if admitted.len() >= top_k { break; }
        let seen = per_category.get(&r.chunk.category).copied().unwrap_or(0);
        if seen < tunables.per_category_cap || admitted.len() < tunables.min_results {
            *per_category.entry(r.chunk.category.clone()).or_default() += 1;
            admitted.push(r);
        }
    }
    admitted
}

/// `quality_pass` followed by `diversify`. Input must already be sorted by
/// descending similarity; the output keeps that order and has at most `top_k` entries.
pub fn filter(
    fused: Vec<ScoredResult>,
    threshold: f32,
    top_k: usize,
    tunables: &FusionTunables,
) -> Vec<ScoredResult> {
    let (kept, _) = quality_pass(fused, threshold, tunables);
    diversify(kept, top_k, tunables)
}
