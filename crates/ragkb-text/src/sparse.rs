//! TF-IDF keyword index over the in-memory corpus.
//!
//! The vocabulary (unigrams and, optionally, bigrams of adjacent non-stop-word
//! tokens) is fitted once over all chunk contents and capped at
//! `max_features` terms by total corpus frequency. Weights are raw term counts
//! times the smoothed idf `ln((1 + n) / (1 + df)) + 1`, L2-normalised per row.
//! Queries go through the same vocabulary; unknown terms contribute nothing.
//!
//! Similarity is the linear kernel (plain dot product), not a cosine, so rows
//! are compared exactly as they were weighted at fit time.

use std::collections::HashMap;
use tracing::{debug, info};

use ragkb_core::config::SparseSettings;
use ragkb_core::{ChunkId, SearchHit, SourceKind};

use crate::analyzer::Analyzer;

type TermId = usize;

#[derive(Clone)]
pub struct SparseIndex {
    analyzer: Analyzer,
    settings: SparseSettings,
    vocabulary: HashMap<String, TermId>,
    idf: Vec<f32>,
    /// Inverted rows: for each term, `(chunk, weight)` in ascending chunk order.
    postings: Vec<Vec<(ChunkId, f32)>>,
    num_docs: usize,
}

impl SparseIndex {
    pub fn fit<S: AsRef<str>>(documents: &[S], settings: SparseSettings) -> Self {
        let analyzer = Analyzer::default();
        let num_docs = documents.len();

        let doc_counts: Vec<HashMap<String, u32>> = documents
            .iter()
            .map(|d| count_terms(extract_terms(&analyzer, d.as_ref(), settings.use_bigrams)))
            .collect();

        let mut df: HashMap<&str, u32> = HashMap::new();
        let mut total: HashMap<&str, u64> = HashMap::new();
        for counts in &doc_counts {
            for (term, &c) in counts {
                *df.entry(term.as_str()).or_default() += 1;
                *total.entry(term.as_str()).or_default() += u64::from(c);
            }
        }

        let mut terms: Vec<&str> = df.keys().copied().collect();
        if terms.len() > settings.max_features {
            terms.sort_by(|a, b| total[b].cmp(&total[a]).then_with(|| a.cmp(b)));
            terms.truncate(settings.max_features);
        }
        terms.sort_unstable();

        let vocabulary: HashMap<String, TermId> =
            terms.iter().enumerate().map(|(i, t)| ((*t).to_string(), i)).collect();
        let idf: Vec<f32> = terms.iter().map(|t| smooth_idf(num_docs, df[t])).collect();

        let mut postings: Vec<Vec<(ChunkId, f32)>> = vec![Vec::new(); terms.len()];
        for (doc, counts) in doc_counts.iter().enumerate() {
            let row = weigh(counts, &vocabulary, &idf, settings.l2_normalize);
            for (term, w) in row {
                postings[term].push((doc, w));
            }
        }

        info!(docs = num_docs, vocabulary = terms.len(), "fitted sparse index");
        Self { analyzer, settings, vocabulary, idf, postings, num_docs }
    }

    pub fn vocabulary_size(&self) -> usize { self.vocabulary.len() }

    pub fn num_docs(&self) -> usize { self.num_docs }

    pub fn contains_term(&self, term: &str) -> bool { self.vocabulary.contains_key(term) }

    /// Project `text` into the fitted vector space, sorted by term id.
    pub fn transform(&self, text: &str) -> Vec<(TermId, f32)> {
        let counts = count_terms(extract_terms(&self.analyzer, text, self.settings.use_bigrams));
        weigh(&counts, &self.vocabulary, &self.idf, self.settings.l2_normalize)
    }

    /// Chunks with a strictly positive linear-kernel score, best first.
    /// Ties keep corpus order.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<SearchHit> {
        if top_k == 0 || self.num_docs == 0 { return vec![]; }
        let q = self.transform(query);
        if q.is_empty() {
            debug!("query has no in-vocabulary terms");
            return vec![];
        }
        let mut scores = vec![0f32; self.num_docs];
        for (term, qw) in q {
            for &(doc, w) in &self.postings[term] {
                scores[doc] += qw * w;
            }
        }
        let mut hits: Vec<SearchHit> = scores
            .into_iter()
            .enumerate()
            .filter(|&(_, s)| s > 0.0)
            .map(|(id, score)| SearchHit { id, score, source: SourceKind::Keyword })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);
        hits
    }
}

fn smooth_idf(num_docs: usize, df: u32) -> f32 {
    (((1 + num_docs) as f32) / ((1 + df) as f32)).ln() + 1.0
}

fn extract_terms(analyzer: &Analyzer, text: &str, use_bigrams: bool) -> Vec<String> {
    let tokens = analyzer.tokens(text);
    let mut terms = tokens.clone();
    if use_bigrams {
        terms.extend(tokens.windows(2).map(|w| format!("{} {}", w[0], w[1])));
    }
    terms
}

fn count_terms(terms: Vec<String>) -> HashMap<String, u32> {
    let mut counts = HashMap::new();
    for t in terms { *counts.entry(t).or_default() += 1; }
    counts
}

fn weigh(
    counts: &HashMap<String, u32>,
    vocabulary: &HashMap<String, TermId>,
    idf: &[f32],
    l2_normalize: bool,
) -> Vec<(TermId, f32)> {
    let mut row: Vec<(TermId, f32)> = counts
        .iter()
        .filter_map(|(term, &c)| vocabulary.get(term).map(|&t| (t, c as f32 * idf[t])))
        .collect();
    // Fixed summation order keeps the norm bit-identical across calls.
    row.sort_unstable_by_key(|&(t, _)| t);
    if l2_normalize {
        let norm = row.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        if norm > 0.0 {
            for (_, w) in &mut row { *w /= norm; }
        }
    }
    row
}
