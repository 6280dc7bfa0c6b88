//! ragkb-text
//!
//! Keyword side of retrieval: the tantivy-based analyzer chain, the query
//! normalizer and the TF-IDF sparse index.

pub mod analyzer;
pub mod normalize;
pub mod sparse;

pub use analyzer::Analyzer;
pub use normalize::QueryNormalizer;
pub use sparse::SparseIndex;
