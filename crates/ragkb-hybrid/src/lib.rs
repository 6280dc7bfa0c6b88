//! ragkb-hybrid
//!
//! Fuses the dense and sparse rankings, applies the quality and diversity
//! filter, and owns the corpus behind the `HybridRetriever`.

pub mod filter;
pub mod fusion;
pub mod ingest;
pub mod retriever;

pub use filter::{diversify, filter, quality_pass};
pub use fusion::{fuse, FusedHit, QueryWeights};
pub use ingest::ingest_directory;
pub use retriever::HybridRetriever;
