//! ragkb-vector
//!
//! Dense side of retrieval: the embedding matrix, its `.npy` codec, the
//! brute-force cosine index and the on-disk corpus artifacts.

pub mod artifacts;
pub mod dense;
pub mod matrix;
pub mod npy;

pub use artifacts::CorpusArtifacts;
pub use dense::{cosine_similarity, DenseIndex};
pub use matrix::EmbeddingMatrix;
