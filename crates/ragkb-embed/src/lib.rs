//! ragkb-embed
//!
//! Dense embedding functions behind the `Embedder` trait: a candle BERT
//! sentence encoder and a deterministic hashing embedder.

use anyhow::Result;
use tracing::info;

use ragkb_core::config::{expand_path, EmbeddingBackend, EmbeddingSettings};
use ragkb_core::traits::Embedder;

pub mod device;
pub mod hashing;
pub mod model;
pub mod pool;
pub mod tokenize;

pub use hashing::HashingEmbedder;
pub use model::SentenceEmbedder;
pub use pool::masked_mean_l2;

pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    match settings.backend {
        EmbeddingBackend::Hashing => {
            info!(dim = settings.hashing_dim, "using hashing embedder");
            Ok(Box::new(HashingEmbedder::new(settings.hashing_dim)))
        }
        EmbeddingBackend::Bert => {
            let dir = expand_path(&settings.model_dir);
            Ok(Box::new(SentenceEmbedder::load(&dir, settings.max_len, settings.batch_size)?))
        }
    }
}
