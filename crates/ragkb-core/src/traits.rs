use crate::config::SearchOptions;
use crate::types::{KbStats, ScoredResult};

/// The single embedding function shared by the corpus and by queries.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}

pub trait SearchEngine: Send + Sync {
    fn search(&self, query: &str, options: SearchOptions) -> crate::Result<Vec<ScoredResult>>;
    fn stats(&self) -> crate::Result<KbStats>;
}
