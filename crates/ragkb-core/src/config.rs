//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates nested keys, e.g. `APP_SEARCH__TOP_K`).

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

use crate::data_processor::ChunkingConfig;
use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(KbSettings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{key}': {e}")))
    }

    pub fn settings(&self) -> Result<KbSettings> {
        self.figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))
    }
}

/// Typed view of the whole configuration tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KbSettings {
    pub data: DataSettings,
    pub search: SearchOptions,
    pub fusion: FusionTunables,
    pub sparse: SparseSettings,
    pub normalizer: NormalizerSettings,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingConfig,
}

impl KbSettings {
    pub fn validate(&self) -> Result<()> {
        let f = &self.fusion;
        for (name, w) in [("short_query_weights", f.short_query_weights), ("long_query_weights", f.long_query_weights)] {
            if !(w.semantic >= 0.0 && w.keyword >= 0.0) {
                return Err(Error::InvalidConfig(format!("fusion.{name} must be non-negative")));
            }
        }
        if !(f.consensus_boost >= 1.0) {
            return Err(Error::InvalidConfig("fusion.consensus_boost must be >= 1.0".into()));
        }
        if f.candidate_multiplier == 0 {
            return Err(Error::InvalidConfig("fusion.candidate_multiplier must be >= 1".into()));
        }
        if !self.search.similarity_threshold.is_finite() {
            return Err(Error::InvalidConfig("search.similarity_threshold must be finite".into()));
        }
        if self.chunking.chunk_words == 0 || self.chunking.overlap_words >= self.chunking.chunk_words {
            return Err(Error::InvalidConfig(
                "chunking.overlap_words must be smaller than chunking.chunk_words".into(),
            ));
        }
        if self.sparse.max_features == 0 {
            return Err(Error::InvalidConfig("sparse.max_features must be >= 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Directory holding `metadata.json` and `embeddings.npy`.
    pub artifacts_dir: String,
    /// Directory of raw `.txt`/`.md` documents used by `ingest`.
    pub raw_dir: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { artifacts_dir: "data/embeddings".to_string(), raw_dir: "data/raw".to_string() }
    }
}

impl DataSettings {
    pub fn artifacts_path(&self) -> PathBuf {
        expand_path(&self.artifacts_dir)
    }

    pub fn raw_path(&self) -> PathBuf {
        expand_path(&self.raw_dir)
    }
}

/// Per-call search parameters, passed by value into every search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub top_k: usize,
    pub similarity_threshold: f32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { top_k: 5, similarity_threshold: 0.3 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathWeights {
    pub semantic: f32,
    pub keyword: f32,
}

/// Heuristic constants of the fusion and filtering stages.
///
/// None of these are learned. They were picked empirically on a small
/// healthcare corpus and should be re-tuned for other corpora.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionTunables {
    /// Queries with at most this many whitespace tokens use `short_query_weights`.
    pub short_query_max_tokens: usize,
    pub short_query_weights: PathWeights,
    pub long_query_weights: PathWeights,
    /// Multiplier applied when both paths scored a chunk above zero.
    pub consensus_boost: f32,
    pub backoff_step: f32,
    pub backoff_floor: f32,
    /// Fewer survivors than this triggers the threshold backoff, and the
    /// diversity cap is waived until this many results are admitted.
    pub min_results: usize,
    pub per_category_cap: usize,
    /// Each path retrieves `top_k * candidate_multiplier` candidates.
    pub candidate_multiplier: usize,
}

impl Default for FusionTunables {
    fn default() -> Self {
        Self {
            short_query_max_tokens: 3,
            short_query_weights: PathWeights { semantic: 0.6, keyword: 0.4 },
            long_query_weights: PathWeights { semantic: 0.8, keyword: 0.2 },
            consensus_boost: 1.2,
            backoff_step: 0.1,
            backoff_floor: 0.1,
            min_results: 2,
            per_category_cap: 2,
            candidate_multiplier: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SparseSettings {
    pub max_features: usize,
    pub use_bigrams: bool,
    pub l2_normalize: bool,
}

impl Default for SparseSettings {
    fn default() -> Self {
        Self { max_features: 5000, use_bigrams: true, l2_normalize: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpansionMode {
    /// `hd` becomes `hd hemodialysis`.
    Append,
    /// `hd` becomes `hemodialysis`.
    Replace,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerSettings {
    pub mode: ExpansionMode,
    pub abbreviations: BTreeMap<String, String>,
}

impl Default for NormalizerSettings {
    fn default() -> Self {
        let abbreviations = [
            ("hd", "hemodialysis"),
            ("pd", "peritoneal dialysis"),
            ("ckd", "chronic kidney disease"),
            ("esrd", "end stage renal disease"),
            ("dcc", "dialysis care center"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self { mode: ExpansionMode::Append, abbreviations }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    Bert,
    Hashing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub backend: EmbeddingBackend,
    pub model_dir: String,
    pub max_len: usize,
    pub batch_size: usize,
    pub hashing_dim: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Bert,
            model_dir: "models/all-MiniLM-L6-v2".to_string(),
            max_len: 256,
            batch_size: 32,
            hashing_dim: 384,
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
