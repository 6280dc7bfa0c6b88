#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod data_processor;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{Config, FusionTunables, KbSettings, SearchOptions};
pub use error::{Error, Result};
pub use types::{Chunk, ChunkId, KbStats, RankedChunk, ScoredResult, SearchHit, SourceKind};
