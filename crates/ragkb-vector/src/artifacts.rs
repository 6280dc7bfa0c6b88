//! On-disk corpus: `metadata.json` (chunk records) co-indexed with
//! `embeddings.npy` (one row per chunk).
//!
//! Saves go through temporary files in the target directory; the previous
//! embeddings file is kept aside until both new files are in place, so a
//! failed save leaves the old pair intact.

use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use ragkb_core::{Chunk, Error, Result};

use crate::matrix::EmbeddingMatrix;
use crate::npy;

pub const METADATA_FILE: &str = "metadata.json";
pub const EMBEDDINGS_FILE: &str = "embeddings.npy";

#[derive(Debug, Clone)]
pub struct CorpusArtifacts {
    dir: PathBuf,
}

impl CorpusArtifacts {
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

    pub fn dir(&self) -> &Path { &self.dir }
    pub fn metadata_path(&self) -> PathBuf { self.dir.join(METADATA_FILE) }
    pub fn embeddings_path(&self) -> PathBuf { self.dir.join(EMBEDDINGS_FILE) }

    pub fn exists(&self) -> bool {
        self.metadata_path().is_file() && self.embeddings_path().is_file()
    }

    /// Load both artifacts and check that their row counts agree.
    pub fn load(&self) -> Result<(Vec<Chunk>, EmbeddingMatrix)> {
        let metadata_path = self.metadata_path();
        let raw = read_artifact(&metadata_path)?;
        let chunks: Vec<Chunk> = serde_json::from_slice(&raw)
            .map_err(|e| Error::malformed(&metadata_path, e.to_string()))?;

        let embeddings_path = self.embeddings_path();
        let bytes = read_artifact(&embeddings_path)?;
        let embeddings = npy::decode(&bytes, &embeddings_path)?;

        if chunks.len() != embeddings.rows() {
            return Err(Error::RowCountMismatch { chunks: chunks.len(), rows: embeddings.rows() });
        }
        info!(dir = %self.dir.display(), chunks = chunks.len(), dim = embeddings.dim(), "loaded corpus artifacts");
        Ok((chunks, embeddings))
    }

    pub fn save(&self, chunks: &[Chunk], embeddings: &EmbeddingMatrix) -> Result<()> {
        if chunks.len() != embeddings.rows() {
            return Err(Error::RowCountMismatch { chunks: chunks.len(), rows: embeddings.rows() });
        }
        fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;

        let mut meta_tmp = NamedTempFile::new_in(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        {
            let mut w = BufWriter::new(meta_tmp.as_file_mut());
            serde_json::to_writer_pretty(&mut w, chunks)
                .map_err(|e| Error::Operation(format!("serializing metadata: {e}")))?;
            w.flush().map_err(|e| Error::io(&self.dir, e))?;
        }
        let mut emb_tmp = NamedTempFile::new_in(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        npy::encode(embeddings, BufWriter::new(emb_tmp.as_file_mut())).map_err(|e| Error::io(emb_tmp.path(), e))?;

        let embeddings_path = self.embeddings_path();
        let metadata_path = self.metadata_path();
        let backup = self.dir.join(format!("{EMBEDDINGS_FILE}.bak"));
        let had_previous = embeddings_path.is_file();
        if had_previous {
            fs::rename(&embeddings_path, &backup).map_err(|e| Error::io(&embeddings_path, e))?;
        }

        let restore = |cause: Error| -> Error {
            if had_previous {
                if let Err(e) = fs::rename(&backup, &embeddings_path) {
                    warn!(error = %e, "failed to restore previous embeddings");
                }
            } else {
                let _ = fs::remove_file(&embeddings_path);
            }
            cause
        };

        emb_tmp.persist(&embeddings_path).map_err(|e| restore(Error::io(&embeddings_path, e.error)))?;
        meta_tmp.persist(&metadata_path).map_err(|e| restore(Error::io(&metadata_path, e.error)))?;
        if had_previous {
            let _ = fs::remove_file(&backup);
        }
        info!(dir = %self.dir.display(), chunks = chunks.len(), "saved corpus artifacts");
        Ok(())
    }
}

fn read_artifact(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::NotFound(format!("corpus artifact {}", path.display())),
        _ => Error::io(path, e),
    })
}
