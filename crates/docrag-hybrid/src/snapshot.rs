//! On-disk snapshots of an index generation.
//!
//! A snapshot is a directory `<root>/<name>/` holding `payload.json` (chunks,
//! tokens, vectors in chunk order) and `manifest.json` (format version,
//! counts, blake3 of the payload). The manifest is written last, so a
//! directory without one is an interrupted save. Both files are written to a
//! temp file and renamed into place.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use docrag_core::types::DocumentChunk;
use docrag_core::{Error, Result};

use crate::generation::IndexGeneration;

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;
const MANIFEST_FILE: &str = "manifest.json";
const PAYLOAD_FILE: &str = "payload.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub format_version: u32,
    pub generation: u64,
    pub embedder_id: String,
    pub dim: Option<usize>,
    pub chunk_count: usize,
    pub payload_blake3: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct SnapshotPayload {
    chunks: Vec<DocumentChunk>,
    tokens: Vec<Vec<String>>,
    vectors: Vec<Vec<f32>>,
}

pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

    pub fn root(&self) -> &Path { &self.root }

    pub fn dir(&self, name: &str) -> Result<PathBuf> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(|c: char| c == '/' || c == '\\');
        if !valid { return Err(Error::InvalidInput(format!("invalid snapshot name '{}'", name))); }
        Ok(self.root.join(name))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.dir(name).map(|d| d.join(MANIFEST_FILE).is_file()).unwrap_or(false)
    }

    pub fn save(&self, name: &str, generation: &IndexGeneration) -> Result<SnapshotManifest> {
        let dir = self.dir(name)?;
        fs::create_dir_all(&dir)?;
        let payload = SnapshotPayload {
            chunks: generation.chunks().to_vec(),
            tokens: generation.tokens().to_vec(),
            vectors: generation.vectors(),
        };
        let payload_bytes = serde_json::to_vec(&payload).map_err(|e| Error::Operation(format!("encode snapshot: {}", e)))?;
        let manifest = SnapshotManifest {
            format_version: SNAPSHOT_FORMAT_VERSION,
            generation: generation.id(),
            embedder_id: generation.embedder_id().to_string(),
            dim: generation.dense().dim(),
            chunk_count: generation.len(),
            payload_blake3: blake3::hash(&payload_bytes).to_hex().to_string(),
            created_at: Utc::now(),
        };
        let manifest_bytes =
            serde_json::to_vec_pretty(&manifest).map_err(|e| Error::Operation(format!("encode manifest: {}", e)))?;

        // An overwrite must not leave a new payload next to an old manifest.
        let manifest_path = dir.join(MANIFEST_FILE);
        if manifest_path.exists() { fs::remove_file(&manifest_path)?; }
        write_atomic(&dir, &dir.join(PAYLOAD_FILE), &payload_bytes)?;
        write_atomic(&dir, &manifest_path, &manifest_bytes)?;
        info!(snapshot = %dir.display(), chunks = manifest.chunk_count, "snapshot saved");
        Ok(manifest)
    }

    pub fn manifest(&self, name: &str) -> Result<SnapshotManifest> {
        let path = self.dir(name)?.join(MANIFEST_FILE);
        if !path.is_file() { return Err(Error::NotFound(format!("snapshot manifest {}", path.display()))); }
        let bytes = fs::read(&path)?;
        serde_json::from_slice(&bytes).map_err(|e| Error::MalformedSnapshot(format!("manifest: {}", e)))
    }

    /// Read a snapshot back into a generation. A missing snapshot is
    /// `NotFound`; anything truncated, tampered with or from another format
    /// version is `MalformedSnapshot`.
    pub fn load(&self, name: &str) -> Result<IndexGeneration> {
        let dir = self.dir(name)?;
        let manifest = self.manifest(name)?;
        if manifest.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(Error::MalformedSnapshot(format!(
                "format version {} (expected {})",
                manifest.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }
        let payload_bytes = fs::read(dir.join(PAYLOAD_FILE))
            .map_err(|e| Error::MalformedSnapshot(format!("payload unreadable: {}", e)))?;
        let checksum = blake3::hash(&payload_bytes).to_hex().to_string();
        if checksum != manifest.payload_blake3 {
            return Err(Error::MalformedSnapshot("payload checksum mismatch".into()));
        }
        let payload: SnapshotPayload =
            serde_json::from_slice(&payload_bytes).map_err(|e| Error::MalformedSnapshot(format!("payload: {}", e)))?;
        if payload.chunks.len() != manifest.chunk_count || payload.tokens.len() != payload.chunks.len() {
            return Err(Error::MalformedSnapshot(format!(
                "manifest lists {} chunks, payload has {} chunks and {} token lists",
                manifest.chunk_count,
                payload.chunks.len(),
                payload.tokens.len()
            )));
        }
        let generation = IndexGeneration::from_parts(
            manifest.generation,
            manifest.embedder_id.clone(),
            manifest.dim,
            payload.chunks,
            payload.vectors,
        )
        .map_err(|e| Error::MalformedSnapshot(e.to_string()))?;
        if generation.tokens() != payload.tokens.as_slice() {
            warn!(snapshot = %dir.display(), "stored tokens differ from current tokenizer output; using current");
        }
        info!(snapshot = %dir.display(), chunks = generation.len(), generation = generation.id(), "snapshot loaded");
        Ok(generation)
    }
}

fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
