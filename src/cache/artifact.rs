//! Content-addressed artifact store with a metadata record per artifact.
//!
//! Every artifact `<name>` in the cache directory has a sibling
//! `<name>.meta.json` holding the key it was produced for. The artifact is
//! written first and the metadata last, so a metadata record only exists for a
//! fully written artifact.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;

/// Which pipeline stage produced an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Index,
    Subgraph,
    Graph,
}

/// Inspectable record stored next to each artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub key: String,
    pub kind: ArtifactKind,
    pub source: String,
    /// Hex seed for subgraph and graph artifacts.
    pub seed: Option<String>,
    /// Object records (index, subgraph) or node statements (graph).
    pub records: usize,
    pub created_at: DateTime<Utc>,
    pub tool_version: String,
}

impl ArtifactMeta {
    pub fn new(key: impl Into<String>, kind: ArtifactKind, source: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind,
            source: source.into(),
            seed: None,
            records: 0,
            created_at: Utc::now(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = Some(seed.into());
        self
    }

    pub fn with_records(mut self, records: usize) -> Self {
        self.records = records;
        self
    }
}

/// Result of looking an artifact up under a key.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheStatus {
    /// Artifact and metadata present, key matches.
    Hit(ArtifactMeta),
    /// Artifact present but metadata missing, unreadable, or for another key.
    Stale(Option<ArtifactMeta>),
    Missing,
}

/// Artifact store rooted at one directory.
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    dir: PathBuf,
}

impl ArtifactCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn meta_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.meta.json", name))
    }

    /// Metadata for `name`, or `None` when absent or unreadable.
    pub fn read_meta(&self, name: &str) -> Option<ArtifactMeta> {
        let raw = std::fs::read_to_string(self.meta_path(name)).ok()?;
        match serde_json::from_str(&raw) {
            Ok(meta) => Some(meta),
            Err(e) => {
                log::warn!("Unreadable cache metadata for {}: {}", name, e);
                None
            }
        }
    }

    pub fn lookup(&self, name: &str, key: &str) -> CacheStatus {
        if !self.artifact_path(name).is_file() {
            return CacheStatus::Missing;
        }
        match self.read_meta(name) {
            Some(meta) if meta.key == key => CacheStatus::Hit(meta),
            other => CacheStatus::Stale(other),
        }
    }

    pub fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let raw = std::fs::read_to_string(self.artifact_path(name))?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn read_text(&self, name: &str) -> Result<String> {
        Ok(std::fs::read_to_string(self.artifact_path(name))?)
    }

    /// Persist `value` as pretty-printed JSON, then its metadata.
    pub fn store_json<T: Serialize + ?Sized>(
        &self,
        name: &str,
        value: &T,
        meta: &ArtifactMeta,
    ) -> Result<PathBuf> {
        let body = serde_json::to_string_pretty(value)?;
        self.store_text(name, &body, meta)
    }

    /// Persist `body` verbatim, then its metadata.
    pub fn store_text(&self, name: &str, body: &str, meta: &ArtifactMeta) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.artifact_path(name);
        // drop old metadata first so a crash mid-write leaves the artifact stale
        let meta_path = self.meta_path(name);
        if meta_path.exists() {
            std::fs::remove_file(&meta_path)?;
        }
        std::fs::write(&path, body)?;
        std::fs::write(&meta_path, serde_json::to_string_pretty(meta)?)?;
        log::debug!("Stored {} ({:?}, key {})", path.display(), meta.kind, meta.key);
        Ok(path)
    }
}
