//! Persisted annotation snapshots.
//!
//! The engine never talks to storage itself. Hosts implement
//! `SnapshotStore` (HTTP backend, local cache, file on disk) and hand the
//! decoded tree back to the engine.

use crate::annotation::{AnnotationNode, now_millis};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Version stamped on snapshots written by this crate.
pub const SNAPSHOT_VERSION: &str = "1.0";

fn default_version() -> String {
    SNAPSHOT_VERSION.to_string()
}

/// `{rootAnnotation, savedAt, version}` as stored by the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationSnapshot {
    pub root_annotation: AnnotationNode,
    #[serde(default = "now_millis")]
    pub saved_at: i64,
    #[serde(default = "default_version")]
    pub version: String,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("snapshot decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    #[error("snapshot I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot store unavailable: {0}")]
    Unavailable(String),
}

impl AnnotationSnapshot {
    /// Stamp a tree with the current time and version.
    pub fn capture(root: &AnnotationNode) -> Self {
        Self {
            root_annotation: root.clone(),
            saved_at: now_millis(),
            version: default_version(),
        }
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode permissively: missing `savedAt`/`version` take defaults.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Compact MessagePack encoding (named fields, so defaults still apply on decode).
    pub fn to_msgpack(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, SnapshotError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

// ─── Store trait ─────────────────────────────────────────────────────────

/// Persistence backend for snapshots.
///
/// Implemented by each host: an HTTP client, a browser cache, a file.
pub trait SnapshotStore {
    fn save(&mut self, snapshot: &AnnotationSnapshot) -> Result<(), SnapshotError>;

    /// `Ok(None)` means "nothing stored yet".
    fn load(&self) -> Result<Option<AnnotationSnapshot>, SnapshotError>;
}

/// Load from `primary`; on failure fall back to `cache`; otherwise no annotations.
pub fn load_with_fallback(
    primary: &dyn SnapshotStore,
    cache: Option<&dyn SnapshotStore>,
) -> Option<AnnotationSnapshot> {
    match primary.load() {
        Ok(snapshot) => snapshot,
        Err(err) => {
            log::warn!("primary snapshot load failed: {err}");
            match cache.map(|c| c.load()) {
                Some(Ok(snapshot)) => snapshot,
                Some(Err(cache_err)) => {
                    log::warn!("snapshot cache load failed: {cache_err}");
                    None
                }
                None => None,
            }
        }
    }
}

/// In-memory store, used as a secondary cache and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    saved: Option<AnnotationSnapshot>,
}

impl SnapshotStore for MemoryStore {
    fn save(&mut self, snapshot: &AnnotationSnapshot) -> Result<(), SnapshotError> {
        self.saved = Some(snapshot.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<AnnotationSnapshot>, SnapshotError> {
        Ok(self.saved.clone())
    }
}

/// JSON file on disk. A missing file loads as "nothing stored".
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    pub path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(&self, source: std::io::Error) -> SnapshotError {
        SnapshotError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SnapshotStore for JsonFileStore {
    fn save(&mut self, snapshot: &AnnotationSnapshot) -> Result<(), SnapshotError> {
        let json = serde_json::to_string_pretty(snapshot)?;
        std::fs::write(&self.path, json).map_err(|e| self.io_error(e))
    }

    fn load(&self) -> Result<Option<AnnotationSnapshot>, SnapshotError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(AnnotationSnapshot::from_json(&text)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }
}
