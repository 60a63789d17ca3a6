// State cache. The updater persists its snapshot after each cycle and
// restores it on startup so a restart does not lose device history
// (first_seen, offline devices still inside the activity window).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PersistError;
use crate::model::RouterState;

/// Envelope written to the cache: the snapshot plus when it was taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredState {
    pub saved_at: DateTime<Utc>,
    pub state: RouterState,
}

/// Blob store for per-router state, keyed by a stable string. The
/// updater keys by its entry id.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, PersistError>;
    async fn save(&self, key: &str, bytes: &[u8]) -> Result<(), PersistError>;
    async fn remove(&self, key: &str) -> Result<(), PersistError>;
}

// ── File-backed store ────────────────────────────────────────────────

/// One JSON file per router under a spool directory.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Keys are addresses or user-chosen ids; anything that is not a
    /// portable file name character maps to '_'.
    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

#[async_trait]
impl CacheStore for FileCache {
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, PersistError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, key: &str, bytes: &[u8]) -> Result<(), PersistError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(key);
        // Write-then-rename keeps readers off half-written blobs.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(path = %path.display(), "state persisted");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PersistError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

// ── In-memory store ──────────────────────────────────────────────────

/// Keeps blobs in a map. For tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, PersistError> {
        let entries = self.entries.lock().expect("cache lock poisoned");
        Ok(entries.get(key).cloned())
    }

    async fn save(&self, key: &str, bytes: &[u8]) -> Result<(), PersistError> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.insert(key.to_owned(), bytes.to_vec());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PersistError> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.remove(key);
        Ok(())
    }
}
