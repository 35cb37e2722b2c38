//! File-backed pending-registration cache.
//!
//! The on-disk analogue of browser local storage: one JSON object of string
//! keys to string values. Every write replaces the file through a temp file
//! and a rename, so a crash never leaves a half-written cache behind.

use crate::config::PendingCacheConfig;
use crate::error::{AuthError, Result};
use crate::providers::PendingCache;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

type Entries = BTreeMap<String, String>;

/// Pending-registration cache persisted to a JSON file.
///
/// Clones share one lock, so read-modify-write cycles from the same process
/// never interleave. Other processes writing the same file are not
/// coordinated with.
#[derive(Debug, Clone)]
pub struct FilePendingCache {
    path: Arc<PathBuf>,
    lock: Arc<Mutex<()>>,
}

impl FilePendingCache {
    /// Use the file at `path`. It is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Use the file named in configuration.
    #[must_use]
    pub fn from_config(config: &PendingCacheConfig) -> Self {
        Self::new(config.path.clone())
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_entries(&self) -> Result<Entries> {
        match tokio::fs::read(self.path.as_path()).await {
            Ok(bytes) if bytes.is_empty() => Ok(Entries::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                AuthError::CacheError(format!("{} is not a JSON object: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(io_error(&self.path, &e)),
        }
    }

    async fn write_entries(&self, entries: &Entries) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, &e))?;
        }

        let bytes = serde_json::to_vec_pretty(entries)
            .map_err(|e| AuthError::CacheError(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| io_error(&tmp, &e))?;
        tokio::fs::rename(&tmp, self.path.as_path())
            .await
            .map_err(|e| io_error(&self.path, &e))
    }

    async fn update<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut Entries) -> bool + Send,
    {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_entries().await?;
        if change(&mut entries) {
            self.write_entries(&entries).await?;
        }
        Ok(())
    }
}

fn io_error(path: &Path, error: &std::io::Error) -> AuthError {
    AuthError::CacheError(format!("{}: {error}", path.display()))
}

impl PendingCache for FilePendingCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_entries().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        tracing::trace!(key, path = %self.path.display(), "Caching pending registration field");
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.update(|entries| entries.remove(key).is_some()).await
    }
}
