//! In-memory pending-registration cache.

use crate::error::{AuthError, Result};
use crate::providers::PendingCache;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

/// Pending-registration cache kept in process memory.
///
/// Clones share the same map, which stands in for one browser profile's
/// local storage. Contents do not survive a restart; use
/// [`FilePendingCache`](super::FilePendingCache) where a reload must be
/// survived.
#[derive(Debug, Clone, Default)]
pub struct MemoryPendingCache {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryPendingCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    /// `true` if no key is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> AuthError {
    AuthError::CacheError("pending cache lock poisoned".to_string())
}

impl PendingCache for MemoryPendingCache {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send {
        let entries = Arc::clone(&self.entries);
        let key = key.to_string();

        async move {
            Ok(entries.lock().map_err(|_| poisoned())?.get(&key).cloned())
        }
    }

    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<()>> + Send {
        let entries = Arc::clone(&self.entries);
        let key = key.to_string();
        let value = value.to_string();

        async move {
            entries.lock().map_err(|_| poisoned())?.insert(key, value);
            Ok(())
        }
    }

    fn remove(&self, key: &str) -> impl Future<Output = Result<()>> + Send {
        let entries = Arc::clone(&self.entries);
        let key = key.to_string();

        async move {
            entries.lock().map_err(|_| poisoned())?.remove(&key);
            Ok(())
        }
    }
}
