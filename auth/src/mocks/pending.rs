//! Mock pending-registration cache for testing.

use crate::error::{AuthError, Result};
use crate::providers::PendingCache;
use crate::stores::MemoryPendingCache;
use std::future::Future;
use std::sync::{Arc, Mutex};

/// Pending-registration cache that can be told to fail.
///
/// Delegates to a [`MemoryPendingCache`] while healthy.
#[derive(Debug, Clone, Default)]
pub struct MockPendingCache {
    entries: MemoryPendingCache,
    failure: Arc<Mutex<Option<AuthError>>>,
}

impl MockPendingCache {
    /// Create an empty, healthy cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail with `error`.
    pub fn fail_with(&self, error: AuthError) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = Some(error);
        }
    }

    /// Number of keys held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if no key is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check(&self) -> Result<()> {
        self.failure
            .lock()
            .map_err(|_| AuthError::CacheError("mock cache lock poisoned".to_string()))?
            .clone()
            .map_or(Ok(()), Err)
    }
}

impl PendingCache for MockPendingCache {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send {
        let checked = self.check();
        let read = self.entries.get(key);
        async move {
            checked?;
            read.await
        }
    }

    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<()>> + Send {
        let checked = self.check();
        let write = self.entries.set(key, value);
        async move {
            checked?;
            write.await
        }
    }

    fn remove(&self, key: &str) -> impl Future<Output = Result<()>> + Send {
        let checked = self.check();
        let write = self.entries.remove(key);
        async move {
            checked?;
            write.await
        }
    }
}
