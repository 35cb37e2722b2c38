//! Mock profile store for testing.

use crate::error::{AuthError, Result};
use crate::providers::ProfileStore;
use crate::state::ProfileRecord;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Mock profile store.
///
/// Uses in-memory storage and counts reads and writes, so tests can assert
/// exactly how often reconciliation touched the store.
#[derive(Debug, Clone, Default)]
pub struct MockProfileStore {
    records: Arc<Mutex<HashMap<String, ProfileRecord>>>,
    reads: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
    failure: Arc<Mutex<Option<AuthError>>>,
    write_failure: Arc<Mutex<Option<AuthError>>>,
}

impl MockProfileStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record without counting it as a write.
    #[must_use]
    pub fn with_record(self, record: ProfileRecord) -> Self {
        if let Ok(mut records) = self.records.lock() {
            records.insert(record.uid.clone(), record);
        }
        self
    }

    /// Make every following call fail with `error` (simulates an outage).
    pub fn fail_with(&self, error: AuthError) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = Some(error);
        }
    }

    /// Make only `put` fail with `error`; lookups keep working.
    pub fn fail_writes_with(&self, error: AuthError) {
        if let Ok(mut failure) = self.write_failure.lock() {
            *failure = Some(error);
        }
    }

    /// Stop failing.
    pub fn recover(&self) {
        for failure in [&self.failure, &self.write_failure] {
            if let Ok(mut failure) = failure.lock() {
                *failure = None;
            }
        }
    }

    /// Stored record for `uid`.
    #[must_use]
    pub fn record(&self, uid: &str) -> Option<ProfileRecord> {
        self.records.lock().ok()?.get(uid).cloned()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().map_or(0, |records| records.len())
    }

    /// `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `get` calls so far.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `put` calls so far (failed ones included).
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

fn poisoned() -> AuthError {
    AuthError::StoreError("mock store lock poisoned".to_string())
}

fn check_failure(failure: &Mutex<Option<AuthError>>) -> Result<()> {
    failure.lock().map_err(|_| poisoned())?.clone().map_or(Ok(()), Err)
}

impl ProfileStore for MockProfileStore {
    fn get(&self, uid: &str) -> impl Future<Output = Result<Option<ProfileRecord>>> + Send {
        let records = Arc::clone(&self.records);
        let reads = Arc::clone(&self.reads);
        let failure = Arc::clone(&self.failure);
        let uid = uid.to_string();

        async move {
            reads.fetch_add(1, Ordering::SeqCst);
            check_failure(&failure)?;
            Ok(records.lock().map_err(|_| poisoned())?.get(&uid).cloned())
        }
    }

    fn put(&self, uid: &str, record: &ProfileRecord) -> impl Future<Output = Result<()>> + Send {
        let records = Arc::clone(&self.records);
        let writes = Arc::clone(&self.writes);
        let failure = Arc::clone(&self.failure);
        let write_failure = Arc::clone(&self.write_failure);
        let uid = uid.to_string();
        let record = record.clone();

        async move {
            writes.fetch_add(1, Ordering::SeqCst);
            check_failure(&failure)?;
            check_failure(&write_failure)?;
            records.lock().map_err(|_| poisoned())?.insert(uid, record);
            Ok(())
        }
    }
}
