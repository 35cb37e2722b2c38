//! Profile store trait.

use crate::error::Result;
use crate::state::ProfileRecord;
use std::future::Future;

/// Document store holding one profile record per user id.
///
/// Writes are last-write-wins; there is no create-if-absent primitive, so two
/// clients provisioning the same new uid at once may both write.
pub trait ProfileStore: Send + Sync {
    /// Fetch the record for `uid`.
    ///
    /// # Returns
    ///
    /// `None` if no record exists.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::StoreError`](crate::AuthError::StoreError) if the
    /// store is unreachable or the stored document is malformed.
    fn get(&self, uid: &str) -> impl Future<Output = Result<Option<ProfileRecord>>> + Send;

    /// Write the record for `uid`, replacing any existing one.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::StoreError`](crate::AuthError::StoreError) if the
    /// write fails.
    fn put(&self, uid: &str, record: &ProfileRecord) -> impl Future<Output = Result<()>> + Send;
}
