//! Pending-registration cache trait.

use crate::constants::pending_keys;
use crate::error::Result;
use crate::state::{PendingRegistration, Role};
use std::future::Future;

/// Client-local string cache holding an in-progress registration.
///
/// Must survive a process reload: the user requests a link in one process
/// and redeems it in the next. Concurrent windows share one cache and may
/// overwrite each other's registration.
pub trait PendingCache: Send + Sync {
    /// Read `key`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::CacheError`](crate::AuthError::CacheError) if the
    /// backing storage cannot be read.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Write `key`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::CacheError`](crate::AuthError::CacheError) if the
    /// backing storage cannot be written.
    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<()>> + Send;

    /// Delete `key`. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::CacheError`](crate::AuthError::CacheError) if the
    /// backing storage cannot be written.
    fn remove(&self, key: &str) -> impl Future<Output = Result<()>> + Send;

    /// Read all three registration fields.
    ///
    /// A cached role that names no known role is logged and treated as absent.
    ///
    /// # Errors
    ///
    /// Propagates [`PendingCache::get`] failures.
    fn load_registration(&self) -> impl Future<Output = Result<PendingRegistration>> + Send {
        async move {
            let name = self.get(pending_keys::USER_NAME).await?;
            let role = match self.get(pending_keys::USER_ROLE).await? {
                Some(raw) => match raw.parse::<Role>() {
                    Ok(role) => Some(role),
                    Err(error) => {
                        tracing::warn!(%error, "Ignoring unreadable cached role");
                        None
                    },
                },
                None => None,
            };
            let pending_email = self.get(pending_keys::EMAIL_FOR_SIGN_IN).await?;

            Ok(PendingRegistration {
                name,
                role,
                pending_email,
            })
        }
    }

    /// Cache the name and role from a submitted registration form.
    ///
    /// # Errors
    ///
    /// Propagates [`PendingCache::set`] failures.
    fn save_registration(&self, name: &str, role: Role) -> impl Future<Output = Result<()>> + Send {
        async move {
            self.set(pending_keys::USER_NAME, name).await?;
            self.set(pending_keys::USER_ROLE, role.as_str()).await
        }
    }

    /// Remove every registration field.
    ///
    /// All removals are attempted; the first failure is returned.
    ///
    /// # Errors
    ///
    /// Propagates [`PendingCache::remove`] failures.
    fn clear_registration(&self) -> impl Future<Output = Result<()>> + Send {
        async move {
            let mut first_error = None;
            for key in pending_keys::ALL {
                if let Err(error) = self.remove(key).await {
                    first_error.get_or_insert(error);
                }
            }
            first_error.map_or(Ok(()), Err)
        }
    }
}
