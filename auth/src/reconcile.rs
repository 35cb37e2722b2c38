//! Post-sign-in profile reconciliation.
//!
//! Given a fresh identity assertion, decide whether the user already has a
//! profile (returning user) or needs one provisioned (new user), and produce
//! the [`Profile`] the session should hold.
//!
//! # Rules
//!
//! - A stored record is returned as-is. Provider name or email changes are
//!   not written back.
//! - A new user's role comes from the role dialog if one was answered,
//!   otherwise from the pending registration. No role means no profile.
//! - A new user's name comes from the provider display name, then the
//!   pending registration, then `""`. The email always comes from the
//!   assertion.
//! - After the one write of the new-user path succeeds, the whole pending
//!   registration is cleared.

use crate::error::{AuthError, Result};
use crate::providers::{PendingCache, ProfileStore};
use crate::state::{IdentityAssertion, Profile, ProfileRecord, Role};
use carebridge_core::environment::Clock;

/// Resolve `assertion` to a profile, provisioning one for new users.
///
/// `selected_role` is the answer from the federated role dialog; email-link
/// sign-ins pass `None` and rely on the cached registration.
///
/// # Errors
///
/// - [`AuthError::StoreError`]: the profile store failed (nothing is cleared)
/// - [`AuthError::IncompleteRegistration`]: new user and no role available
///   (nothing is written or cleared)
/// - [`AuthError::CacheError`]: the pending registration could not be read
#[tracing::instrument(
    skip_all,
    fields(uid = %assertion.uid, selected_role = ?selected_role)
)]
pub async fn reconcile<P, C>(
    profiles: &P,
    pending: &C,
    clock: &dyn Clock,
    assertion: &IdentityAssertion,
    selected_role: Option<Role>,
) -> Result<Profile>
where
    P: ProfileStore,
    C: PendingCache,
{
    if let Some(record) = profiles.get(&assertion.uid).await? {
        tracing::debug!("Returning user, using stored profile");
        return Ok(record.into());
    }

    let registration = pending.load_registration().await?;

    let Some(role) = selected_role.or(registration.role) else {
        tracing::warn!("New user without a role, refusing to provision");
        return Err(AuthError::IncompleteRegistration);
    };

    let name = assertion
        .display_name
        .clone()
        .filter(|n| !n.is_empty())
        .or(registration.name)
        .unwrap_or_default();

    let profile = Profile {
        uid: assertion.uid.clone(),
        email: assertion.email.clone(),
        name,
        role,
    };

    let record = ProfileRecord::new(profile.clone(), clock.now());
    profiles.put(&profile.uid, &record).await?;

    tracing::info!(role = %profile.role, "Provisioned new profile");

    // The profile is already persisted; a stale cache only risks reusing the
    // name/role for the next registration on this device.
    if let Err(error) = pending.clear_registration().await {
        tracing::warn!(%error, "Could not clear pending registration");
    }

    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::pending_keys;
    use crate::mocks::{MockPendingCache, MockProfileStore};
    use carebridge_testing::{test_clock, test_instant};

    fn assertion(display_name: Option<&str>) -> IdentityAssertion {
        IdentityAssertion {
            uid: "u-ann".to_string(),
            email: "ann@clinic.se".to_string(),
            display_name: display_name.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_new_user_stamps_created_at_from_clock() -> Result<()> {
        let profiles = MockProfileStore::new();
        let pending = MockPendingCache::new();
        pending.save_registration("Ann", Role::Nurse).await?;

        reconcile(&profiles, &pending, &test_clock(), &assertion(None), None).await?;

        let stored = profiles.record("u-ann");
        assert_eq!(stored.map(|r| r.created_at), Some(test_instant()));
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_display_name_falls_back_to_cached_name() -> Result<()> {
        let profiles = MockProfileStore::new();
        let pending = MockPendingCache::new();
        pending.save_registration("Ann", Role::Nurse).await?;

        let profile = reconcile(&profiles, &pending, &test_clock(), &assertion(Some("")), None).await?;
        assert_eq!(profile.name, "Ann");
        Ok(())
    }

    #[tokio::test]
    async fn test_store_failure_leaves_cache_untouched() -> Result<()> {
        let profiles = MockProfileStore::new();
        let pending = MockPendingCache::new();
        pending.save_registration("Ann", Role::Nurse).await?;
        pending.set(pending_keys::EMAIL_FOR_SIGN_IN, "ann@clinic.se").await?;
        profiles.fail_with(AuthError::StoreError("unavailable".to_string()));

        let result = reconcile(&profiles, &pending, &test_clock(), &assertion(None), None).await;

        assert_eq!(result, Err(AuthError::StoreError("unavailable".to_string())));
        assert_eq!(pending.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_write_after_lookup_keeps_pending_registration() -> Result<()> {
        let profiles = MockProfileStore::new();
        let pending = MockPendingCache::new();
        pending.save_registration("Ann", Role::Nurse).await?;
        pending.set(pending_keys::EMAIL_FOR_SIGN_IN, "ann@clinic.se").await?;
        profiles.fail_writes_with(AuthError::StoreError("permission denied".to_string()));

        let result = reconcile(&profiles, &pending, &test_clock(), &assertion(None), None).await;

        assert_eq!(result, Err(AuthError::StoreError("permission denied".to_string())));
        assert_eq!(profiles.read_count(), 1);
        assert_eq!(profiles.write_count(), 1);
        assert!(profiles.is_empty());
        assert_eq!(pending.len(), 3);
        assert_eq!(
            pending.get(pending_keys::USER_ROLE).await?,
            Some(Role::Nurse.to_string())
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_cache_clear_failure_still_returns_profile() -> Result<()> {
        let profiles = MockProfileStore::new();
        let pending = MockPendingCache::new();
        pending.save_registration("Ann", Role::Nurse).await?;

        let wrapped = ClearFails(pending.clone());

        let profile = reconcile(&profiles, &wrapped, &test_clock(), &assertion(None), None).await?;
        assert_eq!(profile.role, Role::Nurse);
        assert_eq!(profiles.write_count(), 1);
        Ok(())
    }

    /// Cache whose removals fail while reads and writes succeed.
    struct ClearFails(MockPendingCache);

    impl PendingCache for ClearFails {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            self.0.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<()> {
            self.0.set(key, value).await
        }

        async fn remove(&self, _key: &str) -> Result<()> {
            Err(AuthError::CacheError("read-only".to_string()))
        }
    }
}
