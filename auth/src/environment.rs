//! Authentication environment.
//!
//! This module defines the environment type for dependency injection
//! in auth reducers.

use crate::error::Result;
use crate::providers::{IdentityProvider, PendingCache, ProfileStore};
use crate::reconcile::reconcile;
use crate::second_factor::SecondFactorIssuer;
use crate::state::{IdentityAssertion, Profile, Role};
use carebridge_core::environment::{Clock, SystemClock};
use std::sync::Arc;

/// Authentication environment.
///
/// Contains all external dependencies needed by auth reducers. Adapters are
/// cheap handles; reducers clone the environment into effects.
///
/// # Type Parameters
///
/// - `I`: Identity provider
/// - `P`: Profile store
/// - `C`: Pending-registration cache
#[derive(Clone)]
pub struct AuthEnvironment<I, P, C>
where
    I: IdentityProvider + Clone,
    P: ProfileStore + Clone,
    C: PendingCache + Clone,
{
    /// Identity provider (popup, email links, sign-out).
    pub identity: I,

    /// Profile store (one record per uid).
    pub profiles: P,

    /// Client-local pending registration.
    pub pending: C,

    /// Issuer for the simulated e-ID challenge.
    pub second_factor: SecondFactorIssuer,

    /// Source of `createdAt` and challenge timestamps.
    pub clock: Arc<dyn Clock>,
}

impl<I, P, C> AuthEnvironment<I, P, C>
where
    I: IdentityProvider + Clone,
    P: ProfileStore + Clone,
    C: PendingCache + Clone,
{
    /// Create a new authentication environment using the system clock and
    /// the default e-ID issuer.
    #[must_use]
    pub fn new(identity: I, profiles: P, pending: C) -> Self {
        Self {
            identity,
            profiles,
            pending,
            second_factor: SecondFactorIssuer::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the e-ID issuer.
    #[must_use]
    pub fn with_second_factor(mut self, issuer: SecondFactorIssuer) -> Self {
        self.second_factor = issuer;
        self
    }

    /// Run [`reconcile`] against this environment's store, cache and clock.
    ///
    /// # Errors
    ///
    /// See [`reconcile`].
    pub async fn reconcile(
        &self,
        assertion: &IdentityAssertion,
        selected_role: Option<Role>,
    ) -> Result<Profile> {
        reconcile(
            &self.profiles,
            &self.pending,
            self.clock.as_ref(),
            assertion,
            selected_role,
        )
        .await
    }
}

impl<I, P, C> std::fmt::Debug for AuthEnvironment<I, P, C>
where
    I: IdentityProvider + Clone + std::fmt::Debug,
    P: ProfileStore + Clone + std::fmt::Debug,
    C: PendingCache + Clone + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthEnvironment")
            .field("identity", &self.identity)
            .field("profiles", &self.profiles)
            .field("pending", &self.pending)
            .field("second_factor", &self.second_factor)
            .finish_non_exhaustive()
    }
}
