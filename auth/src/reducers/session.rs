//! Session reducer: logout, the e-ID stand-in and error dismissal.

use crate::actions::AuthAction;
use crate::environment::AuthEnvironment;
use crate::providers::{IdentityProvider, PendingCache, ProfileStore};
use crate::state::AuthState;
use carebridge_core::effect::Effect;
use carebridge_core::reducer::Reducer;
use carebridge_core::{SmallVec, async_effect, smallvec};

/// Session reducer.
#[derive(Debug, Clone)]
pub struct SessionReducer<I, P, C> {
    _phantom: std::marker::PhantomData<(I, P, C)>,
}

impl<I, P, C> SessionReducer<I, P, C> {
    /// Create a new session reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<I, P, C> Default for SessionReducer<I, P, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I, P, C> Reducer for SessionReducer<I, P, C>
where
    I: IdentityProvider + Clone + 'static,
    P: ProfileStore + Clone + 'static,
    C: PendingCache + Clone + 'static,
{
    type State = AuthState;
    type Action = AuthAction;
    type Environment = AuthEnvironment<I, P, C>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ═══════════════════════════════════════════════════════════════
            // Logout: local state first, provider and cache afterwards
            // ═══════════════════════════════════════════════════════════════
            AuthAction::Logout => {
                let had_session = state.session.is_authenticated();
                state.session.clear();
                state.email_link.reset();
                state.federated.reset();
                state.second_factor = None;
                state.last_error = None;

                tracing::info!(had_session, "Logging out");

                let identity = env.identity.clone();
                let pending = env.pending.clone();

                smallvec![async_effect! {
                    if let Err(error) = identity.sign_out().await {
                        tracing::warn!(%error, "Provider sign-out failed");
                    }
                    if let Err(error) = pending.clear_registration().await {
                        tracing::warn!(%error, "Could not clear pending registration");
                    }
                    Some(AuthAction::LoggedOut)
                }]
            },

            AuthAction::LoggedOut => {
                tracing::debug!("Logout finished");
                smallvec![Effect::None]
            },

            // ═══════════════════════════════════════════════════════════════
            // RequestSecondFactor: randomness stays out of the reducer
            // ═══════════════════════════════════════════════════════════════
            AuthAction::RequestSecondFactor => {
                let issuer = env.second_factor.clone();
                let clock = env.clock.clone();

                smallvec![async_effect! {
                    Some(AuthAction::SecondFactorIssued {
                        challenge: issuer.issue(clock.now()),
                    })
                }]
            },

            AuthAction::SecondFactorIssued { challenge } => {
                tracing::debug!(issued_at = %challenge.issued_at, "e-ID challenge issued");
                state.second_factor = Some(challenge);
                smallvec![Effect::None]
            },

            AuthAction::DismissError => {
                state.last_error = None;
                smallvec![Effect::None]
            },

            // Other actions are not handled by this reducer
            _ => smallvec![Effect::None],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthError;
    use crate::mocks::{MockIdentityProvider, MockPendingCache, MockProfileStore};
    use crate::second_factor::SecondFactorIssuer;
    use crate::state::{EmailLinkFlow, Profile, Role};
    use carebridge_testing::{ReducerTest, assertions, test_instant};

    type TestReducer = SessionReducer<MockIdentityProvider, MockProfileStore, MockPendingCache>;

    fn env() -> AuthEnvironment<MockIdentityProvider, MockProfileStore, MockPendingCache> {
        AuthEnvironment::new(
            MockIdentityProvider::new(),
            MockProfileStore::new(),
            MockPendingCache::new(),
        )
    }

    fn signed_in() -> AuthState {
        let mut state = AuthState {
            email_link: EmailLinkFlow::Reconciled,
            second_factor: Some(SecondFactorIssuer::default().issue(test_instant())),
            ..AuthState::default()
        };
        state.session.set(Profile {
            uid: "u-ann".to_string(),
            email: "ann@clinic.se".to_string(),
            name: "Ann".to_string(),
            role: Role::Nurse,
        });
        state
    }

    #[test]
    fn test_logout_clears_session_before_effects_run() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(signed_in())
            .when_action(AuthAction::Logout)
            .then_state(|state| {
                assert_eq!(state, &AuthState::default());
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn test_second_factor_issued_is_stored() {
        let challenge = SecondFactorIssuer::default().issue(test_instant());
        let expected = challenge.clone();

        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(AuthState::default())
            .when_action(AuthAction::SecondFactorIssued { challenge })
            .then_state(move |state| assert_eq!(state.second_factor, Some(expected)))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_dismiss_error() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(AuthState {
                last_error: Some(AuthError::IncompleteRegistration),
                ..AuthState::default()
            })
            .when_action(AuthAction::DismissError)
            .then_state(|state| assert_eq!(state.last_error, None))
            .run();
    }
}
