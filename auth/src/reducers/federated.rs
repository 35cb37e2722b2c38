//! Federated (Google popup) sign-in reducer.
//!
//! # Flow
//!
//! 1. "Sign in with Google" opens the provider popup
//! 2. The assertion comes back and the profile store is consulted
//! 3. Registered users are reconciled straight away
//! 4. New users see the role dialog; the assertion is held meanwhile
//! 5. The chosen role provisions the profile
//!
//! Dismissing the dialog drops the assertion. No profile is written, the
//! session stays empty, and the next attempt starts from the popup again.

use crate::actions::AuthAction;
use crate::environment::AuthEnvironment;
use crate::error::AuthError;
use crate::providers::{IdentityProvider, PendingCache, ProfileStore};
use crate::state::{AuthState, IdentityAssertion, Role, SignInMethod};
use carebridge_core::effect::Effect;
use carebridge_core::reducer::Reducer;
use carebridge_core::{SmallVec, async_effect, smallvec};

/// Federated sign-in reducer.
#[derive(Debug, Clone)]
pub struct FederatedReducer<I, P, C> {
    _phantom: std::marker::PhantomData<(I, P, C)>,
}

impl<I, P, C> FederatedReducer<I, P, C> {
    /// Create a new federated reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<I, P, C> Default for FederatedReducer<I, P, C> {
    fn default() -> Self {
        Self::new()
    }
}

fn failed(error: AuthError) -> Option<AuthAction> {
    Some(AuthAction::SignInFailed {
        via: SignInMethod::Federated,
        error,
    })
}

fn reconcile_effect<I, P, C>(
    env: &AuthEnvironment<I, P, C>,
    assertion: IdentityAssertion,
    selected_role: Option<Role>,
) -> Effect<AuthAction>
where
    I: IdentityProvider + Clone + 'static,
    P: ProfileStore + Clone + 'static,
    C: PendingCache + Clone + 'static,
{
    let env = env.clone();

    async_effect! {
        match env.reconcile(&assertion, selected_role).await {
            Ok(profile) => Some(AuthAction::Reconciled {
                via: SignInMethod::Federated,
                profile,
            }),
            Err(error) => failed(error),
        }
    }
}

impl<I, P, C> Reducer for FederatedReducer<I, P, C>
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
            // SignInWithGoogle: popup, then a profile lookup
            // ═══════════════════════════════════════════════════════════════
            AuthAction::SignInWithGoogle => {
                if let Err(error) = state.federated.begin() {
                    tracing::warn!(%error, "Ignoring federated sign-in request");
                    return smallvec![Effect::None];
                }
                state.last_error = None;

                let identity = env.identity.clone();
                let profiles = env.profiles.clone();

                smallvec![async_effect! {
                    let assertion = match identity.authenticate_federated().await {
                        Ok(assertion) => assertion,
                        Err(error) => return failed(error),
                    };

                    match profiles.get(&assertion.uid).await {
                        Ok(record) => Some(AuthAction::FederatedAssertionReceived {
                            assertion,
                            registered: record.is_some(),
                        }),
                        Err(error) => failed(error),
                    }
                }]
            },

            // ═══════════════════════════════════════════════════════════════
            // FederatedAssertionReceived: reconcile or ask for a role
            // ═══════════════════════════════════════════════════════════════
            AuthAction::FederatedAssertionReceived {
                assertion,
                registered,
            } => {
                if let Err(error) = state.federated.assertion_received(assertion.clone(), registered) {
                    tracing::warn!(%error, "Discarding federated assertion");
                    return smallvec![Effect::None];
                }

                if registered {
                    smallvec![reconcile_effect(env, assertion, None)]
                } else {
                    tracing::debug!(uid = %assertion.uid, "New federated user, awaiting role");
                    smallvec![Effect::None]
                }
            },

            // ═══════════════════════════════════════════════════════════════
            // SelectRole: provision with the chosen role
            // ═══════════════════════════════════════════════════════════════
            AuthAction::SelectRole { role } => match state.federated.select_role() {
                Ok(assertion) => smallvec![reconcile_effect(env, assertion, Some(role))],
                Err(error) => {
                    tracing::warn!(%error, "Ignoring role selection");
                    smallvec![Effect::None]
                },
            },

            // ═══════════════════════════════════════════════════════════════
            // CancelRoleSelection: abandon without a profile
            // ═══════════════════════════════════════════════════════════════
            AuthAction::CancelRoleSelection => {
                match state.federated.cancel() {
                    Ok(()) => tracing::info!("Role selection abandoned"),
                    Err(error) => tracing::warn!(%error, "Ignoring role dialog dismissal"),
                }
                smallvec![Effect::None]
            },

            AuthAction::Reconciled { profile, .. } => {
                match state.federated.reconciled() {
                    Ok(()) => {
                        tracing::info!(role = %profile.role, "Signed in with Google");
                        state.session.set(profile);
                        state.last_error = None;
                    },
                    Err(error) => tracing::warn!(%error, "Discarding stale sign-in result"),
                }
                smallvec![Effect::None]
            },

            AuthAction::SignInFailed { error, .. } => {
                match state.federated.fail(error.clone()) {
                    Ok(()) => {
                        tracing::warn!(%error, "Federated sign-in failed");
                        state.last_error = Some(error);
                    },
                    Err(transition) => tracing::warn!(%transition, "Discarding stale failure"),
                }
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
    use crate::mocks::{MockIdentityProvider, MockPendingCache, MockProfileStore};
    use crate::state::FederatedFlow;
    use carebridge_testing::{ReducerTest, assertions};

    type TestReducer = FederatedReducer<MockIdentityProvider, MockProfileStore, MockPendingCache>;

    fn env() -> AuthEnvironment<MockIdentityProvider, MockProfileStore, MockPendingCache> {
        AuthEnvironment::new(
            MockIdentityProvider::new(),
            MockProfileStore::new(),
            MockPendingCache::new(),
        )
    }

    fn bob() -> IdentityAssertion {
        IdentityAssertion {
            uid: "u-bob".to_string(),
            email: "bob@gmail.com".to_string(),
            display_name: Some("Bob".to_string()),
        }
    }

    #[test]
    fn test_sign_in_opens_popup() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(AuthState::default())
            .when_action(AuthAction::SignInWithGoogle)
            .then_state(|state| assert_eq!(state.federated, FederatedFlow::Authenticating))
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn test_second_click_while_authenticating_is_ignored() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(AuthState::default())
            .when_actions([AuthAction::SignInWithGoogle, AuthAction::SignInWithGoogle])
            .then_state(|state| assert_eq!(state.federated, FederatedFlow::Authenticating))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_new_user_waits_for_role() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(AuthState::default())
            .when_actions([
                AuthAction::SignInWithGoogle,
                AuthAction::FederatedAssertionReceived {
                    assertion: bob(),
                    registered: false,
                },
            ])
            .then_state(|state| {
                assert_eq!(state.federated.held_assertion(), Some(&bob()));
                assert!(!state.session.is_authenticated());
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_registered_user_reconciles_immediately() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(AuthState::default())
            .when_actions([
                AuthAction::SignInWithGoogle,
                AuthAction::FederatedAssertionReceived {
                    assertion: bob(),
                    registered: true,
                },
            ])
            .then_state(|state| assert_eq!(state.federated, FederatedFlow::Reconciling))
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn test_cancel_drops_assertion() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(AuthState::default())
            .when_actions([
                AuthAction::SignInWithGoogle,
                AuthAction::FederatedAssertionReceived {
                    assertion: bob(),
                    registered: false,
                },
                AuthAction::CancelRoleSelection,
            ])
            .then_state(|state| {
                assert_eq!(state.federated, FederatedFlow::Idle);
                assert_eq!(state.session.current_profile(), None);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_role_without_dialog_is_ignored() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(AuthState::default())
            .when_action(AuthAction::SelectRole { role: Role::Doctor })
            .then_state(|state| assert_eq!(state.federated, FederatedFlow::Idle))
            .then_effects(assertions::assert_no_effects)
            .run();
    }
}
