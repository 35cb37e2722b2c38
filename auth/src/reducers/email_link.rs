//! Passwordless email-link reducer.
//!
//! # Flow
//!
//! 1. Registration or login form submits an address
//! 2. Registration caches name and role; the provider emails a link
//! 3. On success the address is cached for the redeeming process
//! 4. The app is opened at the link (often in a fresh process)
//! 5. The cached address redeems the link; the address is then forgotten
//! 6. The assertion is reconciled into a profile
//!
//! Nothing is retried automatically. A failed flow waits for the user to
//! submit the form again.

use crate::actions::AuthAction;
use crate::constants::pending_keys;
use crate::environment::AuthEnvironment;
use crate::error::AuthError;
use crate::providers::{IdentityProvider, PendingCache, ProfileStore};
use crate::state::{AuthState, Role, SignInMethod};
use carebridge_core::effect::Effect;
use carebridge_core::reducer::Reducer;
use carebridge_core::{SmallVec, async_effect, smallvec};

/// Email-link sign-in reducer.
#[derive(Debug, Clone)]
pub struct EmailLinkReducer<I, P, C> {
    _phantom: std::marker::PhantomData<(I, P, C)>,
}

impl<I, P, C> EmailLinkReducer<I, P, C> {
    /// Create a new email-link reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<I, P, C> Default for EmailLinkReducer<I, P, C> {
    fn default() -> Self {
        Self::new()
    }
}

fn failed(error: AuthError) -> Option<AuthAction> {
    Some(AuthAction::SignInFailed {
        via: SignInMethod::EmailLink,
        error,
    })
}

/// Cache the registration (if any), request the link, then cache the address.
fn send_link<I, P, C>(
    env: &AuthEnvironment<I, P, C>,
    email: String,
    registration: Option<(String, Role)>,
) -> Effect<AuthAction>
where
    I: IdentityProvider + Clone + 'static,
    P: ProfileStore + Clone + 'static,
    C: PendingCache + Clone + 'static,
{
    let identity = env.identity.clone();
    let pending = env.pending.clone();

    async_effect! {
        if let Some((name, role)) = registration {
            if let Err(error) = pending.save_registration(&name, role).await {
                return failed(error);
            }
        }

        if let Err(error) = identity.send_passwordless_link(&email).await {
            tracing::warn!(%error, "Sign-in link request failed");
            return failed(error);
        }

        if let Err(error) = pending.set(pending_keys::EMAIL_FOR_SIGN_IN, &email).await {
            return failed(error);
        }

        tracing::info!("Sign-in link sent");
        Some(AuthAction::LinkSent { email })
    }
}

impl<I, P, C> Reducer for EmailLinkReducer<I, P, C>
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
            // SubmitRegistration: validate the form, cache it, send a link
            // ═══════════════════════════════════════════════════════════════
            AuthAction::SubmitRegistration { name, email, role } => {
                let name = name.trim().to_string();
                let checked = if name.is_empty() {
                    Err(AuthError::InvalidRegistration("name is required".to_string()))
                } else if let Some(role) = role {
                    state.email_link.request_link(&email).map(|email| (email, role))
                } else {
                    Err(AuthError::InvalidRegistration("role is required".to_string()))
                };

                match checked {
                    Ok((email, role)) => {
                        state.last_error = None;
                        smallvec![send_link(env, email, Some((name, role)))]
                    },
                    Err(error) => {
                        tracing::warn!(%error, "Registration form rejected");
                        state.last_error = Some(error);
                        smallvec![Effect::None]
                    },
                }
            },

            // ═══════════════════════════════════════════════════════════════
            // SendLoginLink: validate the address and send a link
            // ═══════════════════════════════════════════════════════════════
            AuthAction::SendLoginLink { email } => match state.email_link.request_link(&email) {
                Ok(email) => {
                    state.last_error = None;
                    smallvec![send_link(env, email, None)]
                },
                Err(error) => {
                    tracing::warn!(%error, "Login form rejected");
                    state.last_error = Some(error);
                    smallvec![Effect::None]
                },
            },

            // ═══════════════════════════════════════════════════════════════
            // LinkSent: the user now checks their inbox
            // ═══════════════════════════════════════════════════════════════
            AuthAction::LinkSent { email } => {
                if let Err(error) = state.email_link.link_sent(email) {
                    tracing::warn!(%error, "Ignoring link confirmation");
                }
                smallvec![Effect::None]
            },

            // ═══════════════════════════════════════════════════════════════
            // DetectCompletionLink: redeem the link with the cached address
            // ═══════════════════════════════════════════════════════════════
            AuthAction::DetectCompletionLink { location } => {
                if !env.identity.is_completion_link(&location) {
                    tracing::trace!("Location is not a sign-in link");
                    return smallvec![Effect::None];
                }

                if let Err(error) = state.email_link.completion_detected() {
                    tracing::warn!(%error, "Ignoring sign-in link");
                    return smallvec![Effect::None];
                }

                let env = env.clone();
                smallvec![async_effect! {
                    let email = match env.pending.get(pending_keys::EMAIL_FOR_SIGN_IN).await {
                        Ok(Some(email)) => email,
                        Ok(None) => return failed(AuthError::MissingPendingEmail),
                        Err(error) => return failed(error),
                    };

                    let completed = env.identity.complete_link(&email, &location).await;

                    // Single use: forget the address whatever the provider said
                    if let Err(error) = env.pending.remove(pending_keys::EMAIL_FOR_SIGN_IN).await {
                        tracing::warn!(%error, "Could not forget pending email");
                    }

                    let assertion = match completed {
                        Ok(assertion) => assertion,
                        Err(error) => return failed(error),
                    };

                    match env.reconcile(&assertion, None).await {
                        Ok(profile) => Some(AuthAction::Reconciled {
                            via: SignInMethod::EmailLink,
                            profile,
                        }),
                        Err(error) => failed(error),
                    }
                }]
            },

            // ═══════════════════════════════════════════════════════════════
            // Reconciled: the session takes the profile
            // ═══════════════════════════════════════════════════════════════
            AuthAction::Reconciled { profile, .. } => {
                match state.email_link.reconciled() {
                    Ok(()) => {
                        tracing::info!(role = %profile.role, "Signed in with email link");
                        state.session.set(profile);
                        state.last_error = None;
                    },
                    Err(error) => tracing::warn!(%error, "Discarding stale sign-in result"),
                }
                smallvec![Effect::None]
            },

            // ═══════════════════════════════════════════════════════════════
            // SignInFailed: surface the error, no retry
            // ═══════════════════════════════════════════════════════════════
            AuthAction::SignInFailed { error, .. } => {
                match state.email_link.fail(error.clone()) {
                    Ok(()) => {
                        tracing::warn!(%error, "Email-link sign-in failed");
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
    use crate::state::EmailLinkFlow;
    use carebridge_testing::{ReducerTest, assertions};

    type TestEnv = AuthEnvironment<MockIdentityProvider, MockProfileStore, MockPendingCache>;
    type TestReducer = EmailLinkReducer<MockIdentityProvider, MockProfileStore, MockPendingCache>;

    fn env() -> TestEnv {
        AuthEnvironment::new(
            MockIdentityProvider::new(),
            MockProfileStore::new(),
            MockPendingCache::new(),
        )
    }

    #[test]
    fn test_invalid_email_stays_idle() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(AuthState::default())
            .when_action(AuthAction::SendLoginLink {
                email: "ann.clinic.se".to_string(),
            })
            .then_state(|state| {
                assert_eq!(state.email_link, EmailLinkFlow::Idle);
                assert!(matches!(state.last_error, Some(AuthError::InvalidEmail(_))));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_registration_requires_role() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(AuthState::default())
            .when_action(AuthAction::SubmitRegistration {
                name: "Ann".to_string(),
                email: "ann@clinic.se".to_string(),
                role: None,
            })
            .then_state(|state| {
                assert!(matches!(
                    state.last_error,
                    Some(AuthError::InvalidRegistration(_))
                ));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_registration_requires_name() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(AuthState::default())
            .when_action(AuthAction::SubmitRegistration {
                name: "   ".to_string(),
                email: "ann@clinic.se".to_string(),
                role: Some(Role::Nurse),
            })
            .then_state(|state| {
                assert!(matches!(
                    state.last_error,
                    Some(AuthError::InvalidRegistration(_))
                ));
            })
            .run();
    }

    #[test]
    fn test_valid_login_form_sends_link() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(AuthState::default())
            .when_action(AuthAction::SendLoginLink {
                email: "ann@clinic.se".to_string(),
            })
            .then_state(|state| {
                // The state moves only once the provider confirms
                assert_eq!(state.email_link, EmailLinkFlow::Idle);
                assert_eq!(state.last_error, None);
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn test_link_sent_records_address() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(AuthState::default())
            .when_action(AuthAction::LinkSent {
                email: "ann@clinic.se".to_string(),
            })
            .then_state(|state| {
                assert_eq!(state.email_link.pending_email(), Some("ann@clinic.se"));
            })
            .run();
    }

    #[test]
    fn test_ordinary_location_is_ignored() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(AuthState::default())
            .when_action(AuthAction::DetectCompletionLink {
                location: "https://portal.test/dashboard".to_string(),
            })
            .then_state(|state| assert_eq!(state.email_link, EmailLinkFlow::Idle))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_completion_link_moves_to_pending() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(AuthState::default())
            .when_action(AuthAction::DetectCompletionLink {
                location: "https://portal.test/finish?mode=signIn&oobCode=abc".to_string(),
            })
            .then_state(|state| {
                assert_eq!(state.email_link, EmailLinkFlow::LinkCompletionPending);
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn test_failure_is_terminal_and_surfaced() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(AuthState {
                email_link: EmailLinkFlow::LinkCompletionPending,
                ..AuthState::default()
            })
            .when_action(AuthAction::SignInFailed {
                via: SignInMethod::EmailLink,
                error: AuthError::MissingPendingEmail,
            })
            .then_state(|state| {
                assert_eq!(
                    state.email_link,
                    EmailLinkFlow::Failed {
                        error: AuthError::MissingPendingEmail
                    }
                );
                assert_eq!(state.last_error, Some(AuthError::MissingPendingEmail));
                assert!(!state.session.is_authenticated());
            })
            .run();
    }
}
