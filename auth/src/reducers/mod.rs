//! Authentication reducers.
//!
//! Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
//! Provider calls, cache access and reconciliation run in the effects they
//! return.

pub mod email_link;
pub mod federated;
pub mod session;

use crate::actions::AuthAction;
use crate::environment::AuthEnvironment;
use crate::providers::{IdentityProvider, PendingCache, ProfileStore};
use crate::state::{AuthState, SignInMethod};
use carebridge_core::{SmallVec, effect::Effect, reducer::Reducer};

// Re-export
pub use email_link::EmailLinkReducer;
pub use federated::FederatedReducer;
pub use session::SessionReducer;

/// Unified authentication reducer.
///
/// Combines the email-link and federated flows with session handling and
/// routes each action to the sub-reducer that owns it. Outcomes are routed
/// by the flow that produced them.
#[derive(Clone, Debug)]
pub struct AuthReducer<I, P, C>
where
    I: IdentityProvider + Clone + 'static,
    P: ProfileStore + Clone + 'static,
    C: PendingCache + Clone + 'static,
{
    email_link: EmailLinkReducer<I, P, C>,
    federated: FederatedReducer<I, P, C>,
    session: SessionReducer<I, P, C>,
}

impl<I, P, C> AuthReducer<I, P, C>
where
    I: IdentityProvider + Clone + 'static,
    P: ProfileStore + Clone + 'static,
    C: PendingCache + Clone + 'static,
{
    /// Create a new unified auth reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            email_link: EmailLinkReducer::new(),
            federated: FederatedReducer::new(),
            session: SessionReducer::new(),
        }
    }
}

impl<I, P, C> Default for AuthReducer<I, P, C>
where
    I: IdentityProvider + Clone + 'static,
    P: ProfileStore + Clone + 'static,
    C: PendingCache + Clone + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<I, P, C> Reducer for AuthReducer<I, P, C>
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
            // Email-link actions
            AuthAction::SubmitRegistration { .. }
            | AuthAction::SendLoginLink { .. }
            | AuthAction::LinkSent { .. }
            | AuthAction::DetectCompletionLink { .. }
            | AuthAction::Reconciled {
                via: SignInMethod::EmailLink,
                ..
            }
            | AuthAction::SignInFailed {
                via: SignInMethod::EmailLink,
                ..
            } => self.email_link.reduce(state, action, env),

            // Federated actions
            AuthAction::SignInWithGoogle
            | AuthAction::FederatedAssertionReceived { .. }
            | AuthAction::SelectRole { .. }
            | AuthAction::CancelRoleSelection
            | AuthAction::Reconciled {
                via: SignInMethod::Federated,
                ..
            }
            | AuthAction::SignInFailed {
                via: SignInMethod::Federated,
                ..
            } => self.federated.reduce(state, action, env),

            // Session management
            AuthAction::Logout
            | AuthAction::LoggedOut
            | AuthAction::RequestSecondFactor
            | AuthAction::SecondFactorIssued { .. }
            | AuthAction::DismissError => self.session.reduce(state, action, env),
        }
    }
}
