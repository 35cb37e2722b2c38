//! Authentication actions.
//!
//! Actions are the inputs of the auth reducer: user intents from the
//! presentation layer and results fed back by effects.

use crate::error::AuthError;
use crate::second_factor::SecondFactorChallenge;
use crate::state::{IdentityAssertion, Profile, Role, SignInMethod};

/// Authentication actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthAction {
    // ═══════════════════════════════════════════════════════════════════════
    // Email Link
    // ═══════════════════════════════════════════════════════════════════════
    /// Registration form submitted: cache name and role, then send a link.
    SubmitRegistration {
        /// Full name
        name: String,
        /// Email address
        email: String,
        /// Chosen role; `None` if the form's role field was left empty
        role: Option<Role>,
    },

    /// Login form submitted: send a link to a (presumably) registered address.
    SendLoginLink {
        /// Email address
        email: String,
    },

    /// The provider accepted the link request and the address is cached.
    LinkSent {
        /// Recipient address
        email: String,
    },

    /// The app was opened at `location`; redeem it if it is a sign-in link.
    DetectCompletionLink {
        /// Full URL the app was opened with
        location: String,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Federated
    // ═══════════════════════════════════════════════════════════════════════
    /// "Sign in with Google" clicked.
    SignInWithGoogle,

    /// The popup returned and the profile store was consulted.
    FederatedAssertionReceived {
        /// Who signed in
        assertion: IdentityAssertion,
        /// Whether a profile already exists
        registered: bool,
    },

    /// Role dialog answered.
    SelectRole {
        /// Chosen role
        role: Role,
    },

    /// Role dialog dismissed. No profile is created.
    CancelRoleSelection,

    // ═══════════════════════════════════════════════════════════════════════
    // Outcomes
    // ═══════════════════════════════════════════════════════════════════════
    /// Reconciliation produced a profile.
    Reconciled {
        /// Flow that started the sign-in
        via: SignInMethod,
        /// Profile for the session
        profile: Profile,
    },

    /// Sending, redeeming, authenticating or reconciling failed.
    SignInFailed {
        /// Flow that failed
        via: SignInMethod,
        /// Why
        error: AuthError,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Session
    // ═══════════════════════════════════════════════════════════════════════
    /// Sign out: clear the session, the provider session and the pending
    /// registration.
    Logout,

    /// Provider sign-out and cache cleanup finished (successfully or not).
    LoggedOut,

    /// Issue a simulated e-ID challenge for the QR screen.
    RequestSecondFactor,

    /// Challenge issued.
    SecondFactorIssued {
        /// Challenge to render
        challenge: SecondFactorChallenge,
    },

    /// Error banner dismissed.
    DismissError,
}

impl AuthAction {
    /// `true` for actions that end a sign-in attempt.
    ///
    /// Handy as a `send_and_wait_for` predicate.
    #[must_use]
    pub const fn is_sign_in_outcome(&self) -> bool {
        matches!(self, Self::Reconciled { .. } | Self::SignInFailed { .. })
    }
}
