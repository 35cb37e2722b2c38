//! # CareBridge Authentication
//!
//! Client-side sign-in and profile reconciliation for the care portal. A
//! person signs in as a doctor, nurse, patient or admin with a passwordless
//! email link or a Google popup; the first sign-in provisions a profile, and
//! later sign-ins load it.
//!
//! ## Architecture
//!
//! Authentication is implemented as reducers and effects:
//!
//! ```text
//! Action → Reducer → (State, Effects) → Effect Execution → More Actions
//! ```
//!
//! Every sign-in path ends in [`reconcile`], the single place where a
//! profile is created or read back.
//!
//! ## Example: Email-link registration
//!
//! ```rust,ignore
//! use carebridge_auth::*;
//!
//! let store = AuthStore::new(AuthState::default(), AuthReducer::new(), env);
//!
//! // 1. Registration form: name and role are cached, a link is emailed
//! store.send(AuthAction::SubmitRegistration {
//!     name: "Ann".into(),
//!     email: "ann@clinic.se".into(),
//!     role: Some(Role::Nurse),
//! }).await?;
//!
//! // 2. Later, possibly after a restart: the app opens at the link
//! let outcome = store.send_and_wait_for(
//!     AuthAction::DetectCompletionLink { location },
//!     AuthAction::is_sign_in_outcome,
//!     Duration::from_secs(10),
//! ).await?;
//!
//! // 3. Profile provisioned and held in the session
//! assert_eq!(store.state(|s| s.session.current_profile().map(|p| p.role)).await, Some(Role::Nurse));
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod actions;
pub mod config;
pub mod constants;
pub mod environment;
pub mod error;
pub mod providers;
pub mod reconcile;
pub mod reducers;
pub mod second_factor;
pub mod state;
pub mod stores;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-export main types for convenience
pub use actions::AuthAction;
pub use config::AuthConfig;
pub use environment::AuthEnvironment;
pub use error::{AuthError, Result};
pub use reconcile::reconcile;
pub use reducers::AuthReducer;
pub use second_factor::{SecondFactorChallenge, SecondFactorIssuer};
pub use state::{
    AuthState, EmailLinkFlow, FederatedFlow, IdentityAssertion, PendingRegistration, Profile,
    ProfileRecord, Role, SessionState, SignInMethod,
};

/// Store running the auth reducer.
pub type AuthStore<I, P, C> = carebridge_runtime::Store<
    AuthState,
    AuthAction,
    AuthEnvironment<I, P, C>,
    AuthReducer<I, P, C>,
>;
