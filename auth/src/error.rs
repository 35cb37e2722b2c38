//! Error types for sign-in, registration and reconciliation.

use thiserror::Error;

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Error taxonomy for the client auth core.
///
/// Errors travel inside actions (`AuthAction::SignInFailed`), so the enum is
/// `Clone + PartialEq` and carries adapter failures as strings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    // ═══════════════════════════════════════════════════════════
    // Reconciliation Errors
    // ═══════════════════════════════════════════════════════════

    /// Profile store unreachable, rejected the request, or returned a
    /// malformed document.
    #[error("Profile store error: {0}")]
    StoreError(String),

    /// New user with neither a selected role nor a cached one.
    #[error("Registration incomplete: no role selected")]
    IncompleteRegistration,

    // ═══════════════════════════════════════════════════════════
    // Email Link Errors
    // ═══════════════════════════════════════════════════════════

    /// A completion link was opened but no email address is cached.
    ///
    /// Typically the link was opened on a different device than the one
    /// that requested it.
    #[error("No pending email address for this sign-in link")]
    MissingPendingEmail,

    /// The identity provider refused the link (expired, already used, or
    /// issued for another address).
    #[error("Sign-in link rejected: {0}")]
    LinkRejected(String),

    /// Email address failed validation.
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    /// Registration form is missing a name or role.
    #[error("Invalid registration: {0}")]
    InvalidRegistration(String),

    /// A flow received an event its current state does not accept.
    #[error("Cannot {event} while {state}")]
    InvalidTransition {
        /// State the flow was in
        state: &'static str,
        /// Transition that was attempted
        event: &'static str,
    },

    // ═══════════════════════════════════════════════════════════
    // Adapter Errors
    // ═══════════════════════════════════════════════════════════

    /// Identity provider failure other than a link rejection.
    #[error("Identity provider error: {0}")]
    AuthProviderError(String),

    /// Pending-registration cache could not be read or written.
    #[error("Pending registration cache error: {0}")]
    CacheError(String),

    /// Missing or malformed configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AuthError {
    /// Returns `true` if the message can be shown to the user as-is.
    ///
    /// # Examples
    ///
    /// ```
    /// # use carebridge_auth::AuthError;
    /// assert!(AuthError::MissingPendingEmail.is_user_error());
    /// assert!(!AuthError::StoreError("timeout".into()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::IncompleteRegistration
                | Self::MissingPendingEmail
                | Self::LinkRejected(_)
                | Self::InvalidEmail(_)
                | Self::InvalidRegistration(_)
        )
    }

    /// Returns `true` if the failure came from an adapter and a manual retry
    /// may succeed.
    ///
    /// ```
    /// # use carebridge_auth::AuthError;
    /// assert!(AuthError::CacheError("disk full".into()).is_transient());
    /// assert!(!AuthError::IncompleteRegistration.is_transient());
    /// ```
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::StoreError(_) | Self::AuthProviderError(_) | Self::CacheError(_)
        )
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::AuthProviderError(error.to_string())
    }
}
