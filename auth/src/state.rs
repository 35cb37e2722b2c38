//! Authentication state types.
//!
//! This module defines the profile model, the pending-registration snapshot,
//! the session container and the two sign-in flow state machines.
//! All types are `Clone` to support the functional architecture pattern.

use crate::error::{AuthError, Result};
use crate::second_factor::SecondFactorChallenge;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ═══════════════════════════════════════════════════════════════════════
// Roles and Profiles
// ═══════════════════════════════════════════════════════════════════════

/// Portal role assigned at registration.
///
/// Parsed case-insensitively, serialized lowercase.
///
/// ```
/// # use carebridge_auth::Role;
/// assert_eq!("Nurse".parse::<Role>().ok(), Some(Role::Nurse));
/// assert_eq!(Role::Admin.to_string(), "admin");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Role {
    /// Physician
    Doctor,
    /// Nursing staff
    Nurse,
    /// Patient
    Patient,
    /// Portal administrator
    Admin,
}

impl Role {
    /// Every role, in the order the registration form lists them.
    pub const ALL: [Self; 4] = [Self::Doctor, Self::Nurse, Self::Patient, Self::Admin];

    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Doctor => "doctor",
            Self::Nurse => "nurse",
            Self::Patient => "patient",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known role.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role `{0}`")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ParseRoleError(s.to_string()))
    }
}

impl TryFrom<String> for Role {
    type Error = ParseRoleError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// Signed-in user as the rest of the client sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Provider-issued user id (immutable once persisted).
    pub uid: String,

    /// Email address.
    pub email: String,

    /// Display name; may be empty.
    pub name: String,

    /// Portal role.
    pub role: Role,
}

/// Profile document as persisted in the profile store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    /// Provider-issued user id.
    pub uid: String,

    /// Email address.
    pub email: String,

    /// Display name; may be empty.
    pub name: String,

    /// Portal role.
    pub role: Role,

    /// When the record was first written.
    pub created_at: DateTime<Utc>,
}

impl ProfileRecord {
    /// Stamp a profile with its creation time.
    #[must_use]
    pub fn new(profile: Profile, created_at: DateTime<Utc>) -> Self {
        Self {
            uid: profile.uid,
            email: profile.email,
            name: profile.name,
            role: profile.role,
            created_at,
        }
    }
}

impl From<ProfileRecord> for Profile {
    fn from(record: ProfileRecord) -> Self {
        Self {
            uid: record.uid,
            email: record.email,
            name: record.name,
            role: record.role,
        }
    }
}

/// Opaque result of a successful identity-provider sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityAssertion {
    /// Provider-issued user id.
    pub uid: String,

    /// Verified email address.
    pub email: String,

    /// Display name reported by the provider, if any.
    pub display_name: Option<String>,
}

/// Which sign-in flow produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignInMethod {
    /// Passwordless email link
    EmailLink,
    /// Federated (Google) popup
    Federated,
}

// ═══════════════════════════════════════════════════════════════════════
// Pending Registration
// ═══════════════════════════════════════════════════════════════════════

/// In-progress registration held in the client-local cache.
///
/// Filled in by the registration form (name, role) and by a link request
/// (email); cleared as a whole once a new profile is persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRegistration {
    /// Name typed into the registration form.
    pub name: Option<String>,

    /// Role chosen on the registration form.
    pub role: Option<Role>,

    /// Address the last sign-in link was sent to.
    pub pending_email: Option<String>,
}

impl PendingRegistration {
    /// `true` when no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.role.is_none() && self.pending_email.is_none()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Session
// ═══════════════════════════════════════════════════════════════════════

/// Process-wide session slot: zero or one signed-in profile.
///
/// Never persisted; a restarted client starts signed out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    current_profile: Option<Profile>,
}

impl SessionState {
    /// The signed-in profile, if any.
    #[must_use]
    pub const fn current_profile(&self) -> Option<&Profile> {
        self.current_profile.as_ref()
    }

    /// `true` when a profile is held.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.current_profile.is_some()
    }

    /// Replace the held profile. No field-level merging.
    pub fn set(&mut self, profile: Profile) {
        self.current_profile = Some(profile);
    }

    /// Drop the held profile.
    pub fn clear(&mut self) {
        self.current_profile = None;
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Email Link Flow
// ═══════════════════════════════════════════════════════════════════════

/// Passwordless email-link sign-in.
///
/// ```text
/// Idle ──link_sent──▶ LinkSent ──completion_detected──▶ LinkCompletionPending
///   │                                                       │        │
///   └──────────────completion_detected (after reload)───────┘        │
///                                         reconciled ◀──────────────┤
///                                         fail ◀────────────────────┘
/// ```
///
/// `Failed` is left through [`EmailLinkFlow::reset`] or a new link request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EmailLinkFlow {
    /// Nothing in progress.
    #[default]
    Idle,

    /// A link was sent to `email`.
    LinkSent {
        /// Recipient address
        email: String,
    },

    /// The current location is a completion link being redeemed.
    LinkCompletionPending,

    /// Sign-in finished and the session holds a profile.
    Reconciled,

    /// Sign-in failed; nothing is retried automatically.
    Failed {
        /// Why
        error: AuthError,
    },
}

impl EmailLinkFlow {
    /// Human-readable state name used in transition errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::LinkSent { .. } => "link sent",
            Self::LinkCompletionPending => "completing sign-in link",
            Self::Reconciled => "signed in",
            Self::Failed { .. } => "failed",
        }
    }

    const fn reject(&self, event: &'static str) -> AuthError {
        AuthError::InvalidTransition {
            state: self.name(),
            event,
        }
    }

    /// Check a link request and return the validated address.
    ///
    /// Accepted while idle, after a previous link (resend) and after a
    /// failure (manual retry).
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidTransition`] while a link is being redeemed or
    ///   after sign-in
    /// - [`AuthError::InvalidEmail`] if `email` fails [`validate_email`]
    pub fn request_link(&self, email: &str) -> Result<String> {
        match self {
            Self::Idle | Self::LinkSent { .. } | Self::Failed { .. } => validate_email(email),
            _ => Err(self.reject("request a sign-in link")),
        }
    }

    /// The provider accepted the link request.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidTransition`] outside the states
    /// [`EmailLinkFlow::request_link`] accepts.
    pub fn link_sent(&mut self, email: String) -> Result<()> {
        match self {
            Self::Idle | Self::LinkSent { .. } | Self::Failed { .. } => {
                *self = Self::LinkSent { email };
                Ok(())
            },
            _ => Err(self.reject("record a sent link")),
        }
    }

    /// The current location was recognised as a completion link.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidTransition`] unless idle or waiting for a link.
    pub fn completion_detected(&mut self) -> Result<()> {
        match self {
            Self::Idle | Self::LinkSent { .. } => {
                *self = Self::LinkCompletionPending;
                Ok(())
            },
            _ => Err(self.reject("redeem a sign-in link")),
        }
    }

    /// Reconciliation finished for the redeemed link.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidTransition`] unless a link is being redeemed.
    pub fn reconciled(&mut self) -> Result<()> {
        match self {
            Self::LinkCompletionPending => {
                *self = Self::Reconciled;
                Ok(())
            },
            _ => Err(self.reject("finish sign-in")),
        }
    }

    /// Sending or redeeming the link failed.
    ///
    /// A retry from `Failed` that fails again replaces the error.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidTransition`] after sign-in.
    pub fn fail(&mut self, error: AuthError) -> Result<()> {
        match self {
            Self::Idle | Self::LinkSent { .. } | Self::LinkCompletionPending | Self::Failed { .. } => {
                *self = Self::Failed { error };
                Ok(())
            },
            _ => Err(self.reject("record a failure")),
        }
    }

    /// Return to `Idle` from any state.
    pub fn reset(&mut self) {
        *self = Self::Idle;
    }

    /// Address of the outstanding link, if one was sent in this process.
    #[must_use]
    pub fn pending_email(&self) -> Option<&str> {
        match self {
            Self::LinkSent { email } => Some(email),
            _ => None,
        }
    }

    /// `true` for `Reconciled` and `Failed`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Reconciled | Self::Failed { .. })
    }
}

/// Validate an email address typed into a sign-in or registration form.
///
/// Surrounding whitespace is trimmed. The address must contain exactly one
/// `@` with a non-empty local part and a domain that has an inner dot.
///
/// ```
/// # use carebridge_auth::state::validate_email;
/// assert_eq!(validate_email(" ann@clinic.se ").ok().as_deref(), Some("ann@clinic.se"));
/// assert!(validate_email("ann@clinic").is_err());
/// ```
///
/// # Errors
///
/// Returns [`AuthError::InvalidEmail`] describing the first problem found.
pub fn validate_email(input: &str) -> Result<String> {
    let email = input.trim();
    if email.is_empty() {
        return Err(AuthError::InvalidEmail("address is empty".to_string()));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(AuthError::InvalidEmail("address contains whitespace".to_string()));
    }

    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(AuthError::InvalidEmail(
            "address must contain exactly one @".to_string(),
        ));
    };

    if local.is_empty() {
        return Err(AuthError::InvalidEmail("missing name before @".to_string()));
    }
    let domain_ok = domain
        .split_once('.')
        .is_some_and(|_| !domain.starts_with('.') && !domain.ends_with('.'));
    if !domain_ok {
        return Err(AuthError::InvalidEmail(format!("`{domain}` is not a valid domain")));
    }

    Ok(email.to_string())
}

// ═══════════════════════════════════════════════════════════════════════
// Federated Flow
// ═══════════════════════════════════════════════════════════════════════

/// Federated (Google) popup sign-in.
///
/// Registered users go `Authenticating → Reconciling`; new users stop in
/// `AwaitingRole` until the role dialog is answered or dismissed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FederatedFlow {
    /// Nothing in progress.
    #[default]
    Idle,

    /// Popup open.
    Authenticating,

    /// New user; the role dialog is showing.
    AwaitingRole {
        /// Held until a role is picked or the dialog is dismissed
        assertion: IdentityAssertion,
    },

    /// Profile lookup or creation running.
    Reconciling,

    /// Sign-in finished and the session holds a profile.
    Reconciled,

    /// Sign-in failed.
    Failed {
        /// Why
        error: AuthError,
    },
}

impl FederatedFlow {
    /// Human-readable state name used in transition errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Authenticating => "authenticating",
            Self::AwaitingRole { .. } => "awaiting role selection",
            Self::Reconciling => "reconciling",
            Self::Reconciled => "signed in",
            Self::Failed { .. } => "failed",
        }
    }

    const fn reject(&self, event: &'static str) -> AuthError {
        AuthError::InvalidTransition {
            state: self.name(),
            event,
        }
    }

    /// Open the popup.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidTransition`] unless idle or failed.
    pub fn begin(&mut self) -> Result<()> {
        match self {
            Self::Idle | Self::Failed { .. } => {
                *self = Self::Authenticating;
                Ok(())
            },
            _ => Err(self.reject("start federated sign-in")),
        }
    }

    /// The popup returned an assertion; `registered` tells whether a profile
    /// already exists for it.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidTransition`] unless authenticating.
    pub fn assertion_received(&mut self, assertion: IdentityAssertion, registered: bool) -> Result<()> {
        match self {
            Self::Authenticating => {
                *self = if registered {
                    Self::Reconciling
                } else {
                    Self::AwaitingRole { assertion }
                };
                Ok(())
            },
            _ => Err(self.reject("accept a federated assertion")),
        }
    }

    /// The role dialog was answered; hands back the held assertion.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidTransition`] unless the dialog is showing.
    pub fn select_role(&mut self) -> Result<IdentityAssertion> {
        match std::mem::take(self) {
            Self::AwaitingRole { assertion } => {
                *self = Self::Reconciling;
                Ok(assertion)
            },
            other => {
                *self = other;
                Err(self.reject("select a role"))
            },
        }
    }

    /// The role dialog was dismissed. The assertion is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidTransition`] unless the dialog is showing.
    pub fn cancel(&mut self) -> Result<()> {
        match self {
            Self::AwaitingRole { .. } => {
                *self = Self::Idle;
                Ok(())
            },
            _ => Err(self.reject("cancel role selection")),
        }
    }

    /// Reconciliation finished.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidTransition`] unless reconciling.
    pub fn reconciled(&mut self) -> Result<()> {
        match self {
            Self::Reconciling => {
                *self = Self::Reconciled;
                Ok(())
            },
            _ => Err(self.reject("finish sign-in")),
        }
    }

    /// The popup, the lookup or reconciliation failed.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidTransition`] when nothing is in flight.
    pub fn fail(&mut self, error: AuthError) -> Result<()> {
        match self {
            Self::Authenticating | Self::AwaitingRole { .. } | Self::Reconciling => {
                *self = Self::Failed { error };
                Ok(())
            },
            _ => Err(self.reject("record a failure")),
        }
    }

    /// Return to `Idle` from any state.
    pub fn reset(&mut self) {
        *self = Self::Idle;
    }

    /// The assertion held while the role dialog is showing.
    #[must_use]
    pub const fn held_assertion(&self) -> Option<&IdentityAssertion> {
        match self {
            Self::AwaitingRole { assertion } => Some(assertion),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Root State
// ═══════════════════════════════════════════════════════════════════════

/// Root authentication state managed by the auth reducer.
///
/// # Examples
///
/// ```
/// # use carebridge_auth::AuthState;
/// let state = AuthState::default();
/// assert!(!state.session.is_authenticated());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    /// Signed-in profile slot.
    pub session: SessionState,

    /// Passwordless email-link flow.
    pub email_link: EmailLinkFlow,

    /// Federated popup flow.
    pub federated: FederatedFlow,

    /// Last issued e-ID challenge, while its QR code is showing.
    pub second_factor: Option<SecondFactorChallenge>,

    /// Most recent failure, for the presentation layer to display.
    pub last_error: Option<AuthError>,
}
