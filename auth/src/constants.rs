//! Authentication constants.
//!
//! This module contains constant values used throughout the authentication system.

/// Keys of the pending-registration cache.
///
/// These match the browser client's local-storage layout, so a cache written
/// by the web portal stays readable.
pub mod pending_keys {
    /// Name typed into the registration form.
    pub const USER_NAME: &str = "userName";

    /// Role chosen on the registration form (lowercase role name).
    pub const USER_ROLE: &str = "userRole";

    /// Address the last sign-in link was sent to.
    pub const EMAIL_FOR_SIGN_IN: &str = "emailForSignIn";

    /// Every key, in the order they are cleared.
    pub const ALL: [&str; 3] = [USER_NAME, USER_ROLE, EMAIL_FOR_SIGN_IN];
}

/// Markers of a provider completion link.
pub mod link_markers {
    /// `mode` value of an email sign-in link.
    pub const SIGN_IN_MODE: &str = "signIn";

    /// Query parameter carrying the one-time code.
    pub const OOB_CODE_PARAM: &str = "oobCode";

    /// Parameters that may wrap the real link when it passes through a redirector.
    pub const NESTED_LINK_PARAMS: [&str; 2] = ["link", "deep_link_id"];
}
