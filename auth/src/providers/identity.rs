//! Identity provider trait and completion-link parsing.

use crate::constants::link_markers;
use crate::error::Result;
use crate::state::IdentityAssertion;
use std::future::Future;

/// Identity provider (popup sign-in, passwordless links, sign-out).
///
/// Implementations only establish *who* the user is; profiles and roles are
/// the reconciliation procedure's business.
pub trait IdentityProvider: Send + Sync {
    /// Run the federated (Google) popup sign-in.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AuthProviderError`](crate::AuthError::AuthProviderError)
    /// if the popup is closed or the provider refuses the credential.
    fn authenticate_federated(&self) -> impl Future<Output = Result<IdentityAssertion>> + Send;

    /// Email a sign-in link to `email`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AuthProviderError`](crate::AuthError::AuthProviderError)
    /// if the provider does not accept the request.
    fn send_passwordless_link(&self, email: &str) -> impl Future<Output = Result<()>> + Send;

    /// `true` if `location` is a sign-in link this provider issued.
    fn is_completion_link(&self, location: &str) -> bool;

    /// Redeem the link at `location` for `email`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::LinkRejected`](crate::AuthError::LinkRejected): expired,
    ///   reused, or issued for another address
    /// - [`AuthError::AuthProviderError`](crate::AuthError::AuthProviderError):
    ///   any other failure
    fn complete_link(
        &self,
        email: &str,
        location: &str,
    ) -> impl Future<Output = Result<IdentityAssertion>> + Send;

    /// End the provider session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AuthProviderError`](crate::AuthError::AuthProviderError)
    /// if the provider cannot be reached.
    fn sign_out(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Redirectors wrap the real link at most this many times before we give up.
const MAX_LINK_NESTING: usize = 3;

/// `true` if `location` carries `mode=signIn` and a non-empty `oobCode`,
/// either directly or inside a `link` / `deep_link_id` parameter.
///
/// ```
/// # use carebridge_auth::providers::is_completion_link;
/// assert!(is_completion_link("https://portal.test/finish?mode=signIn&oobCode=abc"));
/// assert!(!is_completion_link("https://portal.test/finish?mode=resetPassword&oobCode=abc"));
/// ```
#[must_use]
pub fn is_completion_link(location: &str) -> bool {
    extract_oob_code(location).is_some()
}

/// The one-time code of a completion link, if `location` is one.
#[must_use]
pub fn extract_oob_code(location: &str) -> Option<String> {
    extract_nested(location, 0)
}

fn extract_nested(location: &str, depth: usize) -> Option<String> {
    if depth > MAX_LINK_NESTING {
        return None;
    }

    let params = query_params(location);
    let lookup = |key: &str| {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    };

    if lookup("mode") == Some(link_markers::SIGN_IN_MODE) {
        if let Some(code) = lookup(link_markers::OOB_CODE_PARAM).filter(|c| !c.is_empty()) {
            return Some(code.to_string());
        }
    }

    link_markers::NESTED_LINK_PARAMS
        .iter()
        .filter_map(|key| lookup(*key))
        .find_map(|inner| extract_nested(inner, depth + 1))
}

fn query_params(location: &str) -> Vec<(String, String)> {
    let without_fragment = location.split('#').next().unwrap_or_default();
    let Some((_, query)) = without_fragment.split_once('?') else {
        return Vec::new();
    };
    serde_urlencoded::from_str(query).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_link() {
        let link = "https://portal.test/finishSignIn?apiKey=k&oobCode=CODE-1&mode=signIn&lang=en";
        assert_eq!(extract_oob_code(link).as_deref(), Some("CODE-1"));
    }

    #[test]
    fn test_nested_link_is_decoded() {
        let link = "https://clinic.page.link/?link=https%3A%2F%2Fportal.test%2Ffinish%3Fmode%3DsignIn%26oobCode%3DXYZ";
        assert_eq!(extract_oob_code(link).as_deref(), Some("XYZ"));
    }

    #[test]
    fn test_not_completion_links() {
        assert!(!is_completion_link("https://portal.test/login"));
        assert!(!is_completion_link("https://portal.test/finish?mode=signIn"));
        assert!(!is_completion_link("https://portal.test/finish?mode=signIn&oobCode="));
        assert!(!is_completion_link("https://portal.test/finish#mode=signIn&oobCode=abc"));
        assert!(!is_completion_link(""));
    }

    #[test]
    fn test_fragment_after_query_is_ignored() {
        assert!(is_completion_link("https://portal.test/finish?mode=signIn&oobCode=abc#top"));
    }
}
