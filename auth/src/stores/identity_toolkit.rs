//! Firebase Identity Toolkit provider (REST).
//!
//! - Email links: `accounts:sendOobCode` (`EMAIL_SIGNIN`) and
//!   `accounts:signInWithEmailLink`
//! - Google: `accounts:signInWithIdp` exchanging the ID token the popup
//!   produced
//!
//! # Example
//!
//! ```no_run
//! use carebridge_auth::config::{EmailLinkConfig, FirebaseConfig};
//! use carebridge_auth::stores::{IdentityToolkitProvider, StaticIdToken};
//!
//! # fn example() -> carebridge_auth::Result<()> {
//! let identity = IdentityToolkitProvider::new(
//!     &FirebaseConfig::new("api-key".to_string(), "clinic".to_string()),
//!     &EmailLinkConfig::default(),
//!     StaticIdToken::new("google-id-token".to_string()),
//! )?;
//! # Ok(())
//! # }
//! ```

use crate::config::{EmailLinkConfig, FirebaseConfig};
use crate::error::{AuthError, Result};
use crate::providers::{IdentityProvider, extract_oob_code, is_completion_link};
use crate::state::IdentityAssertion;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Identity Toolkit error codes meaning "this link can't be redeemed".
const LINK_REJECTION_CODES: [&str; 3] = ["INVALID_OOB_CODE", "EXPIRED_OOB_CODE", "INVALID_EMAIL"];

/// Supplies the Google ID token obtained by the presentation layer's popup.
pub trait IdTokenSource: Send + Sync {
    /// Run (or await) the popup and return its ID token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AuthProviderError`] if the popup was closed or failed.
    fn id_token(&self) -> impl Future<Output = Result<String>> + Send;
}

/// [`IdTokenSource`] that always hands out the same token.
///
/// For command-line tools and tests where the token is obtained out of band.
#[derive(Debug, Clone)]
pub struct StaticIdToken(String);

impl StaticIdToken {
    /// Wrap a token.
    #[must_use]
    pub const fn new(token: String) -> Self {
        Self(token)
    }
}

impl IdTokenSource for StaticIdToken {
    async fn id_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Tokens of the signed-in provider user.
#[derive(Debug, Clone)]
pub(crate) struct ProviderSession {
    pub(crate) uid: String,
    pub(crate) id_token: String,
    pub(crate) refresh_token: Option<String>,
}

/// Shared view of the user signed in through an [`IdentityToolkitProvider`].
///
/// Clones observe the same session, so a store holding one authenticates its
/// requests as whoever the provider last signed in.
#[derive(Debug, Clone, Default)]
pub struct SignedInUser {
    session: Arc<RwLock<Option<ProviderSession>>>,
}

impl SignedInUser {
    /// ID token of the signed-in user, `None` when signed out.
    pub async fn id_token(&self) -> Option<String> {
        self.session.read().await.as_ref().map(|s| s.id_token.clone())
    }

    pub(crate) async fn replace(&self, session: ProviderSession) {
        *self.session.write().await = Some(session);
    }

    pub(crate) async fn take(&self) -> Option<ProviderSession> {
        self.session.write().await.take()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendOobCodeRequest<'a> {
    request_type: &'static str,
    email: &'a str,
    continue_url: &'a str,
    can_handle_code_in_app: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithEmailLinkRequest<'a> {
    email: &'a str,
    oob_code: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithIdpRequest<'a> {
    post_body: String,
    request_uri: &'a str,
    return_secure_token: bool,
    return_idp_credential: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Identity provider backed by the Identity Toolkit REST API.
#[derive(Clone, Debug)]
pub struct IdentityToolkitProvider<G> {
    http_client: Client,
    base_url: String,
    api_key: String,
    continue_url: String,
    handle_code_in_app: bool,
    google: G,
    session: SignedInUser,
}

impl<G: IdTokenSource> IdentityToolkitProvider<G> {
    /// Build the provider.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ConfigError`] if the configuration is incomplete or
    /// the HTTP client cannot be built.
    pub fn new(firebase: &FirebaseConfig, email_link: &EmailLinkConfig, google: G) -> Result<Self> {
        firebase.validate()?;

        let http_client = Client::builder()
            .timeout(firebase.request_timeout)
            .build()
            .map_err(|e| AuthError::ConfigError(format!("HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: firebase.identity_toolkit_url.trim_end_matches('/').to_string(),
            api_key: firebase.api_key.clone(),
            continue_url: email_link.continue_url.clone(),
            handle_code_in_app: email_link.handle_code_in_app,
            google,
            session: SignedInUser::default(),
        })
    }

    /// Handle on this provider's signed-in user, for authenticating store calls.
    #[must_use]
    pub fn signed_in_user(&self) -> SignedInUser {
        self.session.clone()
    }

    async fn call<B: Serialize + Sync>(&self, method: &str, body: &B) -> Result<reqwest::Response> {
        let url = format!("{}/accounts:{method}", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await?;
        Ok(response)
    }

    async fn sign_in(&self, response: reqwest::Response, rejecting: bool) -> Result<IdentityAssertion> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body, rejecting));
        }

        let signed_in: SignInResponse = response.json().await?;
        let assertion = IdentityAssertion {
            uid: signed_in.local_id.clone(),
            email: signed_in.email.unwrap_or_default(),
            display_name: signed_in.display_name.filter(|n| !n.trim().is_empty()),
        };

        self.session
            .replace(ProviderSession {
                uid: signed_in.local_id,
                id_token: signed_in.id_token,
                refresh_token: signed_in.refresh_token,
            })
            .await;

        Ok(assertion)
    }
}

/// Map a failed Identity Toolkit response to an [`AuthError`].
///
/// With `rejecting` set, link-specific codes become [`AuthError::LinkRejected`].
fn classify_failure(status: StatusCode, body: &str, rejecting: bool) -> AuthError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| status.to_string());

    // Messages look like "INVALID_OOB_CODE" or "INVALID_EMAIL : detail"
    let code = message.split([' ', ':']).next().unwrap_or_default();

    if rejecting && status == StatusCode::BAD_REQUEST && LINK_REJECTION_CODES.contains(&code) {
        AuthError::LinkRejected(message)
    } else {
        tracing::error!(%status, "Identity Toolkit request failed: {}", message);
        AuthError::AuthProviderError(message)
    }
}

impl<G: IdTokenSource> IdentityProvider for IdentityToolkitProvider<G> {
    async fn authenticate_federated(&self) -> Result<IdentityAssertion> {
        let id_token = self.google.id_token().await?;
        let post_body = serde_urlencoded::to_string([
            ("id_token", id_token.as_str()),
            ("providerId", "google.com"),
        ])
        .map_err(|e| AuthError::AuthProviderError(e.to_string()))?;

        let response = self
            .call(
                "signInWithIdp",
                &SignInWithIdpRequest {
                    post_body,
                    request_uri: &self.continue_url,
                    return_secure_token: true,
                    return_idp_credential: true,
                },
            )
            .await?;

        self.sign_in(response, false).await
    }

    async fn send_passwordless_link(&self, email: &str) -> Result<()> {
        let response = self
            .call(
                "sendOobCode",
                &SendOobCodeRequest {
                    request_type: "EMAIL_SIGNIN",
                    email,
                    continue_url: &self.continue_url,
                    can_handle_code_in_app: self.handle_code_in_app,
                },
            )
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body, false));
        }

        tracing::info!("Sign-in link requested");
        Ok(())
    }

    fn is_completion_link(&self, location: &str) -> bool {
        is_completion_link(location)
    }

    async fn complete_link(&self, email: &str, location: &str) -> Result<IdentityAssertion> {
        let oob_code = extract_oob_code(location)
            .ok_or_else(|| AuthError::LinkRejected("not a sign-in link".to_string()))?;

        let response = self
            .call(
                "signInWithEmailLink",
                &SignInWithEmailLinkRequest {
                    email,
                    oob_code: &oob_code,
                },
            )
            .await?;

        self.sign_in(response, true).await
    }

    async fn sign_out(&self) -> Result<()> {
        // Identity Toolkit has no server-side sign-out; dropping the tokens is it
        if let Some(session) = self.session.take().await {
            tracing::debug!(
                uid = %session.uid,
                had_refresh_token = session.refresh_token.is_some(),
                "Provider session dropped"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> Result<IdentityToolkitProvider<StaticIdToken>> {
        IdentityToolkitProvider::new(
            &FirebaseConfig::new("key".to_string(), "clinic".to_string()),
            &EmailLinkConfig::new("https://portal.test/finishSignIn".to_string()),
            StaticIdToken::new("tok".to_string()),
        )
    }

    #[test]
    fn test_expired_code_is_a_link_rejection() {
        let body = r#"{"error":{"code":400,"message":"EXPIRED_OOB_CODE","errors":[]}}"#;
        assert_eq!(
            classify_failure(StatusCode::BAD_REQUEST, body, true),
            AuthError::LinkRejected("EXPIRED_OOB_CODE".to_string())
        );
    }

    #[test]
    fn test_code_with_detail_is_a_link_rejection() {
        let body = r#"{"error":{"code":400,"message":"INVALID_EMAIL : The email address is badly formatted."}}"#;
        assert!(matches!(
            classify_failure(StatusCode::BAD_REQUEST, body, true),
            AuthError::LinkRejected(_)
        ));
    }

    #[test]
    fn test_other_failures_are_provider_errors() {
        let body = r#"{"error":{"code":400,"message":"INVALID_OOB_CODE"}}"#;
        assert!(matches!(
            classify_failure(StatusCode::BAD_REQUEST, body, false),
            AuthError::AuthProviderError(_)
        ));
        assert_eq!(
            classify_failure(StatusCode::SERVICE_UNAVAILABLE, "<html>", true),
            AuthError::AuthProviderError("503 Service Unavailable".to_string())
        );
    }

    #[test]
    fn test_send_oob_code_body_shape() -> std::result::Result<(), serde_json::Error> {
        let body = serde_json::to_value(SendOobCodeRequest {
            request_type: "EMAIL_SIGNIN",
            email: "ann@clinic.se",
            continue_url: "https://portal.test/finishSignIn",
            can_handle_code_in_app: true,
        })?;
        assert_eq!(body["requestType"], "EMAIL_SIGNIN");
        assert_eq!(body["canHandleCodeInApp"], true);
        assert_eq!(body["continueUrl"], "https://portal.test/finishSignIn");
        Ok(())
    }

    #[tokio::test]
    async fn test_non_link_location_is_rejected_without_a_request() -> Result<()> {
        let identity = provider()?;
        assert!(!identity.is_completion_link("https://portal.test/login"));

        let result = identity
            .complete_link("ann@clinic.se", "https://portal.test/login")
            .await;
        assert!(matches!(result, Err(AuthError::LinkRejected(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_sign_out_without_session_is_ok() -> Result<()> {
        let identity = provider()?;
        identity.sign_out().await?;
        assert_eq!(identity.signed_in_user().id_token().await, None);
        Ok(())
    }

    #[test]
    fn test_missing_api_key_is_a_config_error() {
        let result = IdentityToolkitProvider::new(
            &FirebaseConfig::default(),
            &EmailLinkConfig::default(),
            StaticIdToken::new(String::new()),
        );
        assert!(matches!(result, Err(AuthError::ConfigError(_))));
    }
}
