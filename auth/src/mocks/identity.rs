//! Mock identity provider for testing.

use crate::error::{AuthError, Result};
use crate::providers::{IdentityProvider, is_completion_link};
use crate::state::IdentityAssertion;
use std::future::Future;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Inner {
    federated: Option<Result<IdentityAssertion>>,
    link: Option<Result<IdentityAssertion>>,
    send_failure: Option<AuthError>,
    sign_out_failure: Option<AuthError>,
    sent_links: Vec<String>,
    redeemed_links: Vec<(String, String)>,
    sign_out_calls: usize,
}

/// Mock identity provider.
///
/// Answers with pre-configured assertions and records every call. Clones
/// share configuration and call history.
#[derive(Debug, Clone, Default)]
pub struct MockIdentityProvider {
    inner: Arc<Mutex<Inner>>,
}

impl MockIdentityProvider {
    /// Create a provider with nothing configured.
    ///
    /// Unconfigured sign-ins fail with [`AuthError::AuthProviderError`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn configure(self, change: impl FnOnce(&mut Inner)) -> Self {
        if let Ok(mut inner) = self.inner.lock() {
            change(&mut inner);
        }
        self
    }

    fn read<T>(&self, f: impl FnOnce(&Inner) -> T) -> Option<T> {
        self.inner.lock().ok().map(|inner| f(&inner))
    }

    /// Popup sign-in returns `assertion`.
    #[must_use]
    pub fn with_federated_assertion(self, assertion: IdentityAssertion) -> Self {
        self.configure(|inner| inner.federated = Some(Ok(assertion)))
    }

    /// Popup sign-in fails with `error` (e.g. the user closed the popup).
    #[must_use]
    pub fn with_federated_failure(self, error: AuthError) -> Self {
        self.configure(|inner| inner.federated = Some(Err(error)))
    }

    /// Redeeming a completion link returns `assertion`.
    #[must_use]
    pub fn with_link_assertion(self, assertion: IdentityAssertion) -> Self {
        self.configure(|inner| inner.link = Some(Ok(assertion)))
    }

    /// Redeeming a completion link fails with [`AuthError::LinkRejected`].
    #[must_use]
    pub fn with_link_rejection(self, reason: &str) -> Self {
        let error = AuthError::LinkRejected(reason.to_string());
        self.configure(|inner| inner.link = Some(Err(error)))
    }

    /// Link requests fail with `error`.
    #[must_use]
    pub fn with_send_failure(self, error: AuthError) -> Self {
        self.configure(|inner| inner.send_failure = Some(error))
    }

    /// Sign-out fails with `error`.
    #[must_use]
    pub fn with_sign_out_failure(self, error: AuthError) -> Self {
        self.configure(|inner| inner.sign_out_failure = Some(error))
    }

    /// Addresses sign-in links were sent to, in order.
    #[must_use]
    pub fn sent_links(&self) -> Vec<String> {
        self.read(|inner| inner.sent_links.clone()).unwrap_or_default()
    }

    /// `(email, location)` pairs passed to `complete_link`, in order.
    #[must_use]
    pub fn redeemed_links(&self) -> Vec<(String, String)> {
        self.read(|inner| inner.redeemed_links.clone()).unwrap_or_default()
    }

    /// Number of `sign_out` calls.
    #[must_use]
    pub fn sign_out_calls(&self) -> usize {
        self.read(|inner| inner.sign_out_calls).unwrap_or_default()
    }
}

fn unconfigured(what: &str) -> AuthError {
    AuthError::AuthProviderError(format!("mock identity provider: no {what} configured"))
}

impl IdentityProvider for MockIdentityProvider {
    fn authenticate_federated(&self) -> impl Future<Output = Result<IdentityAssertion>> + Send {
        let inner = Arc::clone(&self.inner);

        async move {
            inner
                .lock()
                .map_err(|_| AuthError::AuthProviderError("mock lock poisoned".to_string()))?
                .federated
                .clone()
                .unwrap_or_else(|| Err(unconfigured("federated assertion")))
        }
    }

    fn send_passwordless_link(&self, email: &str) -> impl Future<Output = Result<()>> + Send {
        let inner = Arc::clone(&self.inner);
        let email = email.to_string();

        async move {
            let mut inner = inner
                .lock()
                .map_err(|_| AuthError::AuthProviderError("mock lock poisoned".to_string()))?;
            if let Some(error) = inner.send_failure.clone() {
                return Err(error);
            }
            inner.sent_links.push(email);
            Ok(())
        }
    }

    fn is_completion_link(&self, location: &str) -> bool {
        is_completion_link(location)
    }

    fn complete_link(
        &self,
        email: &str,
        location: &str,
    ) -> impl Future<Output = Result<IdentityAssertion>> + Send {
        let inner = Arc::clone(&self.inner);
        let email = email.to_string();
        let location = location.to_string();

        async move {
            if !is_completion_link(&location) {
                return Err(AuthError::LinkRejected("not a sign-in link".to_string()));
            }
            let mut inner = inner
                .lock()
                .map_err(|_| AuthError::AuthProviderError("mock lock poisoned".to_string()))?;
            inner.redeemed_links.push((email, location));
            inner
                .link
                .clone()
                .unwrap_or_else(|| Err(unconfigured("link assertion")))
        }
    }

    fn sign_out(&self) -> impl Future<Output = Result<()>> + Send {
        let inner = Arc::clone(&self.inner);

        async move {
            let mut inner = inner
                .lock()
                .map_err(|_| AuthError::AuthProviderError("mock lock poisoned".to_string()))?;
            inner.sign_out_calls += 1;
            inner.sign_out_failure.clone().map_or(Ok(()), Err)
        }
    }
}
