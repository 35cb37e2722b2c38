//! Authentication configuration.
//!
//! Configuration structures for the adapters and flows. Values come from
//! the application (usually via [`AuthConfig::from_env`]), never from
//! constants buried in reducers.

use crate::error::{AuthError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Email-link (passwordless) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailLinkConfig {
    /// Where the provider sends the user after they click the link.
    ///
    /// The completion link arrives at this URL with `mode=signIn&oobCode=…`.
    pub continue_url: String,

    /// Ask the provider to open the link in the app rather than a hosted page.
    ///
    /// Default: `true` (required for email-link sign-in)
    pub handle_code_in_app: bool,
}

impl EmailLinkConfig {
    /// Create configuration for the given continue URL.
    #[must_use]
    pub const fn new(continue_url: String) -> Self {
        Self {
            continue_url,
            handle_code_in_app: true,
        }
    }

    /// Set whether the link is handled in-app.
    #[must_use]
    pub const fn with_handle_code_in_app(mut self, in_app: bool) -> Self {
        self.handle_code_in_app = in_app;
        self
    }
}

impl Default for EmailLinkConfig {
    fn default() -> Self {
        Self::new("http://localhost:5173/finishSignIn".to_string())
    }
}

/// Firebase project configuration for the REST adapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirebaseConfig {
    /// Web API key.
    pub api_key: String,

    /// Project id (Firestore database path).
    pub project_id: String,

    /// Identity Toolkit endpoint root.
    ///
    /// Default: `https://identitytoolkit.googleapis.com/v1`
    pub identity_toolkit_url: String,

    /// Firestore endpoint root.
    ///
    /// Default: `https://firestore.googleapis.com/v1`
    pub firestore_url: String,

    /// Collection profile documents live in.
    ///
    /// Default: `users`
    pub profile_collection: String,

    /// Per-request timeout.
    ///
    /// Default: 10 seconds
    pub request_timeout: Duration,
}

impl FirebaseConfig {
    /// Create configuration for a project.
    #[must_use]
    pub fn new(api_key: String, project_id: String) -> Self {
        Self {
            api_key,
            project_id,
            ..Self::default()
        }
    }

    /// Point both adapters at another host (emulator, test server).
    #[must_use]
    pub fn with_endpoints(mut self, identity_toolkit_url: String, firestore_url: String) -> Self {
        self.identity_toolkit_url = identity_toolkit_url;
        self.firestore_url = firestore_url;
        self
    }

    /// Store profiles in another collection.
    #[must_use]
    pub fn with_profile_collection(mut self, collection: String) -> Self {
        self.profile_collection = collection;
        self
    }

    /// Set per-request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Check that the adapters can be built from this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ConfigError`] if the API key or project id is
    /// empty.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(AuthError::ConfigError("Firebase API key is not set".to_string()));
        }
        if self.project_id.trim().is_empty() {
            return Err(AuthError::ConfigError(
                "Firebase project id is not set".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            project_id: String::new(),
            identity_toolkit_url: "https://identitytoolkit.googleapis.com/v1".to_string(),
            firestore_url: "https://firestore.googleapis.com/v1".to_string(),
            profile_collection: "users".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Simulated e-ID challenge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecondFactorConfig {
    /// Prefix of the QR payload URL.
    ///
    /// Default: `https://example.com/mockbankid`
    pub base_url: String,
}

impl SecondFactorConfig {
    /// Set the QR payload prefix.
    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

impl Default for SecondFactorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://example.com/mockbankid".to_string(),
        }
    }
}

/// Pending-registration cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingCacheConfig {
    /// JSON file backing the cache.
    ///
    /// Default: `.carebridge/pending.json`
    pub path: PathBuf,
}

impl Default for PendingCacheConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".carebridge/pending.json"),
        }
    }
}

/// Complete auth configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Email-link flow
    pub email_link: EmailLinkConfig,
    /// Firebase REST adapters
    pub firebase: FirebaseConfig,
    /// e-ID challenge
    pub second_factor: SecondFactorConfig,
    /// Pending-registration cache
    pub pending_cache: PendingCacheConfig,
}

impl AuthConfig {
    /// Load configuration from `CAREBRIDGE_*` environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `CAREBRIDGE_CONTINUE_URL` | `http://localhost:5173/finishSignIn` |
    /// | `CAREBRIDGE_HANDLE_CODE_IN_APP` | `true` |
    /// | `CAREBRIDGE_FIREBASE_API_KEY` | empty |
    /// | `CAREBRIDGE_FIREBASE_PROJECT_ID` | empty |
    /// | `CAREBRIDGE_IDENTITY_TOOLKIT_URL` | Google endpoint |
    /// | `CAREBRIDGE_FIRESTORE_URL` | Google endpoint |
    /// | `CAREBRIDGE_PROFILE_COLLECTION` | `users` |
    /// | `CAREBRIDGE_REQUEST_TIMEOUT_SECS` | `10` |
    /// | `CAREBRIDGE_EID_BASE_URL` | `https://example.com/mockbankid` |
    /// | `CAREBRIDGE_PENDING_CACHE_PATH` | `.carebridge/pending.json` |
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            email_link: EmailLinkConfig {
                continue_url: env::var("CAREBRIDGE_CONTINUE_URL")
                    .unwrap_or(defaults.email_link.continue_url),
                handle_code_in_app: env::var("CAREBRIDGE_HANDLE_CODE_IN_APP")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.email_link.handle_code_in_app),
            },
            firebase: FirebaseConfig {
                api_key: env::var("CAREBRIDGE_FIREBASE_API_KEY").unwrap_or_default(),
                project_id: env::var("CAREBRIDGE_FIREBASE_PROJECT_ID").unwrap_or_default(),
                identity_toolkit_url: env::var("CAREBRIDGE_IDENTITY_TOOLKIT_URL")
                    .unwrap_or(defaults.firebase.identity_toolkit_url),
                firestore_url: env::var("CAREBRIDGE_FIRESTORE_URL")
                    .unwrap_or(defaults.firebase.firestore_url),
                profile_collection: env::var("CAREBRIDGE_PROFILE_COLLECTION")
                    .unwrap_or(defaults.firebase.profile_collection),
                request_timeout: env::var("CAREBRIDGE_REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .map_or(defaults.firebase.request_timeout, Duration::from_secs),
            },
            second_factor: SecondFactorConfig {
                base_url: env::var("CAREBRIDGE_EID_BASE_URL")
                    .unwrap_or(defaults.second_factor.base_url),
            },
            pending_cache: PendingCacheConfig {
                path: env::var("CAREBRIDGE_PENDING_CACHE_PATH")
                    .map_or(defaults.pending_cache.path, PathBuf::from),
            },
        }
    }
}
