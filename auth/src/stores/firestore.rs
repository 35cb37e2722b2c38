//! Firestore profile store (REST).
//!
//! Profiles are documents `{collection}/{uid}` with typed fields:
//!
//! ```json
//! { "fields": {
//!     "uid":       { "stringValue": "u-1" },
//!     "email":     { "stringValue": "ann@clinic.se" },
//!     "name":      { "stringValue": "Ann" },
//!     "role":      { "stringValue": "nurse" },
//!     "createdAt": { "timestampValue": "2025-01-01T00:00:00Z" } } }
//! ```

use crate::config::FirebaseConfig;
use crate::error::{AuthError, Result};
use crate::providers::ProfileStore;
use crate::state::{ProfileRecord, Role};
use crate::stores::SignedInUser;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    fields: Map<String, Value>,
}

impl Document {
    /// Field `key` if it holds a value of `kind` (`stringValue`, ...).
    fn typed(&self, key: &str, kind: &str) -> Option<&str> {
        self.fields.get(key)?.get(kind)?.as_str()
    }
}

/// Profile store backed by Firestore's REST API.
#[derive(Clone, Debug)]
pub struct FirestoreProfileStore {
    http_client: Client,
    documents_url: String,
    api_key: String,
    signed_in: Option<SignedInUser>,
}

impl FirestoreProfileStore {
    /// Build the store from Firebase configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ConfigError`] if the configuration is incomplete or
    /// the HTTP client cannot be built.
    pub fn new(config: &FirebaseConfig) -> Result<Self> {
        config.validate()?;

        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AuthError::ConfigError(format!("HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            documents_url: format!(
                "{}/projects/{}/databases/(default)/documents/{}",
                config.firestore_url.trim_end_matches('/'),
                config.project_id,
                config.profile_collection
            ),
            api_key: config.api_key.clone(),
            signed_in: None,
        })
    }

    /// Send the ID token of `user` with every request.
    ///
    /// Security rules that check `request.auth` reject unauthenticated calls,
    /// so live deployments share the identity provider's user here.
    #[must_use]
    pub fn with_signed_in_user(mut self, user: SignedInUser) -> Self {
        self.signed_in = Some(user);
        self
    }

    async fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.query(&[("key", self.api_key.as_str())]);
        let token = match &self.signed_in {
            Some(user) => user.id_token().await,
            None => None,
        };
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn document_url(&self, uid: &str) -> Result<String> {
        if uid.is_empty() || uid.contains('/') {
            return Err(AuthError::StoreError(format!("`{uid}` is not a valid document id")));
        }
        Ok(format!("{}/{uid}", self.documents_url))
    }
}

fn store_error(context: &str, error: impl std::fmt::Display) -> AuthError {
    AuthError::StoreError(format!("{context}: {error}"))
}

fn encode(record: &ProfileRecord) -> Document {
    let mut fields = Map::new();
    fields.insert("uid".to_string(), json!({ "stringValue": record.uid }));
    fields.insert("email".to_string(), json!({ "stringValue": record.email }));
    fields.insert("name".to_string(), json!({ "stringValue": record.name }));
    fields.insert("role".to_string(), json!({ "stringValue": record.role.as_str() }));
    fields.insert(
        "createdAt".to_string(),
        json!({ "timestampValue": record.created_at.to_rfc3339_opts(SecondsFormat::Micros, true) }),
    );
    Document { fields }
}

fn decode(uid: &str, document: &Document) -> Result<ProfileRecord> {
    let string_field = |key: &str| {
        document
            .typed(key, "stringValue")
            .map(str::to_string)
            .ok_or_else(|| {
                AuthError::StoreError(format!("profile {uid}: field `{key}` missing or not a string"))
            })
    };

    let role = string_field("role")?
        .parse::<Role>()
        .map_err(|e| store_error(&format!("profile {uid}"), e))?;

    let created_at = document
        .typed("createdAt", "timestampValue")
        .ok_or_else(|| {
            AuthError::StoreError(format!(
                "profile {uid}: field `createdAt` missing or not a timestamp"
            ))
        })
        .and_then(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| store_error(&format!("profile {uid}: createdAt"), e))
        })?;

    Ok(ProfileRecord {
        uid: string_field("uid").unwrap_or_else(|_| uid.to_string()),
        email: string_field("email")?,
        // Older documents may lack a name
        name: string_field("name").unwrap_or_default(),
        role,
        created_at,
    })
}

impl ProfileStore for FirestoreProfileStore {
    async fn get(&self, uid: &str) -> Result<Option<ProfileRecord>> {
        let url = self.document_url(uid)?;

        let response = self
            .authorize(self.http_client.get(&url))
            .await
            .send()
            .await
            .map_err(|e| store_error("profile lookup", e))?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(uid, "No profile document");
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            tracing::error!(uid, %status, "Firestore lookup failed: {}", error_body);
            return Err(store_error("profile lookup", status));
        }

        let document: Document = response
            .json()
            .await
            .map_err(|e| store_error("profile lookup", e))?;

        decode(uid, &document).map(Some)
    }

    async fn put(&self, uid: &str, record: &ProfileRecord) -> Result<()> {
        let url = self.document_url(uid)?;

        let response = self
            .authorize(self.http_client.patch(&url))
            .await
            .json(&encode(record))
            .send()
            .await
            .map_err(|e| store_error("profile write", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            tracing::error!(uid, %status, "Firestore write failed: {}", error_body);
            return Err(store_error("profile write", status));
        }

        tracing::debug!(uid, "Profile document written");
        Ok(())
    }
}
