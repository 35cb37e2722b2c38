//! Simulated national e-ID challenge.
//!
//! Issuing a challenge produces the URL a QR code would encode. Nothing on
//! the other end verifies it; the portal only shows the code.

use crate::config::SecondFactorConfig;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// One issued challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondFactorChallenge {
    /// 128-bit random token, base64url without padding (22 characters).
    pub token: String,

    /// `{base_url}/{token}`
    pub payload_url: String,

    /// When the challenge was issued.
    pub issued_at: DateTime<Utc>,
}

/// Issues [`SecondFactorChallenge`]s against a configured base URL.
#[derive(Debug, Clone)]
pub struct SecondFactorIssuer {
    base_url: String,
}

impl SecondFactorIssuer {
    /// Create an issuer from configuration.
    #[must_use]
    pub fn new(config: &SecondFactorConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Issue a fresh challenge stamped with `now`.
    #[must_use]
    pub fn issue(&self, now: DateTime<Utc>) -> SecondFactorChallenge {
        let token = generate_token();
        SecondFactorChallenge {
            payload_url: format!("{}/{token}", self.base_url),
            token,
            issued_at: now,
        }
    }
}

impl Default for SecondFactorIssuer {
    fn default() -> Self {
        Self::new(&SecondFactorConfig::default())
    }
}

fn generate_token() -> String {
    let mut random_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut random_bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(random_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use carebridge_testing::test_instant;

    #[test]
    fn test_issue_builds_payload_from_base_url() {
        let issuer = SecondFactorIssuer::default();
        let challenge = issuer.issue(test_instant());

        assert_eq!(challenge.token.len(), 22);
        assert_eq!(
            challenge.payload_url,
            format!("https://example.com/mockbankid/{}", challenge.token)
        );
        assert_eq!(challenge.issued_at, test_instant());
    }

    #[test]
    fn test_tokens_are_url_safe_and_unique() {
        let issuer = SecondFactorIssuer::new(
            &SecondFactorConfig::default().with_base_url("https://eid.test/qr/".to_string()),
        );
        let a = issuer.issue(test_instant());
        let b = issuer.issue(test_instant());

        assert_ne!(a.token, b.token);
        assert!(a.payload_url.starts_with("https://eid.test/qr/"));
        assert!(!a.payload_url.contains("qr//"));
        assert!(
            a.token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }
}
