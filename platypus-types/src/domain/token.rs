//! Credentials and tokens exchanged with a provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::link::ItemId;

/// Durable credential for calling the provider on behalf of one item.
///
/// Not `Display`, `Serialize` or `Clone`: the token only leaves
/// this type through [`AccessToken::expose_secret`]. Use
/// [`AccessToken::fingerprint`] when a log line needs to correlate tokens.
#[derive(PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First 8 hex characters of the token's SHA-256.
    pub fn fingerprint(&self) -> String {
        let hash = Sha256::digest(self.0.as_bytes());
        hex::encode(&hash[..4])
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccessToken(<redacted {}>)", self.fingerprint())
    }
}

/// Result of exchanging a public token.
///
/// The access token must go straight to the secrets provider.
#[derive(Debug)]
pub struct ItemToken {
    pub access_token: AccessToken,
    pub item_id: ItemId,
}

impl ItemToken {
    pub fn into_parts(self) -> (AccessToken, ItemId) {
        (self.access_token, self.item_id)
    }
}

/// Short-lived token used by a client surface to start a new link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkToken {
    pub link_token: String,
    pub expiration: DateTime<Utc>,
    pub request_id: Option<String>,
}

impl LinkToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiration
    }
}

/// Per-user details for link token creation.
#[derive(Debug, Default)]
pub struct LinkTokenOptions {
    /// Stable, non-PII identifier of the end user
    pub client_user_id: String,
    pub legal_name: Option<String>,
    pub phone_number: Option<String>,
    pub email_address: Option<String>,
    /// When set, the link token re-authenticates this existing item
    pub update_mode_item: Option<AccessToken>,
}

impl LinkTokenOptions {
    pub fn for_user(client_user_id: impl Into<String>) -> Self {
        Self {
            client_user_id: client_user_id.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_access_token_debug_is_redacted() {
        let token = AccessToken::new("access-sandbox-secret-value");
        let debug = format!("{:?}", token);
        assert!(!debug.contains("secret-value"));
        assert!(debug.contains(&token.fingerprint()));
    }

    #[test]
    fn test_fingerprint_is_stable_and_short() {
        let a = AccessToken::new("access-abc");
        let b = AccessToken::new("access-abc");
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 8);
        assert_ne!(a.fingerprint(), AccessToken::new("access-xyz").fingerprint());
    }

    #[test]
    fn test_item_token_into_parts() {
        let token = ItemToken {
            access_token: AccessToken::new("access-abc"),
            item_id: ItemId::new("item-123"),
        };
        let (access, item) = token.into_parts();
        assert_eq!(access.expose_secret(), "access-abc");
        assert_eq!(item.as_str(), "item-123");
    }

    #[test]
    fn test_link_token_expiry() {
        let now = Utc::now();
        let token = LinkToken {
            link_token: "link-sandbox-1".into(),
            expiration: now + Duration::hours(4),
            request_id: None,
        };
        assert!(!token.is_expired_at(now));
        assert!(token.is_expired_at(now + Duration::hours(4)));
    }
}
