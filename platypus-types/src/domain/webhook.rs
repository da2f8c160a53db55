use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public key used to verify signatures of inbound provider webhooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookVerificationKey {
    pub key_id: String,
    pub algorithm: String,
    pub curve: String,
    pub key_type: String,
    pub key_use: String,
    pub x: String,
    pub y: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl WebhookVerificationKey {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires| now < expires)
    }
}
