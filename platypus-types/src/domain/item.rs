use serde::{Deserialize, Serialize};

use super::link::ItemId;

/// Health of a linked item as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStatus {
    pub item_id: ItemId,
    pub institution_id: Option<String>,
    pub webhook_url: Option<String>,
    /// Provider error code when the item needs attention (e.g. `ITEM_LOGIN_REQUIRED`)
    pub error_code: Option<String>,
    #[serde(default)]
    pub consented_products: Vec<String>,
}

impl ItemStatus {
    pub fn is_healthy(&self) -> bool {
        self.error_code.is_none()
    }

    pub fn requires_login(&self) -> bool {
        self.error_code.as_deref() == Some("ITEM_LOGIN_REQUIRED")
    }
}
