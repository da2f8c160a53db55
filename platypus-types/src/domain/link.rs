//! Link domain model.

use serde::{Deserialize, Serialize};

use crate::error::PlatypusError;

/// Internal account (tenant) identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(u64);

impl AccountId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AccountId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Internal link identifier, unique within an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(u64);

impl LinkId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for LinkId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Provider-assigned identifier of one linked institution connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// How a link was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    #[default]
    Plaid,
    Manual,
}

/// Plaid-specific metadata of a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaidLink {
    pub item_id: ItemId,
    pub institution_id: Option<String>,
    pub institution_name: Option<String>,
    #[serde(default)]
    pub products: Vec<String>,
    pub webhook_url: Option<String>,
}

impl PlaidLink {
    pub fn new(item_id: impl Into<ItemId>) -> Self {
        Self {
            item_id: item_id.into(),
            institution_id: None,
            institution_name: None,
            products: Vec::new(),
            webhook_url: None,
        }
    }
}

/// A bank account stored under a link, keyed by its provider account id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccountRef {
    pub bank_account_id: u64,
    pub external_account_id: String,
}

/// Connection between an internal account and one external provider item.
///
/// Owned by the link repository; read-only to the provider layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub account_id: AccountId,
    pub link_id: LinkId,
    pub link_type: LinkType,
    pub plaid_link: Option<PlaidLink>,
    #[serde(default)]
    pub bank_accounts: Vec<BankAccountRef>,
}

impl Link {
    /// Creates a Plaid-backed link.
    pub fn plaid(account_id: AccountId, link_id: LinkId, plaid_link: PlaidLink) -> Self {
        Self {
            account_id,
            link_id,
            link_type: LinkType::Plaid,
            plaid_link: Some(plaid_link),
            bank_accounts: Vec::new(),
        }
    }

    /// Creates a link with no provider metadata.
    pub fn manual(account_id: AccountId, link_id: LinkId) -> Self {
        Self {
            account_id,
            link_id,
            link_type: LinkType::Manual,
            plaid_link: None,
            bank_accounts: Vec::new(),
        }
    }

    /// Returns the provider item id, or `InvalidLink` when the link carries
    /// no Plaid metadata.
    pub fn plaid_item_id(&self) -> Result<&ItemId, PlatypusError> {
        self.plaid_link
            .as_ref()
            .map(|p| &p.item_id)
            .ok_or_else(|| {
                PlatypusError::InvalidLink(format!(
                    "link {} of account {} has no plaid details",
                    self.link_id, self.account_id
                ))
            })
    }

    /// External account ids of the bank accounts stored under this link.
    pub fn external_account_ids(&self) -> Vec<String> {
        self.bank_accounts
            .iter()
            .map(|b| b.external_account_id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_plaid_item_id() {
        let link = Link::plaid(AccountId::new(1), LinkId::new(2), PlaidLink::new("item-123"));
        assert_eq!(link.plaid_item_id().unwrap().as_str(), "item-123");
    }

    #[test]
    fn test_manual_link_has_no_item() {
        let link = Link::manual(AccountId::new(1), LinkId::new(2));
        let err = link.plaid_item_id().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidLink);
    }

    #[test]
    fn test_ids_parse() {
        assert_eq!("42".parse::<AccountId>().unwrap(), AccountId::new(42));
        assert!("abc".parse::<LinkId>().is_err());
    }
}
