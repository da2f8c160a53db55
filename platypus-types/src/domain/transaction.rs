//! Transaction domain model.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A bank transaction retrieved through a provider.
///
/// Amounts follow the provider's sign convention: positive values are money
/// leaving the account, negative values are money coming in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    /// Provider account id the transaction was posted to
    pub account_id: String,
    /// Amount in major units of `currency`
    pub amount: Decimal,
    pub currency: String,
    pub date: NaiveDate,
    pub authorized_date: Option<NaiveDate>,
    pub name: String,
    pub merchant_name: Option<String>,
    #[serde(default)]
    pub category: Vec<String>,
    pub pending: bool,
    /// Set on posted transactions that replaced a pending one
    pub pending_transaction_id: Option<String>,
}

impl Transaction {
    /// Name to show to a user: the merchant when known, otherwise the raw name.
    pub fn display_name(&self) -> &str {
        self.merchant_name
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transaction(merchant: Option<&str>) -> Transaction {
        Transaction {
            transaction_id: "txn-1".into(),
            account_id: "acc-1".into(),
            amount: Decimal::new(425, 2),
            currency: "USD".into(),
            date: NaiveDate::from_ymd_opt(2021, 3, 4).unwrap(),
            authorized_date: None,
            name: "SQ *COFFEE SHOP 1234".into(),
            merchant_name: merchant.map(String::from),
            category: vec!["Food and Drink".into()],
            pending: false,
            pending_transaction_id: None,
        }
    }

    #[test]
    fn test_display_name_prefers_merchant() {
        assert_eq!(transaction(Some("Coffee Shop")).display_name(), "Coffee Shop");
    }

    #[test]
    fn test_display_name_falls_back_to_name() {
        assert_eq!(transaction(None).display_name(), "SQ *COFFEE SHOP 1234");
        assert_eq!(transaction(Some("  ")).display_name(), "SQ *COFFEE SHOP 1234");
    }
}
