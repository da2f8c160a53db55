//! Conversion from Plaid wire models to domain types.
//!
//! Every function here is pure. Required fields that are absent or empty
//! produce [`ConversionError::MissingField`]; fields that are present but
//! unparsable produce [`ConversionError::InvalidField`].

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use platypus_types::{
    AccessToken, BankAccount, BankAccountBalances, BankAccountType, ConversionError, ItemId,
    ItemStatus, ItemToken, LinkToken, Transaction, WebhookVerificationKey,
};
use rust_decimal::Decimal;

use crate::wire::{
    LinkTokenCreateResponse, PlaidAccount, PlaidItem, PlaidJwk, PlaidTransaction,
    PublicTokenExchangeResponse,
};

fn required(
    value: Option<String>,
    entity: &'static str,
    field: &'static str,
) -> Result<String, ConversionError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConversionError::MissingField { entity, field })
}

fn currency(
    iso: Option<String>,
    unofficial: Option<String>,
    entity: &'static str,
) -> Result<String, ConversionError> {
    let code = iso.filter(|c| !c.is_empty()).or(unofficial);
    required(code, entity, "iso_currency_code")
}

fn parse_date(
    value: &str,
    entity: &'static str,
    field: &'static str,
) -> Result<NaiveDate, ConversionError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| ConversionError::InvalidField {
        entity,
        field,
        reason: format!("{value:?}: {e}"),
    })
}

/// Reads a JSON number as the decimal it was written as.
///
/// `f64` display is the shortest string that round-trips, so `0.00012345`
/// stays `0.00012345` instead of picking up binary noise.
fn decimal(
    value: f64,
    entity: &'static str,
    field: &'static str,
) -> Result<Decimal, ConversionError> {
    Decimal::from_str(&value.to_string()).map_err(|e| ConversionError::InvalidField {
        entity,
        field,
        reason: format!("{value}: {e}"),
    })
}

fn optional_amount(
    value: Option<f64>,
    entity: &'static str,
    field: &'static str,
) -> Result<Option<Decimal>, ConversionError> {
    value.map(|v| decimal(v, entity, field)).transpose()
}

fn timestamp(
    secs: i64,
    entity: &'static str,
    field: &'static str,
) -> Result<DateTime<Utc>, ConversionError> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| ConversionError::InvalidField {
        entity,
        field,
        reason: format!("timestamp {secs} is out of range"),
    })
}

/// Converts one Plaid account.
pub fn bank_account_from_plaid(account: PlaidAccount) -> Result<BankAccount, ConversionError> {
    const ENTITY: &str = "account";

    let account_id = required(account.account_id, ENTITY, "account_id")?;
    let name = required(account.name, ENTITY, "name")?;
    let balances = account
        .balances
        .ok_or(ConversionError::MissingField { entity: ENTITY, field: "balances" })?;
    let currency = currency(
        balances.iso_currency_code,
        balances.unofficial_currency_code,
        ENTITY,
    )?;

    Ok(BankAccount {
        account_id,
        name,
        official_name: account.official_name,
        mask: account.mask,
        account_type: account
            .account_type
            .as_deref()
            .map(BankAccountType::from_provider)
            .unwrap_or(BankAccountType::Other),
        sub_type: account.subtype,
        currency,
        balances: BankAccountBalances {
            available: optional_amount(balances.available, ENTITY, "available")?,
            current: optional_amount(balances.current, ENTITY, "current")?,
            limit: optional_amount(balances.limit, ENTITY, "limit")?,
        },
    })
}

/// Converts every account or none: the first failure aborts the batch.
pub fn bank_accounts_from_plaid(
    accounts: Vec<PlaidAccount>,
) -> Result<Vec<BankAccount>, ConversionError> {
    accounts.into_iter().map(bank_account_from_plaid).collect()
}

/// Converts one Plaid transaction.
pub fn transaction_from_plaid(txn: PlaidTransaction) -> Result<Transaction, ConversionError> {
    const ENTITY: &str = "transaction";

    let transaction_id = required(txn.transaction_id, ENTITY, "transaction_id")?;
    let account_id = required(txn.account_id, ENTITY, "account_id")?;
    let amount = txn
        .amount
        .ok_or(ConversionError::MissingField { entity: ENTITY, field: "amount" })?;
    let amount = decimal(amount, ENTITY, "amount")?;
    let date = required(txn.date, ENTITY, "date")?;
    let date = parse_date(&date, ENTITY, "date")?;
    let authorized_date = txn
        .authorized_date
        .filter(|d| !d.is_empty())
        .map(|d| parse_date(&d, ENTITY, "authorized_date"))
        .transpose()?;

    Ok(Transaction {
        transaction_id,
        account_id,
        amount,
        currency: currency(txn.iso_currency_code, txn.unofficial_currency_code, ENTITY)?,
        date,
        authorized_date,
        name: required(txn.name, ENTITY, "name")?,
        merchant_name: txn.merchant_name,
        category: txn.category.unwrap_or_default(),
        pending: txn.pending.unwrap_or(false),
        pending_transaction_id: txn.pending_transaction_id,
    })
}

pub fn transactions_from_plaid(
    txns: Vec<PlaidTransaction>,
) -> Result<Vec<Transaction>, ConversionError> {
    txns.into_iter().map(transaction_from_plaid).collect()
}

pub fn item_token_from_plaid(
    response: PublicTokenExchangeResponse,
) -> Result<ItemToken, ConversionError> {
    const ENTITY: &str = "public token exchange";

    let access_token = required(response.access_token, ENTITY, "access_token")?;
    let item_id = required(response.item_id, ENTITY, "item_id")?;
    Ok(ItemToken {
        access_token: AccessToken::new(access_token),
        item_id: ItemId::new(item_id),
    })
}

pub fn link_token_from_plaid(
    response: LinkTokenCreateResponse,
) -> Result<LinkToken, ConversionError> {
    const ENTITY: &str = "link token";

    let link_token = required(response.link_token, ENTITY, "link_token")?;
    let expiration = required(response.expiration, ENTITY, "expiration")?;
    let expiration = DateTime::parse_from_rfc3339(&expiration)
        .map_err(|e| ConversionError::InvalidField {
            entity: ENTITY,
            field: "expiration",
            reason: format!("{expiration:?}: {e}"),
        })?
        .with_timezone(&Utc);

    Ok(LinkToken {
        link_token,
        expiration,
        request_id: response.request_id,
    })
}

pub fn webhook_key_from_plaid(key: PlaidJwk) -> Result<WebhookVerificationKey, ConversionError> {
    const ENTITY: &str = "webhook verification key";

    let created_at = key
        .created_at
        .ok_or(ConversionError::MissingField { entity: ENTITY, field: "created_at" })?;

    Ok(WebhookVerificationKey {
        key_id: required(key.kid, ENTITY, "kid")?,
        algorithm: required(key.alg, ENTITY, "alg")?,
        curve: required(key.crv, ENTITY, "crv")?,
        key_type: required(key.kty, ENTITY, "kty")?,
        key_use: required(key.key_use, ENTITY, "use")?,
        x: required(key.x, ENTITY, "x")?,
        y: required(key.y, ENTITY, "y")?,
        created_at: timestamp(created_at, ENTITY, "created_at")?,
        expires_at: key
            .expired_at
            .map(|secs| timestamp(secs, ENTITY, "expired_at"))
            .transpose()?,
    })
}

pub fn item_status_from_plaid(item: PlaidItem) -> Result<ItemStatus, ConversionError> {
    Ok(ItemStatus {
        item_id: ItemId::new(required(item.item_id, "item", "item_id")?),
        institution_id: item.institution_id,
        webhook_url: item.webhook.filter(|w| !w.is_empty()),
        error_code: item
            .error
            .map(|e| e.error_code)
            .filter(|code| !code.is_empty()),
        consented_products: item.consented_products.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{PlaidBalances, PlaidErrorBody};

    fn checking() -> PlaidAccount {
        PlaidAccount {
            account_id: Some("acc-1".into()),
            balances: Some(PlaidBalances {
                available: Some(100.0),
                current: Some(110.25),
                limit: None,
                iso_currency_code: Some("USD".into()),
                unofficial_currency_code: None,
            }),
            mask: Some("0000".into()),
            name: Some("Plaid Checking".into()),
            official_name: Some("Plaid Gold Standard 0% Interest Checking".into()),
            account_type: Some("depository".into()),
            subtype: Some("checking".into()),
        }
    }

    fn coffee() -> PlaidTransaction {
        PlaidTransaction {
            transaction_id: Some("txn-1".into()),
            account_id: Some("acc-1".into()),
            amount: Some(4.33),
            iso_currency_code: Some("USD".into()),
            date: Some("2024-03-14".into()),
            name: Some("Starbucks".into()),
            merchant_name: Some("Starbucks".into()),
            category: Some(vec!["Food and Drink".into(), "Coffee Shop".into()]),
            pending: Some(false),
            ..Default::default()
        }
    }

    #[test]
    fn test_account_preserves_identity_and_balances() {
        let account = bank_account_from_plaid(checking()).unwrap();
        assert_eq!(account.account_id, "acc-1");
        assert_eq!(account.name, "Plaid Checking");
        assert_eq!(account.balances.available, Some(Decimal::new(100, 0)));
        assert_eq!(account.balances.current, Some(Decimal::new(11025, 2)));
        assert_eq!(account.balances.limit, None);
        assert_eq!(account.account_type, BankAccountType::Depository);
        assert_eq!(account.currency, "USD");
    }

    #[test]
    fn test_account_missing_id() {
        let mut raw = checking();
        raw.account_id = None;
        let err = bank_account_from_plaid(raw).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::MissingField { field: "account_id", .. }
        ));
    }

    #[test]
    fn test_account_empty_id_counts_as_missing() {
        let mut raw = checking();
        raw.account_id = Some(String::new());
        assert!(bank_account_from_plaid(raw).is_err());
    }

    #[test]
    fn test_unofficial_currency_fallback() {
        let mut raw = checking();
        if let Some(b) = raw.balances.as_mut() {
            b.iso_currency_code = None;
            b.unofficial_currency_code = Some("BTC".into());
        }
        assert_eq!(bank_account_from_plaid(raw).unwrap().currency, "BTC");
    }

    #[test]
    fn test_sub_cent_balances_are_kept_exactly() {
        let mut raw = checking();
        if let Some(b) = raw.balances.as_mut() {
            b.iso_currency_code = None;
            b.unofficial_currency_code = Some("BTC".into());
            b.available = Some(0.00012345);
            b.current = Some(1.23456789);
            b.limit = Some(-12.345);
        }
        let balances = bank_account_from_plaid(raw).unwrap().balances;
        assert_eq!(balances.available, Some(Decimal::new(12345, 8)));
        assert_eq!(balances.current, Some(Decimal::new(123456789, 8)));
        assert_eq!(balances.limit, Some(Decimal::new(-12345, 3)));
    }

    #[test]
    fn test_amount_out_of_decimal_range() {
        let mut raw = checking();
        if let Some(b) = raw.balances.as_mut() {
            b.current = Some(1e300);
        }
        let err = bank_account_from_plaid(raw).unwrap_err();
        assert!(matches!(err, ConversionError::InvalidField { field: "current", .. }));
    }

    #[test]
    fn test_batch_is_all_or_nothing() {
        let mut broken = checking();
        broken.account_id = None;
        let result = bank_accounts_from_plaid(vec![checking(), broken, checking()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_transaction_conversion() {
        let txn = transaction_from_plaid(coffee()).unwrap();
        assert_eq!(txn.transaction_id, "txn-1");
        assert_eq!(txn.amount, Decimal::new(433, 2));
        assert_eq!(txn.date, NaiveDate::from_ymd_opt(2024, 3, 14).unwrap());
        assert_eq!(txn.authorized_date, None);
        assert_eq!(txn.category.len(), 2);
        assert!(!txn.pending);
    }

    #[test]
    fn test_transaction_bad_date() {
        let mut raw = coffee();
        raw.date = Some("14/03/2024".into());
        let err = transaction_from_plaid(raw).unwrap_err();
        assert!(matches!(err, ConversionError::InvalidField { field: "date", .. }));
    }

    #[test]
    fn test_item_token() {
        let token = item_token_from_plaid(PublicTokenExchangeResponse {
            access_token: Some("access-abc".into()),
            item_id: Some("item-123".into()),
            request_id: None,
        })
        .unwrap();
        assert_eq!(token.access_token.expose_secret(), "access-abc");
        assert_eq!(token.item_id.as_str(), "item-123");
    }

    #[test]
    fn test_link_token_expiration() {
        let token = link_token_from_plaid(LinkTokenCreateResponse {
            link_token: Some("link-sandbox-1".into()),
            expiration: Some("2024-03-14T10:00:00Z".into()),
            request_id: Some("req-1".into()),
        })
        .unwrap();
        assert_eq!(token.expiration.timestamp(), 1_710_410_400);

        let err = link_token_from_plaid(LinkTokenCreateResponse {
            link_token: Some("link-sandbox-1".into()),
            expiration: Some("tomorrow".into()),
            request_id: None,
        })
        .unwrap_err();
        assert!(matches!(err, ConversionError::InvalidField { .. }));
    }

    #[test]
    fn test_webhook_key() {
        let key = webhook_key_from_plaid(PlaidJwk {
            alg: Some("ES256".into()),
            crv: Some("P-256".into()),
            kid: Some("key-1".into()),
            kty: Some("EC".into()),
            key_use: Some("sig".into()),
            x: Some("x-coord".into()),
            y: Some("y-coord".into()),
            created_at: Some(1_560_466_143),
            expired_at: None,
        })
        .unwrap();
        assert_eq!(key.key_id, "key-1");
        assert_eq!(key.created_at.timestamp(), 1_560_466_143);
        assert!(key.expires_at.is_none());
    }

    #[test]
    fn test_item_status_error_code() {
        let status = item_status_from_plaid(PlaidItem {
            item_id: Some("item-123".into()),
            error: Some(PlaidErrorBody {
                error_code: "ITEM_LOGIN_REQUIRED".into(),
                ..Default::default()
            }),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(status.error_code.as_deref(), Some("ITEM_LOGIN_REQUIRED"));
        assert!(status.requires_login());
    }
}
