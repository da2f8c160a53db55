//! Plaid API request and response models.
//!
//! Response fields are optional; the conversion functions decide what is
//! required and report missing ones as conversion errors. Request types
//! borrow their inputs and do not derive `Debug`, as several carry an
//! access token.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

fn is_empty_slice(value: &&[String]) -> bool {
    value.is_empty()
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Error body Plaid returns with non-2xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaidErrorBody {
    #[serde(default)]
    pub error_type: String,
    #[serde(default)]
    pub error_code: String,
    #[serde(default)]
    pub error_message: String,
    pub display_message: Option<String>,
    pub request_id: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Link tokens
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct LinkTokenUser<'a> {
    pub client_user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<&'a str>,
}

#[derive(Serialize)]
pub struct LinkTokenCreateRequest<'a> {
    pub client_name: &'a str,
    pub language: &'a str,
    pub country_codes: &'a [String],
    pub user: LinkTokenUser<'a>,
    #[serde(skip_serializing_if = "is_empty_slice")]
    pub products: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<&'a str>,
    /// Present only in update mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkTokenCreateResponse {
    pub link_token: Option<String>,
    pub expiration: Option<String>,
    pub request_id: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Public token exchange
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct PublicTokenExchangeRequest<'a> {
    pub public_token: &'a str,
}

/// Holds the freshly issued access token, so no `Debug`.
#[derive(Clone, Deserialize)]
pub struct PublicTokenExchangeResponse {
    pub access_token: Option<String>,
    pub item_id: Option<String>,
    pub request_id: Option<String>,
}

#[derive(Serialize)]
pub struct SandboxPublicTokenCreateRequest<'a> {
    pub institution_id: &'a str,
    pub initial_products: &'a [String],
}

#[derive(Debug, Clone, Deserialize)]
pub struct SandboxPublicTokenCreateResponse {
    pub public_token: Option<String>,
    pub request_id: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Webhook verification keys
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct WebhookVerificationKeyGetRequest<'a> {
    pub key_id: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookVerificationKeyGetResponse {
    pub key: Option<PlaidJwk>,
    pub request_id: Option<String>,
}

/// JSON Web Key as returned by Plaid.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaidJwk {
    pub alg: Option<String>,
    pub crv: Option<String>,
    pub kid: Option<String>,
    pub kty: Option<String>,
    #[serde(rename = "use")]
    pub key_use: Option<String>,
    pub x: Option<String>,
    pub y: Option<String>,
    pub created_at: Option<i64>,
    pub expired_at: Option<i64>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Accounts
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct AccountsGetOptions<'a> {
    pub account_ids: &'a [String],
}

#[derive(Serialize)]
pub struct AccountsGetRequest<'a> {
    pub access_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<AccountsGetOptions<'a>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountsGetResponse {
    #[serde(default)]
    pub accounts: Vec<PlaidAccount>,
    pub item: Option<PlaidItem>,
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaidAccount {
    pub account_id: Option<String>,
    pub balances: Option<PlaidBalances>,
    pub mask: Option<String>,
    pub name: Option<String>,
    pub official_name: Option<String>,
    #[serde(rename = "type")]
    pub account_type: Option<String>,
    pub subtype: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaidBalances {
    pub available: Option<f64>,
    pub current: Option<f64>,
    pub limit: Option<f64>,
    pub iso_currency_code: Option<String>,
    pub unofficial_currency_code: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Transactions
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct TransactionsGetOptions<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_ids: Option<&'a [String]>,
    pub count: u32,
    pub offset: u32,
}

#[derive(Serialize)]
pub struct TransactionsGetRequest<'a> {
    pub access_token: &'a str,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub options: TransactionsGetOptions<'a>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionsGetResponse {
    #[serde(default)]
    pub transactions: Vec<PlaidTransaction>,
    #[serde(default)]
    pub total_transactions: u64,
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaidTransaction {
    pub transaction_id: Option<String>,
    pub account_id: Option<String>,
    pub amount: Option<f64>,
    pub iso_currency_code: Option<String>,
    pub unofficial_currency_code: Option<String>,
    pub date: Option<String>,
    pub authorized_date: Option<String>,
    pub name: Option<String>,
    pub merchant_name: Option<String>,
    pub category: Option<Vec<String>>,
    pub pending: Option<bool>,
    pub pending_transaction_id: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Items
// ─────────────────────────────────────────────────────────────────────────────

/// Body of `/item/get` and `/item/remove`.
#[derive(Serialize)]
pub struct ItemRequest<'a> {
    pub access_token: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemGetResponse {
    pub item: Option<PlaidItem>,
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaidItem {
    pub item_id: Option<String>,
    pub institution_id: Option<String>,
    pub webhook: Option<String>,
    pub error: Option<PlaidErrorBody>,
    pub consented_products: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemRemoveResponse {
    pub request_id: Option<String>,
}
