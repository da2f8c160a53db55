//! Bank account domain model.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Account classification, following the provider's nomenclature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BankAccountType {
    Depository,
    Credit,
    Loan,
    Investment,
    Brokerage,
    Other,
}

impl BankAccountType {
    /// Parses a provider type string; unknown values become `Other`.
    pub fn from_provider(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "depository" => Self::Depository,
            "credit" => Self::Credit,
            "loan" => Self::Loan,
            "investment" => Self::Investment,
            "brokerage" => Self::Brokerage,
            _ => Self::Other,
        }
    }

    /// Credit and loan accounts carry liabilities.
    pub fn is_liability(&self) -> bool {
        matches!(self, Self::Credit | Self::Loan)
    }
}

impl AsRef<str> for BankAccountType {
    fn as_ref(&self) -> &str {
        match self {
            Self::Depository => "depository",
            Self::Credit => "credit",
            Self::Loan => "loan",
            Self::Investment => "investment",
            Self::Brokerage => "brokerage",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for BankAccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// Balances in major units of the account currency, exactly as reported.
///
/// Unofficial currencies (crypto) carry more than two decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BankAccountBalances {
    pub available: Option<Decimal>,
    pub current: Option<Decimal>,
    pub limit: Option<Decimal>,
}

/// One external bank account as seen through a provider.
///
/// Only produced by converting provider payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccount {
    /// Provider account id
    pub account_id: String,
    /// Display name
    pub name: String,
    pub official_name: Option<String>,
    /// Last digits of the account number
    pub mask: Option<String>,
    pub account_type: BankAccountType,
    pub sub_type: Option<String>,
    /// ISO 4217 code, or the provider's unofficial code for non-ISO currencies
    pub currency: String,
    pub balances: BankAccountBalances,
}
