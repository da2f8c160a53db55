//! Domain models for the provider layer.

pub mod bank_account;
pub mod item;
pub mod link;
pub mod token;
pub mod transaction;
pub mod webhook;

pub use bank_account::{BankAccount, BankAccountBalances, BankAccountType};
pub use item::ItemStatus;
pub use link::{AccountId, BankAccountRef, ItemId, Link, LinkId, LinkType, PlaidLink};
pub use token::{AccessToken, ItemToken, LinkToken, LinkTokenOptions};
pub use transaction::Transaction;
pub use webhook::WebhookVerificationKey;
