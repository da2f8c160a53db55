//! # Platypus Types
//!
//! Domain types and port traits for the bank-data provider layer.
//! This crate has no network or storage IO - only data structures, the
//! error taxonomy, the cancellation context and trait definitions.
//!
//! ## Architecture
//!
//! This crate is the **innermost core** of the hexagonal architecture:
//! - `domain/` - Links, bank accounts, transactions, tokens, webhook keys
//! - `ports/` - Traits for the link repository, secrets provider,
//!   instrumentation and the provider capabilities themselves
//! - `context` - Caller-supplied cancellation and deadlines
//! - `error` - Error taxonomy shared by every adapter

pub mod context;
pub mod domain;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use context::{CallContext, CancelHandle};
pub use domain::{
    AccessToken, AccountId, BankAccount, BankAccountBalances, BankAccountRef, BankAccountType,
    ItemId, ItemStatus, ItemToken, Link, LinkId, LinkToken, LinkTokenOptions, LinkType, PlaidLink,
    Transaction, WebhookVerificationKey,
};
pub use error::{
    BoxError, ConversionError, ErrorKind, PlatypusError, ProviderRequestError, RepoError,
    SecretsError,
};
pub use ports::{
    CallSpan, HttpBreadcrumb, Instrumentation, LinkRepository, Platypus, PlatypusClient,
    SecretsProvider, SpanStatus,
};
