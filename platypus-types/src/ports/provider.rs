//! Provider capability ports.
//!
//! A bank-data aggregator is exposed as a pair of capabilities: a factory
//! ([`Platypus`]) for operations not scoped to an existing link, and a
//! per-link client ([`PlatypusClient`]). Each aggregator is one
//! implementation of the pair, chosen when the factory is built.

use chrono::NaiveDate;

use crate::context::CallContext;
use crate::domain::{
    AccessToken, AccountId, BankAccount, ItemId, ItemStatus, ItemToken, Link, LinkId, LinkToken,
    LinkTokenOptions, Transaction, WebhookVerificationKey,
};
use crate::error::PlatypusError;

/// Factory capability of a provider.
#[async_trait::async_trait]
pub trait Platypus: Send + Sync {
    /// Requests a short-lived token to start a new link on a client surface.
    async fn create_link_token(
        &self,
        ctx: &CallContext,
        options: LinkTokenOptions,
    ) -> Result<LinkToken, PlatypusError>;

    /// Exchanges a single-use public token for an access token and item id.
    async fn exchange_public_token(
        &self,
        ctx: &CallContext,
        public_token: &str,
    ) -> Result<ItemToken, PlatypusError>;

    /// Resolves the webhook signing key with the given id.
    async fn get_webhook_verification_key(
        &self,
        ctx: &CallContext,
        key_id: &str,
    ) -> Result<WebhookVerificationKey, PlatypusError>;

    /// Builds a client for the link that owns `item_id`.
    async fn new_client_from_item_id(
        &self,
        ctx: &CallContext,
        item_id: &ItemId,
    ) -> Result<Box<dyn PlatypusClient>, PlatypusError>;

    /// Builds a client for the link with the given internal identifiers.
    async fn new_client_from_link(
        &self,
        ctx: &CallContext,
        account_id: AccountId,
        link_id: LinkId,
    ) -> Result<Box<dyn PlatypusClient>, PlatypusError>;

    /// Builds a client bound to `link` and an already resolved token.
    async fn new_client(
        &self,
        ctx: &CallContext,
        link: &Link,
        access_token: AccessToken,
    ) -> Result<Box<dyn PlatypusClient>, PlatypusError>;

    /// Releases pooled transport resources. Idempotent.
    fn close(&self) -> Result<(), PlatypusError>;
}

/// Per-link capability of a provider.
///
/// Bound at construction to exactly one (account, link, access token);
/// never reused across links. Nothing here retries.
#[async_trait::async_trait]
pub trait PlatypusClient: Send + Sync {
    fn account_id(&self) -> AccountId;

    fn link_id(&self) -> LinkId;

    /// Retrieves accounts under the link. An empty `account_ids` means all
    /// accounts. Fails as a whole if any single account fails to convert.
    async fn get_accounts(
        &self,
        ctx: &CallContext,
        account_ids: &[String],
    ) -> Result<Vec<BankAccount>, PlatypusError>;

    /// Retrieves every transaction in `[start, end]`, following pagination
    /// until exhausted.
    async fn get_all_transactions(
        &self,
        ctx: &CallContext,
        start: NaiveDate,
        end: NaiveDate,
        account_ids: &[String],
    ) -> Result<Vec<Transaction>, PlatypusError>;

    /// Reports the provider-side health of the bound item.
    async fn get_item(&self, ctx: &CallContext) -> Result<ItemStatus, PlatypusError>;

    /// Permanently removes the bound item at the provider.
    async fn remove_item(&self, ctx: &CallContext) -> Result<(), PlatypusError>;
}
