//! Secrets provider port.

use crate::domain::{AccessToken, AccountId, ItemId};
use crate::error::SecretsError;

/// Resolves and stores provider access tokens.
///
/// Tokens are keyed by (account id, provider item id). Callers acquire a
/// token for the lifetime of one client and never cache it beyond that.
#[async_trait::async_trait]
pub trait SecretsProvider: Send + Sync + 'static {
    async fn get_access_token_for_link_item_id(
        &self,
        account_id: AccountId,
        item_id: &ItemId,
    ) -> Result<Option<AccessToken>, SecretsError>;

    async fn store_access_token_for_link_item_id(
        &self,
        account_id: AccountId,
        item_id: &ItemId,
        access_token: AccessToken,
    ) -> Result<(), SecretsError>;

    /// Invalidates a stored token, e.g. after the item was removed.
    async fn remove_access_token_for_link_item_id(
        &self,
        account_id: AccountId,
        item_id: &ItemId,
    ) -> Result<(), SecretsError>;
}
