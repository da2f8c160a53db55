//! In-memory secrets provider.

use async_trait::async_trait;
use dashmap::DashMap;
use platypus_types::{AccessToken, AccountId, ItemId, SecretsError, SecretsProvider};
use tracing::debug;

/// Access tokens keyed by (account id, item id).
///
/// Only token fingerprints are ever logged.
#[derive(Default)]
pub struct InMemorySecretsProvider {
    tokens: DashMap<(AccountId, ItemId), AccessToken>,
}

impl InMemorySecretsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl SecretsProvider for InMemorySecretsProvider {
    async fn get_access_token_for_link_item_id(
        &self,
        account_id: AccountId,
        item_id: &ItemId,
    ) -> Result<Option<AccessToken>, SecretsError> {
        Ok(self
            .tokens
            .get(&(account_id, item_id.clone()))
            .map(|token| AccessToken::new(token.expose_secret())))
    }

    async fn store_access_token_for_link_item_id(
        &self,
        account_id: AccountId,
        item_id: &ItemId,
        access_token: AccessToken,
    ) -> Result<(), SecretsError> {
        debug!(
            account_id = %account_id,
            item_id = %item_id,
            fingerprint = %access_token.fingerprint(),
            "stored access token"
        );
        self.tokens.insert((account_id, item_id.clone()), access_token);
        Ok(())
    }

    async fn remove_access_token_for_link_item_id(
        &self,
        account_id: AccountId,
        item_id: &ItemId,
    ) -> Result<(), SecretsError> {
        if let Some((_, token)) = self.tokens.remove(&(account_id, item_id.clone())) {
            debug!(
                account_id = %account_id,
                item_id = %item_id,
                fingerprint = %token.fingerprint(),
                "removed access token"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_get_remove() {
        let secrets = InMemorySecretsProvider::new();
        let account = AccountId::new(1);
        let item = ItemId::new("item-123");

        secrets
            .store_access_token_for_link_item_id(account, &item, AccessToken::new("access-abc"))
            .await
            .unwrap();
        let token = secrets
            .get_access_token_for_link_item_id(account, &item)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(token.expose_secret(), "access-abc");

        secrets
            .remove_access_token_for_link_item_id(account, &item)
            .await
            .unwrap();
        assert!(secrets.is_empty());
    }

    #[tokio::test]
    async fn test_tokens_are_scoped_by_account() {
        let secrets = InMemorySecretsProvider::new();
        let item = ItemId::new("item-123");
        secrets
            .store_access_token_for_link_item_id(
                AccountId::new(1),
                &item,
                AccessToken::new("access-abc"),
            )
            .await
            .unwrap();

        let other = secrets
            .get_access_token_for_link_item_id(AccountId::new(2), &item)
            .await
            .unwrap();
        assert!(other.is_none());
    }

    #[tokio::test]
    async fn test_remove_missing_is_ok() {
        let secrets = InMemorySecretsProvider::new();
        secrets
            .remove_access_token_for_link_item_id(AccountId::new(1), &ItemId::new("nope"))
            .await
            .unwrap();
    }
}
