//! In-memory link repository.

use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use platypus_types::{AccountId, ItemId, Link, LinkId, LinkRepository, RepoError};
use tracing::debug;

/// Links keyed by (account id, link id), with a secondary index on the
/// Plaid item id.
#[derive(Default)]
pub struct InMemoryLinkRepository {
    links: DashMap<(AccountId, LinkId), Link>,
    by_item: DashMap<ItemId, (AccountId, LinkId)>,
}

impl InMemoryLinkRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores or replaces a link.
    ///
    /// Fails with `Conflict` when another link already owns the same item.
    pub fn insert(&self, link: Link) -> Result<(), RepoError> {
        let key = (link.account_id, link.link_id);

        if let Some(plaid) = &link.plaid_link {
            // Claim the item while holding its shard lock.
            match self.by_item.entry(plaid.item_id.clone()) {
                Entry::Occupied(owner) if *owner.get() != key => {
                    return Err(RepoError::Conflict(format!(
                        "item {} already belongs to link {}",
                        plaid.item_id,
                        owner.get().1
                    )));
                }
                Entry::Occupied(_) => {}
                Entry::Vacant(slot) => {
                    slot.insert(key);
                }
            }
        }

        let new_item = link.plaid_link.as_ref().map(|p| p.item_id.clone());
        if let Some(previous) = self.links.insert(key, link) {
            if let Some(old) = previous.plaid_link {
                if new_item.as_ref() != Some(&old.item_id) {
                    self.by_item.remove_if(&old.item_id, |_, owner| *owner == key);
                }
            }
        }

        debug!(account_id = %key.0, link_id = %key.1, "stored link");
        Ok(())
    }

    /// Removes a link and its item index entry.
    pub fn remove(&self, account_id: AccountId, link_id: LinkId) -> Option<Link> {
        let (_, link) = self.links.remove(&(account_id, link_id))?;
        if let Some(plaid) = &link.plaid_link {
            self.by_item.remove(&plaid.item_id);
        }
        Some(link)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[async_trait]
impl LinkRepository for InMemoryLinkRepository {
    async fn get_link_by_item_id(&self, item_id: &ItemId) -> Result<Option<Link>, RepoError> {
        let Some(key) = self.by_item.get(item_id).map(|k| *k) else {
            return Ok(None);
        };
        Ok(self.links.get(&key).map(|l| l.clone()))
    }

    async fn get_link(
        &self,
        account_id: AccountId,
        link_id: LinkId,
    ) -> Result<Option<Link>, RepoError> {
        Ok(self.links.get(&(account_id, link_id)).map(|l| l.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platypus_types::PlaidLink;

    fn plaid_link(account: u64, link: u64, item: &str) -> Link {
        Link::plaid(AccountId::new(account), LinkId::new(link), PlaidLink::new(item))
    }

    #[tokio::test]
    async fn test_lookup_by_item_and_ids() {
        let repo = InMemoryLinkRepository::new();
        repo.insert(plaid_link(1, 2, "item-123")).unwrap();

        let by_item = repo
            .get_link_by_item_id(&ItemId::new("item-123"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_item.link_id, LinkId::new(2));

        let by_ids = repo
            .get_link(AccountId::new(1), LinkId::new(2))
            .await
            .unwrap();
        assert_eq!(by_ids, Some(by_item));
    }

    #[tokio::test]
    async fn test_unknown_item_is_none() {
        let repo = InMemoryLinkRepository::new();
        let found = repo
            .get_link_by_item_id(&ItemId::new("missing"))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_item_owned_by_other_link_conflicts() {
        let repo = InMemoryLinkRepository::new();
        repo.insert(plaid_link(1, 2, "item-123")).unwrap();
        let err = repo.insert(plaid_link(1, 3, "item-123")).unwrap_err();
        assert!(matches!(err, RepoError::Conflict(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_claims_on_one_item_admit_one_link() {
        let repo = std::sync::Arc::new(InMemoryLinkRepository::new());

        let handles: Vec<_> = (0..16)
            .map(|link| {
                let repo = std::sync::Arc::clone(&repo);
                tokio::spawn(async move { repo.insert(plaid_link(1, link, "item-shared")) })
            })
            .collect();

        let mut stored = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                stored += 1;
            }
        }
        assert_eq!(stored, 1);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_replacing_link_moves_item_index() {
        let repo = InMemoryLinkRepository::new();
        repo.insert(plaid_link(1, 2, "item-old")).unwrap();
        repo.insert(plaid_link(1, 2, "item-new")).unwrap();

        assert!(
            repo.get_link_by_item_id(&ItemId::new("item-old"))
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            repo.get_link_by_item_id(&ItemId::new("item-new"))
                .await
                .unwrap()
                .is_some()
        );
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_remove() {
        let repo = InMemoryLinkRepository::new();
        repo.insert(plaid_link(1, 2, "item-123")).unwrap();
        assert!(repo.remove(AccountId::new(1), LinkId::new(2)).is_some());
        assert!(repo.is_empty());
        assert!(
            repo.get_link_by_item_id(&ItemId::new("item-123"))
                .await
                .unwrap()
                .is_none()
        );
    }
}
