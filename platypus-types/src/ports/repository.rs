//! Link repository port.

use crate::domain::{AccountId, ItemId, Link, LinkId};
use crate::error::RepoError;

/// Read access to stored links.
///
/// Implementations load the Plaid sub-record and the bank accounts of the
/// link along with it.
#[async_trait::async_trait]
pub trait LinkRepository: Send + Sync + 'static {
    /// Finds the link that owns the given provider item.
    async fn get_link_by_item_id(&self, item_id: &ItemId) -> Result<Option<Link>, RepoError>;

    /// Finds a link by its internal identifiers.
    async fn get_link(
        &self,
        account_id: AccountId,
        link_id: LinkId,
    ) -> Result<Option<Link>, RepoError>;
}
