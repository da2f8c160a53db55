//! Plaid implementation of the per-link client.

use std::sync::Arc;

use chrono::NaiveDate;
use platypus_types::{
    AccessToken, AccountId, BankAccount, CallContext, CallSpan, ConversionError, Instrumentation,
    ItemId, ItemStatus, LinkId, PlatypusClient, PlatypusError, ProviderRequestError, Transaction,
};
use serde_json::json;
use tracing::{debug, error, info};

use crate::after::after;
use crate::convert::{bank_accounts_from_plaid, item_status_from_plaid, transactions_from_plaid};
use crate::transport::PlaidTransport;
use crate::wire::{
    AccountsGetOptions, AccountsGetRequest, AccountsGetResponse, ItemGetResponse, ItemRemoveResponse,
    ItemRequest, TransactionsGetOptions, TransactionsGetRequest, TransactionsGetResponse,
};

/// Number of transactions requested per `/transactions/get` page.
pub const TRANSACTIONS_PAGE_SIZE: u32 = 500;

/// Client bound to one link and its access token.
pub struct PlaidClient {
    account_id: AccountId,
    link_id: LinkId,
    item_id: Option<ItemId>,
    access_token: AccessToken,
    transport: PlaidTransport,
    instrumentation: Arc<dyn Instrumentation>,
}

impl PlaidClient {
    pub fn new(
        account_id: AccountId,
        link_id: LinkId,
        item_id: Option<ItemId>,
        access_token: AccessToken,
        transport: PlaidTransport,
        instrumentation: Arc<dyn Instrumentation>,
    ) -> Self {
        Self {
            account_id,
            link_id,
            item_id,
            access_token,
            transport,
            instrumentation,
        }
    }

    fn start_span(&self, operation: &str) -> Box<dyn CallSpan> {
        let mut span = self.instrumentation.start_span(operation);
        span.set_tag("accountId", &self.account_id.to_string());
        span.set_tag("linkId", &self.link_id.to_string());
        if let Some(item_id) = &self.item_id {
            span.set_tag("itemId", item_id.as_str());
        }
        span
    }

    fn log_failure(&self, operation: &str, err: &PlatypusError) {
        error!(
            account_id = %self.account_id,
            link_id = %self.link_id,
            operation,
            error = %err,
            "Plaid request failed"
        );
    }

    async fn fetch_transactions(
        &self,
        ctx: &CallContext,
        span: &mut dyn CallSpan,
        start: NaiveDate,
        end: NaiveDate,
        account_ids: &[String],
    ) -> Result<Vec<Transaction>, PlatypusError> {
        if start > end {
            return Err(ProviderRequestError::InvalidRequest(format!(
                "start date {start} is after end date {end}"
            ))
            .into());
        }

        let mut transactions = Vec::new();
        let mut offset: u32 = 0;
        loop {
            let request = TransactionsGetRequest {
                access_token: self.access_token.expose_secret(),
                start_date: start,
                end_date: end,
                options: TransactionsGetOptions {
                    account_ids: (!account_ids.is_empty()).then_some(account_ids),
                    count: TRANSACTIONS_PAGE_SIZE,
                    offset,
                },
            };

            let exchange = self
                .transport
                .post(ctx, "/transactions/get", &request)
                .await
                .and_then(|response: TransactionsGetResponse| {
                    let total = response.total_transactions;
                    let page = transactions_from_plaid(response.transactions)?;
                    Ok((total, page))
                });
            let (total, page) = after(
                span,
                exchange,
                "Retrieved Plaid transactions.",
                "failed to retrieve transactions from plaid",
            )?;

            if page.is_empty() {
                break;
            }
            offset = offset.saturating_add(u32::try_from(page.len()).unwrap_or(u32::MAX));
            transactions.extend(page);
            debug!(
                link_id = %self.link_id,
                retrieved = transactions.len(),
                total,
                "retrieved transactions page"
            );
            if u64::from(offset) >= total {
                break;
            }
        }

        Ok(transactions)
    }
}

#[async_trait::async_trait]
impl PlatypusClient for PlaidClient {
    fn account_id(&self) -> AccountId {
        self.account_id
    }

    fn link_id(&self) -> LinkId {
        self.link_id
    }

    async fn get_accounts(
        &self,
        ctx: &CallContext,
        account_ids: &[String],
    ) -> Result<Vec<BankAccount>, PlatypusError> {
        let mut span = self.start_span("plaid.get_accounts");
        span.set_data(
            "accountIds",
            if account_ids.is_empty() {
                json!("all accounts")
            } else {
                json!(account_ids)
            },
        );

        let request = AccountsGetRequest {
            access_token: self.access_token.expose_secret(),
            options: (!account_ids.is_empty()).then_some(AccountsGetOptions { account_ids }),
        };

        let exchange = self
            .transport
            .post(ctx, "/accounts/get", &request)
            .await
            .and_then(|response: AccountsGetResponse| {
                bank_accounts_from_plaid(response.accounts).map_err(Into::into)
            });

        let result = after(
            span.as_mut(),
            exchange,
            "Retrieved Plaid bank accounts.",
            "failed to retrieve bank accounts from plaid",
        );
        if let Err(err) = &result {
            self.log_failure("get_accounts", err);
        }
        result
    }

    async fn get_all_transactions(
        &self,
        ctx: &CallContext,
        start: NaiveDate,
        end: NaiveDate,
        account_ids: &[String],
    ) -> Result<Vec<Transaction>, PlatypusError> {
        let mut span = self.start_span("plaid.get_all_transactions");
        span.set_data("startDate", json!(start));
        span.set_data("endDate", json!(end));
        span.set_data(
            "accountIds",
            if account_ids.is_empty() {
                json!("all accounts")
            } else {
                json!(account_ids)
            },
        );

        let result = self
            .fetch_transactions(ctx, span.as_mut(), start, end, account_ids)
            .await;
        if let Err(err) = &result {
            self.log_failure("get_all_transactions", err);
        }
        result
    }

    async fn get_item(&self, ctx: &CallContext) -> Result<ItemStatus, PlatypusError> {
        let mut span = self.start_span("plaid.get_item");

        let request = ItemRequest {
            access_token: self.access_token.expose_secret(),
        };
        let exchange = self
            .transport
            .post(ctx, "/item/get", &request)
            .await
            .and_then(|response: ItemGetResponse| {
                let item = response.item.ok_or(ConversionError::MissingField {
                    entity: "item status",
                    field: "item",
                })?;
                item_status_from_plaid(item).map_err(Into::into)
            });

        let result = after(
            span.as_mut(),
            exchange,
            "Retrieved Plaid item.",
            "failed to retrieve item from plaid",
        );
        if let Err(err) = &result {
            self.log_failure("get_item", err);
        }
        result
    }

    async fn remove_item(&self, ctx: &CallContext) -> Result<(), PlatypusError> {
        let mut span = self.start_span("plaid.remove_item");

        let request = ItemRequest {
            access_token: self.access_token.expose_secret(),
        };
        let exchange = self
            .transport
            .post(ctx, "/item/remove", &request)
            .await
            .and_then(|_: ItemRemoveResponse| Ok(()));

        let result = after(
            span.as_mut(),
            exchange,
            "Removed Plaid item.",
            "failed to remove item from plaid",
        );
        match &result {
            Ok(()) => info!(
                account_id = %self.account_id,
                link_id = %self.link_id,
                "removed Plaid item"
            ),
            Err(err) => self.log_failure("remove_item", err),
        }
        result
    }
}
