//! Plaid implementation of the provider factory.

use std::sync::{Arc, PoisonError, RwLock};

use platypus_types::{
    AccessToken, AccountId, CallContext, CallSpan, Instrumentation, ItemId, ItemToken, Link,
    LinkId, LinkRepository, LinkToken, LinkTokenOptions, Platypus, PlatypusClient, PlatypusError,
    ProviderRequestError, RepoError, SecretsProvider, SpanStatus, WebhookVerificationKey,
};
use tracing::{debug, error, info};

use crate::after::after;
use crate::client::PlaidClient;
use crate::config::{PlaidConfig, PlaidEnvironment};
use crate::convert::{item_token_from_plaid, link_token_from_plaid, webhook_key_from_plaid};
use crate::transport::PlaidTransport;
use crate::wire::{
    LinkTokenCreateRequest, LinkTokenCreateResponse, LinkTokenUser, PublicTokenExchangeRequest,
    PublicTokenExchangeResponse, SandboxPublicTokenCreateRequest,
    SandboxPublicTokenCreateResponse, WebhookVerificationKeyGetRequest,
    WebhookVerificationKeyGetResponse,
};

/// Plaid error code for an unknown webhook verification key.
pub const INVALID_WEBHOOK_KEY_CODE: &str = "INVALID_WEBHOOK_VERIFICATION_KEY_ID";

/// Plaid-backed provider factory.
///
/// Owns the pooled transport until [`Platypus::close`] is called. Clients
/// built by the factory hold their own handle on the pool and keep working
/// after close.
pub struct Plaid {
    transport: RwLock<Option<PlaidTransport>>,
    config: PlaidConfig,
    secrets: Arc<dyn SecretsProvider>,
    repo: Arc<dyn LinkRepository>,
    instrumentation: Arc<dyn Instrumentation>,
}

impl Plaid {
    pub fn new(
        config: PlaidConfig,
        secrets: Arc<dyn SecretsProvider>,
        repo: Arc<dyn LinkRepository>,
        instrumentation: Arc<dyn Instrumentation>,
    ) -> Result<Self, PlatypusError> {
        let transport = PlaidTransport::new(&config)?;
        info!(
            environment = ?config.environment,
            base_url = %transport.base_url(),
            "Plaid provider initialized"
        );
        Ok(Self {
            transport: RwLock::new(Some(transport)),
            config,
            secrets,
            repo,
            instrumentation,
        })
    }

    pub fn config(&self) -> &PlaidConfig {
        &self.config
    }

    fn transport(&self) -> Result<PlaidTransport, PlatypusError> {
        self.transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| ProviderRequestError::Closed.into())
    }

    /// Creates a public token for a sandbox institution without going
    /// through Link. Only available in the sandbox environment.
    pub async fn sandbox_create_public_token(
        &self,
        ctx: &CallContext,
        institution_id: &str,
        initial_products: &[String],
    ) -> Result<String, PlatypusError> {
        if self.config.environment != PlaidEnvironment::Sandbox {
            return Err(ProviderRequestError::InvalidRequest(
                "sandbox public tokens can only be created in the sandbox environment".into(),
            )
            .into());
        }
        let transport = self.transport()?;

        let mut span = self
            .instrumentation
            .start_span("plaid.sandbox_create_public_token");
        span.set_tag("institutionId", institution_id);

        let products = if initial_products.is_empty() {
            self.config.products.as_slice()
        } else {
            initial_products
        };
        let request = SandboxPublicTokenCreateRequest {
            institution_id,
            initial_products: products,
        };
        let exchange = transport
            .post(ctx, "/sandbox/public_token/create", &request)
            .await
            .and_then(|response: SandboxPublicTokenCreateResponse| {
                response
                    .public_token
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| {
                        ProviderRequestError::Decode(
                            "sandbox public token response has no public_token".into(),
                        )
                        .into()
                    })
            });

        after(
            span.as_mut(),
            exchange,
            "Created sandbox public token",
            "failed to create sandbox public token",
        )
    }

    async fn client_for_item(
        &self,
        ctx: &CallContext,
        item_id: &ItemId,
        span: &mut dyn CallSpan,
    ) -> Result<Box<dyn PlatypusClient>, PlatypusError> {
        let lookup = ctx.run(self.repo.get_link_by_item_id(item_id)).await?;
        let link = found_link(lookup, || format!("no link for item {item_id}"))?;
        tag_link(span, &link);
        debug!(
            account_id = %link.account_id,
            link_id = %link.link_id,
            "resolved link for item"
        );
        self.client_for_link(ctx, link).await
    }

    async fn client_for_ids(
        &self,
        ctx: &CallContext,
        account_id: AccountId,
        link_id: LinkId,
        span: &mut dyn CallSpan,
    ) -> Result<Box<dyn PlatypusClient>, PlatypusError> {
        let lookup = ctx.run(self.repo.get_link(account_id, link_id)).await?;
        let link = found_link(lookup, || {
            format!("no link {link_id} for account {account_id}")
        })?;
        tag_link(span, &link);
        self.client_for_link(ctx, link).await
    }

    /// Resolves the access token of `link` and binds a client to it.
    async fn client_for_link(
        &self,
        ctx: &CallContext,
        link: Link,
    ) -> Result<Box<dyn PlatypusClient>, PlatypusError> {
        let item_id = link.plaid_item_id()?.clone();

        let token = ctx
            .run(
                self.secrets
                    .get_access_token_for_link_item_id(link.account_id, &item_id),
            )
            .await?;
        let access_token = match token {
            Ok(Some(token)) => token,
            Ok(None) => {
                return Err(PlatypusError::credential_resolution(
                    format!("no access token stored for item {item_id}"),
                    None,
                ));
            }
            Err(e) => {
                error!(
                    account_id = %link.account_id,
                    link_id = %link.link_id,
                    error = %e,
                    "failed to retrieve access token for link"
                );
                return Err(PlatypusError::credential_resolution(
                    format!("failed to retrieve access token for item {item_id}"),
                    Some(e),
                ));
            }
        };

        self.bind_client(&link, access_token)
    }

    fn bind_client(
        &self,
        link: &Link,
        access_token: AccessToken,
    ) -> Result<Box<dyn PlatypusClient>, PlatypusError> {
        if access_token.is_empty() {
            return Err(PlatypusError::credential_resolution(
                format!("empty access token for link {}", link.link_id),
                None,
            ));
        }
        let transport = self.transport()?;

        Ok(Box::new(PlaidClient::new(
            link.account_id,
            link.link_id,
            link.plaid_link.as_ref().map(|p| p.item_id.clone()),
            access_token,
            transport,
            Arc::clone(&self.instrumentation),
        )))
    }
}

fn tag_link(span: &mut dyn CallSpan, link: &Link) {
    span.set_tag("accountId", &link.account_id.to_string());
    span.set_tag("linkId", &link.link_id.to_string());
    if let Some(plaid) = &link.plaid_link {
        span.set_tag("itemId", plaid.item_id.as_str());
    }
}

/// Closes the span of an operation that sends no provider request.
fn settle<T>(
    span: &mut dyn CallSpan,
    result: Result<T, PlatypusError>,
    error_message: &str,
) -> Result<T, PlatypusError> {
    match result {
        Ok(value) => {
            span.set_status(SpanStatus::Ok);
            Ok(value)
        }
        Err(err) => {
            span.set_status(SpanStatus::InternalError);
            Err(err.wrap(error_message))
        }
    }
}

/// Maps a repository lookup to the provider error taxonomy.
fn found_link(
    result: Result<Option<Link>, RepoError>,
    what: impl FnOnce() -> String,
) -> Result<Link, PlatypusError> {
    match result {
        Ok(Some(link)) => Ok(link),
        Ok(None) | Err(RepoError::NotFound) => Err(PlatypusError::NotFound(what())),
        Err(e) => Err(PlatypusError::from(e).wrap("failed to retrieve link")),
    }
}

/// Classifies a missing-key answer from the key endpoint as `NotFound`.
fn webhook_key_not_found(key_id: &str, err: PlatypusError) -> PlatypusError {
    let missing = err.provider_request().is_some_and(|e| {
        e.error_code() == Some(INVALID_WEBHOOK_KEY_CODE) || e.status() == Some(404)
    });
    if missing {
        PlatypusError::NotFound(format!("webhook verification key {key_id}: {err}"))
    } else {
        err
    }
}

#[async_trait::async_trait]
impl Platypus for Plaid {
    async fn create_link_token(
        &self,
        ctx: &CallContext,
        options: LinkTokenOptions,
    ) -> Result<LinkToken, PlatypusError> {
        if options.client_user_id.trim().is_empty() {
            return Err(ProviderRequestError::InvalidRequest(
                "link token requires a client user id".into(),
            )
            .into());
        }
        let transport = self.transport()?;

        let mut span = self.instrumentation.start_span("plaid.create_link_token");
        span.set_data(
            "updateMode",
            serde_json::Value::Bool(options.update_mode_item.is_some()),
        );

        // Update mode must not request new products.
        let products: &[String] = if options.update_mode_item.is_some() {
            &[]
        } else {
            &self.config.products
        };
        let request = LinkTokenCreateRequest {
            client_name: &self.config.client_name,
            language: &self.config.language,
            country_codes: &self.config.country_codes,
            user: LinkTokenUser {
                client_user_id: &options.client_user_id,
                legal_name: options.legal_name.as_deref(),
                phone_number: options.phone_number.as_deref(),
                email_address: options.email_address.as_deref(),
            },
            products,
            webhook: self.config.webhook_url.as_deref(),
            redirect_uri: self.config.redirect_uri.as_deref(),
            access_token: options
                .update_mode_item
                .as_ref()
                .map(AccessToken::expose_secret),
        };

        let exchange = transport
            .post(ctx, "/link/token/create", &request)
            .await
            .and_then(|response: LinkTokenCreateResponse| {
                link_token_from_plaid(response).map_err(Into::into)
            });

        let result = after(
            span.as_mut(),
            exchange,
            "Created Plaid link token",
            "failed to create link token",
        );
        if let Err(err) = &result {
            error!(error = %err, "failed to create link token");
        }
        result
    }

    async fn exchange_public_token(
        &self,
        ctx: &CallContext,
        public_token: &str,
    ) -> Result<ItemToken, PlatypusError> {
        if public_token.trim().is_empty() {
            return Err(
                ProviderRequestError::InvalidRequest("public token must not be empty".into())
                    .into(),
            );
        }
        let transport = self.transport()?;

        let mut span = self.instrumentation.start_span("plaid.exchange_public_token");

        let request = PublicTokenExchangeRequest { public_token };
        let exchange = transport
            .post(ctx, "/item/public_token/exchange", &request)
            .await
            .and_then(|response: PublicTokenExchangeResponse| {
                item_token_from_plaid(response).map_err(Into::into)
            });

        let result = after(
            span.as_mut(),
            exchange,
            "Exchanged public token",
            "failed to exchange public token",
        );
        match &result {
            Ok(token) => info!(item_id = %token.item_id, "exchanged public token for item"),
            Err(err) => error!(error = %err, "failed to exchange public token"),
        }
        result
    }

    async fn get_webhook_verification_key(
        &self,
        ctx: &CallContext,
        key_id: &str,
    ) -> Result<WebhookVerificationKey, PlatypusError> {
        let transport = self.transport()?;

        let mut span = self
            .instrumentation
            .start_span("plaid.get_webhook_verification_key");
        span.set_tag("keyId", key_id);

        let request = WebhookVerificationKeyGetRequest { key_id };
        let exchange = transport
            .post(ctx, "/webhook_verification_key/get", &request)
            .await
            .map_err(|err| webhook_key_not_found(key_id, err))
            .and_then(|response: WebhookVerificationKeyGetResponse| {
                let key = response.key.ok_or_else(|| {
                    PlatypusError::NotFound(format!(
                        "webhook verification key {key_id}: provider returned no key"
                    ))
                })?;
                webhook_key_from_plaid(key).map_err(Into::into)
            });

        after(
            span.as_mut(),
            exchange,
            "Retrieved webhook verification key",
            "failed to retrieve webhook verification key",
        )
    }

    async fn new_client_from_item_id(
        &self,
        ctx: &CallContext,
        item_id: &ItemId,
    ) -> Result<Box<dyn PlatypusClient>, PlatypusError> {
        ctx.check()?;
        let mut span = self.instrumentation.start_span("plaid.new_client_from_item_id");
        span.set_tag("itemId", item_id.as_str());

        let result = self.client_for_item(ctx, item_id, span.as_mut()).await;
        settle(
            span.as_mut(),
            result,
            &format!("cannot create client for item {item_id}"),
        )
    }

    async fn new_client_from_link(
        &self,
        ctx: &CallContext,
        account_id: AccountId,
        link_id: LinkId,
    ) -> Result<Box<dyn PlatypusClient>, PlatypusError> {
        ctx.check()?;
        let mut span = self.instrumentation.start_span("plaid.new_client_from_link");
        span.set_tag("accountId", &account_id.to_string());
        span.set_tag("linkId", &link_id.to_string());

        let result = self
            .client_for_ids(ctx, account_id, link_id, span.as_mut())
            .await;
        settle(
            span.as_mut(),
            result,
            &format!("cannot create client for link {link_id}"),
        )
    }

    async fn new_client(
        &self,
        ctx: &CallContext,
        link: &Link,
        access_token: AccessToken,
    ) -> Result<Box<dyn PlatypusClient>, PlatypusError> {
        ctx.check()?;
        let mut span = self.instrumentation.start_span("plaid.new_client");
        tag_link(span.as_mut(), link);

        let result = self.bind_client(link, access_token);
        settle(span.as_mut(), result, "cannot create client")
    }

    fn close(&self) -> Result<(), PlatypusError> {
        let previous = self
            .transport
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            info!("Plaid provider closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platypus_types::ErrorKind;

    #[test]
    fn test_found_link_maps_repository_errors() {
        let missing = found_link(Ok(None), || "no link".into()).unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::NotFound);

        let not_found = found_link(Err(RepoError::NotFound), || "no link".into()).unwrap_err();
        assert_eq!(not_found.kind(), ErrorKind::NotFound);

        let broken =
            found_link(Err(RepoError::Database("connection reset".into())), || "no link".into())
                .unwrap_err();
        assert_eq!(broken.kind(), ErrorKind::Repository);
        assert!(broken.to_string().contains("connection reset"));
    }

    #[test]
    fn test_webhook_key_not_found_mapping() {
        let api = |status: u16, code: &str| -> PlatypusError {
            ProviderRequestError::Api {
                status,
                error_type: "INVALID_INPUT".into(),
                error_code: code.into(),
                error_message: "nope".into(),
                display_message: None,
                request_id: None,
            }
            .into()
        };

        let by_code = webhook_key_not_found("k1", api(400, INVALID_WEBHOOK_KEY_CODE));
        assert_eq!(by_code.kind(), ErrorKind::NotFound);
        assert!(by_code.to_string().contains("k1"));

        let by_status = webhook_key_not_found("k1", api(404, ""));
        assert_eq!(by_status.kind(), ErrorKind::NotFound);

        let other = webhook_key_not_found("k1", api(500, "INTERNAL_SERVER_ERROR"));
        assert_eq!(other.kind(), ErrorKind::ProviderRequest);
    }
}
