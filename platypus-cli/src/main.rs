//! # Platypus CLI
//!
//! Drives the provider layer from the command line:
//! - Load configuration from environment
//! - Set up logging and optional trace export
//! - Build the provider factory over in-memory ports
//! - Run one command and print the result as JSON

mod config;
mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{Days, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde_json::json;

use platypus_plaid::{Plaid, ProviderDeps, TracingInstrumentation, build_platypus};
use platypus_store::{InMemoryLinkRepository, InMemorySecretsProvider};
use platypus_types::{
    AccessToken, AccountId, CallContext, Link, LinkId, LinkTokenOptions, PlaidLink,
    Platypus, PlatypusClient, SecretsProvider,
};

#[derive(Parser)]
#[command(name = "platypus")]
#[command(author, version, about = "Bank-data provider CLI", long_about = None)]
struct Cli {
    /// Abandon the command after this many seconds
    #[arg(long, global = true, env = "PLATYPUS_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a link token for a user
    LinkToken {
        /// Stable identifier of the end user
        #[arg(long)]
        user: String,
        #[arg(long)]
        legal_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        /// Re-authenticate the item behind this access token instead
        #[arg(long, env = "PLAID_UPDATE_ACCESS_TOKEN")]
        update_access_token: Option<String>,
    },
    /// Exchange a public token for an access token
    Exchange {
        public_token: String,
        /// Print the access token instead of its fingerprint
        #[arg(long)]
        reveal: bool,
    },
    /// Fetch a webhook verification key
    WebhookKey { key_id: String },
    /// List bank accounts under an item
    Accounts {
        #[command(flatten)]
        token: TokenArgs,
        /// Restrict to these provider account ids
        #[arg(long = "account")]
        accounts: Vec<String>,
    },
    /// List transactions under an item
    Transactions {
        #[command(flatten)]
        token: TokenArgs,
        /// First day, inclusive (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// Last day, inclusive (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,
        #[arg(long = "account")]
        accounts: Vec<String>,
    },
    /// Show the health of an item
    Item {
        #[command(flatten)]
        token: TokenArgs,
    },
    /// Remove an item at the provider
    RemoveItem {
        #[command(flatten)]
        token: TokenArgs,
    },
    /// Link a sandbox institution end to end and list its accounts
    SandboxLink {
        #[arg(long, default_value = "ins_109508")]
        institution: String,
        /// Also fetch this many days of transactions
        #[arg(long)]
        days: Option<u64>,
    },
}

#[derive(clap::Args)]
struct TokenArgs {
    #[arg(long, env = "PLAID_ACCESS_TOKEN", hide_env_values = true)]
    access_token: String,
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// A client for an access token given on the command line.
async fn client_for_token(
    platypus: &dyn Platypus,
    ctx: &CallContext,
    token: TokenArgs,
) -> Result<Box<dyn PlatypusClient>> {
    let link = Link::manual(AccountId::new(0), LinkId::new(0));
    Ok(platypus
        .new_client(ctx, &link, AccessToken::new(token.access_token))
        .await?)
}

/// Context canceled by Ctrl-C and bounded by the optional timeout.
fn call_context(timeout_secs: Option<u64>) -> CallContext {
    let (ctx, cancel) = CallContext::with_cancel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, canceling");
            cancel.cancel();
        }
    });
    match timeout_secs {
        Some(secs) => ctx.with_timeout(Duration::from_secs(secs)),
        None => ctx,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = config::Config::from_env()?;
    let otel_provider = telemetry::init(&config)?;

    let result = run(cli, config).await;

    telemetry::shutdown(otel_provider);
    result
}

async fn run(cli: Cli, config: config::Config) -> Result<()> {
    let ctx = call_context(cli.timeout_secs);
    let repo = Arc::new(InMemoryLinkRepository::new());
    let secrets = Arc::new(InMemorySecretsProvider::new());

    match cli.command {
        Commands::SandboxLink { institution, days } => {
            let plaid = Plaid::new(
                config.plaid,
                secrets.clone(),
                repo.clone(),
                Arc::new(TracingInstrumentation),
            )?;
            let result =
                sandbox_link(&plaid, &ctx, &repo, secrets.as_ref(), &institution, days).await;
            plaid.close()?;
            result
        }
        command => {
            let platypus = build_platypus(
                config.provider,
                config.plaid,
                ProviderDeps::new(secrets, repo),
            )?;
            let result = run_command(platypus.as_ref(), &ctx, command).await;
            platypus.close()?;
            result
        }
    }
}

async fn run_command(platypus: &dyn Platypus, ctx: &CallContext, command: Commands) -> Result<()> {
    match command {
        Commands::LinkToken {
            user,
            legal_name,
            email,
            phone,
            update_access_token,
        } => {
            let options = LinkTokenOptions {
                legal_name,
                email_address: email,
                phone_number: phone,
                update_mode_item: update_access_token.map(AccessToken::new),
                ..LinkTokenOptions::for_user(user)
            };
            let token = platypus.create_link_token(ctx, options).await?;
            print_json(&token)?;
        }

        Commands::Exchange {
            public_token,
            reveal,
        } => {
            let (access_token, item_id) = platypus
                .exchange_public_token(ctx, &public_token)
                .await?
                .into_parts();
            let shown = if reveal {
                access_token.expose_secret().to_string()
            } else {
                format!("<redacted {}>", access_token.fingerprint())
            };
            print_json(&json!({ "item_id": item_id, "access_token": shown }))?;
        }

        Commands::WebhookKey { key_id } => {
            let key = platypus.get_webhook_verification_key(ctx, &key_id).await?;
            print_json(&key)?;
        }

        Commands::Accounts { token, accounts } => {
            let client = client_for_token(platypus, ctx, token).await?;
            print_json(&client.get_accounts(ctx, &accounts).await?)?;
        }

        Commands::Transactions {
            token,
            start,
            end,
            accounts,
        } => {
            let client = client_for_token(platypus, ctx, token).await?;
            let transactions = client
                .get_all_transactions(ctx, start, end, &accounts)
                .await?;
            print_json(&transactions)?;
        }

        Commands::Item { token } => {
            let client = client_for_token(platypus, ctx, token).await?;
            print_json(&client.get_item(ctx).await?)?;
        }

        Commands::RemoveItem { token } => {
            let client = client_for_token(platypus, ctx, token).await?;
            client.remove_item(ctx).await?;
            println!("✓ Item removed");
        }

        Commands::SandboxLink { .. } => {
            anyhow::bail!("sandbox-link needs the concrete Plaid factory")
        }
    }

    Ok(())
}

/// Creates a sandbox item, stores it through the ports and reads it back
/// the way the application would.
async fn sandbox_link(
    plaid: &Plaid,
    ctx: &CallContext,
    repo: &InMemoryLinkRepository,
    secrets: &dyn SecretsProvider,
    institution: &str,
    days: Option<u64>,
) -> Result<()> {
    let public_token = plaid
        .sandbox_create_public_token(ctx, institution, &[])
        .await?;
    let (access_token, item_id) = plaid
        .exchange_public_token(ctx, &public_token)
        .await?
        .into_parts();

    let account_id = AccountId::new(1);
    let mut plaid_link = PlaidLink::new(item_id.clone());
    plaid_link.institution_id = Some(institution.to_string());
    repo.insert(Link::plaid(account_id, LinkId::new(1), plaid_link))?;
    secrets
        .store_access_token_for_link_item_id(account_id, &item_id, access_token)
        .await?;

    let client = plaid.new_client_from_item_id(ctx, &item_id).await?;
    let accounts = client.get_accounts(ctx, &[]).await?;

    let transactions = match days {
        Some(days) => {
            let end = Utc::now().date_naive();
            let start = end.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN);
            Some(client.get_all_transactions(ctx, start, end, &[]).await?)
        }
        None => None,
    };

    print_json(&json!({
        "item_id": item_id,
        "accounts": accounts,
        "transactions": transactions,
    }))
}
