//! # Platypus Plaid Adapter
//!
//! Implements the provider ports against the Plaid API.
//!
//! ## Architecture
//!
//! This crate is an **adapter** in the hexagonal architecture:
//! - `config` - Credentials, environment and link settings from env vars
//! - `transport` - Pooled reqwest client, error classification, cancellation
//! - `wire` - Plaid request/response models
//! - `convert` - Wire models to domain types
//! - `after` - Per-request span tagging and breadcrumbs
//! - `instrumentation` - Tracing, no-op and recording span sinks
//! - `platypus` / `client` - The factory and per-link client

pub mod after;
pub mod client;
pub mod config;
pub mod convert;
pub mod instrumentation;
pub mod platypus;
pub mod transport;
pub mod wire;

use std::sync::Arc;

use platypus_types::{Instrumentation, LinkRepository, Platypus, PlatypusError, SecretsProvider};

pub use after::after;
pub use client::{PlaidClient, TRANSACTIONS_PAGE_SIZE};
pub use config::{PlaidConfig, PlaidEnvironment};
pub use instrumentation::{
    NoopInstrumentation, RecordedSpan, RecordingInstrumentation, TracingInstrumentation,
};
pub use platypus::Plaid;
pub use transport::{Exchange, PlaidTransport, ResponseMeta};

/// Aggregators a factory can be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    #[default]
    Plaid,
}

impl std::str::FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "plaid" => Ok(Self::Plaid),
            other => anyhow::bail!("Unknown provider: {}. Supported: plaid", other),
        }
    }
}

/// Collaborators every provider factory is wired with.
#[derive(Clone)]
pub struct ProviderDeps {
    pub secrets: Arc<dyn SecretsProvider>,
    pub repo: Arc<dyn LinkRepository>,
    pub instrumentation: Arc<dyn Instrumentation>,
}

impl ProviderDeps {
    /// Deps with spans routed through `tracing`.
    pub fn new(secrets: Arc<dyn SecretsProvider>, repo: Arc<dyn LinkRepository>) -> Self {
        Self {
            secrets,
            repo,
            instrumentation: Arc::new(TracingInstrumentation),
        }
    }

    pub fn with_instrumentation(mut self, instrumentation: Arc<dyn Instrumentation>) -> Self {
        self.instrumentation = instrumentation;
        self
    }
}

/// Builds the factory for `kind`.
pub fn build_platypus(
    kind: ProviderKind,
    config: PlaidConfig,
    deps: ProviderDeps,
) -> Result<Arc<dyn Platypus>, PlatypusError> {
    match kind {
        ProviderKind::Plaid => Ok(Arc::new(Plaid::new(
            config,
            deps.secrets,
            deps.repo,
            deps.instrumentation,
        )?)),
    }
}
