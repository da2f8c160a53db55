//! # Platypus Store
//!
//! In-memory adapters for the [`LinkRepository`] and [`SecretsProvider`]
//! ports. Used by the CLI and by tests; a deployment backs the same ports
//! with its database and secret manager.

mod links;
mod secrets;

pub use links::InMemoryLinkRepository;
pub use secrets::InMemorySecretsProvider;

#[doc(no_inline)]
pub use platypus_types::{LinkRepository, SecretsProvider};
