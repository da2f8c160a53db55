//! Port traits (interfaces for adapters).
//!
//! The provider layer depends on these traits, not on concrete
//! persistence, secrets or tracing backends.

mod instrumentation;
mod provider;
mod repository;
mod secrets;

pub use instrumentation::{CallSpan, HttpBreadcrumb, Instrumentation, SpanStatus};
pub use provider::{Platypus, PlatypusClient};
pub use repository::LinkRepository;
pub use secrets::SecretsProvider;
