//! Instrumentation port.
//!
//! Every provider operation opens one span through this port and reports
//! each outbound request on it. Adapters decide where spans go (tracing,
//! an in-memory recorder, nowhere).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Final state of a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SpanStatus {
    #[default]
    Unset,
    Ok,
    InternalError,
}

impl AsRef<str> for SpanStatus {
    fn as_ref(&self) -> &str {
        match self {
            Self::Unset => "unset",
            Self::Ok => "ok",
            Self::InternalError => "internal_error",
        }
    }
}

/// Diagnostic event describing one completed HTTP exchange.
///
/// Never carries credentials: only method, URL, status and correlation data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpBreadcrumb {
    pub message: String,
    pub category: String,
    pub url: String,
    pub method: String,
    pub status_code: u16,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

/// An open span. Finishes when dropped.
pub trait CallSpan: Send {
    fn set_tag(&mut self, key: &str, value: &str);

    fn set_data(&mut self, key: &str, value: serde_json::Value);

    fn add_breadcrumb(&mut self, breadcrumb: HttpBreadcrumb);

    fn set_status(&mut self, status: SpanStatus);
}

/// Factory for spans, injected into provider factories and clients.
pub trait Instrumentation: Send + Sync + 'static {
    fn start_span(&self, operation: &str) -> Box<dyn CallSpan>;
}
