//! Instrumentation adapters.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use platypus_types::{CallSpan, HttpBreadcrumb, Instrumentation, SpanStatus};
use tracing::field::Empty;

/// Emits spans and breadcrumbs through `tracing`.
///
/// Breadcrumbs become `info` events on the `platypus::breadcrumb` target,
/// so a subscriber can route them separately.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingInstrumentation;

impl Instrumentation for TracingInstrumentation {
    fn start_span(&self, operation: &str) -> Box<dyn CallSpan> {
        let span = tracing::info_span!(
            "platypus.call",
            operation = %operation,
            plaid_request_id = Empty,
            status = Empty,
        );
        Box::new(TracingSpan {
            span,
            operation: operation.to_string(),
            status: SpanStatus::Unset,
            started: Instant::now(),
        })
    }
}

struct TracingSpan {
    span: tracing::Span,
    operation: String,
    status: SpanStatus,
    started: Instant,
}

impl CallSpan for TracingSpan {
    fn set_tag(&mut self, key: &str, value: &str) {
        if key == crate::after::REQUEST_ID_TAG {
            self.span.record("plaid_request_id", value);
        } else {
            tracing::debug!(parent: &self.span, tag = key, value, "span tag");
        }
    }

    fn set_data(&mut self, key: &str, value: serde_json::Value) {
        tracing::debug!(parent: &self.span, key, %value, "span data");
    }

    fn add_breadcrumb(&mut self, breadcrumb: HttpBreadcrumb) {
        tracing::info!(
            target: "platypus::breadcrumb",
            parent: &self.span,
            category = %breadcrumb.category,
            method = %breadcrumb.method,
            url = %breadcrumb.url,
            status_code = breadcrumb.status_code,
            request_id = breadcrumb.data.get("X-RequestId").map(String::as_str).unwrap_or(""),
            "{}",
            breadcrumb.message
        );
    }

    fn set_status(&mut self, status: SpanStatus) {
        self.status = status;
        self.span.record("status", status.as_ref());
    }
}

impl Drop for TracingSpan {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        match self.status {
            SpanStatus::InternalError => tracing::warn!(
                parent: &self.span,
                operation = %self.operation,
                elapsed_ms,
                "provider call failed"
            ),
            _ => tracing::debug!(
                parent: &self.span,
                operation = %self.operation,
                elapsed_ms,
                "provider call finished"
            ),
        }
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInstrumentation;

impl Instrumentation for NoopInstrumentation {
    fn start_span(&self, _operation: &str) -> Box<dyn CallSpan> {
        Box::new(NoopSpan)
    }
}

struct NoopSpan;

impl CallSpan for NoopSpan {
    fn set_tag(&mut self, _key: &str, _value: &str) {}
    fn set_data(&mut self, _key: &str, _value: serde_json::Value) {}
    fn add_breadcrumb(&mut self, _breadcrumb: HttpBreadcrumb) {}
    fn set_status(&mut self, _status: SpanStatus) {}
}

/// A finished span captured by [`RecordingInstrumentation`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordedSpan {
    pub operation: String,
    pub tags: BTreeMap<String, String>,
    pub data: BTreeMap<String, serde_json::Value>,
    pub breadcrumbs: Vec<HttpBreadcrumb>,
    pub status: SpanStatus,
}

/// Keeps every finished span in memory. Cloning shares the recording.
#[derive(Debug, Clone, Default)]
pub struct RecordingInstrumentation {
    finished: Arc<Mutex<Vec<RecordedSpan>>>,
}

impl RecordingInstrumentation {
    pub fn new() -> Self {
        Self::default()
    }

    /// All finished spans in completion order.
    pub fn spans(&self) -> Vec<RecordedSpan> {
        self.finished
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The most recently finished span for `operation`.
    pub fn find(&self, operation: &str) -> Option<RecordedSpan> {
        self.finished
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|s| s.operation == operation)
            .cloned()
    }
}

impl Instrumentation for RecordingInstrumentation {
    fn start_span(&self, operation: &str) -> Box<dyn CallSpan> {
        Box::new(RecordingSpan {
            span: RecordedSpan {
                operation: operation.to_string(),
                ..Default::default()
            },
            sink: Arc::clone(&self.finished),
        })
    }
}

struct RecordingSpan {
    span: RecordedSpan,
    sink: Arc<Mutex<Vec<RecordedSpan>>>,
}

impl CallSpan for RecordingSpan {
    fn set_tag(&mut self, key: &str, value: &str) {
        self.span.tags.insert(key.to_string(), value.to_string());
    }

    fn set_data(&mut self, key: &str, value: serde_json::Value) {
        self.span.data.insert(key.to_string(), value);
    }

    fn add_breadcrumb(&mut self, breadcrumb: HttpBreadcrumb) {
        self.span.breadcrumbs.push(breadcrumb);
    }

    fn set_status(&mut self, status: SpanStatus) {
        self.span.status = status;
    }
}

impl Drop for RecordingSpan {
    fn drop(&mut self) {
        let span = std::mem::take(&mut self.span);
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(span);
    }
}
