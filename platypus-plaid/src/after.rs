//! Post-request instrumentation shared by every Plaid operation.

use std::collections::BTreeMap;

use platypus_types::{CallSpan, HttpBreadcrumb, PlatypusError, SpanStatus};

use crate::transport::Exchange;

/// Span tag and data key holding Plaid's correlation id.
pub const REQUEST_ID_TAG: &str = "plaidRequestId";

/// Breadcrumb category for Plaid requests.
pub const BREADCRUMB_CATEGORY: &str = "plaid";

/// Records the outcome of one outbound request on `span`.
///
/// When the server answered, the correlation id is attached as tag and data
/// and an HTTP breadcrumb describing the request is added. The span status
/// reflects the result. Errors come back wrapped with `error_message`;
/// successes are returned untouched.
pub fn after<T>(
    span: &mut dyn CallSpan,
    exchange: Exchange<T>,
    message: &str,
    error_message: &str,
) -> Result<T, PlatypusError> {
    if let Some(response) = exchange.response {
        let request_id = response.request_id.unwrap_or_default();
        span.set_tag(REQUEST_ID_TAG, &request_id);
        span.set_data(REQUEST_ID_TAG, serde_json::Value::String(request_id.clone()));

        let mut data = BTreeMap::new();
        data.insert("X-RequestId".to_string(), request_id);
        span.add_breadcrumb(HttpBreadcrumb {
            message: message.to_string(),
            category: BREADCRUMB_CATEGORY.to_string(),
            url: response.url,
            method: response.method,
            status_code: response.status,
            data,
        });
    }

    match exchange.result {
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
