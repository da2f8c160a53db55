//! HTTP transport to the Plaid API.
//!
//! One pooled `reqwest::Client` per factory, shared by every client the
//! factory builds. Credentials travel as default headers, access tokens in
//! the JSON body. Nothing here retries.

use platypus_types::{CallContext, PlatypusError, ProviderRequestError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::PlaidConfig;
use crate::wire::PlaidErrorBody;

/// Plaid API version every request is pinned to.
pub const PLAID_API_VERSION: &str = "2020-09-14";

/// Response header carrying Plaid's correlation id.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Metadata of a response that was actually received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMeta {
    pub url: String,
    pub method: String,
    pub status: u16,
    pub request_id: Option<String>,
}

/// Outcome of one outbound request.
///
/// `response` is set whenever the server answered, including non-2xx
/// answers and bodies that failed to decode.
#[derive(Debug)]
pub struct Exchange<T> {
    pub response: Option<ResponseMeta>,
    pub result: Result<T, PlatypusError>,
}

impl<T> Exchange<T> {
    /// An exchange that never reached the server.
    pub fn failed(err: impl Into<PlatypusError>) -> Self {
        Self {
            response: None,
            result: Err(err.into()),
        }
    }

    /// Chains a fallible step onto a successful result, keeping the response metadata.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Result<U, PlatypusError>) -> Exchange<U> {
        Exchange {
            response: self.response,
            result: self.result.and_then(f),
        }
    }

    pub fn map_err(self, f: impl FnOnce(PlatypusError) -> PlatypusError) -> Self {
        Self {
            response: self.response,
            result: self.result.map_err(f),
        }
    }
}

/// Pooled HTTP transport bound to one base URL and set of credentials.
#[derive(Clone)]
pub struct PlaidTransport {
    http: Client,
    base_url: String,
}

impl PlaidTransport {
    /// Builds the pooled client with credentials and API version as default headers.
    pub fn new(config: &PlaidConfig) -> Result<Self, PlatypusError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("plaid-client-id"),
            header_value("PLAID-CLIENT-ID", &config.client_id)?,
        );
        let mut secret = header_value("PLAID-SECRET", &config.client_secret)?;
        secret.set_sensitive(true);
        headers.insert(HeaderName::from_static("plaid-secret"), secret);
        headers.insert(
            HeaderName::from_static("plaid-version"),
            HeaderValue::from_static(PLAID_API_VERSION),
        );

        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderRequestError::Transport {
                message: "failed to build HTTP client".to_string(),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            http,
            base_url: config.resolved_base_url(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Posts `body` as JSON to `path` and decodes the response.
    ///
    /// Fails with `Canceled` without sending anything when `ctx` is already
    /// done, and abandons the request if `ctx` finishes while it is in flight.
    pub async fn post<B, R>(&self, ctx: &CallContext, path: &str, body: &B) -> Exchange<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);

        let response = match ctx.run(self.http.post(&url).json(body).send()).await {
            Err(canceled) => return Exchange::failed(canceled),
            Ok(Err(e)) => return Exchange::failed(transport_error(e)),
            Ok(Ok(response)) => response,
        };

        let status = response.status();
        let meta = ResponseMeta {
            url,
            method: "POST".to_string(),
            status: status.as_u16(),
            request_id: response
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        };

        let bytes = match ctx.run(response.bytes()).await {
            Err(canceled) => {
                return Exchange {
                    response: Some(meta),
                    result: Err(canceled),
                };
            }
            Ok(Err(e)) => {
                return Exchange {
                    response: Some(meta),
                    result: Err(transport_error(e).into()),
                };
            }
            Ok(Ok(bytes)) => bytes,
        };

        let result: Result<R, PlatypusError> = if status.is_success() {
            serde_json::from_slice::<R>(&bytes)
                .map_err(|e| ProviderRequestError::Decode(format!("{path}: {e}")).into())
        } else {
            Err(api_error(status.as_u16(), &bytes, meta.request_id.as_deref()).into())
        };

        Exchange {
            response: Some(meta),
            result,
        }
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, PlatypusError> {
    HeaderValue::from_str(value).map_err(|_| {
        ProviderRequestError::InvalidRequest(format!("{name} contains invalid header characters"))
            .into()
    })
}

fn transport_error(err: reqwest::Error) -> ProviderRequestError {
    let message = if err.is_timeout() {
        "request timed out"
    } else if err.is_connect() {
        "failed to connect to provider"
    } else if err.is_body() || err.is_decode() {
        "failed to read response body"
    } else {
        "request failed"
    };
    ProviderRequestError::Transport {
        message: message.to_string(),
        source: Some(Box::new(err)),
    }
}

fn api_error(status: u16, body: &[u8], header_request_id: Option<&str>) -> ProviderRequestError {
    let parsed: PlaidErrorBody = serde_json::from_slice(body).unwrap_or_else(|_| PlaidErrorBody {
        error_message: String::from_utf8_lossy(body).into_owned(),
        ..Default::default()
    });
    ProviderRequestError::Api {
        status,
        error_type: parsed.error_type,
        error_code: parsed.error_code,
        error_message: parsed.error_message,
        display_message: parsed.display_message,
        request_id: parsed
            .request_id
            .or_else(|| header_request_id.map(str::to_string)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlaidEnvironment;

    #[test]
    fn test_api_error_parses_plaid_body() {
        let body = br#"{
            "error_type": "INVALID_INPUT",
            "error_code": "INVALID_PUBLIC_TOKEN",
            "error_message": "provided public token is in an invalid format",
            "display_message": null,
            "request_id": "req-9"
        }"#;
        let err = api_error(400, body, None);
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.error_code(), Some("INVALID_PUBLIC_TOKEN"));
        match err {
            ProviderRequestError::Api { request_id, .. } => {
                assert_eq!(request_id.as_deref(), Some("req-9"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_api_error_non_json_body() {
        let err = api_error(502, b"Bad Gateway", Some("req-header"));
        match err {
            ProviderRequestError::Api {
                error_message,
                request_id,
                ..
            } => {
                assert_eq!(error_message, "Bad Gateway");
                assert_eq!(request_id.as_deref(), Some("req-header"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_unprintable_credentials() {
        let config = PlaidConfig::new("id\n", "secret", PlaidEnvironment::Sandbox);
        assert!(PlaidTransport::new(&config).is_err());
    }

    #[test]
    fn test_base_url_from_config() {
        let config = PlaidConfig::new("id", "secret", PlaidEnvironment::Sandbox)
            .with_base_url("http://127.0.0.1:1234/");
        let transport = PlaidTransport::new(&config).unwrap();
        assert_eq!(transport.base_url(), "http://127.0.0.1:1234");
    }

    #[test]
    fn test_exchange_and_then_keeps_response() {
        let exchange: Exchange<u32> = Exchange {
            response: Some(ResponseMeta {
                url: "http://localhost/accounts/get".into(),
                method: "POST".into(),
                status: 200,
                request_id: Some("req-1".into()),
            }),
            result: Ok(1),
        };
        let chained = exchange.and_then(|_| {
            Err::<u32, _>(PlatypusError::NotFound("gone".into()))
        });
        assert!(chained.response.is_some());
        assert!(chained.result.is_err());
    }
}
