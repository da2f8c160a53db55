//! Configuration loading from environment.

use std::env;

use platypus_plaid::{PlaidConfig, ProviderKind};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Application configuration.
#[derive(Debug)]
pub struct Config {
    pub provider: ProviderKind,
    pub plaid: PlaidConfig,
    pub log_format: LogFormat,
    /// OTLP collector endpoint; tracing export is off when unset
    pub otel_endpoint: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let provider = match lookup("PLATYPUS_PROVIDER") {
            Some(value) => value.parse()?,
            None => ProviderKind::default(),
        };

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("") | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => anyhow::bail!("Unknown LOG_FORMAT: {}. Supported: text, json", other),
        };

        Ok(Self {
            provider,
            plaid: PlaidConfig::from_vars(&lookup)?,
            log_format,
            otel_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|v| !v.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const CREDENTIALS: [(&str, &str); 2] =
        [("PLAID_CLIENT_ID", "id"), ("PLAID_CLIENT_SECRET", "secret")];

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(vars(&CREDENTIALS)).unwrap();
        assert_eq!(config.provider, ProviderKind::Plaid);
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.otel_endpoint.is_none());
    }

    #[test]
    fn test_json_logs_and_otel() {
        let mut pairs = CREDENTIALS.to_vec();
        pairs.push(("LOG_FORMAT", "json"));
        pairs.push(("OTEL_EXPORTER_OTLP_ENDPOINT", "http://localhost:4317"));
        let config = Config::from_vars(vars(&pairs)).unwrap();
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.otel_endpoint.as_deref(), Some("http://localhost:4317"));
    }

    #[test]
    fn test_rejects_unknown_values() {
        let mut pairs = CREDENTIALS.to_vec();
        pairs.push(("LOG_FORMAT", "xml"));
        assert!(Config::from_vars(vars(&pairs)).is_err());

        let mut pairs = CREDENTIALS.to_vec();
        pairs.push(("PLATYPUS_PROVIDER", "teller"));
        assert!(Config::from_vars(vars(&pairs)).is_err());
    }

    #[test]
    fn test_requires_plaid_credentials() {
        assert!(Config::from_vars(vars(&[])).is_err());
    }
}
