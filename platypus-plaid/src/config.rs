//! Plaid configuration loading from environment.

use std::env;
use std::time::Duration;

/// Default per-request timeout enforced by the transport.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Plaid environment the credentials belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaidEnvironment {
    #[default]
    Sandbox,
    Development,
    Production,
}

impl PlaidEnvironment {
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Sandbox => "https://sandbox.plaid.com",
            Self::Development => "https://development.plaid.com",
            Self::Production => "https://production.plaid.com",
        }
    }
}

impl std::str::FromStr for PlaidEnvironment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            other => anyhow::bail!(
                "Unknown Plaid environment: {}. Supported: sandbox, development, production",
                other
            ),
        }
    }
}

/// Plaid client configuration.
#[derive(Clone)]
pub struct PlaidConfig {
    pub client_id: String,
    pub client_secret: String,
    pub environment: PlaidEnvironment,
    /// Overrides the environment's base URL (mock servers, proxies)
    pub base_url: Option<String>,
    pub timeout: Duration,
    pub client_name: String,
    pub language: String,
    pub country_codes: Vec<String>,
    pub products: Vec<String>,
    pub webhook_url: Option<String>,
    pub redirect_uri: Option<String>,
}

impl std::fmt::Debug for PlaidConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaidConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("environment", &self.environment)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("client_name", &self.client_name)
            .field("country_codes", &self.country_codes)
            .field("products", &self.products)
            .finish_non_exhaustive()
    }
}

impl PlaidConfig {
    /// Creates a configuration with default link settings.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        environment: PlaidEnvironment,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            environment,
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            client_name: "monetr".to_string(),
            language: "en".to_string(),
            country_codes: vec!["US".to_string()],
            products: vec!["transactions".to_string()],
            webhook_url: None,
            redirect_uri: None,
        }
    }

    /// Points the client at a different server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Base URL requests are sent to, without a trailing slash.
    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .as_deref()
            .unwrap_or(self.environment.base_url())
            .trim_end_matches('/')
            .to_string()
    }

    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Loads configuration through `lookup`, one variable at a time.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let client_id = lookup("PLAID_CLIENT_ID")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| anyhow::anyhow!("PLAID_CLIENT_ID environment variable is required"))?;

        let client_secret = lookup("PLAID_CLIENT_SECRET")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!("PLAID_CLIENT_SECRET environment variable is required")
            })?;

        let environment = match lookup("PLAID_ENVIRONMENT") {
            Some(value) => value.parse()?,
            None => PlaidEnvironment::default(),
        };

        let mut config = Self::new(client_id, client_secret, environment);
        config.base_url = lookup("PLAID_BASE_URL").filter(|v| !v.is_empty());

        if let Some(timeout) = lookup("PLAID_TIMEOUT_SECS") {
            let secs: u64 = timeout
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid PLAID_TIMEOUT_SECS: {}", timeout))?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(name) = lookup("PLAID_CLIENT_NAME") {
            config.client_name = name;
        }
        if let Some(language) = lookup("PLAID_LANGUAGE") {
            config.language = language;
        }
        if let Some(codes) = lookup("PLAID_COUNTRY_CODES") {
            config.country_codes = split_list(&codes, true);
        }
        if let Some(products) = lookup("PLAID_PRODUCTS") {
            config.products = split_list(&products, false);
        }
        config.webhook_url = lookup("PLAID_WEBHOOK_URL").filter(|v| !v.is_empty());
        config.redirect_uri = lookup("PLAID_REDIRECT_URI").filter(|v| !v.is_empty());

        Ok(config)
    }
}

fn split_list(value: &str, uppercase: bool) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            if uppercase {
                v.to_uppercase()
            } else {
                v.to_lowercase()
            }
        })
        .collect()
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

    #[test]
    fn test_requires_credentials() {
        let err = PlaidConfig::from_vars(vars(&[("PLAID_CLIENT_ID", "id")])).unwrap_err();
        assert!(err.to_string().contains("PLAID_CLIENT_SECRET"));
    }

    #[test]
    fn test_defaults() {
        let config = PlaidConfig::from_vars(vars(&[
            ("PLAID_CLIENT_ID", "id"),
            ("PLAID_CLIENT_SECRET", "secret"),
        ]))
        .unwrap();
        assert_eq!(config.environment, PlaidEnvironment::Sandbox);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.country_codes, vec!["US"]);
        assert_eq!(config.products, vec!["transactions"]);
        assert_eq!(config.resolved_base_url(), "https://sandbox.plaid.com");
    }

    #[test]
    fn test_overrides() {
        let config = PlaidConfig::from_vars(vars(&[
            ("PLAID_CLIENT_ID", "id"),
            ("PLAID_CLIENT_SECRET", "secret"),
            ("PLAID_ENVIRONMENT", "Production"),
            ("PLAID_BASE_URL", "http://127.0.0.1:9000/"),
            ("PLAID_TIMEOUT_SECS", "5"),
            ("PLAID_COUNTRY_CODES", "us, ca"),
            ("PLAID_PRODUCTS", "Transactions,auth"),
        ]))
        .unwrap();
        assert_eq!(config.environment, PlaidEnvironment::Production);
        assert_eq!(config.resolved_base_url(), "http://127.0.0.1:9000");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.country_codes, vec!["US", "CA"]);
        assert_eq!(config.products, vec!["transactions", "auth"]);
    }

    #[test]
    fn test_invalid_environment() {
        let result = PlaidConfig::from_vars(vars(&[
            ("PLAID_CLIENT_ID", "id"),
            ("PLAID_CLIENT_SECRET", "secret"),
            ("PLAID_ENVIRONMENT", "staging"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = PlaidConfig::new("id", "super-secret", PlaidEnvironment::Sandbox);
        assert!(!format!("{:?}", config).contains("super-secret"));
    }
}
