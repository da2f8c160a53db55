//! Error types for the bank-data provider layer.

use std::error::Error as StdError;

/// Boxed error used to carry foreign causes (transport, secrets backends).
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Classification of a [`PlatypusError`], stable across any amount of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ProviderRequest,
    NotFound,
    InvalidLink,
    CredentialResolution,
    Conversion,
    Canceled,
    Repository,
}

/// Failures reaching the provider or interpreting its HTTP response.
#[derive(Debug, thiserror::Error)]
pub enum ProviderRequestError {
    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("provider returned HTTP {status}: {error_code} ({error_message})")]
    Api {
        status: u16,
        error_type: String,
        error_code: String,
        error_message: String,
        display_message: Option<String>,
        request_id: Option<String>,
    },

    #[error("failed to decode provider response: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("provider transport has been closed")]
    Closed,
}

impl ProviderRequestError {
    /// Returns the provider error code for API errors.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Api { error_code, .. } => Some(error_code),
            _ => None,
        }
    }

    /// Returns the HTTP status for API errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A provider payload that could not be mapped onto a domain type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error("{entity} is missing required field `{field}`")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },

    #[error("{entity} has invalid field `{field}`: {reason}")]
    InvalidField {
        entity: &'static str,
        field: &'static str,
        reason: String,
    },
}

/// Link repository errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Secrets provider errors.
#[derive(Debug, thiserror::Error)]
pub enum SecretsError {
    #[error("secrets backend unavailable: {0}")]
    Unavailable(String),

    #[error("secret not found")]
    NotFound,

    #[error("secrets backend error: {0}")]
    Backend(#[source] BoxError),
}

/// Errors surfaced by the provider factory and clients.
#[derive(Debug, thiserror::Error)]
pub enum PlatypusError {
    #[error(transparent)]
    ProviderRequest(#[from] ProviderRequestError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid link: {0}")]
    InvalidLink(String),

    #[error("failed to resolve credentials: {message}")]
    CredentialResolution {
        message: String,
        #[source]
        source: Option<SecretsError>,
    },

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("canceled: {0}")]
    Canceled(String),

    #[error(transparent)]
    Repository(#[from] RepoError),

    #[error("{message}: {source}")]
    Context {
        message: String,
        #[source]
        source: Box<PlatypusError>,
    },
}

impl PlatypusError {
    /// Wraps this error with a human-readable message, keeping it as the cause.
    pub fn wrap(self, message: impl Into<String>) -> Self {
        Self::Context {
            message: message.into(),
            source: Box::new(self),
        }
    }

    /// Returns the classification of the innermost error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ProviderRequest(_) => ErrorKind::ProviderRequest,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidLink(_) => ErrorKind::InvalidLink,
            Self::CredentialResolution { .. } => ErrorKind::CredentialResolution,
            Self::Conversion(_) => ErrorKind::Conversion,
            Self::Canceled(_) => ErrorKind::Canceled,
            Self::Repository(_) => ErrorKind::Repository,
            Self::Context { source, .. } => source.kind(),
        }
    }

    /// Returns the innermost error, skipping context wrappers.
    pub fn root(&self) -> &PlatypusError {
        let mut current = self;
        while let Self::Context { source, .. } = current {
            current = source;
        }
        current
    }

    /// Returns the provider request error, if that is what this error is.
    pub fn provider_request(&self) -> Option<&ProviderRequestError> {
        match self.root() {
            Self::ProviderRequest(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_canceled(&self) -> bool {
        self.kind() == ErrorKind::Canceled
    }

    pub fn credential_resolution(message: impl Into<String>, source: Option<SecretsError>) -> Self {
        Self::CredentialResolution {
            message: message.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_preserves_kind() {
        let err = PlatypusError::NotFound("link for item".into())
            .wrap("cannot create client")
            .wrap("sync failed");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "sync failed: cannot create client: not found: link for item"
        );
    }

    #[test]
    fn test_wrap_keeps_cause_chain() {
        let err = PlatypusError::Canceled("deadline exceeded".into()).wrap("failed to get accounts");
        let source = err.source().expect("wrapped error must expose its cause");
        assert_eq!(source.to_string(), "canceled: deadline exceeded");
    }

    #[test]
    fn test_provider_request_accessors() {
        let err = PlatypusError::from(ProviderRequestError::Api {
            status: 400,
            error_type: "INVALID_INPUT".into(),
            error_code: "INVALID_PUBLIC_TOKEN".into(),
            error_message: "provided public token is in an invalid format".into(),
            display_message: None,
            request_id: Some("req-1".into()),
        })
        .wrap("failed to exchange public token");

        assert_eq!(err.kind(), ErrorKind::ProviderRequest);
        let inner = err.provider_request().unwrap();
        assert_eq!(inner.status(), Some(400));
        assert_eq!(inner.error_code(), Some("INVALID_PUBLIC_TOKEN"));
    }

    #[test]
    fn test_conversion_error_message() {
        let err = ConversionError::MissingField {
            entity: "bank account",
            field: "account_id",
        };
        assert_eq!(
            err.to_string(),
            "bank account is missing required field `account_id`"
        );
        assert_eq!(PlatypusError::from(err).kind(), ErrorKind::Conversion);
    }
}
