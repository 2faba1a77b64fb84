//! Error types for portage-rig.

use std::fmt;

use portage_core::ErrorKind;

/// Result type alias for rig operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during rig operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Provider rejected or failed the request.
    #[error("provider error: {provider}: {message}")]
    Provider { provider: String, message: String },

    /// Provider could not be reached.
    #[error("network error: {provider}: {message}")]
    Network { provider: String, message: String },

    /// Provider throttled the request.
    #[error("rate limited: {provider}: {message}")]
    RateLimited { provider: String, message: String },

    /// Model reply did not match the requested structure.
    #[error("structured output error: {0}")]
    StructuredOutput(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Creates a provider error.
    pub fn provider(provider: impl fmt::Display, message: impl fmt::Display) -> Self {
        Self::Provider {
            provider: provider.to_string(),
            message: message.to_string(),
        }
    }

    /// Creates a network error.
    pub fn network(provider: impl fmt::Display, message: impl fmt::Display) -> Self {
        Self::Network {
            provider: provider.to_string(),
            message: message.to_string(),
        }
    }

    /// Creates a rate limit error.
    pub fn rate_limited(provider: impl fmt::Display, message: impl fmt::Display) -> Self {
        Self::RateLimited {
            provider: provider.to_string(),
            message: message.to_string(),
        }
    }

    /// Creates a structured output error.
    pub fn structured_output(message: impl fmt::Display) -> Self {
        Self::StructuredOutput(message.to_string())
    }

    /// Creates a configuration error.
    pub fn config(message: impl fmt::Display) -> Self {
        Self::Config(message.to_string())
    }

    /// Returns the matching [`ErrorKind`] of the core error type.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Provider { .. } => ErrorKind::ExternalError,
            Self::Network { .. } => ErrorKind::NetworkError,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::StructuredOutput(_) => ErrorKind::Parse,
            Self::Config(_) => ErrorKind::Configuration,
            Self::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// Returns true if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

impl From<Error> for portage_core::Error {
    fn from(error: Error) -> Self {
        let message = error.to_string();
        portage_core::Error::new(error.kind())
            .with_message(message)
            .with_source(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_into_core_error_with_kind() {
        let error: portage_core::Error = Error::rate_limited("openai", "slow down").into();
        assert_eq!(error.kind(), ErrorKind::RateLimited);
        assert!(error.is_retryable());
        assert_eq!(
            error.to_string(),
            "rate_limited: rate limited: openai: slow down"
        );
    }

    #[test]
    fn provider_errors_are_permanent() {
        let error = Error::provider("anthropic", "invalid model");
        assert!(!error.is_retryable());
        assert_eq!(error.kind(), ErrorKind::ExternalError);
    }
}
