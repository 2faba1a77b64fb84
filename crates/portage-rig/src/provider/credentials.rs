//! Credential types for completion providers.

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

/// API key credentials.
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiKeyCredentials {
    /// API key.
    pub api_key: String,
}

impl ApiKeyCredentials {
    /// Creates credentials from an API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

impl std::fmt::Debug for ApiKeyCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyCredentials")
            .field("api_key", &"***")
            .finish()
    }
}

/// Credentials of every supported completion provider.
#[derive(Debug, Clone, Serialize, Deserialize, IntoStaticStr)]
#[serde(tag = "provider")]
pub enum Credentials {
    /// OpenAI credentials.
    #[serde(rename = "openai")]
    #[strum(serialize = "openai")]
    OpenAi(ApiKeyCredentials),
    /// Anthropic credentials.
    #[serde(rename = "anthropic")]
    #[strum(serialize = "anthropic")]
    Anthropic(ApiKeyCredentials),
}

impl Credentials {
    /// Returns the provider name as a string.
    pub fn provider(&self) -> &'static str {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_hides_api_key() {
        let credentials = Credentials::OpenAi(ApiKeyCredentials::new("sk-secret"));
        assert!(!format!("{credentials:?}").contains("sk-secret"));
        assert_eq!(credentials.provider(), "openai");
    }
}
