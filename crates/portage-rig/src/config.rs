//! Configuration for LLM access.

use std::sync::Arc;

#[cfg(feature = "config")]
use clap::Args;
use portage_core::IntoProvider;
use serde::{Deserialize, Serialize};

use crate::provider::{ApiKeyCredentials, CompletionModel, CompletionProvider, Credentials};
use crate::{Completion, Error, Result, StructuredOutput};

/// Configuration of the completion model used by the converters.
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct RigConfig {
    /// Completion model as `provider/model`.
    #[cfg_attr(
        feature = "config",
        arg(long = "llm-model", env = "LLM_MODEL", default_value = "openai/gpt-4o-mini")
    )]
    pub model: CompletionModel,

    /// OpenAI API key.
    #[serde(default, skip_serializing)]
    #[cfg_attr(feature = "config", arg(long, env = "OPENAI_API_KEY", hide_env_values = true))]
    pub openai_api_key: Option<String>,

    /// Anthropic API key.
    #[serde(default, skip_serializing)]
    #[cfg_attr(
        feature = "config",
        arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)
    )]
    pub anthropic_api_key: Option<String>,

    /// Sampling temperature sent with every request.
    #[cfg_attr(feature = "config", arg(long = "llm-temperature", env = "LLM_TEMPERATURE"))]
    pub temperature: Option<f64>,

    /// Attempts per structured reply before giving up.
    #[cfg_attr(
        feature = "config",
        arg(long = "llm-attempts", env = "LLM_ATTEMPTS", default_value_t = StructuredOutput::DEFAULT_ATTEMPTS)
    )]
    pub attempts: u32,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            model: CompletionModel::default(),
            openai_api_key: None,
            anthropic_api_key: None,
            temperature: None,
            attempts: StructuredOutput::DEFAULT_ATTEMPTS,
        }
    }
}

impl RigConfig {
    /// Returns the credentials matching the configured model's provider.
    pub fn credentials(&self) -> Result<Credentials> {
        let (key, env) = match self.model {
            CompletionModel::OpenAi(_) => (&self.openai_api_key, "OPENAI_API_KEY"),
            CompletionModel::Anthropic(_) => (&self.anthropic_api_key, "ANTHROPIC_API_KEY"),
        };
        let api_key = key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::config(format!("{env} is required for {}", self.model)))?;

        let credentials = ApiKeyCredentials::new(api_key);
        Ok(match self.model {
            CompletionModel::OpenAi(_) => Credentials::OpenAi(credentials),
            CompletionModel::Anthropic(_) => Credentials::Anthropic(credentials),
        })
    }

    /// Creates the completion provider described by this configuration.
    pub async fn completion_provider(&self) -> portage_core::Result<CompletionProvider> {
        let credentials = self.credentials()?;
        CompletionProvider::create(self.model.clone(), credentials).await
    }

    /// Wraps `completion` with the configured structured output settings.
    pub fn structured_output(&self, completion: Arc<dyn Completion>) -> StructuredOutput {
        StructuredOutput::new(completion)
            .with_attempts(self.attempts)
            .with_temperature(self.temperature)
    }
}

impl std::fmt::Debug for RigConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RigConfig")
            .field("model", &self.model)
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "***"))
            .field("anthropic_api_key", &self.anthropic_api_key.as_ref().map(|_| "***"))
            .field("temperature", &self.temperature)
            .field("attempts", &self.attempts)
            .finish()
    }
}
