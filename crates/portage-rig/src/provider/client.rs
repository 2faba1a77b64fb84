//! Completion provider wrapping rig completion models.

use std::sync::Arc;
use std::time::Instant;

use portage_core::{IntoProvider, LlmUsage};
use rig::completion::{AssistantContent, CompletionError, CompletionModel as RigCompletionModel};
use rig::one_or_many::OneOrMany;
use rig::prelude::CompletionClient;
use rig::providers::{anthropic, openai};

use super::credentials::Credentials;
use super::model::{AnthropicModel, CompletionModel, OpenAiCompletionModel};
use crate::{Completion, CompletionRequest, CompletionResponse, Error, Result, TRACING_TARGET};

/// Token limit sent to providers that require one when the request has none.
const DEFAULT_MAX_TOKENS: u64 = 8192;

/// Completion provider that wraps the supported rig completion models.
///
/// This is a cheaply cloneable wrapper around an `Arc<CompletionService>`.
#[derive(Clone)]
pub struct CompletionProvider(Arc<CompletionService>);

pub(crate) enum CompletionService {
    OpenAi {
        model: openai::CompletionModel,
        model_name: String,
    },
    Anthropic {
        model: anthropic::completion::CompletionModel,
        model_name: String,
    },
}

#[async_trait::async_trait]
impl IntoProvider for CompletionProvider {
    type Credentials = Credentials;
    type Params = CompletionModel;

    async fn create(
        params: Self::Params,
        credentials: Self::Credentials,
    ) -> portage_core::Result<Self> {
        let provider = match (credentials, params) {
            (Credentials::OpenAi(c), CompletionModel::OpenAi(m)) => Self::openai(&c.api_key, m)?,
            (Credentials::Anthropic(c), CompletionModel::Anthropic(m)) => {
                Self::anthropic(&c.api_key, m)?
            }
            (credentials, model) => {
                return Err(Error::config(format!(
                    "{} credentials cannot be used with {model}",
                    credentials.provider()
                ))
                .into());
            }
        };
        Ok(provider)
    }
}

impl CompletionProvider {
    /// Creates an OpenAI completion provider with a specific model.
    pub fn openai(api_key: &str, model: OpenAiCompletionModel) -> Result<Self> {
        let client = openai::Client::new(api_key)
            .map_err(|e| Error::provider("openai", e.to_string()))?
            .completions_api();
        Ok(Self(Arc::new(CompletionService::OpenAi {
            model: client.completion_model(model.as_ref()),
            model_name: model.as_ref().to_string(),
        })))
    }

    /// Creates an Anthropic completion provider with a specific model.
    pub fn anthropic(api_key: &str, model: AnthropicModel) -> Result<Self> {
        let client = anthropic::Client::new(api_key)
            .map_err(|e| Error::provider("anthropic", e.to_string()))?;
        Ok(Self(Arc::new(CompletionService::Anthropic {
            model: client.completion_model(model.as_ref()),
            model_name: model.as_ref().to_string(),
        })))
    }

    /// Returns the model name.
    pub fn model_name(&self) -> &str {
        match self.0.as_ref() {
            CompletionService::OpenAi { model_name, .. } => model_name,
            CompletionService::Anthropic { model_name, .. } => model_name,
        }
    }

    /// Returns the provider name.
    pub fn provider_name(&self) -> &'static str {
        match self.0.as_ref() {
            CompletionService::OpenAi { .. } => "openai",
            CompletionService::Anthropic { .. } => "anthropic",
        }
    }
}

#[async_trait::async_trait]
impl Completion for CompletionProvider {
    fn model_name(&self) -> &str {
        CompletionProvider::model_name(self)
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let provider = self.provider_name();
        let started = Instant::now();

        let (text, usage) = match self.0.as_ref() {
            CompletionService::OpenAi { model, .. } => send(model, request).await,
            CompletionService::Anthropic { model, .. } => {
                let request = CompletionRequest {
                    max_tokens: request.max_tokens.or(Some(DEFAULT_MAX_TOKENS)),
                    ..request
                };
                send(model, request).await
            }
        }
        .map_err(|e| classify(provider, e))?;

        let usage = LlmUsage::new(self.model_name(), usage.input_tokens, usage.output_tokens);
        tracing::debug!(
            target: TRACING_TARGET,
            provider,
            model = %usage.model,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Completion finished"
        );

        Ok(CompletionResponse { text, usage })
    }
}

async fn send<M>(
    model: &M,
    request: CompletionRequest,
) -> std::result::Result<(String, rig::completion::Usage), CompletionError>
where
    M: RigCompletionModel,
{
    let mut builder = model.completion_request(request.prompt);
    if let Some(preamble) = request.preamble {
        builder = builder.preamble(preamble);
    }
    if let Some(temperature) = request.temperature {
        builder = builder.temperature(temperature);
    }
    if let Some(max_tokens) = request.max_tokens {
        builder = builder.max_tokens(max_tokens);
    }

    let response = builder.send().await?;
    Ok((extract_text_content(&response.choice), response.usage))
}

/// Maps a rig error onto the error kinds callers retry on.
fn classify(provider: &str, error: CompletionError) -> Error {
    let message = error.to_string();
    match error {
        CompletionError::HttpError(_) => Error::network(provider, message),
        CompletionError::ProviderError(ref detail) if is_rate_limit(detail) => {
            Error::rate_limited(provider, message)
        }
        _ => Error::provider(provider, message),
    }
}

fn is_rate_limit(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("rate limit")
        || message.contains("rate_limit")
        || message.contains("429")
        || message.contains("overloaded")
}

/// Extracts text content from assistant content choices.
fn extract_text_content(choice: &OneOrMany<AssistantContent>) -> String {
    choice
        .iter()
        .filter_map(|content| match content {
            AssistantContent::Text(text) => Some(text.text()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("")
}

impl std::fmt::Debug for CompletionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.as_ref() {
            CompletionService::OpenAi { model_name, .. } => f
                .debug_struct("CompletionProvider::OpenAi")
                .field("model", model_name)
                .finish(),
            CompletionService::Anthropic { model_name, .. } => f
                .debug_struct("CompletionProvider::Anthropic")
                .field("model", model_name)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_messages_are_detected() {
        assert!(is_rate_limit("Rate limit reached for gpt-4o-mini"));
        assert!(is_rate_limit("{\"type\":\"overloaded_error\"}"));
        assert!(!is_rate_limit("invalid api key"));
    }

    #[test]
    fn provider_errors_keep_their_kind() {
        let error = classify(
            "openai",
            CompletionError::ProviderError("429 Too Many Requests".into()),
        );
        assert!(error.is_retryable());

        let error = classify("openai", CompletionError::ProviderError("bad key".into()));
        assert!(!error.is_retryable());
    }
}
