//! Type-safe completion model references.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::Error;

/// Reference to a completion model of a specific provider.
///
/// The textual form is `provider/model`, e.g. `openai/gpt-4o-mini` or
/// `anthropic/claude-sonnet-4-20250514`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", content = "model")]
pub enum CompletionModel {
    /// OpenAI completion models.
    #[serde(rename = "openai")]
    OpenAi(OpenAiCompletionModel),
    /// Anthropic models.
    #[serde(rename = "anthropic")]
    Anthropic(AnthropicModel),
}

/// OpenAI completion models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum OpenAiCompletionModel {
    /// GPT-4o (multimodal flagship)
    #[strum(serialize = "gpt-4o")]
    #[serde(rename = "gpt-4o")]
    Gpt4o,
    /// GPT-4o mini (fast, affordable)
    #[strum(serialize = "gpt-4o-mini")]
    #[serde(rename = "gpt-4o-mini")]
    Gpt4oMini,
    /// GPT-4.1
    #[strum(serialize = "gpt-4.1")]
    #[serde(rename = "gpt-4.1")]
    Gpt41,
    /// GPT-4.1 mini
    #[strum(serialize = "gpt-4.1-mini")]
    #[serde(rename = "gpt-4.1-mini")]
    Gpt41Mini,
    /// o3 mini (reasoning)
    #[strum(serialize = "o3-mini")]
    #[serde(rename = "o3-mini")]
    O3Mini,
}

/// Anthropic models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AnthropicModel {
    /// Claude Opus 4 (most capable)
    #[strum(serialize = "claude-opus-4-20250514")]
    #[serde(rename = "claude-opus-4-20250514")]
    ClaudeOpus4,
    /// Claude Sonnet 4 (balanced)
    #[strum(serialize = "claude-sonnet-4-20250514")]
    #[serde(rename = "claude-sonnet-4-20250514")]
    ClaudeSonnet4,
    /// Claude Haiku 3.5 (fast)
    #[strum(serialize = "claude-3-5-haiku-20241022")]
    #[serde(rename = "claude-3-5-haiku-20241022")]
    ClaudeHaiku35,
}

impl CompletionModel {
    /// Returns the model identifier string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::OpenAi(m) => m.as_ref(),
            Self::Anthropic(m) => m.as_ref(),
        }
    }

    /// Returns the provider name.
    pub fn provider(&self) -> &'static str {
        match self {
            Self::OpenAi(_) => "openai",
            Self::Anthropic(_) => "anthropic",
        }
    }
}

impl Default for CompletionModel {
    fn default() -> Self {
        Self::OpenAi(OpenAiCompletionModel::Gpt4oMini)
    }
}

impl fmt::Display for CompletionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider(), self.as_str())
    }
}

impl FromStr for CompletionModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (provider, model) = s.split_once('/').unwrap_or(("openai", s));
        let unknown = |_| Error::config(format!("unknown {provider} model '{model}'"));
        match provider {
            "openai" => model.parse().map(Self::OpenAi).map_err(unknown),
            "anthropic" => model.parse().map(Self::Anthropic).map_err(unknown),
            other => Err(Error::config(format!("unknown provider '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_gpt_4o_mini() {
        let model = CompletionModel::default();
        assert_eq!(model.to_string(), "openai/gpt-4o-mini");
    }

    #[test]
    fn parses_provider_prefixed_names() {
        let model: CompletionModel = "anthropic/claude-sonnet-4-20250514".parse().unwrap();
        assert_eq!(model, CompletionModel::Anthropic(AnthropicModel::ClaudeSonnet4));

        let model: CompletionModel = "gpt-4o".parse().unwrap();
        assert_eq!(model, CompletionModel::OpenAi(OpenAiCompletionModel::Gpt4o));
    }

    #[test]
    fn rejects_unknown_models() {
        assert!("openai/gpt-2".parse::<CompletionModel>().is_err());
        assert!("mistral/large".parse::<CompletionModel>().is_err());
    }

    #[test]
    fn serializes_with_provider_tag() {
        let json = serde_json::to_value(CompletionModel::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"provider": "openai", "model": "gpt-4o-mini"})
        );
    }
}
