//! LLM token usage accounting.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Token usage reported by a single completion call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmUsage {
    /// Model identifier, e.g. `gpt-4o-mini`.
    pub model: String,
    /// Prompt tokens.
    pub input_tokens: u64,
    /// Completion tokens.
    pub output_tokens: u64,
}

impl LlmUsage {
    /// Creates a new usage record.
    pub fn new(model: impl Into<String>, input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            model: model.into(),
            input_tokens,
            output_tokens,
        }
    }

    /// Total tokens billed for the call.
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Accumulated usage of one model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelUsage {
    pub requests: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Usage summed per model across a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSummary {
    #[serde(default)]
    pub models: BTreeMap<String, ModelUsage>,
}

impl UsageSummary {
    /// Creates an empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one completion call.
    pub fn record(&mut self, usage: &LlmUsage) {
        let entry = self.models.entry(usage.model.clone()).or_default();
        entry.requests += 1;
        entry.input_tokens += usage.input_tokens;
        entry.output_tokens += usage.output_tokens;
    }

    /// Number of completion calls across all models.
    pub fn requests(&self) -> u64 {
        self.models.values().map(|m| m.requests).sum()
    }

    /// Total tokens across all models.
    pub fn total_tokens(&self) -> u64 {
        self.models
            .values()
            .map(|m| m.input_tokens + m.output_tokens)
            .sum()
    }
}

impl<'a> FromIterator<&'a LlmUsage> for UsageSummary {
    fn from_iter<I: IntoIterator<Item = &'a LlmUsage>>(iter: I) -> Self {
        let mut summary = Self::new();
        for usage in iter {
            summary.record(usage);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_groups_by_model() {
        let records = [
            LlmUsage::new("gpt-4o-mini", 100, 20),
            LlmUsage::new("gpt-4o-mini", 50, 10),
            LlmUsage::new("claude-3-5-haiku-20241022", 7, 3),
        ];
        let summary: UsageSummary = records.iter().collect();

        assert_eq!(summary.requests(), 3);
        assert_eq!(summary.total_tokens(), 190);
        assert_eq!(summary.models["gpt-4o-mini"].input_tokens, 150);
        assert_eq!(summary.models["claude-3-5-haiku-20241022"].requests, 1);
    }
}
