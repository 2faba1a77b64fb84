//! Schema-constrained JSON replies.

use std::sync::Arc;

use portage_core::LlmUsage;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use crate::{Completion, CompletionRequest, Error, Result, TRACING_TARGET};

const SCHEMA_INSTRUCTIONS: &str = "\
Reply with a single JSON object that conforms to this JSON schema:

{schema}

Only output valid JSON, no explanation or markdown formatting.";

/// Parsed reply together with the usage of every attempt that produced it.
#[derive(Debug, Clone)]
pub struct Structured<T> {
    /// Deserialized reply.
    pub value: T,
    /// Usage of each completion call, failed attempts included.
    pub usage: Vec<LlmUsage>,
}

/// Asks a completion backend for JSON matching the schema of `T`.
///
/// Replies wrapped in markdown fences or surrounded by prose are accepted as
/// long as a JSON value can be cut out of them. A reply that still does not
/// deserialize is re-requested up to the configured number of attempts.
#[derive(Clone)]
pub struct StructuredOutput {
    completion: Arc<dyn Completion>,
    attempts: u32,
    temperature: Option<f64>,
}

impl StructuredOutput {
    /// Default number of attempts per extraction.
    pub const DEFAULT_ATTEMPTS: u32 = 2;

    /// Creates a structured output helper on top of a completion backend.
    pub fn new(completion: Arc<dyn Completion>) -> Self {
        Self {
            completion,
            attempts: Self::DEFAULT_ATTEMPTS,
            temperature: None,
        }
    }

    /// Sets the number of attempts; zero is treated as one.
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Sets the sampling temperature of every request.
    pub fn with_temperature(mut self, temperature: Option<f64>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Returns the underlying completion backend.
    pub fn completion(&self) -> &Arc<dyn Completion> {
        &self.completion
    }

    /// Sends `prompt` and deserializes the reply into `T`.
    pub async fn extract<T>(&self, preamble: &str, prompt: &str) -> Result<Structured<T>>
    where
        T: JsonSchema + DeserializeOwned,
    {
        let schema = serde_json::to_string_pretty(&schemars::schema_for!(T))?;
        let instructions = SCHEMA_INSTRUCTIONS.replace("{schema}", &schema);
        let preamble = if preamble.is_empty() {
            instructions
        } else {
            format!("{preamble}\n\n{instructions}")
        };

        let mut usage = Vec::new();
        let mut last_error = None;
        for attempt in 1..=self.attempts {
            let mut request = CompletionRequest::new(prompt).with_preamble(preamble.clone());
            if let Some(temperature) = self.temperature {
                request = request.with_temperature(temperature);
            }

            let response = self.completion.complete(request).await?;
            usage.push(response.usage);

            match parse_json::<T>(&response.text) {
                Ok(value) => return Ok(Structured { value, usage }),
                Err(error) => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        model = self.completion.model_name(),
                        attempt,
                        error = %error,
                        "Reply did not match the requested schema"
                    );
                    last_error = Some(error);
                }
            }
        }

        let reason = last_error.map(|e| e.to_string()).unwrap_or_default();
        Err(Error::structured_output(format!(
            "no valid reply after {} attempt(s): {reason}",
            self.attempts
        )))
    }
}

impl std::fmt::Debug for StructuredOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuredOutput")
            .field("model", &self.completion.model_name())
            .field("attempts", &self.attempts)
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// Deserializes the JSON value contained in a model reply.
pub(crate) fn parse_json<T: DeserializeOwned>(text: &str) -> serde_json::Result<T> {
    let text = text.trim();
    let direct = serde_json::from_str(text);
    if direct.is_ok() {
        return direct;
    }

    if let Some(body) = fenced_block(text)
        && let Ok(value) = serde_json::from_str(body)
    {
        return Ok(value);
    }

    text.match_indices(['{', '['])
        .find_map(|(start, _)| first_value(&text[start..]))
        .map_or(direct, Ok)
}

/// Deserializes the value at the start of `text`, ignoring what follows it.
fn first_value<T: DeserializeOwned>(text: &str) -> Option<T> {
    serde_json::Deserializer::from_str(text)
        .into_iter::<T>()
        .next()
        .and_then(|value| value.ok())
}

/// Returns the body of the first markdown code fence.
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let (_, body) = text[open + 3..].split_once('\n')?;
    let body = body.rfind("```").map_or(body, |close| &body[..close]);
    Some(body.trim())
}

#[cfg(test)]
mod tests {
    use schemars::JsonSchema;
    use serde::Deserialize;

    use super::*;
    use crate::mock::MockCompletion;

    #[derive(Debug, Deserialize, JsonSchema, PartialEq)]
    struct Converted {
        code: String,
        imports: Vec<String>,
    }

    #[test]
    fn parses_plain_fenced_and_wrapped_json() {
        let plain: Converted = parse_json(r#"{"code": "x", "imports": []}"#).unwrap();
        assert_eq!(plain.code, "x");

        let fenced: Converted =
            parse_json("```json\n{\"code\": \"y\", \"imports\": [\"a\"]}\n```").unwrap();
        assert_eq!(fenced.imports, vec!["a"]);

        let wrapped: Converted =
            parse_json("Here you go: {\"code\": \"z\", \"imports\": []} hope it helps").unwrap();
        assert_eq!(wrapped.code, "z");
    }

    #[test]
    fn stops_at_the_end_of_the_first_object() {
        let reply = "Result: {\"code\": \"z\", \"imports\": []}\nNote: see {example} and [1].";
        let parsed: Converted = parse_json(reply).unwrap();
        assert_eq!(parsed.code, "z");

        let nested: Converted =
            parse_json("{note} then {\"code\": \"{}\", \"imports\": [\"]\"]} done}").unwrap();
        assert_eq!(nested.code, "{}");
        assert_eq!(nested.imports, vec!["]"]);
    }

    #[test]
    fn keeps_backticks_inside_strings() {
        let value: Converted =
            parse_json(r#"{"code": "const s = `a${b}`;", "imports": []}"#).unwrap();
        assert_eq!(value.code, "const s = `a${b}`;");
    }

    #[tokio::test]
    async fn retries_until_reply_parses() {
        let mock = Arc::new(MockCompletion::scripted([
            "sorry, I cannot do that",
            r#"{"code": "export {}", "imports": []}"#,
        ]));
        let structured = StructuredOutput::new(mock.clone()).with_attempts(2);

        let result = structured
            .extract::<Converted>("You convert code.", "convert this")
            .await
            .unwrap();
        assert_eq!(result.value.code, "export {}");
        assert_eq!(result.usage.len(), 2);

        let requests = mock.requests();
        let preamble = requests[0].preamble.as_deref().unwrap();
        assert!(preamble.starts_with("You convert code."));
        assert!(preamble.contains("\"imports\""));
    }

    #[tokio::test]
    async fn fails_after_last_attempt() {
        let mock = Arc::new(MockCompletion::replying("not json"));
        let structured = StructuredOutput::new(mock.clone()).with_attempts(3);

        let error = structured
            .extract::<Converted>("", "convert this")
            .await
            .unwrap_err();
        assert!(matches!(error, Error::StructuredOutput(_)));
        assert_eq!(mock.requests().len(), 3);
    }
}
