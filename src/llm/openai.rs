//! `OpenAI` adapter.
//!
//! Routes gpt-5 family models to the Responses API and everything else to
//! Chat Completions. Both paths request structured JSON output.

use super::{
    ChatMessage, LlmHttpConfig, PromptValidation, ProviderAdapter, ProviderResponse, Role,
    ValidationVerdict, build_http_client, parse_json_payload, skipped_validation,
    validation_user_message,
};
use crate::models::TokenUsage;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fast model used for style-prompt validation.
const VALIDATION_MODEL: &str = "gpt-4.1-mini";

/// `OpenAI` provider adapter.
pub struct OpenAiAdapter {
    /// API key.
    api_key: String,
    /// API endpoint.
    endpoint: String,
    /// Model to use.
    model: String,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl OpenAiAdapter {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.openai.com/v1";

    /// Creates a new `OpenAI` adapter.
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, http: LlmHttpConfig) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            model: model.into(),
            client: build_http_client(http),
        }
    }

    /// Sets the API endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Whether the model is served by the Responses API.
    fn uses_responses_api(&self) -> bool {
        self.model.starts_with("gpt-5")
    }

    /// Whether the model takes `max_completion_tokens` instead of `max_tokens`.
    fn uses_completion_token_param(model: &str) -> bool {
        model.starts_with("gpt-4.1")
            || model.starts_with("o1")
            || model.starts_with("o3")
            || model.starts_with("o4")
    }

    /// Reasoning models only accept the default temperature.
    fn supports_temperature(model: &str) -> bool {
        !model.starts_with("o1") && !model.starts_with("o3") && !model.starts_with("o4")
    }

    fn post_json<T: Serialize>(&self, path: &str, body: &T) -> Result<Value> {
        let response = self
            .client
            .post(format!("{}{path}", self.endpoint))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .map_err(|e| Error::Provider {
                provider: "openai".to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().unwrap_or(Value::Null);
            let message = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map_or_else(|| format!("API error: {status}"), ToString::to_string);
            return Err(Error::Provider {
                provider: "openai".to_string(),
                message,
            });
        }

        response.json().map_err(|e| Error::Provider {
            provider: "openai".to_string(),
            message: e.to_string(),
        })
    }

    /// Calls the Responses API (gpt-5 family).
    fn generate_responses(&self, messages: &[ChatMessage]) -> Result<ProviderResponse> {
        let system = messages
            .iter()
            .find(|m| m.role == Role::System)
            .map_or("", |m| m.content.as_str());
        let turns: Vec<&ChatMessage> =
            messages.iter().filter(|m| m.role != Role::System).collect();

        // json_object mode requires the literal "json" in both the
        // instructions and the final user input.
        let mut instructions = system.to_string();
        if !instructions.to_lowercase().contains("json") {
            instructions.push_str("\n\nRespond with valid JSON.");
        }

        let last_user_index = turns.iter().rposition(|m| m.role == Role::User);
        let input: Value = if turns.len() == 1 && turns[0].role == Role::User {
            Value::String(ensure_json_literal(&turns[0].content))
        } else {
            let items: Vec<Value> = turns
                .iter()
                .enumerate()
                .map(|(i, m)| {
                    let content = if Some(i) == last_user_index {
                        ensure_json_literal(&m.content)
                    } else {
                        m.content.clone()
                    };
                    serde_json::json!({ "role": m.role, "content": content })
                })
                .collect();
            Value::Array(items)
        };

        let body = serde_json::json!({
            "model": self.model,
            "instructions": instructions,
            "input": input,
            "text": { "format": { "type": "json_object" } },
        });

        let data = self.post_json("/responses", &body)?;

        let text = extract_output_text(&data).ok_or_else(|| Error::InvalidResponseFormat {
            cause: "no output text in response".to_string(),
        })?;

        let usage = TokenUsage {
            input_tokens: data
                .pointer("/usage/input_tokens")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            output_tokens: data
                .pointer("/usage/output_tokens")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            cached_tokens: data
                .pointer("/usage/input_tokens_details/cached_tokens")
                .and_then(Value::as_u64)
                .unwrap_or(0),
        };

        Ok(ProviderResponse {
            result: parse_json_payload(&text)?,
            usage,
        })
    }

    /// Calls the Chat Completions API.
    fn generate_chat(&self, messages: &[ChatMessage]) -> Result<ProviderResponse> {
        let request = ChatCompletionRequest::for_model(&self.model, messages.to_vec());
        let data = self.post_json("/chat/completions", &request)?;

        let content = data
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidResponseFormat {
                cause: "no choices in response".to_string(),
            })?;

        let usage = TokenUsage {
            input_tokens: data
                .pointer("/usage/prompt_tokens")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            output_tokens: data
                .pointer("/usage/completion_tokens")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            cached_tokens: data
                .pointer("/usage/prompt_tokens_details/cached_tokens")
                .and_then(Value::as_u64)
                .unwrap_or(0),
        };

        Ok(ProviderResponse {
            result: parse_json_payload(content)?,
            usage,
        })
    }
}

impl ProviderAdapter for OpenAiAdapter {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn generate(&self, messages: &[ChatMessage]) -> Result<ProviderResponse> {
        if self.uses_responses_api() {
            self.generate_responses(messages)
        } else {
            self.generate_chat(messages)
        }
    }

    fn test_connection(&self) -> Result<bool> {
        // The models endpoint validates the key without requiring JSON mode.
        let response = self
            .client
            .get(format!("{}/models", self.endpoint))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .map_err(|e| Error::Provider {
                provider: "openai".to_string(),
                message: e.to_string(),
            })?;
        Ok(response.status().is_success())
    }

    fn validate_style_prompt(&self, prompt: &str) -> PromptValidation {
        let request = ChatCompletionRequest {
            model: VALIDATION_MODEL.to_string(),
            messages: vec![
                ChatMessage::system(super::VALIDATION_SYSTEM_PROMPT),
                ChatMessage::user(validation_user_message(prompt)),
            ],
            response_format: ResponseFormat::json_object(),
            temperature: Some(0.1),
            max_tokens: None,
            max_completion_tokens: Some(150),
        };

        let verdict: Result<ValidationVerdict> = self
            .post_json("/chat/completions", &request)
            .and_then(|data| {
                let content = data
                    .pointer("/choices/0/message/content")
                    .and_then(Value::as_str)
                    .ok_or_else(|| Error::InvalidResponseFormat {
                        cause: "no choices in response".to_string(),
                    })?;
                serde_json::from_str(content).map_err(|e| Error::InvalidResponseFormat {
                    cause: e.to_string(),
                })
            });

        match verdict {
            Ok(verdict) => verdict.into_validation(),
            Err(err) => skipped_validation(&err),
        }
    }
}

/// Appends a JSON nudge when the content lacks the literal required by
/// json_object mode.
fn ensure_json_literal(content: &str) -> String {
    if content.to_lowercase().contains("json") {
        content.to_string()
    } else {
        format!("{content}\n\nRespond with valid JSON.")
    }
}

/// Concatenates `output_text` items from a Responses API payload.
fn extract_output_text(data: &Value) -> Option<String> {
    let output = data.get("output")?.as_array()?;
    let mut text = String::new();
    for item in output {
        if let Some(contents) = item.get("content").and_then(Value::as_array) {
            for part in contents {
                if part.get("type").and_then(Value::as_str) == Some("output_text") {
                    if let Some(t) = part.get("text").and_then(Value::as_str) {
                        text.push_str(t);
                    }
                }
            }
        }
    }
    if text.is_empty() { None } else { Some(text) }
}

/// Request to the Chat Completions API.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    /// Token limit for gpt-4o and earlier models.
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    /// Token limit for gpt-4.1/o-series models.
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

impl ChatCompletionRequest {
    /// Builds a generation request with the model's token/temperature rules.
    fn for_model(model: &str, messages: Vec<ChatMessage>) -> Self {
        let use_completion_param = OpenAiAdapter::uses_completion_token_param(model);
        Self {
            model: model.to_string(),
            messages,
            response_format: ResponseFormat::json_object(),
            temperature: OpenAiAdapter::supports_temperature(model).then_some(0.8),
            max_tokens: (!use_completion_param).then_some(1000),
            max_completion_tokens: use_completion_param.then_some(1000),
        }
    }
}

/// `response_format` field.
#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

impl ResponseFormat {
    const fn json_object() -> Self {
        Self {
            kind: "json_object",
        }
    }
}
