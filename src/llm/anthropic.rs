//! Anthropic adapter.
//!
//! Messages API with the system prompt passed as a top-level parameter.

use super::{
    ChatMessage, LlmHttpConfig, PromptValidation, ProviderAdapter, ProviderResponse, Role,
    ValidationVerdict, build_http_client, parse_json_payload, skipped_validation,
    validation_user_message,
};
use crate::models::TokenUsage;
use crate::{Error, Result};
use serde::Serialize;
use serde_json::Value;

/// Fast model used for connection tests and style-prompt validation.
const UTILITY_MODEL: &str = "claude-3-5-haiku-20241022";

/// Anthropic provider adapter.
pub struct AnthropicAdapter {
    /// API key.
    api_key: String,
    /// API endpoint.
    endpoint: String,
    /// Model to use.
    model: String,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl AnthropicAdapter {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.anthropic.com/v1";

    /// API version header value.
    const API_VERSION: &'static str = "2023-06-01";

    /// Creates a new Anthropic adapter.
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

    fn post_messages<T: Serialize>(&self, body: &T) -> Result<Value> {
        let response = self
            .client
            .post(format!("{}/messages", self.endpoint))
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", Self::API_VERSION)
            .json(body)
            .send()
            .map_err(|e| Error::Provider {
                provider: "anthropic".to_string(),
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
                provider: "anthropic".to_string(),
                message,
            });
        }

        response.json().map_err(|e| Error::Provider {
            provider: "anthropic".to_string(),
            message: e.to_string(),
        })
    }
}

impl ProviderAdapter for AnthropicAdapter {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn generate(&self, messages: &[ChatMessage]) -> Result<ProviderResponse> {
        let request = MessagesRequest::generation(&self.model, messages);
        let data = self.post_messages(&request)?;

        let content = data
            .pointer("/content/0/text")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidResponseFormat {
                cause: "no content in response".to_string(),
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
                .pointer("/usage/cache_read_input_tokens")
                .and_then(Value::as_u64)
                .unwrap_or(0),
        };

        Ok(ProviderResponse {
            result: parse_json_payload(content)?,
            usage,
        })
    }

    fn test_connection(&self) -> Result<bool> {
        let request = MessagesRequest {
            model: UTILITY_MODEL.to_string(),
            max_tokens: 10,
            temperature: None,
            system: None,
            messages: vec![WireMessage {
                role: "user",
                content: "Hi".to_string(),
            }],
        };
        match self.post_messages(&request) {
            Ok(_) => Ok(true),
            // Auth rejections come back as Provider errors; a failed test is
            // still an answer, not a hard error.
            Err(Error::Provider { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn validate_style_prompt(&self, prompt: &str) -> PromptValidation {
        let request = MessagesRequest {
            model: UTILITY_MODEL.to_string(),
            max_tokens: 150,
            temperature: None,
            system: Some(super::VALIDATION_SYSTEM_PROMPT.to_string()),
            messages: vec![WireMessage {
                role: "user",
                content: validation_user_message(prompt),
            }],
        };

        let verdict: Result<ValidationVerdict> = self.post_messages(&request).and_then(|data| {
            let content = data
                .pointer("/content/0/text")
                .and_then(Value::as_str)
                .ok_or_else(|| Error::InvalidResponseFormat {
                    cause: "no content in response".to_string(),
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

/// Request to the Messages API.
#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage>,
}

/// A user/assistant turn on the wire.
#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

impl MessagesRequest {
    /// Builds a generation request, lifting the system message into the
    /// top-level `system` parameter.
    fn generation(model: &str, messages: &[ChatMessage]) -> Self {
        let system = messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.clone());

        let turns = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| WireMessage {
                role: match m.role {
                    Role::Assistant => "assistant",
                    _ => "user",
                },
                content: m.content.clone(),
            })
            .collect();

        Self {
            model: model.to_string(),
            max_tokens: 1000,
            temperature: Some(0.8),
            system,
            messages: turns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_request_lifts_system_prompt() {
        let messages = vec![
            ChatMessage::system("guardrails"),
            ChatMessage::user("context"),
            ChatMessage::assistant("{\"responses\": []}"),
            ChatMessage::user("make it shorter"),
        ];
        let request = MessagesRequest::generation("claude-3-5-haiku-20241022", &messages);

        assert_eq!(request.system.as_deref(), Some("guardrails"));
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[0].role, "user");
        assert_eq!(request.messages[1].role, "assistant");
        assert_eq!(request.max_tokens, 1000);
        assert!((request.temperature.unwrap() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_request_serialization_skips_missing_system() {
        let request = MessagesRequest::generation("m", &[ChatMessage::user("hello")]);
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("system").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_adapter_identity() {
        let adapter = AnthropicAdapter::new("k", "claude-3-5-haiku-20241022", LlmHttpConfig::default());
        assert_eq!(adapter.name(), "anthropic");
        assert_eq!(adapter.model(), "claude-3-5-haiku-20241022");
    }
}
