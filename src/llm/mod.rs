//! LLM provider abstraction.
//!
//! One adapter interface over the supported providers. Adapters own the
//! transport details (endpoints, auth headers, token parameters, structured
//! output plumbing); the orchestrator only sees messages in and a parsed JSON
//! payload with token usage out.

mod anthropic;
mod openai;

pub use anthropic::AnthropicAdapter;
pub use openai::OpenAiAdapter;

use crate::models::TokenUsage;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Message role on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt (Layers 1 + 3).
    System,
    /// User turn (developer context, feedback).
    User,
    /// Assistant turn (previous drafts).
    Assistant,
}

/// A single conversation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role.
    pub role: Role,
    /// Message content.
    pub content: String,
}

impl ChatMessage {
    /// Creates a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Parsed provider response: the structured payload plus token accounting.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// The model's JSON payload.
    pub result: serde_json::Value,
    /// Token usage for this call.
    pub usage: TokenUsage,
}

/// Result of validating a custom style prompt against the mission.
#[derive(Debug, Clone)]
pub struct PromptValidation {
    /// Whether the prompt is safe to use.
    pub valid: bool,
    /// Brief explanation.
    pub reason: String,
    /// True when validation could not run and the prompt was allowed through.
    pub skipped: bool,
}

/// Trait for LLM provider adapters.
pub trait ProviderAdapter: Send + Sync {
    /// The provider name.
    fn name(&self) -> &'static str;

    /// The model id requests are sent with.
    fn model(&self) -> &str;

    /// Sends a conversation and returns the parsed JSON payload with usage.
    ///
    /// # Errors
    ///
    /// Returns `Error::Provider` on HTTP or auth failure and
    /// `Error::InvalidResponseFormat` when the payload is not parseable JSON.
    fn generate(&self, messages: &[ChatMessage]) -> Result<ProviderResponse>;

    /// Checks whether the configured API key is accepted by the provider.
    ///
    /// # Errors
    ///
    /// Returns `Error::Provider` when the request cannot be sent at all.
    fn test_connection(&self) -> Result<bool>;

    /// Validates a custom style prompt against the mission using a fast model.
    ///
    /// Fails open: transport or parse errors return a `skipped` validation
    /// that allows the prompt, since blocking on infrastructure errors would
    /// lock users out of their own settings.
    fn validate_style_prompt(&self, prompt: &str) -> PromptValidation;
}

/// HTTP client configuration for LLM providers.
#[derive(Debug, Clone, Copy)]
pub struct LlmHttpConfig {
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
}

impl Default for LlmHttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 60_000,
            connect_timeout_ms: 5_000,
        }
    }
}

impl LlmHttpConfig {
    /// Loads HTTP configuration from config file settings.
    #[must_use]
    pub const fn from_config(config: &crate::config::AmplifierConfig) -> Self {
        Self {
            timeout_ms: config.timeout_ms,
            connect_timeout_ms: config.connect_timeout_ms,
        }
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("AMPLIFIER_LLM_TIMEOUT_MS") {
            if let Ok(timeout_ms) = v.parse::<u64>() {
                self.timeout_ms = timeout_ms;
            }
        }
        if let Ok(v) = std::env::var("AMPLIFIER_LLM_CONNECT_TIMEOUT_MS") {
            if let Ok(connect_timeout_ms) = v.parse::<u64>() {
                self.connect_timeout_ms = connect_timeout_ms;
            }
        }
        self
    }
}

/// Builds a blocking HTTP client for LLM requests with configured timeouts.
#[must_use]
pub fn build_http_client(config: LlmHttpConfig) -> reqwest::blocking::Client {
    let mut builder = reqwest::blocking::Client::builder();
    if config.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(config.timeout_ms));
    }
    if config.connect_timeout_ms > 0 {
        builder = builder.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
    }

    builder.build().unwrap_or_else(|err| {
        tracing::warn!("Failed to build LLM HTTP client: {err}");
        reqwest::blocking::Client::new()
    })
}

/// System prompt for the style-prompt safety validator.
pub(crate) const VALIDATION_SYSTEM_PROMPT: &str = r#"You are a prompt safety validator for a tool that supports Iranian civil society and human rights.

Your task: Analyze the user's style prompt to determine if it could be used to:
1. Support the Iranian regime, IRGC, or government propaganda
2. Attack, threaten, or undermine protestors, activists, or journalists
3. Spread disinformation or conspiracy theories against the freedom movement
4. Generate hate speech or incite violence
5. Subvert the tool's mission of supporting Iranian civil society

IMPORTANT: The prompt you're validating is a STYLE prompt - it controls tone and content strategy.
Users can legitimately customize tone (formal, casual, urgent), content focus (human rights, policy, diaspora), etc.
Only flag prompts that clearly attempt to subvert the mission.

Return a JSON object:
{
  "valid": true/false,
  "reason": "Brief explanation (required if invalid)"
}"#;

/// Builds the user message for style-prompt validation.
pub(crate) fn validation_user_message(prompt: &str) -> String {
    format!(
        "Analyze this style prompt for a tool that generates posts supporting Iranian civil society:\n\n\"\"\"\n{prompt}\n\"\"\"\n\nIs this prompt safe to use? Return JSON."
    )
}

/// Shape of the validator's JSON verdict.
#[derive(Debug, Deserialize)]
pub(crate) struct ValidationVerdict {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

impl ValidationVerdict {
    /// Converts the raw verdict into a `PromptValidation`.
    pub(crate) fn into_validation(self) -> PromptValidation {
        let reason = self.reason.unwrap_or_else(|| {
            if self.valid {
                "Prompt approved".to_string()
            } else {
                "Prompt rejected".to_string()
            }
        });
        PromptValidation {
            valid: self.valid,
            reason,
            skipped: false,
        }
    }
}

/// The fail-open validation returned when the validator itself errored.
pub(crate) fn skipped_validation(err: &Error) -> PromptValidation {
    tracing::warn!("style prompt validation failed, allowing prompt: {err}");
    PromptValidation {
        valid: true,
        reason: "Validation skipped (error occurred)".to_string(),
        skipped: true,
    }
}

/// Parses a provider's content string as a JSON object payload.
pub(crate) fn parse_json_payload(content: &str) -> Result<serde_json::Value> {
    serde_json::from_str(content).map_err(|e| Error::InvalidResponseFormat {
        cause: format!("failed to parse API response as JSON: {e}"),
    })
}
