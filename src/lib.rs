//! # Amplifier
//!
//! Generation pipeline for drafting advocacy replies and quote posts.
//!
//! Given a snapshot of a social-media post, amplifier builds a layered prompt
//! (fixed guardrails, per-request developer context, user style, sanitized
//! user input), calls an LLM provider, validates the drafts against format
//! and policy rules, retries with corrective hints when needed, and keeps a
//! per-post, per-tab conversation context so refinements stay cheap.
//!
//! ## Features
//!
//! - Four-layer prompt construction with a curated argument/CTA catalog
//! - OpenAI and Anthropic adapters behind one provider interface
//! - Deterministic format/policy validation with bounded auto-regeneration
//! - Per-post reply/quote conversation contexts (in-memory, intentionally volatile)
//! - Token usage and cost accounting per generation
//!
//! ## Example
//!
//! ```rust,ignore
//! use amplifier::{GenerationRequest, GenerationService, ResponseType};
//!
//! let service = GenerationService::from_config(config)?;
//! let result = service.generate(GenerationRequest {
//!     post,
//!     response_type: ResponseType::Reply,
//!     ..Default::default()
//! })?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod cli;
pub mod config;
pub mod context;
pub mod cost;
pub mod llm;
pub mod models;
pub mod profile;
pub mod prompt;
pub mod services;
pub mod validation;

// Re-exports for convenience
pub use config::{AmplifierConfig, Catalog, Provider};
pub use context::ContextStore;
pub use llm::ProviderAdapter;
pub use models::{
    GeneratedResponse, GenerationRequest, GenerationResult, PostData, ResponseType, TokenUsage,
};
pub use services::GenerationService;
pub use validation::ValidationOutcome;

/// Error type for amplifier operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `MissingApiKey` | No API key configured before a generation is attempted |
/// | `InvalidInput` | Malformed post data, unknown provider/response type strings |
/// | `Provider` | Upstream HTTP/auth failure from the LLM provider |
/// | `InvalidResponseFormat` | Provider payload cannot be parsed as structured output |
/// | `OperationFailed` | I/O errors, config parsing failures |
#[derive(Debug, ThisError)]
pub enum Error {
    /// No API key is configured.
    ///
    /// Raised before any prompt is built or any network call is made.
    /// This is a fatal precondition, never retried.
    #[error("API key not configured; add your API key to the amplifier settings")]
    MissingApiKey,

    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - Post data is missing both an identifier and a URL
    /// - A provider or response-type string cannot be parsed
    /// - A catalog override file fails schema validation
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The LLM provider returned an HTTP or authentication failure.
    ///
    /// Carries the upstream message verbatim. Propagated immediately to the
    /// caller; never retried by the validation loop.
    #[error("{provider} request failed: {message}")]
    Provider {
        /// The provider that failed.
        provider: String,
        /// The upstream error message.
        message: String,
    },

    /// The provider returned a payload that is not the expected structured output.
    ///
    /// Counted as a validation failure and retried within the retry budget.
    #[error("invalid response format: {cause}")]
    InvalidResponseFormat {
        /// Why the payload could not be parsed.
        cause: String,
    },

    /// An operation failed.
    ///
    /// Raised when:
    /// - Config or catalog files cannot be read or parsed
    /// - Filesystem I/O errors occur
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

/// Result type alias for amplifier operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in milliseconds.
///
/// Centralized so context and profile timestamps agree on an epoch base.
/// Falls back to 0 if the system clock is before the Unix epoch.
///
/// # Examples
///
/// ```rust
/// use amplifier::current_timestamp_ms;
///
/// let ts = current_timestamp_ms();
/// assert!(ts > 0);
/// ```
#[must_use]
pub fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::MissingApiKey;
        assert!(err.to_string().contains("API key not configured"));

        let err = Error::Provider {
            provider: "openai".to_string(),
            message: "401 Unauthorized".to_string(),
        };
        assert_eq!(err.to_string(), "openai request failed: 401 Unauthorized");

        let err = Error::InvalidResponseFormat {
            cause: "not a JSON object".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid response format: not a JSON object"
        );
    }

    #[test]
    fn test_current_timestamp_ms() {
        let ts = current_timestamp_ms();
        // 2020-01-01 in milliseconds
        assert!(ts > 1_577_836_800_000);
    }
}
