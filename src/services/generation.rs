//! Generation orchestrator.
//!
//! Drives one request through the pipeline: cache check, profile enrichment,
//! layered prompt assembly, provider call, validation with bounded
//! auto-regeneration, refusal substitution, cost recording, and context
//! commit.

use crate::config::{AmplifierConfig, Catalog, Provider};
use crate::context::ContextStore;
use crate::cost::{CostTracker, UsageStats, format_cost};
use crate::llm::{
    AnthropicAdapter, ChatMessage, LlmHttpConfig, OpenAiAdapter, PromptValidation,
    ProviderAdapter,
};
use crate::models::{
    Analysis, GeneratedResponse, GenerationRequest, GenerationResult, PostData, ResponseDraft,
    ResponseType, TokenUsage,
};
use crate::profile::{ProfileCache, ProfileContext, detect_category};
use crate::prompt::{
    Preferences, PromptMode, build_developer_context, build_style_prompt, build_system_prompt,
    sanitize_user_input,
};
use crate::validation::{ValidationOutcome, extract_drafts, validate_result};
use crate::{Error, Result};

/// Retries after the first failed validation (3 attempts total).
pub const MAX_VALIDATION_RETRIES: u32 = 2;

/// Expands `//shortcut` tokens in feedback into their full instructions.
///
/// Unknown tokens pass through untouched so the model sees what the user
/// actually typed.
#[must_use]
pub fn expand_shortcuts(catalog: &Catalog, feedback: &str) -> String {
    feedback
        .split_whitespace()
        .map(|word| {
            catalog
                .shortcuts()
                .get(word)
                .map_or(word, String::as_str)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Orchestrates draft generation end to end.
pub struct GenerationService {
    adapter: Box<dyn ProviderAdapter>,
    catalog: Catalog,
    contexts: ContextStore,
    profiles: ProfileCache,
    costs: CostTracker,
    custom_style_prompt: Option<String>,
    selected_arguments: Vec<u32>,
    selected_ctas: Vec<u32>,
    preferences: Preferences,
    seed: Option<String>,
}

impl GenerationService {
    /// Builds a service from configuration: resolves the API key and model,
    /// loads the catalog, and constructs the provider adapter.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingApiKey` when no key is available and
    /// `Error::OperationFailed` when a catalog override cannot be loaded.
    pub fn from_config(config: AmplifierConfig) -> Result<Self> {
        let catalog = config.load_catalog()?;
        let api_key = config.resolve_api_key()?;
        let model = config.resolve_model(&catalog);
        let http = LlmHttpConfig::from_config(&config).with_env_overrides();

        let adapter: Box<dyn ProviderAdapter> = match config.provider {
            Provider::OpenAi => Box::new(OpenAiAdapter::new(api_key, model, http)),
            Provider::Anthropic => Box::new(AnthropicAdapter::new(api_key, model, http)),
        };

        Ok(Self::with_adapter(adapter, catalog, &config))
    }

    /// Builds a service around an existing adapter. Used by tests and by
    /// callers that construct adapters themselves.
    #[must_use]
    pub fn with_adapter(
        adapter: Box<dyn ProviderAdapter>,
        catalog: Catalog,
        config: &AmplifierConfig,
    ) -> Self {
        let selected_arguments = config
            .selected_arguments
            .clone()
            .unwrap_or_else(|| catalog.default_argument_ids());
        let selected_ctas = config
            .selected_ctas
            .clone()
            .unwrap_or_else(|| catalog.default_cta_ids());

        Self {
            adapter,
            catalog,
            contexts: ContextStore::new(),
            profiles: ProfileCache::new(),
            costs: CostTracker::new(),
            custom_style_prompt: config.custom_style_prompt.clone(),
            selected_arguments,
            selected_ctas,
            preferences: config.preferences.clone(),
            seed: config.seed.clone(),
        }
    }

    /// The active catalog.
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The provider name in use.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.adapter.name()
    }

    /// The model id in use.
    #[must_use]
    pub fn model(&self) -> &str {
        self.adapter.model()
    }

    /// Generates drafts for one tab of one post.
    ///
    /// Returns cached drafts when nothing forces a regeneration. Otherwise
    /// calls the provider, retrying validation failures up to
    /// [`MAX_VALIDATION_RETRIES`] times with corrective hints, and commits
    /// the turn to the conversation context.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for posts without an id or URL,
    /// `Error::Provider` for upstream failures, and
    /// `Error::InvalidResponseFormat` when every attempt produced an
    /// unparseable payload.
    pub fn generate(&self, request: GenerationRequest) -> Result<GenerationResult> {
        let key = request.post.context_key().to_string();
        if key.is_empty() {
            return Err(Error::InvalidInput(
                "post has neither an id nor a URL".to_string(),
            ));
        }
        let response_type = request.response_type;

        // Cache hit: no feedback, no force, drafts already generated.
        if request.feedback.is_none() && !request.force_regenerate {
            let cached = self.contexts.cached_responses(&key, response_type);
            if !cached.is_empty() {
                tracing::debug!(key = %key, %response_type, "returning cached drafts");
                return Ok(GenerationResult {
                    analysis: self.contexts.shared_analysis(&key),
                    responses: cached
                        .into_iter()
                        .map(|d| GeneratedResponse::from_draft(d, response_type))
                        .collect(),
                    validation_warning: None,
                });
            }
        }

        let profile = self.enrich_profile(&request.post);

        let mode = if request.feedback.is_some() {
            PromptMode::Refine
        } else {
            PromptMode::Initial
        };
        let developer_context = build_developer_context(
            &self.catalog,
            &request.post,
            &self.selected_arguments,
            &self.selected_ctas,
            profile.as_ref(),
            response_type,
            mode,
        );
        let system_prompt = build_system_prompt(
            &self.catalog,
            self.custom_style_prompt.as_deref(),
            &self.preferences,
            self.seed.as_deref(),
        );

        let user_input = self.build_user_input(request.feedback.as_deref(), response_type);

        // First turn carries the developer context; later turns rely on it
        // already being in the history.
        let history = self.contexts.tab_history(&key, response_type);
        let history_was_empty = history.is_empty();
        let turn_content = if history_was_empty {
            format!("{developer_context}\n\n{user_input}")
        } else {
            user_input.clone()
        };

        let mut messages = vec![ChatMessage::system(system_prompt)];
        messages.extend(history);
        messages.push(ChatMessage::user(turn_content.clone()));

        let (result, usage, outcome) = self.attempt_loop(&messages, response_type)?;

        let cost = self.costs.record(&self.catalog, self.adapter.model(), usage);
        tracing::debug!(
            model = self.adapter.model(),
            tokens = usage.total(),
            cost = %format_cost(cost),
            "recorded generation usage"
        );

        let validation_warning = (!outcome.valid && !outcome.refusal).then(|| {
            let warning = format!(
                "Some responses may not meet all requirements: {}",
                outcome.issues.join(", ")
            );
            tracing::warn!(%warning, "returning drafts with validation warning");
            warning
        });

        let drafts = extract_drafts(&result, response_type);
        let analysis: Option<Analysis> = result
            .get("analysis")
            .and_then(|a| serde_json::from_value(a.clone()).ok());

        self.contexts.commit_turn(
            &key,
            response_type,
            ChatMessage::user(turn_content),
            ChatMessage::assistant(format_assistant_turn(response_type, &drafts)),
            drafts.clone(),
            analysis,
        );

        Ok(GenerationResult {
            analysis: self.contexts.shared_analysis(&key),
            responses: drafts
                .into_iter()
                .map(|d| GeneratedResponse::from_draft(d, response_type))
                .collect(),
            validation_warning,
        })
    }

    /// Bounded call/validate loop. Returns the accepted (or substituted)
    /// payload, accumulated usage, and the final validation outcome.
    fn attempt_loop(
        &self,
        messages: &[ChatMessage],
        response_type: ResponseType,
    ) -> Result<(serde_json::Value, TokenUsage, ValidationOutcome)> {
        let mut usage = TokenUsage::default();
        let mut last: Option<(serde_json::Value, ValidationOutcome)> = None;
        let mut last_error: Option<Error> = None;

        for attempt in 0..=MAX_VALIDATION_RETRIES {
            let mut current = messages.to_vec();
            if attempt > 0 {
                if let Some((_, outcome)) = &last {
                    if !outcome.fix_hints.is_empty() {
                        if let Some(message) = current.last_mut() {
                            message.content = format!(
                                "{}\n\nIMPORTANT: {}",
                                message.content,
                                outcome.fix_hints.join(" ")
                            );
                        }
                    }
                }
            }

            let response = match self.adapter.generate(&current) {
                Ok(response) => response,
                // Unparseable payloads are validation failures and spend a
                // retry; transport/auth errors propagate immediately.
                Err(err @ Error::InvalidResponseFormat { .. }) => {
                    tracing::warn!(attempt = attempt + 1, "provider payload was not valid JSON");
                    last_error = Some(err);
                    continue;
                }
                Err(err) => return Err(err),
            };

            usage.accumulate(response.usage);
            let outcome = validate_result(&response.result, response_type);

            if outcome.valid {
                return Ok((response.result, usage, outcome));
            }

            if outcome.refusal {
                tracing::warn!("threat detected in drafts, substituting refusal message");
                return Ok((self.refusal_payload(), usage, outcome));
            }

            tracing::warn!(
                attempt = attempt + 1,
                issues = ?outcome.issues,
                "validation failed"
            );
            last = Some((response.result, outcome));
        }

        // Out of retries: hand back the best payload we have, or the parse
        // error if no attempt ever produced one.
        last.map_or_else(
            || {
                Err(last_error.unwrap_or_else(|| Error::InvalidResponseFormat {
                    cause: "no parseable payload produced".to_string(),
                }))
            },
            |(result, outcome)| Ok((result, usage, outcome)),
        )
    }

    /// The canned payload substituted when drafts contained threats.
    fn refusal_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "analysis": {
                "post_sentiment": "unknown",
                "key_topics": [],
                "recommended_approach": "Request refused due to policy violation.",
            },
            "responses": [
                {
                    "text": self.catalog.refusal_messages().violence,
                    "tone": "refusal",
                }
            ],
        })
    }

    /// Layer 4: sanitized user input for this turn.
    fn build_user_input(&self, feedback: Option<&str>, response_type: ResponseType) -> String {
        feedback.map_or_else(
            || {
                format!(
                    "Generate the 3 {response_type} response variations for the original post above."
                )
            },
            |feedback| {
                let expanded = expand_shortcuts(&self.catalog, feedback);
                let sanitized = sanitize_user_input(&expanded);
                if sanitized.is_empty() {
                    // Everything the user typed was filtered; regenerate
                    // rather than sending an empty turn.
                    format!("Generate 3 new {response_type} variations.")
                } else {
                    format!("User feedback: {sanitized}")
                }
            },
        )
    }

    /// Looks up or refreshes the author's cached profile.
    fn enrich_profile(&self, post: &PostData) -> Option<ProfileContext> {
        let handle = post.author.handle.trim();
        if handle.is_empty() {
            return None;
        }

        let cached = self.profiles.get(handle);
        let capture_has_bio = post.author.bio.as_deref().is_some_and(|b| !b.is_empty());
        let cache_missing_bio = cached
            .as_ref()
            .is_none_or(|p| p.bio.as_deref().is_none_or(str::is_empty));

        if cached.is_none() || (capture_has_bio && cache_missing_bio) {
            let bio = post.author.bio.clone().unwrap_or_default();
            let category = detect_category(&bio, &post.author.display_name);
            self.profiles.insert(ProfileContext {
                handle: handle.to_string(),
                display_name: post.author.display_name.clone(),
                bio: (!bio.is_empty()).then_some(bio),
                follower_count: cached.as_ref().map_or(0, |p| p.follower_count),
                follower_category: None,
                category: category.map(ToString::to_string),
                is_verified: post.author.is_verified,
                cached_at: 0,
            });
            return self.profiles.get(handle);
        }

        cached
    }

    /// Clears the conversation context for one post.
    pub fn clear_context(&self, key: &str) {
        self.contexts.remove(key);
    }

    /// Clears all conversation contexts.
    pub fn clear_all_contexts(&self) {
        self.contexts.clear_all();
    }

    /// Usage summary across the standard windows.
    #[must_use]
    pub fn usage_stats(&self) -> UsageStats {
        self.costs.stats()
    }

    /// Checks the configured API key against the provider.
    ///
    /// # Errors
    ///
    /// Returns `Error::Provider` when the request cannot be sent at all.
    pub fn test_connection(&self) -> Result<bool> {
        self.adapter.test_connection()
    }

    /// Validates a custom style prompt against the mission.
    #[must_use]
    pub fn validate_style_prompt(&self, prompt: &str) -> PromptValidation {
        self.adapter.validate_style_prompt(prompt)
    }
}

/// Formats the assistant history turn with explicit numbering so feedback
/// like "use #2" can be resolved against the conversation.
fn format_assistant_turn(response_type: ResponseType, drafts: &[ResponseDraft]) -> String {
    let mut formatted = format!("Generated {response_type} responses:\n");
    for (index, draft) in drafts.iter().enumerate() {
        formatted.push_str(&format!(
            "#{} ({}):\n\"{}\"\n",
            index + 1,
            draft.tone,
            draft.text
        ));
    }
    formatted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_shortcuts() {
        let catalog = Catalog::bundled();
        assert_eq!(
            expand_shortcuts(&catalog, "//shorter and //urgent"),
            "Make the response more concise and Increase urgency while remaining factual"
        );
        assert_eq!(
            expand_shortcuts(&catalog, "//unknown stays put"),
            "//unknown stays put"
        );
    }

    #[test]
    fn test_format_assistant_turn_numbering() {
        let drafts = vec![
            ResponseDraft {
                text: "first".to_string(),
                tone: "direct".to_string(),
            },
            ResponseDraft {
                text: "second".to_string(),
                tone: "personal".to_string(),
            },
        ];
        let formatted = format_assistant_turn(ResponseType::Reply, &drafts);
        assert!(formatted.starts_with("Generated reply responses:\n"));
        assert!(formatted.contains("#1 (direct):\n\"first\""));
        assert!(formatted.contains("#2 (personal):\n\"second\""));
    }
}
