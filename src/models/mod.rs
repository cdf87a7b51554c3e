//! Domain types for the generation pipeline.

use serde::{Deserialize, Serialize};

/// The two independent response categories, each with its own conversation
/// history and cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// A direct reply to the post author.
    #[default]
    Reply,
    /// A quote repost with commentary that can stand alone.
    Quote,
}

impl ResponseType {
    /// The singular name used in prompts and wire messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reply => "reply",
            Self::Quote => "quote",
        }
    }

    /// The plural form used in validation issue tags and result payloads.
    #[must_use]
    pub const fn plural(self) -> &'static str {
        match self {
            Self::Reply => "replies",
            Self::Quote => "quotes",
        }
    }

    /// Parses a response-type string.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for anything other than `reply` or `quote`.
    pub fn parse(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "reply" | "replies" => Ok(Self::Reply),
            "quote" | "quotes" => Ok(Self::Quote),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown response type: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for ResponseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Author details attached to a captured post.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostAuthor {
    /// Handle, with or without a leading `@`.
    pub handle: String,
    /// Display name shown on the profile.
    #[serde(default)]
    pub display_name: String,
    /// Whether the account carries a verification badge.
    #[serde(default, alias = "verified")]
    pub is_verified: bool,
    /// Profile bio, when the capture included one.
    #[serde(default)]
    pub bio: Option<String>,
}

impl PostAuthor {
    /// The handle prefixed with `@` for display.
    #[must_use]
    pub fn display_handle(&self) -> String {
        if self.handle.starts_with('@') {
            self.handle.clone()
        } else {
            format!("@{}", self.handle)
        }
    }
}

/// A post quoted inside the captured post (author and text only).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotedPost {
    /// Quoted post author.
    pub author: PostAuthor,
    /// Quoted post body text.
    #[serde(default)]
    pub text: String,
}

/// Snapshot of a social-media post, supplied fresh by the capture
/// collaborator on each user action. Immutable once captured.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostData {
    /// Post identifier, when the capture could extract one.
    #[serde(default, alias = "tweetId")]
    pub id: Option<String>,
    /// Canonical URL of the post.
    #[serde(default)]
    pub url: String,
    /// Post body text.
    #[serde(default)]
    pub text: String,
    /// Post author.
    pub author: PostAuthor,
    /// Whether the post contains media (image/video). `None` when unknown.
    #[serde(default)]
    pub has_media: Option<bool>,
    /// Nested quoted post, if the original quotes another post.
    #[serde(default)]
    pub quoted_post: Option<QuotedPost>,
}

impl PostData {
    /// Key under which conversation context is stored: the post id, falling
    /// back to the URL.
    #[must_use]
    pub fn context_key(&self) -> &str {
        self.id.as_deref().filter(|id| !id.is_empty()).map_or_else(
            || self.url.as_str(),
            |id| id,
        )
    }
}

/// Token accounting for a provider call, accumulated across retry attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    /// Input (prompt) tokens.
    pub input_tokens: u64,
    /// Output (completion) tokens.
    pub output_tokens: u64,
    /// Prompt tokens served from the provider's cache.
    pub cached_tokens: u64,
}

impl TokenUsage {
    /// Adds another usage record into this one.
    pub const fn accumulate(&mut self, other: Self) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.cached_tokens += other.cached_tokens;
    }

    /// Total tokens (input + output).
    #[must_use]
    pub const fn total(self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Post analysis returned by the model alongside the drafts.
///
/// Set once per post on the first successful generation and shared between
/// the reply and quote tabs thereafter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    /// Sentiment of the original post.
    #[serde(default)]
    pub post_sentiment: String,
    /// Inferred author type (ally, neutral, regime official, ...).
    #[serde(default)]
    pub author_type: Option<String>,
    /// Key topics the model identified.
    #[serde(default)]
    pub key_topics: Vec<String>,
    /// Brief strategy note for the drafts.
    #[serde(default)]
    pub recommended_approach: String,
}

fn default_tone() -> String {
    "standard".to_string()
}

/// A single draft as returned by the model (text plus tone label).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseDraft {
    /// Draft text, hashtags included.
    pub text: String,
    /// Tone style the model used.
    #[serde(default = "default_tone")]
    pub tone: String,
}

/// A draft scoped to the tab it was generated for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedResponse {
    /// Draft text, hashtags included.
    pub text: String,
    /// Tone style the model used.
    pub tone: String,
    /// Which tab this draft belongs to.
    #[serde(rename = "type")]
    pub response_type: ResponseType,
}

impl GeneratedResponse {
    /// Tags a raw draft with its response type.
    #[must_use]
    pub fn from_draft(draft: ResponseDraft, response_type: ResponseType) -> Self {
        Self {
            text: draft.text,
            tone: draft.tone,
            response_type,
        }
    }
}

/// Input to a single generation run.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    /// The post to respond to.
    pub post: PostData,
    /// Which tab to generate for.
    pub response_type: ResponseType,
    /// Optional user feedback; presence switches the run into refine mode.
    pub feedback: Option<String>,
    /// Skip the cache and generate fresh drafts.
    pub force_regenerate: bool,
}

/// Output of a generation run, scoped to the requested tab only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    /// Shared post analysis (from the first successful generation).
    pub analysis: Option<Analysis>,
    /// Drafts for the requested tab.
    pub responses: Vec<GeneratedResponse>,
    /// Advisory warning when soft validation never passed within the retry
    /// budget. Absent on clean results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_warning: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_type_strings() {
        assert_eq!(ResponseType::Reply.as_str(), "reply");
        assert_eq!(ResponseType::Quote.plural(), "quotes");
        assert_eq!(ResponseType::Reply.plural(), "replies");
    }

    #[test]
    fn test_response_type_parse() {
        assert_eq!(ResponseType::parse("reply").unwrap(), ResponseType::Reply);
        assert_eq!(ResponseType::parse("QUOTE").unwrap(), ResponseType::Quote);
        assert!(ResponseType::parse("thread").is_err());
    }

    #[test]
    fn test_context_key_prefers_id() {
        let post = PostData {
            id: Some("12345".to_string()),
            url: "https://x.com/u/status/12345".to_string(),
            ..Default::default()
        };
        assert_eq!(post.context_key(), "12345");
    }

    #[test]
    fn test_context_key_falls_back_to_url() {
        let post = PostData {
            id: None,
            url: "https://x.com/u/status/12345".to_string(),
            ..Default::default()
        };
        assert_eq!(post.context_key(), "https://x.com/u/status/12345");

        let post = PostData {
            id: Some(String::new()),
            url: "https://x.com/u/status/9".to_string(),
            ..Default::default()
        };
        assert_eq!(post.context_key(), "https://x.com/u/status/9");
    }

    #[test]
    fn test_display_handle() {
        let author = PostAuthor {
            handle: "activist".to_string(),
            ..Default::default()
        };
        assert_eq!(author.display_handle(), "@activist");

        let author = PostAuthor {
            handle: "@activist".to_string(),
            ..Default::default()
        };
        assert_eq!(author.display_handle(), "@activist");
    }

    #[test]
    fn test_usage_accumulate() {
        let mut usage = TokenUsage::default();
        usage.accumulate(TokenUsage {
            input_tokens: 100,
            output_tokens: 50,
            cached_tokens: 10,
        });
        usage.accumulate(TokenUsage {
            input_tokens: 20,
            output_tokens: 5,
            cached_tokens: 0,
        });
        assert_eq!(usage.input_tokens, 120);
        assert_eq!(usage.output_tokens, 55);
        assert_eq!(usage.total(), 175);
    }

    #[test]
    fn test_post_data_accepts_capture_shape() {
        let json = r#"{
            "tweetId": "188842",
            "url": "https://x.com/reporter/status/188842",
            "text": "Breaking: internet shutdown reported in three provinces.",
            "author": {
                "handle": "reporter",
                "displayName": "A Reporter",
                "isVerified": true,
                "bio": "Journalist covering Iran"
            },
            "hasMedia": false,
            "quotedPost": {
                "author": { "handle": "witness", "displayName": "Witness" },
                "text": "No connection since last night."
            }
        }"#;
        let post: PostData = serde_json::from_str(json).unwrap();
        assert_eq!(post.context_key(), "188842");
        assert!(post.author.is_verified);
        assert_eq!(post.quoted_post.unwrap().author.handle, "witness");
    }

    #[test]
    fn test_draft_default_tone() {
        let draft: ResponseDraft = serde_json::from_str(r#"{"text": "hello"}"#).unwrap();
        assert_eq!(draft.tone, "standard");
    }
}
