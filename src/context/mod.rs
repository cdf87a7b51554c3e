//! Per-post conversation context.
//!
//! Contexts live in memory only and are intentionally volatile: a restart
//! clears them and the next generation starts fresh. Each post keeps two
//! independent tab contexts (reply and quote) with their own history and
//! draft cache, plus one shared analysis set on the first successful
//! generation.

use crate::llm::ChatMessage;
use crate::models::{Analysis, ResponseDraft, ResponseType};
use std::collections::HashMap;
use std::sync::Mutex;

/// Maximum history entries kept per tab. Older turns are dropped first.
pub const MAX_HISTORY_ENTRIES: usize = 10;

/// Conversation state for one tab (reply or quote) of one post.
#[derive(Debug, Clone, Default)]
pub struct TabContext {
    /// Alternating user/assistant turns, capped at [`MAX_HISTORY_ENTRIES`].
    pub history: Vec<ChatMessage>,
    /// Drafts from the most recent accepted generation.
    pub cached_responses: Vec<ResponseDraft>,
    /// Unix milliseconds of the last generation, `None` before the first.
    pub last_generated_at: Option<u64>,
}

/// All conversation state for one post.
#[derive(Debug, Clone, Default)]
struct ConversationContext {
    /// Analysis from the first successful generation; shared by both tabs.
    shared_analysis: Option<Analysis>,
    reply: TabContext,
    quote: TabContext,
}

impl ConversationContext {
    fn tab(&self, response_type: ResponseType) -> &TabContext {
        match response_type {
            ResponseType::Reply => &self.reply,
            ResponseType::Quote => &self.quote,
        }
    }

    fn tab_mut(&mut self, response_type: ResponseType) -> &mut TabContext {
        match response_type {
            ResponseType::Reply => &mut self.reply,
            ResponseType::Quote => &mut self.quote,
        }
    }
}

/// In-memory store of conversation contexts, keyed by post id (or URL when
/// the capture had no id).
#[derive(Debug, Default)]
pub struct ContextStore {
    contexts: Mutex<HashMap<String, ConversationContext>>,
}

impl ContextStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of one tab's context, defaulting when the post has
    /// no context yet.
    #[must_use]
    pub fn tab(&self, key: &str, response_type: ResponseType) -> TabContext {
        self.lock()
            .get(key)
            .map(|ctx| ctx.tab(response_type).clone())
            .unwrap_or_default()
    }

    /// Cached drafts for one tab, empty when nothing was generated yet.
    #[must_use]
    pub fn cached_responses(&self, key: &str, response_type: ResponseType) -> Vec<ResponseDraft> {
        self.lock()
            .get(key)
            .map(|ctx| ctx.tab(response_type).cached_responses.clone())
            .unwrap_or_default()
    }

    /// Conversation history for one tab.
    #[must_use]
    pub fn tab_history(&self, key: &str, response_type: ResponseType) -> Vec<ChatMessage> {
        self.lock()
            .get(key)
            .map(|ctx| ctx.tab(response_type).history.clone())
            .unwrap_or_default()
    }

    /// The shared analysis for a post, if one was recorded.
    #[must_use]
    pub fn shared_analysis(&self, key: &str) -> Option<Analysis> {
        self.lock().get(key).and_then(|ctx| ctx.shared_analysis.clone())
    }

    /// Records a completed generation turn for one tab: appends the user and
    /// assistant messages, truncates history to the newest
    /// [`MAX_HISTORY_ENTRIES`], replaces the draft cache, stamps the tab, and
    /// sets the shared analysis if none exists yet.
    pub fn commit_turn(
        &self,
        key: &str,
        response_type: ResponseType,
        user_message: ChatMessage,
        assistant_message: ChatMessage,
        drafts: Vec<ResponseDraft>,
        analysis: Option<Analysis>,
    ) {
        let mut contexts = self.lock();
        let ctx = contexts.entry(key.to_string()).or_default();

        let tab = ctx.tab_mut(response_type);
        tab.history.push(user_message);
        tab.history.push(assistant_message);
        if tab.history.len() > MAX_HISTORY_ENTRIES {
            let excess = tab.history.len() - MAX_HISTORY_ENTRIES;
            tab.history.drain(..excess);
        }
        tab.cached_responses = drafts;
        tab.last_generated_at = Some(crate::current_timestamp_ms());

        // First writer wins; later generations never overwrite the analysis.
        if ctx.shared_analysis.is_none() {
            ctx.shared_analysis = analysis;
        }
    }

    /// Removes all context for one post.
    pub fn remove(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Clears every context.
    pub fn clear_all(&self) {
        self.lock().clear();
    }

    /// Number of posts with stored context.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, ConversationContext>> {
        // A poisoned lock means a panic mid-update; the contexts are a cache,
        // so continuing with whatever state remains is acceptable.
        self.contexts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(text: &str) -> ResponseDraft {
        ResponseDraft {
            text: text.to_string(),
            tone: "standard".to_string(),
        }
    }

    fn turn(store: &ContextStore, key: &str, rt: ResponseType, n: usize) {
        store.commit_turn(
            key,
            rt,
            ChatMessage::user(format!("input {n}")),
            ChatMessage::assistant(format!("drafts {n}")),
            vec![draft(&format!("draft {n}"))],
            None,
        );
    }

    #[test]
    fn test_empty_store_defaults() {
        let store = ContextStore::new();
        assert!(store.is_empty());
        assert!(store.cached_responses("k", ResponseType::Reply).is_empty());
        assert!(store.tab_history("k", ResponseType::Reply).is_empty());
        assert!(store.shared_analysis("k").is_none());
    }

    #[test]
    fn test_commit_turn_caches_drafts() {
        let store = ContextStore::new();
        turn(&store, "post1", ResponseType::Reply, 1);

        let tab = store.tab("post1", ResponseType::Reply);
        assert_eq!(tab.history.len(), 2);
        assert_eq!(tab.cached_responses.len(), 1);
        assert!(tab.last_generated_at.is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_tabs_are_isolated() {
        let store = ContextStore::new();
        turn(&store, "post1", ResponseType::Reply, 1);

        assert_eq!(store.tab_history("post1", ResponseType::Reply).len(), 2);
        assert!(store.tab_history("post1", ResponseType::Quote).is_empty());
        assert!(store.cached_responses("post1", ResponseType::Quote).is_empty());
    }

    #[test]
    fn test_history_truncated_to_cap() {
        let store = ContextStore::new();
        // Six rounds = 12 messages, cap keeps the newest 10.
        for n in 0..6 {
            turn(&store, "post1", ResponseType::Reply, n);
        }
        let history = store.tab_history("post1", ResponseType::Reply);
        assert_eq!(history.len(), MAX_HISTORY_ENTRIES);
        assert_eq!(history[0].content, "input 1");
        assert_eq!(history[9].content, "drafts 5");
    }

    #[test]
    fn test_shared_analysis_set_once() {
        let store = ContextStore::new();
        let first = Analysis {
            post_sentiment: "critical".to_string(),
            ..Default::default()
        };
        let second = Analysis {
            post_sentiment: "supportive".to_string(),
            ..Default::default()
        };

        store.commit_turn(
            "post1",
            ResponseType::Reply,
            ChatMessage::user("a"),
            ChatMessage::assistant("b"),
            vec![],
            Some(first),
        );
        store.commit_turn(
            "post1",
            ResponseType::Quote,
            ChatMessage::user("c"),
            ChatMessage::assistant("d"),
            vec![],
            Some(second),
        );

        let analysis = store.shared_analysis("post1").unwrap();
        assert_eq!(analysis.post_sentiment, "critical");
    }

    #[test]
    fn test_remove_and_clear() {
        let store = ContextStore::new();
        turn(&store, "post1", ResponseType::Reply, 1);
        turn(&store, "post2", ResponseType::Reply, 1);

        store.remove("post1");
        assert_eq!(store.len(), 1);
        assert!(store.cached_responses("post1", ResponseType::Reply).is_empty());

        store.clear_all();
        assert!(store.is_empty());
    }
}
