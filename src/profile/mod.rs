//! Author profile cache.
//!
//! Profiles enrich the developer context with a category guess and a
//! follower bucket. Entries live in an LRU cache with a 7-day TTL; the cache
//! is advisory, so a miss just means the prompt gets less metadata.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Cache entry time-to-live: 7 days, in milliseconds.
pub const CACHE_TTL_MS: u64 = 7 * 24 * 60 * 60 * 1000;

/// Maximum cached profiles.
pub const CACHE_CAPACITY: usize = 500;

/// Cached author profile, as injected into the developer context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileContext {
    /// Handle without the leading `@`, lowercased.
    pub handle: String,
    /// Display name.
    pub display_name: String,
    /// Profile bio, when known.
    pub bio: Option<String>,
    /// Raw follower count, when known.
    pub follower_count: u64,
    /// Follower bucket label derived from the count.
    pub follower_category: Option<String>,
    /// Category guess (journalist, activist, ...); `None` when unknown.
    pub category: Option<String>,
    /// Verified status.
    pub is_verified: bool,
    /// When the entry was cached, Unix milliseconds.
    pub cached_at: u64,
}

/// LRU profile cache with TTL expiry.
#[derive(Debug)]
pub struct ProfileCache {
    entries: Mutex<LruCache<String, ProfileContext>>,
}

impl ProfileCache {
    /// Creates a cache with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(CACHE_CAPACITY)
    }

    /// Creates a cache with a custom capacity (minimum 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Looks up a profile by handle, dropping it when past its TTL.
    #[must_use]
    pub fn get(&self, handle: &str) -> Option<ProfileContext> {
        let key = normalize_handle(handle);
        let mut entries = self.lock();

        let cached_at = entries.get(&key).map(|p| p.cached_at)?;
        if crate::current_timestamp_ms().saturating_sub(cached_at) > CACHE_TTL_MS {
            entries.pop(&key);
            return None;
        }
        entries.get(&key).cloned()
    }

    /// Inserts or refreshes a profile. The follower category and timestamp
    /// are derived here so callers only supply raw capture data.
    pub fn insert(&self, mut profile: ProfileContext) {
        profile.handle = normalize_handle(&profile.handle);
        profile.follower_category = Some(follower_category(profile.follower_count).to_string());
        profile.cached_at = crate::current_timestamp_ms();

        let key = profile.handle.clone();
        self.lock().put(key, profile);
    }

    /// Number of cached profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, ProfileContext>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for ProfileCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercases a handle and strips the leading `@`.
#[must_use]
pub fn normalize_handle(handle: &str) -> String {
    handle.trim_start_matches('@').to_lowercase()
}

/// Buckets a follower count into a size label.
#[must_use]
pub const fn follower_category(count: u64) -> &'static str {
    if count < 1_000 {
        "small"
    } else if count < 10_000 {
        "medium"
    } else if count < 100_000 {
        "large"
    } else if count < 1_000_000 {
        "huge"
    } else {
        "celebrity"
    }
}

/// Parses follower counts as displayed ("12.5K", "1.2M", "3,420").
#[must_use]
pub fn parse_follower_count(text: &str) -> u64 {
    let cleaned = text.trim().to_lowercase();
    if cleaned.is_empty() {
        return 0;
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn scaled(text: &str, suffix: char, factor: f64) -> Option<u64> {
        let num: f64 = text.replace(suffix, "").trim().parse().ok()?;
        Some((num * factor).round().max(0.0) as u64)
    }

    if cleaned.contains('k') {
        return scaled(&cleaned, 'k', 1_000.0).unwrap_or(0);
    }
    if cleaned.contains('m') {
        return scaled(&cleaned, 'm', 1_000_000.0).unwrap_or(0);
    }
    cleaned.replace(',', "").parse().unwrap_or(0)
}

const JOURNALIST_KEYWORDS: &[&str] = &[
    "journalist",
    "reporter",
    "correspondent",
    "editor",
    "news",
    "جورنالیست",
    "خبرنگار",
    "روزنامه‌نگار",
    "@nytimes",
    "@washingtonpost",
    "@bbc",
    "@cnn",
    "@reuters",
    "@ap",
    "@vaboradio",
    "@manikinevoa",
    "@iranintl",
    "@bbcpersian",
];

const ACTIVIST_KEYWORDS: &[&str] = &[
    "activist",
    "human rights",
    "advocate",
    "campaigner",
    "فعال",
    "حقوق بشر",
    "مبارز",
    "amnesty",
    "hrw",
    "iranhr",
];

const ACADEMIC_KEYWORDS: &[&str] = &[
    "professor",
    "researcher",
    "scholar",
    "phd",
    "dr.",
    "university",
    "academic",
    "استاد",
    "پژوهشگر",
];

const POLITICIAN_KEYWORDS: &[&str] = &[
    "senator",
    "congressman",
    "representative",
    "ambassador",
    "minister",
    "official",
    "parliament",
    "mp",
    "mep",
    "former",
    "ex-",
    "state dept",
];

const ARTIST_KEYWORDS: &[&str] = &[
    "artist",
    "musician",
    "filmmaker",
    "director",
    "actor",
    "actress",
    "writer",
    "author",
    "poet",
    "هنرمند",
    "نویسنده",
    "شاعر",
];

const DIASPORA_KEYWORDS: &[&str] = &[
    "iranian-american",
    "iranian american",
    "persian",
    "iraniandaily",
    "iran",
    "ایران",
    "ایرانی",
    "diaspora",
];

/// Guesses an author category from bio and display name.
///
/// Ordered by specificity: journalist beats diaspora, so a "journalist
/// covering Iran" bio classifies as journalist. Returns `None` when nothing
/// matches.
#[must_use]
pub fn detect_category(bio: &str, display_name: &str) -> Option<&'static str> {
    let text = format!("{bio} {display_name}").to_lowercase();
    let matches = |keywords: &[&str]| keywords.iter().any(|k| text.contains(k));

    if matches(JOURNALIST_KEYWORDS) {
        Some("journalist")
    } else if matches(ACTIVIST_KEYWORDS) {
        Some("activist")
    } else if matches(ACADEMIC_KEYWORDS) {
        Some("academic")
    } else if matches(POLITICIAN_KEYWORDS) {
        Some("politician")
    } else if matches(ARTIST_KEYWORDS) {
        Some("artist")
    } else if matches(DIASPORA_KEYWORDS) {
        Some("diaspora")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn profile(handle: &str, followers: u64) -> ProfileContext {
        ProfileContext {
            handle: handle.to_string(),
            display_name: handle.to_string(),
            follower_count: followers,
            ..Default::default()
        }
    }

    #[test_case(0, "small")]
    #[test_case(999, "small")]
    #[test_case(1_000, "medium")]
    #[test_case(9_999, "medium")]
    #[test_case(10_000, "large")]
    #[test_case(99_999, "large")]
    #[test_case(100_000, "huge")]
    #[test_case(999_999, "huge")]
    #[test_case(1_000_000, "celebrity")]
    fn test_follower_buckets(count: u64, expected: &str) {
        assert_eq!(follower_category(count), expected);
    }

    #[test_case("12.5K", 12_500)]
    #[test_case("1.2M", 1_200_000)]
    #[test_case("3,420", 3_420)]
    #[test_case("87", 87)]
    #[test_case("", 0)]
    #[test_case("n/a", 0)]
    fn test_parse_follower_count(text: &str, expected: u64) {
        assert_eq!(parse_follower_count(text), expected);
    }

    #[test]
    fn test_insert_and_get() {
        let cache = ProfileCache::new();
        cache.insert(profile("@Reporter", 12_500));

        // Lookups normalize the handle too.
        let cached = cache.get("reporter").unwrap();
        assert_eq!(cached.handle, "reporter");
        assert_eq!(cached.follower_category.as_deref(), Some("large"));
        assert!(cached.cached_at > 0);

        assert!(cache.get("someone_else").is_none());
    }

    #[test]
    fn test_ttl_expiry() {
        let cache = ProfileCache::new();
        let mut stale = profile("old_account", 10);
        stale.follower_category = Some("small".to_string());
        stale.cached_at = crate::current_timestamp_ms() - CACHE_TTL_MS - 1;
        // Insert directly to preserve the stale timestamp.
        cache.lock().put("old_account".to_string(), stale);

        assert!(cache.get("old_account").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_lru_eviction_at_capacity() {
        let cache = ProfileCache::with_capacity(2);
        cache.insert(profile("a", 1));
        cache.insert(profile("b", 2));
        cache.insert(profile("c", 3));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("c").is_some());
    }

    #[test_case("Reporter covering protests, news desk", "", Some("journalist"))]
    #[test_case("Human rights defender", "", Some("activist"))]
    #[test_case("PhD candidate at a university", "", Some("academic"))]
    #[test_case("Former ambassador", "", Some("politician"))]
    #[test_case("Filmmaker and poet", "", Some("artist"))]
    #[test_case("Proud member of the diaspora", "", Some("diaspora"))]
    #[test_case("just vibes", "somebody", None)]
    fn test_detect_category(bio: &str, name: &str, expected: Option<&str>) {
        assert_eq!(detect_category(bio, name), expected);
    }

    #[test]
    fn test_category_precedence() {
        // Journalist wins over diaspora for a bio matching both.
        assert_eq!(
            detect_category("Iranian journalist in exile", ""),
            Some("journalist")
        );
    }
}
