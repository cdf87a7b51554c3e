//! Deterministic draft validation.
//!
//! Every provider payload passes through here before the orchestrator accepts
//! it. Checks are pure string inspection: structure, count, length, hashtag
//! discipline, excluded sources, and threat/incitement phrasing. A threat
//! finding is terminal (refusal); everything else is retryable with fix hints.

use crate::models::{ResponseDraft, ResponseType};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Hashtag every draft must carry.
pub const REQUIRED_HASHTAG: &str = "#IranRevolution2026";

/// Maximum draft length in characters (one post).
pub const MAX_RESPONSE_CHARS: usize = 280;

/// Maximum hashtags per draft (the required one plus one optional).
pub const MAX_HASHTAGS: usize = 2;

/// Expected number of drafts per generation.
pub const EXPECTED_DRAFTS: usize = 3;

/// Sources the drafts must never cite.
static EXCLUDED_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bNIAC\b",
        r"(?i)\bNegar\s*Mortazavi\b",
        r"(?i)\bTrita\s*Parsi\b",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Threat/incitement phrasings. Deliberately narrow: broad patterns like
/// "violence against" also match "the regime's violence against protesters".
static THREAT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bkill\s+(them|him|her|all|everyone)\b",
        r"(?i)\bdeath\s+to\b",
        r"(?i)\b(use|commit|advocate|promote)\s+violence\b",
        r"(?i)\battack\s+(them|civilians|innocents)\b",
        r"(?i)\blet'?s\s+bomb\b",
        r"(?i)\bassassinate\b",
        r"(?i)\bexterminate\b",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Outcome of validating one provider payload.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    /// Whether the payload passed every check.
    pub valid: bool,
    /// Deduplicated issue tags, in detection order.
    pub issues: Vec<String>,
    /// Corrective hints appended to the retry message.
    pub fix_hints: Vec<String>,
    /// True when a threat was detected; terminal, never retried.
    pub refusal: bool,
}

impl ValidationOutcome {
    fn refused() -> Self {
        Self {
            valid: false,
            issues: vec!["threat_detected".to_string()],
            fix_hints: Vec::new(),
            refusal: true,
        }
    }
}

/// Checks a single draft text. Returns issue tags, empty when clean.
#[must_use]
pub fn validate_draft_text(text: &str) -> Vec<&'static str> {
    let mut issues = Vec::new();

    if text.chars().count() > MAX_RESPONSE_CHARS {
        issues.push("too_long");
    }

    if !text.contains(REQUIRED_HASHTAG) {
        issues.push("missing_hashtag");
    }

    if count_hashtags(text) > MAX_HASHTAGS {
        issues.push("too_many_hashtags");
    }

    if EXCLUDED_PATTERNS.iter().any(|p| p.is_match(text)) {
        issues.push("excluded_source");
    }

    if THREAT_PATTERNS.iter().any(|p| p.is_match(text)) {
        issues.push("threat_detected");
    }

    issues
}

/// Counts `#word` hashtags in a draft.
fn count_hashtags(text: &str) -> usize {
    text.match_indices('#')
        .filter(|(i, _)| {
            text[i + 1..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric() || c == '_')
        })
        .count()
}

/// Whether drafts are too alike: distinct lowercase 50-character prefixes
/// below half the draft count (rounded up).
#[must_use]
pub fn are_responses_too_similar(drafts: &[ResponseDraft]) -> bool {
    if drafts.len() < 2 {
        return false;
    }

    let starts: std::collections::HashSet<String> = drafts
        .iter()
        .map(|d| d.text.chars().take(50).collect::<String>().to_lowercase())
        .collect();

    starts.len() < drafts.len().div_ceil(2)
}

/// Pulls the draft array out of a payload, accepting `responses` or the
/// type-specific key (`replies`/`quotes`) some models emit instead.
#[must_use]
pub fn extract_drafts(result: &Value, response_type: ResponseType) -> Vec<ResponseDraft> {
    let array = result
        .get("responses")
        .and_then(Value::as_array)
        .or_else(|| result.get(response_type.plural()).and_then(Value::as_array));

    array.map_or_else(Vec::new, |items| {
        items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect()
    })
}

/// Validates the complete provider payload for one response type.
///
/// A threat finding anywhere short-circuits into a refusal outcome. Otherwise
/// every issue is collected, deduplicated, and paired with fix hints for the
/// retry message.
#[must_use]
pub fn validate_result(result: &Value, response_type: ResponseType) -> ValidationOutcome {
    let plural = response_type.plural();

    if !result.is_object() {
        return ValidationOutcome {
            valid: false,
            issues: vec!["invalid_json".to_string()],
            fix_hints: Vec::new(),
            refusal: false,
        };
    }

    let mut issues: Vec<String> = Vec::new();
    let mut fix_hints: Vec<String> = Vec::new();
    let mut has_too_long = false;
    let mut has_missing_hashtag = false;

    let array = result
        .get("responses")
        .and_then(Value::as_array)
        .or_else(|| result.get(plural).and_then(Value::as_array));

    let Some(array) = array else {
        return ValidationOutcome {
            valid: false,
            issues: vec![format!("no_{plural}")],
            fix_hints: Vec::new(),
            refusal: false,
        };
    };

    if array.is_empty() || array.len() > EXPECTED_DRAFTS {
        issues.push(format!("wrong_{plural}_count"));
    }

    for item in array {
        let Some(text) = item.get("text").and_then(Value::as_str).filter(|t| !t.is_empty())
        else {
            issues.push("empty_response".to_string());
            continue;
        };

        let text_issues = validate_draft_text(text);
        if text_issues.contains(&"threat_detected") {
            return ValidationOutcome::refused();
        }
        has_too_long |= text_issues.contains(&"too_long");
        has_missing_hashtag |= text_issues.contains(&"missing_hashtag");
        issues.extend(text_issues.iter().map(ToString::to_string));
    }

    let drafts = extract_drafts(result, response_type);
    if drafts.len() > 1 && are_responses_too_similar(&drafts) {
        issues.push(format!("{plural}_too_similar"));
        fix_hints.push(format!(
            "Make each {response_type} structurally different."
        ));
    }

    if has_too_long {
        fix_hints.push(format!(
            "Make responses shorter (max {MAX_RESPONSE_CHARS} characters)."
        ));
    }
    if has_missing_hashtag {
        fix_hints.push(format!(
            "Include the required hashtag {REQUIRED_HASHTAG} in each response."
        ));
    }

    let issues = dedup_preserving_order(issues);

    ValidationOutcome {
        valid: issues.is_empty(),
        issues,
        fix_hints,
        refusal: false,
    }
}

fn dedup_preserving_order(issues: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    issues.into_iter().filter(|i| seen.insert(i.clone())).collect()
}
