//! Per-user voice personalization.
//!
//! A small block appended to the style prompt (Layer 3) so different users of
//! the same build do not produce identical phrasing. Driven by explicit
//! preferences plus a stable 7-character seed.

use rand::RngExt;
use serde::{Deserialize, Serialize};

/// A selectable style option with a stable id.
#[derive(Debug, Clone, Copy)]
pub struct StyleOption {
    /// Stable option id.
    pub id: &'static str,
    /// Human-readable label.
    pub label: &'static str,
    /// Description fed into the prompt.
    pub description: &'static str,
}

/// Voice style options.
pub const VOICE_STYLES: &[StyleOption] = &[
    StyleOption {
        id: "professional",
        label: "Professional & measured",
        description: "Calm, factual, authoritative tone",
    },
    StyleOption {
        id: "passionate",
        label: "Passionate & direct",
        description: "Urgent, emotionally engaged, calls to action",
    },
    StyleOption {
        id: "analytical",
        label: "Thoughtful & analytical",
        description: "Evidence-based, nuanced, educational",
    },
    StyleOption {
        id: "personal",
        label: "Warm & personal",
        description: "Conversational, empathetic, human stories",
    },
];

/// Background/expertise options.
pub const BACKGROUNDS: &[StyleOption] = &[
    StyleOption {
        id: "tech",
        label: "Technology",
        description: "Tech industry, digital rights, internet freedom",
    },
    StyleOption {
        id: "healthcare",
        label: "Healthcare",
        description: "Medical, humanitarian, public health angles",
    },
    StyleOption {
        id: "arts",
        label: "Arts & Culture",
        description: "Cultural preservation, artistic expression",
    },
    StyleOption {
        id: "law",
        label: "Law & Policy",
        description: "Legal frameworks, international law, sanctions",
    },
    StyleOption {
        id: "business",
        label: "Business",
        description: "Economic impact, trade, entrepreneurship",
    },
    StyleOption {
        id: "student",
        label: "Student/Academic",
        description: "Education, youth perspective, research",
    },
    StyleOption {
        id: "other",
        label: "Other",
        description: "General perspective",
    },
];

/// Content approach options.
pub const APPROACHES: &[StyleOption] = &[
    StyleOption {
        id: "facts",
        label: "Facts & evidence",
        description: "Data, statistics, documented events",
    },
    StyleOption {
        id: "human",
        label: "Human stories & impact",
        description: "Personal narratives, real consequences",
    },
    StyleOption {
        id: "policy",
        label: "Policy & action",
        description: "What can be done, calls for change",
    },
    StyleOption {
        id: "mixed",
        label: "Mixed approach",
        description: "Balance of all approaches",
    },
];

/// Response length options.
pub const LENGTHS: &[StyleOption] = &[
    StyleOption {
        id: "punchy",
        label: "Punchy",
        description: "Short, impactful (under 180 chars)",
    },
    StyleOption {
        id: "medium",
        label: "Medium",
        description: "Balanced length (180-240 chars)",
    },
    StyleOption {
        id: "full",
        label: "Full",
        description: "Use full character limit (up to 280 chars)",
    },
];

/// User voice preferences. `None` or `"mixed"`/`"other"` means no override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    /// Voice style option id.
    #[serde(default)]
    pub voice_style: Option<String>,
    /// Background option id.
    #[serde(default)]
    pub background: Option<String>,
    /// Approach option id.
    #[serde(default)]
    pub approach: Option<String>,
    /// Length option id.
    #[serde(default)]
    pub length: Option<String>,
}

fn find_option(options: &'static [StyleOption], id: &str) -> Option<&'static StyleOption> {
    options.iter().find(|o| o.id == id)
}

/// Generates a stable 7-character lowercase alphanumeric seed.
#[must_use]
pub fn generate_user_seed() -> String {
    const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..7)
        .map(|_| CHARS[rng.random_range(0..CHARS.len())] as char)
        .collect()
}

/// Builds the personalization block appended to the style prompt.
///
/// Returns `None` when neither preferences nor a seed contribute anything.
#[must_use]
pub fn build_personalization_block(preferences: &Preferences, seed: Option<&str>) -> Option<String> {
    let mut parts = vec!["## Your Personalized Style".to_string()];

    if let Some(id) = preferences.voice_style.as_deref().filter(|id| *id != "mixed") {
        if let Some(style) = find_option(VOICE_STYLES, id) {
            parts.push(format!("Voice: {} - {}", style.label, style.description));
        }
    }

    if let Some(id) = preferences.background.as_deref().filter(|id| *id != "other") {
        if let Some(bg) = find_option(BACKGROUNDS, id) {
            parts.push(format!(
                "Background: {} - reference {} when relevant",
                bg.label,
                bg.description.to_lowercase()
            ));
        }
    }

    if let Some(id) = preferences.approach.as_deref().filter(|id| *id != "mixed") {
        if let Some(approach) = find_option(APPROACHES, id) {
            parts.push(format!("Approach: {}", approach.description));
        }
    }

    if let Some(id) = preferences.length.as_deref() {
        if let Some(length) = find_option(LENGTHS, id) {
            parts.push(format!("Length: {} - {}", length.label, length.description));
        }
    }

    if let Some(seed) = seed.filter(|s| !s.is_empty()) {
        parts.push(format!(
            "Voice fingerprint: {seed} - let this subtly influence your unique word choices and phrasing"
        ));
    }

    if parts.len() > 1 {
        return Some(parts.join("\n"));
    }

    // No preferences set; the seed alone still differentiates voices.
    seed.filter(|s| !s.is_empty()).map(|seed| {
        format!(
            "## Your Unique Voice\nVoice fingerprint: {seed} - let this subtly influence your unique word choices and phrasing"
        )
    })
}
