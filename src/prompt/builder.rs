//! Prompt layer assembly.

use crate::config::Catalog;
use crate::models::{PostData, ResponseType};
use crate::profile::ProfileContext;
use crate::prompt::{Preferences, build_personalization_block};

/// Whether the developer context is for a first generation or a refinement.
///
/// Both modes produce the same context today; the distinction exists so
/// refinement-specific instructions have a place to land without changing
/// call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptMode {
    /// First generation for a tab.
    #[default]
    Initial,
    /// Regeneration driven by user feedback.
    Refine,
}

/// Builds the per-request developer context (Layer 2).
///
/// Deterministic: the same inputs always produce the same string. Sections
/// appear in a fixed order so provider-side prompt caching stays effective.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn build_developer_context(
    catalog: &Catalog,
    post: &PostData,
    selected_argument_ids: &[u32],
    selected_cta_ids: &[u32],
    profile: Option<&ProfileContext>,
    response_type: ResponseType,
    _mode: PromptMode,
) -> String {
    let mut parts: Vec<String> = Vec::new();

    parts.push("## TASK".to_string());
    parts.push(format!(
        "Write exactly 3 X {response_type} responses to the original post below."
    ));
    parts.push(match response_type {
        ResponseType::Reply => "These should be direct replies to the author.".to_string(),
        ResponseType::Quote => {
            "These should be quote reposts with commentary that can stand alone.".to_string()
        }
    });
    parts.push(String::new());

    parts.push("## ORIGINAL POST".to_string());

    let display_name = if post.author.display_name.is_empty() {
        post.author.handle.clone()
    } else {
        post.author.display_name.clone()
    };
    parts.push(format!(
        "Author: {display_name} ({})",
        post.author.display_handle()
    ));

    let mut meta: Vec<String> = Vec::new();
    if let Some(profile) = profile {
        if let Some(category) = profile.category.as_deref().filter(|c| *c != "unknown") {
            meta.push(format!("Category: {category}"));
        }
        if let Some(followers) = &profile.follower_category {
            meta.push(format!("Followers: {followers}"));
        }
    }
    meta.push(format!(
        "Verified: {}",
        if post.author.is_verified { "yes" } else { "no" }
    ));
    parts.push(format!("- {}", meta.join(" | ")));

    if let Some(bio) = profile.and_then(|p| p.bio.as_deref()).filter(|b| !b.is_empty()) {
        parts.push(format!("- Bio: \"{bio}\""));
    }

    if let Some(has_media) = post.has_media {
        parts.push(format!(
            "- Contains media: {}",
            if has_media { "yes" } else { "no" }
        ));
    }

    parts.push(String::new());
    parts.push(format!("Text: {}", post.text));

    if let Some(quoted) = &post.quoted_post {
        let quoted_name = if quoted.author.display_name.is_empty() {
            quoted.author.handle.clone()
        } else {
            quoted.author.display_name.clone()
        };
        parts.push(String::new());
        parts.push("## QUOTED POST".to_string());
        parts.push(format!(
            "Author: {quoted_name} ({})",
            quoted.author.display_handle()
        ));
        parts.push(format!(
            "- Verified: {}",
            if quoted.author.is_verified { "yes" } else { "no" }
        ));
        parts.push(String::new());
        parts.push(format!("Text: {}", quoted.text));
    }
    parts.push(String::new());

    // Selection order follows the caller's id list, skipping unknown ids and
    // anything that is not an include argument.
    let selected_args: Vec<_> = selected_argument_ids
        .iter()
        .filter_map(|id| catalog.include_argument(*id))
        .collect();
    if !selected_args.is_empty() {
        parts.push(
            "## SELECTED ARGUMENTS (facts you MAY use if relevant; do not invent)".to_string(),
        );
        for arg in selected_args {
            parts.push(format!("- [{}] {}: {}", arg.id, arg.title, arg.description));
        }
        parts.push(String::new());
    }

    let selected_ctas: Vec<_> = selected_cta_ids
        .iter()
        .filter_map(|id| catalog.call_to_action(*id))
        .collect();
    if !selected_ctas.is_empty() {
        parts.push(
            "## SELECTED CALLS TO ACTION (policy asks you MAY include if relevant)".to_string(),
        );
        for cta in selected_ctas {
            parts.push(format!("- [{}] {}: {}", cta.id, cta.title, cta.description));
        }
        parts.push(String::new());
    }

    let exclusions = catalog.exclusions();
    if !exclusions.is_empty() {
        parts.push("## ALWAYS-ON EXCLUSIONS".to_string());
        for excl in exclusions {
            parts.push(format!("- {}", excl.description));
        }
        parts.push(String::new());
    }

    parts.push("## INSTRUCTIONS FOR USING ARGUMENTS/CTAs".to_string());
    parts.push("- Use only items that are relevant to THIS post.".to_string());
    parts.push("- If none are relevant, write a response without forcing them.".to_string());
    parts.push(
        "- Do not add new factual claims beyond the selected arguments and the post text."
            .to_string(),
    );
    parts.push("- Treat sensitive numbers as estimates and use attribution language.".to_string());

    parts.join("\n")
}

/// Builds the user style prompt (Layer 3): the custom override when set and
/// non-blank, otherwise the catalog default, followed by the personalization
/// block when one applies.
#[must_use]
pub fn build_style_prompt(
    catalog: &Catalog,
    custom: Option<&str>,
    preferences: &Preferences,
    seed: Option<&str>,
) -> String {
    let effective = custom
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| catalog.default_style_prompt());

    let mut parts = vec![effective.to_string()];
    if let Some(block) = build_personalization_block(preferences, seed) {
        parts.push(block);
    }
    parts.join("\n\n")
}

/// Combines Layer 1 and Layer 3 into the provider-facing system prompt.
///
/// The developer context is not included here; providers inject it as the
/// first user turn so conversation history can omit it on later turns.
#[must_use]
pub fn build_system_prompt(
    catalog: &Catalog,
    custom: Option<&str>,
    preferences: &Preferences,
    seed: Option<&str>,
) -> String {
    format!(
        "{}\n\n{}",
        catalog.fixed_prompt(),
        build_style_prompt(catalog, custom, preferences, seed)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PostAuthor, QuotedPost};

    fn post() -> PostData {
        PostData {
            id: Some("42".to_string()),
            url: "https://x.com/journalist/status/42".to_string(),
            text: "Internet access cut again in two provinces tonight.".to_string(),
            author: PostAuthor {
                handle: "journalist".to_string(),
                display_name: "A Journalist".to_string(),
                is_verified: true,
                bio: None,
            },
            has_media: Some(false),
            quoted_post: None,
        }
    }

    #[test]
    fn test_developer_context_sections_in_order() {
        let catalog = Catalog::bundled();
        let ctx = build_developer_context(
            &catalog,
            &post(),
            &[1001, 1008],
            &[2001],
            None,
            ResponseType::Reply,
            PromptMode::Initial,
        );

        let task = ctx.find("## TASK").unwrap();
        let original = ctx.find("## ORIGINAL POST").unwrap();
        let args = ctx.find("## SELECTED ARGUMENTS").unwrap();
        let ctas = ctx.find("## SELECTED CALLS TO ACTION").unwrap();
        let exclusions = ctx.find("## ALWAYS-ON EXCLUSIONS").unwrap();
        let instructions = ctx.find("## INSTRUCTIONS FOR USING ARGUMENTS/CTAs").unwrap();
        assert!(task < original && original < args && args < ctas);
        assert!(ctas < exclusions && exclusions < instructions);

        assert!(ctx.contains("exactly 3 X reply responses"));
        assert!(ctx.contains("direct replies to the author"));
        assert!(ctx.contains("Author: A Journalist (@journalist)"));
        assert!(ctx.contains("Verified: yes"));
        assert!(ctx.contains("[1001]"));
        assert!(ctx.contains("[2001]"));
        assert!(ctx.contains("NIAC"));
    }

    #[test]
    fn test_quote_task_wording() {
        let catalog = Catalog::bundled();
        let ctx = build_developer_context(
            &catalog,
            &post(),
            &[],
            &[],
            None,
            ResponseType::Quote,
            PromptMode::Initial,
        );
        assert!(ctx.contains("exactly 3 X quote responses"));
        assert!(ctx.contains("quote reposts with commentary"));
        assert!(!ctx.contains("## SELECTED ARGUMENTS"));
    }

    #[test]
    fn test_exclude_ids_never_selectable_as_arguments() {
        let catalog = Catalog::bundled();
        let ctx = build_developer_context(
            &catalog,
            &post(),
            &[1015],
            &[],
            None,
            ResponseType::Reply,
            PromptMode::Initial,
        );
        // 1015 is exclude-kind: it appears under exclusions, never as a
        // selected argument.
        assert!(!ctx.contains("## SELECTED ARGUMENTS"));
        assert!(ctx.contains("## ALWAYS-ON EXCLUSIONS"));
    }

    #[test]
    fn test_quoted_post_block() {
        let catalog = Catalog::bundled();
        let mut p = post();
        p.quoted_post = Some(QuotedPost {
            author: PostAuthor {
                handle: "witness".to_string(),
                ..Default::default()
            },
            text: "No connection since last night.".to_string(),
        });
        let ctx = build_developer_context(
            &catalog,
            &p,
            &[],
            &[],
            None,
            ResponseType::Reply,
            PromptMode::Refine,
        );
        assert!(ctx.contains("## QUOTED POST"));
        assert!(ctx.contains("Author: witness (@witness)"));
    }

    #[test]
    fn test_profile_metadata_line() {
        let catalog = Catalog::bundled();
        let profile = ProfileContext {
            category: Some("journalist".to_string()),
            follower_category: Some("100K+".to_string()),
            bio: Some("Covering Iran since 2019".to_string()),
            ..Default::default()
        };
        let ctx = build_developer_context(
            &catalog,
            &post(),
            &[],
            &[],
            Some(&profile),
            ResponseType::Reply,
            PromptMode::Initial,
        );
        assert!(ctx.contains("- Category: journalist | Followers: 100K+ | Verified: yes"));
        assert!(ctx.contains("- Bio: \"Covering Iran since 2019\""));
    }

    #[test]
    fn test_modes_produce_identical_context() {
        let catalog = Catalog::bundled();
        let a = build_developer_context(
            &catalog,
            &post(),
            &[1001],
            &[2001],
            None,
            ResponseType::Reply,
            PromptMode::Initial,
        );
        let b = build_developer_context(
            &catalog,
            &post(),
            &[1001],
            &[2001],
            None,
            ResponseType::Reply,
            PromptMode::Refine,
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_style_prompt_custom_override() {
        let catalog = Catalog::bundled();
        let prompt = build_style_prompt(&catalog, Some("Be very brief."), &Preferences::default(), None);
        assert_eq!(prompt, "Be very brief.");

        // Blank custom prompt falls back to the default.
        let prompt = build_style_prompt(&catalog, Some("   "), &Preferences::default(), None);
        assert!(prompt.contains("## Writing Preferences"));
    }

    #[test]
    fn test_style_prompt_appends_personalization() {
        let catalog = Catalog::bundled();
        let prompt = build_style_prompt(&catalog, None, &Preferences::default(), Some("a1b2c3d"));
        assert!(prompt.contains("Voice fingerprint: a1b2c3d"));
    }

    #[test]
    fn test_system_prompt_layer_order() {
        let catalog = Catalog::bundled();
        let prompt = build_system_prompt(&catalog, None, &Preferences::default(), None);
        let fixed = prompt.find("ABSOLUTE MISSION GUARDRAILS").unwrap();
        let style = prompt.find("## Writing Preferences").unwrap();
        assert!(fixed < style);
    }
}
