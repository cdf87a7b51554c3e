//! Layered prompt construction.
//!
//! Prompts are assembled from four layers:
//! - Layer 1 (system): fixed guardrails and output format, not user-editable
//! - Layer 2 (developer): post context, arguments, CTAs, exclusions, built per request
//! - Layer 3 (user style): default or custom style prompt plus personalization
//! - Layer 4 (user input): runtime feedback, sanitized

mod builder;
mod personalization;
mod sanitizer;

pub use builder::{PromptMode, build_developer_context, build_style_prompt, build_system_prompt};
pub use personalization::{
    APPROACHES, BACKGROUNDS, LENGTHS, Preferences, StyleOption, VOICE_STYLES,
    build_personalization_block, generate_user_seed,
};
pub use sanitizer::sanitize_user_input;
