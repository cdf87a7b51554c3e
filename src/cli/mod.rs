//! CLI command implementations.
//!
//! This module provides the command-line interface for amplifier. The clap
//! definitions live in the binary; each function here implements one command
//! against the library API.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `generate` | Generate drafts for a captured post (JSON on stdin or a file) |
//! | `test-connection` | Check the configured API key against the provider |
//! | `validate-prompt` | Check a custom style prompt against the mission |
//! | `catalog` | List catalog arguments, calls to action, models, or shortcuts |
//! | `config` | Show the resolved configuration |
//! | `usage` | Show token usage and cost for today, this month, and all time |
//! | `seed` | Generate a personalization seed |
//!
//! # Example Usage
//!
//! ```bash
//! # Generate replies for a captured post
//! amplifier generate --post post.json
//!
//! # Refine the previous drafts
//! amplifier generate --post post.json --feedback "//shorter //firsthand"
//!
//! # List the selectable arguments
//! amplifier catalog arguments
//! ```

use crate::config::{AmplifierConfig, Catalog};
use crate::cost::{format_cost, format_tokens};
use crate::models::{GenerationRequest, PostData, ResponseType};
use crate::prompt::generate_user_seed;
use crate::services::GenerationService;
use std::io::Read;
use std::path::Path;

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Reads a captured post as JSON from a file, or from stdin when no path is
/// given.
///
/// # Errors
///
/// Returns an error when the input cannot be read or parsed.
pub fn read_post_input(path: Option<&Path>) -> Result<PostData, Box<dyn std::error::Error>> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input)?;
            input
        },
    };

    let post: PostData = serde_json::from_str(&raw)?;
    Ok(post)
}

/// Generate command.
///
/// # Errors
///
/// Returns an error when generation fails or the output cannot be serialized.
pub fn cmd_generate(
    service: &GenerationService,
    post: PostData,
    response_type: ResponseType,
    feedback: Option<String>,
    force: bool,
    json: bool,
) -> CliResult {
    let result = service.generate(GenerationRequest {
        post,
        response_type,
        feedback,
        force_regenerate: force,
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if let Some(analysis) = &result.analysis {
        println!("Post sentiment: {}", analysis.post_sentiment);
        if !analysis.key_topics.is_empty() {
            println!("Key topics: {}", analysis.key_topics.join(", "));
        }
        if !analysis.recommended_approach.is_empty() {
            println!("Approach: {}", analysis.recommended_approach);
        }
        println!();
    }

    for (index, response) in result.responses.iter().enumerate() {
        println!(
            "#{} ({}, {} chars)",
            index + 1,
            response.tone,
            response.text.chars().count()
        );
        println!("{}", response.text);
        println!();
    }

    if let Some(warning) = &result.validation_warning {
        eprintln!("Warning: {warning}");
    }

    Ok(())
}

/// Test-connection command.
///
/// # Errors
///
/// Returns an error when the check cannot be performed at all.
pub fn cmd_test_connection(service: &GenerationService) -> CliResult {
    print!(
        "Checking {} ({})... ",
        service.provider_name(),
        service.model()
    );

    match service.test_connection() {
        Ok(true) => {
            println!("OK");
            Ok(())
        },
        Ok(false) => {
            println!("FAILED");
            Err("API key was rejected by the provider".into())
        },
        Err(e) => {
            println!("ERROR");
            Err(e.into())
        },
    }
}

/// Validate-prompt command.
pub fn cmd_validate_prompt(service: &GenerationService, prompt: &str) {
    let validation = service.validate_style_prompt(prompt);

    if validation.skipped {
        println!("Validation skipped (provider unavailable); prompt accepted.");
        return;
    }

    if validation.valid {
        println!("Prompt accepted.");
    } else {
        println!("Prompt rejected.");
    }
    if !validation.reason.is_empty() {
        println!("Reason: {}", validation.reason);
    }
}

/// Catalog command. `section` is one of `arguments`, `ctas`, `models`,
/// `shortcuts`, or `all`.
pub fn cmd_catalog(catalog: &Catalog, section: &str) {
    let section = section.to_lowercase();
    let all = section == "all";

    if all || section == "arguments" {
        println!("Arguments:");
        for argument in catalog.include_arguments() {
            println!("  [{}] {}", argument.id, argument.title);
        }
        println!("Always-on exclusions:");
        for exclusion in catalog.exclusions() {
            println!("  [{}] {}", exclusion.id, exclusion.title);
        }
        println!();
    }

    if all || section == "ctas" {
        println!("Calls to action:");
        for cta in catalog.call_to_actions() {
            let default = if cta.default { " (default)" } else { "" };
            println!("  [{}] {}{}", cta.id, cta.title, default);
        }
        println!();
    }

    if all || section == "models" {
        for provider in ["openai", "anthropic"] {
            println!("Models ({provider}):");
            for model in catalog.models(provider) {
                let default = if model.default { " (default)" } else { "" };
                println!("  {} - {}{}", model.id, model.name, default);
            }
        }
        println!();
    }

    if all || section == "shortcuts" {
        println!("Feedback shortcuts:");
        for (shortcut, expansion) in catalog.shortcuts() {
            println!("  {shortcut:<14} {expansion}");
        }
    }
}

/// Config command.
///
/// # Errors
///
/// Returns an error when the catalog override cannot be loaded.
pub fn cmd_config_show(config: &AmplifierConfig) -> CliResult {
    let catalog = config.load_catalog()?;

    println!("Current Configuration");
    println!("=====================");
    println!();
    println!("Provider: {}", config.provider);
    println!("Model: {}", config.resolve_model(&catalog));
    println!(
        "API Key: {}",
        if config.resolve_api_key().is_ok() {
            "configured"
        } else {
            "missing"
        }
    );
    println!(
        "Style Prompt: {}",
        if config.custom_style_prompt.is_some() {
            "custom"
        } else {
            "(default)"
        }
    );
    println!(
        "Arguments: {}",
        config.selected_arguments.as_ref().map_or_else(
            || format!("all ({})", catalog.default_argument_ids().len()),
            |ids| format!("{} selected", ids.len()),
        )
    );
    println!(
        "Calls to Action: {}",
        config.selected_ctas.as_ref().map_or_else(
            || format!("default ({})", catalog.default_cta_ids().len()),
            |ids| format!("{} selected", ids.len()),
        )
    );
    println!("Seed: {}", config.seed.as_deref().unwrap_or("(none)"));
    println!();
    println!("HTTP:");
    println!("  Timeout: {}ms", config.timeout_ms);
    println!("  Connect Timeout: {}ms", config.connect_timeout_ms);

    Ok(())
}

/// Usage command.
pub fn cmd_usage(service: &GenerationService) {
    let stats = service.usage_stats();

    println!("Token Usage");
    println!("===========");
    println!();
    for (label, bucket) in [
        ("Today", stats.today),
        ("This Month", stats.this_month),
        ("All Time", stats.all_time),
    ] {
        println!(
            "{label}: {} requests, {} tokens, {}",
            bucket.requests,
            format_tokens(bucket.tokens),
            format_cost(bucket.cost)
        );
    }
}

/// Seed command.
pub fn cmd_seed() {
    println!("{}", generate_user_seed());
}
