//! Binary entry point for amplifier.
//!
//! This binary provides the CLI interface for the generation pipeline.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use amplifier::cli::{
    cmd_catalog, cmd_config_show, cmd_generate, cmd_seed, cmd_test_connection, cmd_usage,
    cmd_validate_prompt, read_post_input,
};
use amplifier::config::AmplifierConfig;
use amplifier::models::ResponseType;
use amplifier::services::GenerationService;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

/// Amplifier - generation pipeline for advocacy replies and quote posts.
#[derive(Parser)]
#[command(name = "amplifier")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Generate drafts for a captured post.
    Generate {
        /// Path to the post capture JSON (stdin when omitted).
        #[arg(short, long)]
        post: Option<PathBuf>,

        /// Response type: reply or quote.
        #[arg(short = 't', long, default_value = "reply")]
        response_type: String,

        /// Feedback for refining the previous drafts (supports //shortcuts).
        #[arg(short, long)]
        feedback: Option<String>,

        /// Skip cached drafts and regenerate.
        #[arg(long)]
        force: bool,

        /// Emit the full result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Check the configured API key against the provider.
    TestConnection,

    /// Check a custom style prompt against the mission.
    ValidatePrompt {
        /// The style prompt text.
        prompt: String,
    },

    /// List catalog content.
    Catalog {
        /// Section: arguments, ctas, models, shortcuts, or all.
        #[arg(default_value = "all")]
        section: String,
    },

    /// Show the resolved configuration.
    Config,

    /// Show token usage and cost.
    Usage,

    /// Generate a personalization seed.
    Seed,
}

/// Main entry point.
fn main() -> ExitCode {
    // Load .env before anything reads API keys from the environment.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    match run_command(cli.command, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(
    command: Commands,
    config: AmplifierConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Generate {
            post,
            response_type,
            feedback,
            force,
            json,
        } => {
            let post = read_post_input(post.as_deref())?;
            let response_type = ResponseType::parse(&response_type)?;
            let service = GenerationService::from_config(config)?;
            cmd_generate(&service, post, response_type, feedback, force, json)
        },

        Commands::TestConnection => {
            let service = GenerationService::from_config(config)?;
            cmd_test_connection(&service)
        },

        Commands::ValidatePrompt { prompt } => {
            let service = GenerationService::from_config(config)?;
            cmd_validate_prompt(&service, &prompt);
            Ok(())
        },

        Commands::Catalog { section } => {
            let catalog = config.load_catalog()?;
            cmd_catalog(&catalog, &section);
            Ok(())
        },

        Commands::Config => cmd_config_show(&config),

        Commands::Usage => {
            let service = GenerationService::from_config(config)?;
            cmd_usage(&service);
            Ok(())
        },

        Commands::Seed => {
            cmd_seed();
            Ok(())
        },
    }
}

/// Loads configuration.
fn load_config(path: Option<&str>) -> Result<AmplifierConfig, Box<dyn std::error::Error>> {
    // If a path is provided, load from that file
    if let Some(config_path) = path {
        return AmplifierConfig::load_from_file(std::path::Path::new(config_path))
            .map_err(std::convert::Into::into);
    }

    // Environment override for config path
    if let Ok(config_path) = std::env::var("AMPLIFIER_CONFIG_PATH") {
        if !config_path.trim().is_empty() {
            return AmplifierConfig::load_from_file(std::path::Path::new(&config_path))
                .map_err(std::convert::Into::into);
        }
    }

    // Otherwise, load from default location
    Ok(AmplifierConfig::load_default())
}

/// Initializes tracing output on stderr.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "amplifier=debug"
    } else {
        "amplifier=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
