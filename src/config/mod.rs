//! Configuration management.

mod catalog;

pub use catalog::{
    Argument, ArgumentKind, CallToAction, Catalog, CatalogPrompts, ModelEntry, ModelPricing,
    RefusalMessages,
};

use crate::prompt::Preferences;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Available LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    /// `OpenAI` GPT.
    #[default]
    OpenAi,
    /// Anthropic Claude.
    Anthropic,
}

impl Provider {
    /// Parses a provider string.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for unknown provider names.
    pub fn parse(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" | "open-ai" | "open_ai" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown provider: {other}"
            ))),
        }
    }

    /// Canonical provider name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        }
    }

    /// Environment variable consulted for this provider's API key.
    #[must_use]
    pub const fn api_key_env_var(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main configuration for amplifier.
#[derive(Debug, Clone)]
pub struct AmplifierConfig {
    /// Active LLM provider.
    pub provider: Provider,
    /// Model id sent to the provider. `None` selects the catalog default.
    pub model: Option<String>,
    /// API key. `None` falls back to the provider's environment variable.
    pub api_key: Option<String>,
    /// Custom user style prompt replacing the catalog default (Layer 3).
    pub custom_style_prompt: Option<String>,
    /// Selected argument ids. `None` selects all include arguments.
    pub selected_arguments: Option<Vec<u32>>,
    /// Selected CTA ids. `None` selects the catalog's default set.
    pub selected_ctas: Option<Vec<u32>>,
    /// Personalization preferences for the per-user voice block.
    pub preferences: Preferences,
    /// Stable per-user seed driving personalization choices.
    pub seed: Option<String>,
    /// Optional path to a catalog override JSON file.
    pub catalog_path: Option<PathBuf>,
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
}

impl Default for AmplifierConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: None,
            api_key: None,
            custom_style_prompt: None,
            selected_arguments: None,
            selected_ctas: None,
            preferences: Preferences::default(),
            seed: None,
            catalog_path: None,
            timeout_ms: 60_000,
            connect_timeout_ms: 5_000,
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Provider name.
    pub provider: Option<String>,
    /// Model id.
    pub model: Option<String>,
    /// API key.
    pub api_key: Option<String>,
    /// Custom style prompt.
    pub style_prompt: Option<String>,
    /// Selected argument ids.
    pub arguments: Option<Vec<u32>>,
    /// Selected CTA ids.
    pub call_to_actions: Option<Vec<u32>>,
    /// Personalization seed.
    pub seed: Option<String>,
    /// Catalog override path.
    pub catalog_path: Option<String>,
    /// Personalization section.
    pub personalization: Option<ConfigFilePersonalization>,
    /// HTTP section.
    pub http: Option<ConfigFileHttp>,
}

/// Personalization section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFilePersonalization {
    /// Voice style override ("auto" or a named style).
    pub voice_style: Option<String>,
    /// Background override.
    pub background: Option<String>,
    /// Rhetorical approach override.
    pub approach: Option<String>,
    /// Length preference override.
    pub length: Option<String>,
}

/// HTTP section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileHttp {
    /// Request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
}

impl AmplifierConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: e.to_string(),
            })?;

        let file: ConfigFile =
            toml::from_str(&contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        Self::from_config_file(file)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/amplifier/` on macOS)
    /// 2. XDG config dir (`~/.config/amplifier/` for Unix compatibility)
    ///
    /// Returns default configuration if no config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let platform_config = base_dirs
            .config_dir()
            .join("amplifier")
            .join("config.toml");
        if platform_config.exists() {
            if let Ok(config) = Self::load_from_file(&platform_config) {
                return config;
            }
        }

        let xdg_config = base_dirs
            .home_dir()
            .join(".config")
            .join("amplifier")
            .join("config.toml");
        if xdg_config.exists() {
            if let Ok(config) = Self::load_from_file(&xdg_config) {
                return config;
            }
        }

        Self::default()
    }

    fn from_config_file(file: ConfigFile) -> crate::Result<Self> {
        let mut config = Self::default();

        if let Some(provider) = file.provider {
            config.provider = Provider::parse(&provider)?;
        }
        config.model = file.model;
        config.api_key = file.api_key;
        config.custom_style_prompt = file.style_prompt;
        config.selected_arguments = file.arguments;
        config.selected_ctas = file.call_to_actions;
        config.seed = file.seed;
        config.catalog_path = file.catalog_path.map(PathBuf::from);

        if let Some(p) = file.personalization {
            config.preferences = Preferences {
                voice_style: p.voice_style,
                background: p.background,
                approach: p.approach,
                length: p.length,
            };
        }

        if let Some(http) = file.http {
            if let Some(timeout_ms) = http.timeout_ms {
                config.timeout_ms = timeout_ms;
            }
            if let Some(connect_timeout_ms) = http.connect_timeout_ms {
                config.connect_timeout_ms = connect_timeout_ms;
            }
        }

        Ok(config)
    }

    /// Sets the provider.
    #[must_use]
    pub const fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = provider;
        self
    }

    /// Sets the model id.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets a custom style prompt.
    #[must_use]
    pub fn with_style_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.custom_style_prompt = Some(prompt.into());
        self
    }

    /// Resolves the API key: explicit config first, then the provider's
    /// environment variable.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingApiKey` when neither source yields a non-empty key.
    pub fn resolve_api_key(&self) -> crate::Result<String> {
        if let Some(key) = &self.api_key {
            if !key.is_empty() {
                return Ok(key.clone());
            }
        }
        match std::env::var(self.provider.api_key_env_var()) {
            Ok(key) if !key.is_empty() => Ok(key),
            _ => Err(crate::Error::MissingApiKey),
        }
    }

    /// Resolves the model id: explicit config first, then the catalog's
    /// default entry for the provider, then the first entry.
    #[must_use]
    pub fn resolve_model(&self, catalog: &Catalog) -> String {
        if let Some(model) = &self.model {
            if !model.is_empty() {
                return model.clone();
            }
        }
        let models = catalog.models(self.provider.as_str());
        models
            .iter()
            .find(|m| m.default)
            .or_else(|| models.first())
            .map_or_else(String::new, |m| m.id.clone())
    }

    /// Loads the catalog: the override file when configured, otherwise the
    /// bundled defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured override file cannot be loaded or
    /// fails validation.
    pub fn load_catalog(&self) -> crate::Result<Catalog> {
        match &self.catalog_path {
            Some(path) => Catalog::load_from_file(path),
            None => Ok(Catalog::bundled()),
        }
    }
}
