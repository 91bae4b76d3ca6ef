//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg`, an optional YAML configuration file,
//! and the resolution of user-editable settings into the [`SessionConfig`] that every request is
//! built from.

use std::path::{Path, PathBuf};
use std::time::Duration;

use arrrg_derive::CommandLine;
use serde::{Deserialize, Serialize};

use crate::chat::difficulty::{Difficulty, parse_level};
use crate::error::{Error, Result};
use crate::types::Model;

/// Default maximum tokens per response.
pub const DEFAULT_MAX_TOKENS: u32 = 1500;

/// Smallest accepted response token budget.
pub const MIN_MAX_TOKENS: u32 = 100;

/// Largest accepted response token budget.
pub const MAX_MAX_TOKENS: u32 = 4000;

/// Lowest sampling temperature.
pub const MIN_TEMPERATURE: f32 = 0.0;

/// Highest sampling temperature.
pub const MAX_TEMPERATURE: f32 = 2.0;

/// Temperature used in free configuration when none was chosen.
pub const DEFAULT_TEMPERATURE: f32 = 1.0;

/// Temperature used whenever a difficulty level selects the prompt.
pub const PINNED_TEMPERATURE: f32 = 1.2;

/// System prompt used in free configuration when none was chosen.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Command-line arguments for the sciquest-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: gpt-3.5-turbo)", "MODEL")]
    pub model: Option<String>,

    /// Difficulty level that selects the tutor prompt.
    #[arrrg(
        optional,
        "Difficulty: beginner, intermediate, advanced or off (default: intermediate)",
        "LEVEL"
    )]
    pub level: Option<String>,

    /// Free-form system prompt; implies `--level off`.
    #[arrrg(optional, "System prompt for free configuration", "PROMPT")]
    pub system: Option<String>,

    /// Sampling temperature for free configuration.
    #[arrrg(optional, "Temperature 0.0-2.0 (free configuration only)", "TEMP")]
    pub temperature: Option<String>,

    /// Maximum tokens per response.
    #[arrrg(optional, "Max tokens per response, 100-4000 (default: 1500)", "TOKENS")]
    pub max_tokens: Option<u32>,

    /// API key for the completion provider.
    #[arrrg(optional, "API key (default: $OPENAI_API_KEY)", "KEY")]
    pub api_key: Option<String>,

    /// Base URL of the completion API.
    #[arrrg(optional, "API base URL (default: https://api.openai.com/v1/)", "URL")]
    pub base_url: Option<String>,

    /// YAML configuration file.
    #[arrrg(optional, "YAML configuration file", "FILE")]
    pub config: Option<String>,

    /// Default destination for `/save`.
    #[arrrg(optional, "Default file for /save", "FILE")]
    pub export_path: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Log debug output to stderr.
    #[arrrg(flag, "Log debug output to stderr")]
    pub verbose: bool,
}

/// Errors produced while turning [`ChatArgs`] into a [`ChatConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ChatArgsError {
    /// The `--level` value is not a known difficulty.
    #[error("invalid --level: {0}")]
    InvalidLevel(String),

    /// The `--temperature` value is not a number.
    #[error("invalid --temperature: {0}")]
    InvalidTemperature(String),

    /// A difficulty level and a free system prompt were both requested.
    #[error("a system prompt cannot be combined with a difficulty level; use --level off")]
    ConflictingPrompt,

    /// The configuration file could not be loaded.
    #[error(transparent)]
    ConfigFile(#[from] Error),
}

/// Settings read from a YAML configuration file.
///
/// Every field is optional; command-line flags take precedence over the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfigFile {
    /// Model identifier.
    pub model: Option<String>,
    /// Difficulty level, or `off` for free configuration.
    pub level: Option<String>,
    /// Free-form system prompt.
    pub system: Option<String>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Maximum tokens per response.
    pub max_tokens: Option<u32>,
    /// Base URL of the completion API.
    pub base_url: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Default destination for `/save`.
    pub export_path: Option<PathBuf>,
    /// Disable ANSI colors and styles.
    pub no_color: Option<bool>,
}

impl ChatConfigFile {
    /// Parse a configuration from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|err| Error::io(format!("failed to read {}", path.display()), err))?;
        Self::from_yaml_str(&content)
    }
}

/// Configuration for a chat session.
///
/// This struct holds the user-editable values.  [`ChatConfig::resolve`] turns them into the
/// [`SessionConfig`] actually sent with each request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// The model to use for generating responses.
    pub model: Model,

    /// When set, the level dictates the system prompt and pins the temperature.
    pub difficulty: Option<Difficulty>,

    /// Free-form system prompt, used only without a difficulty level.
    pub system_prompt: Option<String>,

    /// Sampling temperature, used only without a difficulty level.
    pub temperature: Option<f32>,

    /// Maximum tokens per response.
    pub max_tokens: u32,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Default destination for transcript exports.
    pub export_path: Option<PathBuf>,

    /// Override for the completion API base URL.
    pub base_url: Option<String>,

    /// Override for the request timeout.
    pub timeout: Option<Duration>,
}

/// The finalized settings a completion request is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// The model that answers.
    pub model: Model,
    /// The system prompt injected ahead of the transcript.
    pub system_prompt: String,
    /// Sampling temperature in `[0, 2]`.
    pub temperature: f32,
    /// Response token budget in `[100, 4000]`.
    pub max_response_tokens: u32,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: gpt-3.5-turbo
    /// - Difficulty: intermediate
    /// - Max tokens: 1500
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            model: Model::default(),
            difficulty: Some(Difficulty::default()),
            system_prompt: None,
            temperature: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            use_color: true,
            export_path: None,
            base_url: None,
            timeout: None,
        }
    }

    /// Creates a ChatConfig in free configuration, where every field is user-editable.
    pub fn free() -> Self {
        Self {
            difficulty: None,
            ..Self::new()
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Selects a difficulty level, or free configuration with `None`.
    pub fn with_difficulty(mut self, difficulty: Option<Difficulty>) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Sets a free-form system prompt and switches to free configuration.
    pub fn with_system_prompt(mut self, prompt: String) -> Self {
        self.difficulty = None;
        self.system_prompt = Some(prompt);
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the maximum tokens per response.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Sets the default export path.
    pub fn with_export_path(mut self, path: Option<PathBuf>) -> Self {
        self.export_path = path;
        self
    }

    /// Sets the completion API base URL.
    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns true when the system prompt and temperature are derived from a difficulty level.
    pub fn is_pinned(&self) -> bool {
        self.difficulty.is_some()
    }

    /// Produces the settings a request is built from.
    ///
    /// With a difficulty level the prompt comes from the level's fixed table entry and the
    /// temperature is [`PINNED_TEMPERATURE`].  Without one, unset fields take their defaults.
    /// Numbers are clamped into their accepted ranges.
    pub fn resolve(&self) -> SessionConfig {
        let (system_prompt, temperature) = match self.difficulty {
            Some(level) => (level.system_prompt().to_string(), PINNED_TEMPERATURE),
            None => (
                self.system_prompt
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
                clamp_temperature(self.temperature.unwrap_or(DEFAULT_TEMPERATURE)),
            ),
        };
        SessionConfig {
            model: self.model.clone(),
            system_prompt,
            temperature,
            max_response_tokens: clamp_max_tokens(self.max_tokens),
        }
    }

    /// Applies the values of a configuration file on top of `self`.
    pub fn apply_file(mut self, file: ChatConfigFile) -> std::result::Result<Self, ChatArgsError> {
        if let Some(model) = file.model {
            self.model = Model::from(model);
        }
        self = self.apply_prompt(file.level.as_deref(), file.system)?;
        if file.temperature.is_some() {
            self.temperature = file.temperature;
        }
        if let Some(max_tokens) = file.max_tokens {
            self.max_tokens = max_tokens;
        }
        if file.base_url.is_some() {
            self.base_url = file.base_url;
        }
        if let Some(secs) = file.timeout_secs {
            self.timeout = Some(Duration::from_secs(secs));
        }
        if file.export_path.is_some() {
            self.export_path = file.export_path;
        }
        if file.no_color == Some(true) {
            self.use_color = false;
        }
        Ok(self)
    }

    fn apply_prompt(
        mut self,
        level: Option<&str>,
        system: Option<String>,
    ) -> std::result::Result<Self, ChatArgsError> {
        let level = level
            .map(parse_level)
            .transpose()
            .map_err(ChatArgsError::InvalidLevel)?;
        match (level, system) {
            (Some(Some(_)), Some(_)) => return Err(ChatArgsError::ConflictingPrompt),
            (_, Some(system)) => self = self.with_system_prompt(system),
            (Some(level), None) => self.difficulty = level,
            (None, None) => {}
        }
        Ok(self)
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ChatArgs> for ChatConfig {
    type Error = ChatArgsError;

    fn try_from(args: ChatArgs) -> std::result::Result<Self, Self::Error> {
        let mut config = ChatConfig::new();
        if let Some(path) = &args.config {
            config = config.apply_file(ChatConfigFile::from_file(path)?)?;
        }

        if let Some(model) = args.model {
            config.model = Model::from(model);
        }
        config = config.apply_prompt(args.level.as_deref(), args.system)?;
        if let Some(temperature) = args.temperature {
            let value = temperature
                .trim()
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or(ChatArgsError::InvalidTemperature(temperature))?;
            config.temperature = Some(value);
        }
        if let Some(max_tokens) = args.max_tokens {
            config.max_tokens = max_tokens;
        }
        if args.base_url.is_some() {
            config.base_url = args.base_url;
        }
        if let Some(path) = args.export_path {
            config.export_path = Some(PathBuf::from(path));
        }
        if args.no_color {
            config.use_color = false;
        }
        Ok(config)
    }
}

/// Resolves the settings for a difficulty level with every other value at its default.
///
/// The result depends on nothing but `level`.
pub fn resolve_configuration(level: Difficulty) -> SessionConfig {
    ChatConfig::new().with_difficulty(Some(level)).resolve()
}

/// Clamps a temperature into `[0, 2]`; NaN falls back to the default.
pub fn clamp_temperature(temperature: f32) -> f32 {
    if temperature.is_nan() {
        DEFAULT_TEMPERATURE
    } else {
        temperature.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE)
    }
}

/// Clamps a response token budget into `[100, 4000]`.
pub fn clamp_max_tokens(max_tokens: u32) -> u32 {
    max_tokens.clamp(MIN_MAX_TOKENS, MAX_MAX_TOKENS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KnownModel;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert_eq!(config.model, Model::Known(KnownModel::Gpt35Turbo));
        assert_eq!(config.difficulty, Some(Difficulty::Intermediate));
        assert_eq!(config.max_tokens, 1500);
        assert!(config.use_color);
        assert!(config.system_prompt.is_none());
        assert!(config.temperature.is_none());
        assert!(config.export_path.is_none());
        assert!(config.is_pinned());
    }

    #[test]
    fn difficulty_pins_prompt_and_temperature() {
        let config = ChatConfig::new()
            .with_difficulty(Some(Difficulty::Beginner))
            .with_temperature(Some(0.1));
        let resolved = config.resolve();
        assert_eq!(resolved.system_prompt, Difficulty::Beginner.system_prompt());
        assert_eq!(resolved.temperature, PINNED_TEMPERATURE);
        assert_eq!(resolved.max_response_tokens, 1500);
    }

    #[test]
    fn resolve_configuration_ignores_session_state() {
        let first = resolve_configuration(Difficulty::Beginner);
        let _ = resolve_configuration(Difficulty::Advanced);
        let second = resolve_configuration(Difficulty::Beginner);
        assert_eq!(first, second);
        assert_eq!(first.system_prompt, Difficulty::Beginner.system_prompt());
    }

    #[test]
    fn free_configuration_defaults() {
        let resolved = ChatConfig::free().resolve();
        assert_eq!(resolved.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(resolved.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(resolved.max_response_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(resolved.model, Model::default());
    }

    #[test]
    fn free_configuration_is_editable() {
        let resolved = ChatConfig::new()
            .with_system_prompt("Answer like a pirate.".to_string())
            .with_temperature(Some(0.3))
            .with_max_tokens(800)
            .with_model(KnownModel::Gpt4o.into())
            .resolve();
        assert_eq!(resolved.system_prompt, "Answer like a pirate.");
        assert_eq!(resolved.temperature, 0.3);
        assert_eq!(resolved.max_response_tokens, 800);
        assert_eq!(resolved.model, Model::Known(KnownModel::Gpt4o));
    }

    #[test]
    fn numbers_are_clamped() {
        let resolved = ChatConfig::free()
            .with_temperature(Some(7.5))
            .with_max_tokens(10)
            .resolve();
        assert_eq!(resolved.temperature, MAX_TEMPERATURE);
        assert_eq!(resolved.max_response_tokens, MIN_MAX_TOKENS);

        assert_eq!(clamp_temperature(-1.0), MIN_TEMPERATURE);
        assert_eq!(clamp_temperature(f32::NAN), DEFAULT_TEMPERATURE);
        assert_eq!(clamp_max_tokens(100_000), MAX_MAX_TOKENS);
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::try_from(ChatArgs::default()).unwrap();
        assert_eq!(config, ChatConfig::new());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            model: Some("gpt-4o-mini".to_string()),
            system: Some("You are helpful.".to_string()),
            temperature: Some("0.7".to_string()),
            max_tokens: Some(2000),
            no_color: true,
            ..ChatArgs::default()
        };
        let config = ChatConfig::try_from(args).unwrap();
        assert_eq!(config.model, Model::Known(KnownModel::Gpt4oMini));
        assert_eq!(config.difficulty, None);
        assert_eq!(config.system_prompt, Some("You are helpful.".to_string()));
        assert_eq!(config.temperature, Some(0.7));
        assert_eq!(config.max_tokens, 2000);
        assert!(!config.use_color);
    }

    #[test]
    fn config_from_args_level() {
        let args = ChatArgs {
            level: Some("advanced".to_string()),
            ..ChatArgs::default()
        };
        let config = ChatConfig::try_from(args).unwrap();
        assert_eq!(config.difficulty, Some(Difficulty::Advanced));

        let args = ChatArgs {
            level: Some("off".to_string()),
            ..ChatArgs::default()
        };
        let config = ChatConfig::try_from(args).unwrap();
        assert_eq!(config.difficulty, None);
    }

    #[test]
    fn config_from_args_errors() {
        let args = ChatArgs {
            level: Some("expert".to_string()),
            ..ChatArgs::default()
        };
        assert!(matches!(
            ChatConfig::try_from(args),
            Err(ChatArgsError::InvalidLevel(_))
        ));

        let args = ChatArgs {
            temperature: Some("warm".to_string()),
            ..ChatArgs::default()
        };
        assert!(matches!(
            ChatConfig::try_from(args),
            Err(ChatArgsError::InvalidTemperature(_))
        ));

        let args = ChatArgs {
            level: Some("beginner".to_string()),
            system: Some("Be terse.".to_string()),
            ..ChatArgs::default()
        };
        assert!(matches!(
            ChatConfig::try_from(args),
            Err(ChatArgsError::ConflictingPrompt)
        ));
    }

    #[test]
    fn config_file_is_applied_under_flags() {
        let file = ChatConfigFile::from_yaml_str(
            "model: gpt-4\nlevel: beginner\nmax_tokens: 900\ntimeout_secs: 5\nno_color: true\n",
        )
        .unwrap();
        let config = ChatConfig::new().apply_file(file).unwrap();
        assert_eq!(config.model, Model::Known(KnownModel::Gpt4));
        assert_eq!(config.difficulty, Some(Difficulty::Beginner));
        assert_eq!(config.max_tokens, 900);
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
        assert!(!config.use_color);
    }

    #[test]
    fn config_file_path_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sciquest.yaml");
        std::fs::write(&path, "level: off\nsystem: Be brief.\ntemperature: 0.2\n").unwrap();

        let args = ChatArgs {
            config: Some(path.to_string_lossy().into_owned()),
            max_tokens: Some(300),
            ..ChatArgs::default()
        };
        let config = ChatConfig::try_from(args).unwrap();
        assert_eq!(config.difficulty, None);
        assert_eq!(config.system_prompt, Some("Be brief.".to_string()));
        assert_eq!(config.temperature, Some(0.2));
        assert_eq!(config.max_tokens, 300);
    }

    #[test]
    fn config_file_rejects_unknown_fields() {
        let err = ChatConfigFile::from_yaml_str("colour: blue\n").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
