pub mod validation;

use serde::{Deserialize, Serialize};

use self::validation::validate_config;

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Event-line decoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Also accept `data:` lines without the space after the colon.
    #[serde(default)]
    pub allow_data_without_space: bool,
    /// Send a single-space text part before the first standard tool call
    /// that follows visible text.
    #[serde(default = "default_true")]
    pub emit_flush_hint: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            allow_data_without_space: false,
            emit_flush_hint: true,
        }
    }
}

/// Sentinel markers for tool calls embedded in text content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineToolCallConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_call_begin")]
    pub call_begin: String,
    #[serde(default = "default_argument_begin")]
    pub argument_begin: String,
    #[serde(default = "default_call_end")]
    pub call_end: String,
    /// Wrapper tokens that are stripped from visible text wherever they occur.
    #[serde(default = "default_stray_markers")]
    pub stray_markers: Vec<String>,
    /// Namespace removed from the front of a call header, if present.
    #[serde(default = "default_namespace_prefix")]
    pub namespace_prefix: String,
}

fn default_true() -> bool {
    true
}
fn default_call_begin() -> String {
    "<|tool_call_begin|>".to_string()
}
fn default_argument_begin() -> String {
    "<|tool_call_argument_begin|>".to_string()
}
fn default_call_end() -> String {
    "<|tool_call_end|>".to_string()
}
fn default_stray_markers() -> Vec<String> {
    vec![
        "<|tool_calls_section_begin|>".to_string(),
        "<|tool_calls_section_end|>".to_string(),
    ]
}
fn default_namespace_prefix() -> String {
    "functions.".to_string()
}

impl Default for InlineToolCallConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            call_begin: default_call_begin(),
            argument_begin: default_argument_begin(),
            call_end: default_call_end(),
            stray_markers: default_stray_markers(),
            namespace_prefix: default_namespace_prefix(),
        }
    }
}

/// Feature flags and settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "INFO".to_string()
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub decoder: DecoderConfig,
    #[serde(default)]
    pub inline_tool_calls: InlineToolCallConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
}

/// Load configuration from a YAML file and validate it.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when reading the file fails, [`ConfigError::Yaml`]
/// when parsing fails, or [`ConfigError::Validation`] when semantic validation fails.
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse and validate configuration from YAML text.
///
/// # Errors
///
/// Returns [`ConfigError::Yaml`] when parsing fails or
/// [`ConfigError::Validation`] when semantic validation fails.
pub fn parse_config(yaml: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_yaml::from_str(yaml)?;
    validate_config(&config)?;
    Ok(config)
}
