use std::collections::HashSet;

use super::{AppConfig, ConfigError, InlineToolCallConfig};

/// Validate the full configuration, returning an error if any rule is violated.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when any configuration invariant is violated.
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    validate_inline_markers(&config.inline_tool_calls)?;
    validate_log_level(config)?;
    Ok(())
}

fn validation_err(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

fn validate_inline_markers(inline: &InlineToolCallConfig) -> Result<(), ConfigError> {
    let call_markers = [
        ("inline_tool_calls.call_begin", inline.call_begin.as_str()),
        (
            "inline_tool_calls.argument_begin",
            inline.argument_begin.as_str(),
        ),
        ("inline_tool_calls.call_end", inline.call_end.as_str()),
    ];

    let mut seen: HashSet<&str> = HashSet::with_capacity(call_markers.len());
    for (field, marker) in call_markers {
        if marker.is_empty() {
            return Err(validation_err(format!("{field} cannot be empty")));
        }
        if !seen.insert(marker) {
            return Err(validation_err(format!(
                "{field} '{marker}' duplicates another call marker"
            )));
        }
    }

    for marker in &inline.stray_markers {
        if marker.is_empty() {
            return Err(validation_err(
                "inline_tool_calls.stray_markers contains an empty marker",
            ));
        }
        if !seen.insert(marker.as_str()) {
            return Err(validation_err(format!(
                "inline_tool_calls.stray_markers entry '{marker}' is listed twice or duplicates a call marker"
            )));
        }
    }
    Ok(())
}

const VALID_LOG_LEVELS: &[&str] = &[
    "DEBUG", "INFO", "WARNING", "WARN", "ERROR", "CRITICAL", "DISABLED",
];

fn validate_log_level(config: &AppConfig) -> Result<(), ConfigError> {
    let level = config.features.log_level.to_uppercase();
    if !VALID_LOG_LEVELS.contains(&level.as_str()) {
        return Err(validation_err(format!(
            "features.log_level '{}' must be one of {}",
            config.features.log_level,
            VALID_LOG_LEVELS.join(", ")
        )));
    }
    Ok(())
}
