//! Error types for configuration loading, validation, and the settings
//! registry.

use std::path::PathBuf;
use thiserror::Error;
use validator::ValidationErrors;

/// Unified configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File not found error.
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// Configuration validation error.
    #[error("Invalid configuration:\n{}", format_validation_errors(.0))]
    Validation(#[source] ValidationErrors),

    /// Figment parsing error.
    #[error("Configuration parsing error: {0}")]
    Parsing(#[from] figment::Error),

    /// Settings override rejected by the registry.
    #[error(transparent)]
    Setting(#[from] SettingError),

    /// I/O error.
    #[error("Configuration I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error raised by the typed settings registry.
///
/// Every variant maps to a stable numeric code surfaced alongside the
/// message, so callers never have to consult a side table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingError {
    /// Value outside the legal range (or malformed) for the key.
    #[error("invalid value for setting '{field}': {detail}")]
    InvalidSetting { field: String, detail: String },

    /// The key does not exist in the closed setting enumeration.
    #[error("setting '{field}' is not supported")]
    Unsupported { field: String },
}

impl SettingError {
    pub fn code(&self) -> u32 {
        match self {
            SettingError::InvalidSetting { .. } => 40,
            SettingError::Unsupported { .. } => 41,
        }
    }
}

fn format_validation_errors(errors: &ValidationErrors) -> String {
    use std::fmt::Write;

    let mut output = String::new();
    for (field, errors) in errors.field_errors() {
        let _ = writeln!(output, "Field '{}':", field);
        for error in errors {
            let message = match &error.message {
                Some(msg) => msg.to_string(),
                None => error.code.to_string(),
            };
            let _ = writeln!(output, "  - {}", message);
        }
    }
    output
}

impl From<ValidationErrors> for ConfigError {
    fn from(errors: ValidationErrors) -> Self {
        ConfigError::Validation(errors)
    }
}
