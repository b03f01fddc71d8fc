//! # Smittvakt Configuration System
//!
//! Hierarchical configuration management for the Smittvakt scan engine.
//!
//! ## Features
//! - **Unified Configuration**: Single source of truth across all components
//! - **Validation**: Runtime validation of critical parameters on load
//! - **Environment Awareness**: `SMITTVAKT_*` variables override file values
//! - **Typed Settings Registry**: closed-key numeric/string tunables with
//!   per-key defaults and legal ranges

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod database;
mod error;
mod limits;
mod matcher;
mod settings;
mod telemetry;
mod validation;

pub use database::DatabaseConfig;
pub use error::ConfigError;
pub use error::SettingError;
pub use limits::LimitsConfig;
pub use matcher::MatcherConfig;
pub use settings::EngineSettings;
pub use settings::NumField;
pub use settings::StrField;
pub use telemetry::TelemetryConfig;

/// Top-level configuration container for all Smittvakt components.
#[derive(Debug, Serialize, Deserialize, Validate, Default)]
pub struct SmittvaktConfig {
    /// Signature database location and default load options.
    #[validate(nested)]
    pub database: DatabaseConfig,

    /// Per-scan resource limits.
    #[validate(nested)]
    pub limits: LimitsConfig,

    /// Matcher compiler tunables.
    #[validate(nested)]
    pub matcher: MatcherConfig,

    /// Telemetry and observability configuration.
    #[validate(nested)]
    pub telemetry: TelemetryConfig,

    /// Raw numeric overrides applied to the settings registry after the
    /// structured sections, keyed by registry name.
    #[serde(default)]
    pub settings: HashMap<String, i64>,
}

impl SmittvaktConfig {
    /// Load configuration from default files and environment.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/smittvakt.yaml` - base settings. If missing, defaults are
    ///    used.
    /// 3. `SMITTVAKT_*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(SmittvaktConfig::default()));

        if Path::new("config/smittvakt.yaml").exists() {
            figment = figment.merge(Yaml::file("config/smittvakt.yaml"));
        }

        figment
            .merge(Env::prefixed("SMITTVAKT_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }

    /// Load configuration from a specific path for testing/validation.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(
                path.to_string_lossy().to_string(),
            )));
        }

        Figment::from(Serialized::defaults(SmittvaktConfig::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("SMITTVAKT_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }

    /// Build a settings registry seeded from the structured sections, then
    /// apply the raw `settings` overrides.
    pub fn engine_settings(&self) -> Result<EngineSettings, SettingError> {
        let mut settings = EngineSettings::new();

        settings.set_num(NumField::MaxScanSize, as_setting(self.limits.max_scan_size)?)?;
        settings.set_num(NumField::MaxFileSize, as_setting(self.limits.max_file_size)?)?;
        settings.set_num(NumField::MaxRecursion, i64::from(self.limits.max_recursion))?;
        settings.set_num(NumField::MaxFiles, i64::from(self.limits.max_files))?;
        settings.set_num(NumField::TimeLimit, as_setting(self.limits.time_limit_ms)?)?;
        settings.set_num(NumField::AcMinDepth, i64::from(self.matcher.ac_min_depth))?;
        settings.set_num(NumField::AcMaxDepth, i64::from(self.matcher.ac_max_depth))?;
        settings.set_num(NumField::AcOnly, i64::from(u8::from(self.matcher.ac_only)))?;
        settings.set_num(
            NumField::MaxMatcherMemory,
            as_setting(self.matcher.max_matcher_memory)?,
        )?;

        settings.apply_overrides(self.settings.iter().map(|(k, v)| (k.as_str(), *v)))?;
        Ok(settings)
    }
}

fn as_setting(value: u64) -> Result<i64, SettingError> {
    i64::try_from(value).map_err(|_| SettingError::InvalidSetting {
        field: "<config>".to_string(),
        detail: format!("{value} exceeds the settable maximum"),
    })
}
