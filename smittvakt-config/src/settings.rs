//! Engine settings registry.
//!
//! A typed key/value store over a closed enumeration of engine-wide
//! tunables. Numeric and string keys are separate enumerations; every key
//! carries a default and a legal range, and setters validate on write.
//! Values are consulted by the matcher compiler and the scan engine at the
//! next compile/scan boundary only — a running scan keeps the snapshot it
//! started with.
//!
//! The scan pipeline currently consults the size/recursion/file-count/time
//! limits, the cache toggle, the trie depth bounds, and the matcher memory
//! ceiling. The remaining keys are carried for engine API parity and are
//! validated and round-tripped identically.

use std::collections::HashMap;

use crate::error::SettingError;
use crate::validation;

/// Numeric engine settings. Units are given per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumField {
    /// Maximum amount of data scanned per top-level unit, including expanded
    /// container members (bytes).
    MaxScanSize,
    /// Maximum size of a single scanned unit (bytes).
    MaxFileSize,
    /// Maximum container recursion depth (levels).
    MaxRecursion,
    /// Maximum number of members visited inside one container tree (count).
    MaxFiles,
    /// Minimum count of credit card numbers to trigger a detection (count).
    MinCcCount,
    /// Minimum count of SSNs to trigger a detection (count).
    MinSsnCount,
    /// Only use the Aho-Corasick matcher (boolean).
    AcOnly,
    /// Minimum trie depth for the Aho-Corasick matcher (levels).
    AcMinDepth,
    /// Maximum trie depth for the Aho-Corasick matcher (levels).
    AcMaxDepth,
    /// Keep temporary files instead of deleting them (boolean).
    KeepTempFiles,
    /// Bytecode trust policy: 0 trust all, 1 trust signed, 2 trust nothing.
    BytecodeSecurity,
    /// Bytecode execution timeout (milliseconds).
    BytecodeTimeout,
    /// Bytecode mode: 0 auto, 1 JIT, 2 interpreter, 3 test, 4 off.
    BytecodeMode,
    /// Maximum size of a file checked for an embedded PE (bytes).
    MaxEmbeddedPe,
    /// Maximum size of an HTML file to normalize (bytes).
    MaxHtmlNormalize,
    /// Maximum size of a normalized HTML file to scan (bytes).
    MaxHtmlNoTags,
    /// Maximum size of a script file to normalize (bytes).
    MaxScriptNormalize,
    /// Maximum size of a zip to type-reanalyze (bytes).
    MaxZipTypeRcg,
    /// Dump memory and nested scans to disk before scanning (boolean).
    ForceToDisk,
    /// Disable the clean-file cache (boolean).
    DisableCache,
    /// Statistics submission timeout (seconds).
    StatsTimeout,
    /// Maximum raw disk image partitions scanned (count).
    MaxPartitions,
    /// Maximum icons scanned within a PE (count).
    MaxIconsPe,
    /// Maximum recursive HWP3 parsing calls (count).
    MaxRecHwp3,
    /// Wall-clock budget per scan unit; 0 means unlimited (milliseconds).
    TimeLimit,
    /// Maximum PCRE match calls per regex instance (count).
    PcreMatchLimit,
    /// Maximum recursive PCRE match calls per regex instance (count).
    PcreRecMatchLimit,
    /// Maximum file size fed to PCRE matching (bytes).
    PcreMaxFilesize,
    /// Matcher compilation memory ceiling; 0 means unlimited (bytes).
    MaxMatcherMemory,
}

/// String engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrField {
    /// Comma-separated PUA categories to report; empty means all.
    PuaCategories,
    /// Directory for temporary files; must not be empty.
    TempDir,
}

const MIB: u64 = 1024 * 1024;

impl NumField {
    pub const ALL: [NumField; 29] = [
        NumField::MaxScanSize,
        NumField::MaxFileSize,
        NumField::MaxRecursion,
        NumField::MaxFiles,
        NumField::MinCcCount,
        NumField::MinSsnCount,
        NumField::AcOnly,
        NumField::AcMinDepth,
        NumField::AcMaxDepth,
        NumField::KeepTempFiles,
        NumField::BytecodeSecurity,
        NumField::BytecodeTimeout,
        NumField::BytecodeMode,
        NumField::MaxEmbeddedPe,
        NumField::MaxHtmlNormalize,
        NumField::MaxHtmlNoTags,
        NumField::MaxScriptNormalize,
        NumField::MaxZipTypeRcg,
        NumField::ForceToDisk,
        NumField::DisableCache,
        NumField::StatsTimeout,
        NumField::MaxPartitions,
        NumField::MaxIconsPe,
        NumField::MaxRecHwp3,
        NumField::TimeLimit,
        NumField::PcreMatchLimit,
        NumField::PcreRecMatchLimit,
        NumField::PcreMaxFilesize,
        NumField::MaxMatcherMemory,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NumField::MaxScanSize => "max_scan_size",
            NumField::MaxFileSize => "max_file_size",
            NumField::MaxRecursion => "max_recursion",
            NumField::MaxFiles => "max_files",
            NumField::MinCcCount => "min_cc_count",
            NumField::MinSsnCount => "min_ssn_count",
            NumField::AcOnly => "ac_only",
            NumField::AcMinDepth => "ac_min_depth",
            NumField::AcMaxDepth => "ac_max_depth",
            NumField::KeepTempFiles => "keep_temp_files",
            NumField::BytecodeSecurity => "bytecode_security",
            NumField::BytecodeTimeout => "bytecode_timeout",
            NumField::BytecodeMode => "bytecode_mode",
            NumField::MaxEmbeddedPe => "max_embedded_pe",
            NumField::MaxHtmlNormalize => "max_html_normalize",
            NumField::MaxHtmlNoTags => "max_html_no_tags",
            NumField::MaxScriptNormalize => "max_script_normalize",
            NumField::MaxZipTypeRcg => "max_zip_type_rcg",
            NumField::ForceToDisk => "force_to_disk",
            NumField::DisableCache => "disable_cache",
            NumField::StatsTimeout => "stats_timeout",
            NumField::MaxPartitions => "max_partitions",
            NumField::MaxIconsPe => "max_icons_pe",
            NumField::MaxRecHwp3 => "max_rec_hwp3",
            NumField::TimeLimit => "time_limit",
            NumField::PcreMatchLimit => "pcre_match_limit",
            NumField::PcreRecMatchLimit => "pcre_rec_match_limit",
            NumField::PcreMaxFilesize => "pcre_max_filesize",
            NumField::MaxMatcherMemory => "max_matcher_memory",
        }
    }

    pub fn from_name(name: &str) -> Option<NumField> {
        NumField::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn default_value(self) -> u64 {
        match self {
            NumField::MaxScanSize => 400 * MIB,
            NumField::MaxFileSize => 100 * MIB,
            NumField::MaxRecursion => 16,
            NumField::MaxFiles => 10_000,
            NumField::MinCcCount => 3,
            NumField::MinSsnCount => 3,
            NumField::AcOnly => 0,
            NumField::AcMinDepth => 2,
            NumField::AcMaxDepth => 3,
            NumField::KeepTempFiles => 0,
            NumField::BytecodeSecurity => 1,
            NumField::BytecodeTimeout => 5_000,
            NumField::BytecodeMode => 0,
            NumField::MaxEmbeddedPe => 10 * MIB,
            NumField::MaxHtmlNormalize => 10 * MIB,
            NumField::MaxHtmlNoTags => 2 * MIB,
            NumField::MaxScriptNormalize => 5 * MIB,
            NumField::MaxZipTypeRcg => MIB,
            NumField::ForceToDisk => 0,
            NumField::DisableCache => 0,
            NumField::StatsTimeout => 10,
            NumField::MaxPartitions => 50,
            NumField::MaxIconsPe => 100,
            NumField::MaxRecHwp3 => 16,
            NumField::TimeLimit => 0,
            NumField::PcreMatchLimit => 100_000,
            NumField::PcreRecMatchLimit => 2_000,
            NumField::PcreMaxFilesize => 100 * MIB,
            NumField::MaxMatcherMemory => 256 * MIB,
        }
    }

    /// Inclusive legal range for the key.
    pub fn range(self) -> (u64, u64) {
        match self {
            NumField::AcOnly
            | NumField::KeepTempFiles
            | NumField::ForceToDisk
            | NumField::DisableCache => (0, 1),
            NumField::BytecodeSecurity => (0, 2),
            NumField::BytecodeMode => (0, 4),
            NumField::AcMinDepth | NumField::AcMaxDepth => (1, 64),
            NumField::MaxRecursion | NumField::MaxRecHwp3 => (0, 2_048),
            NumField::MinCcCount | NumField::MinSsnCount => (0, 1_024),
            NumField::BytecodeTimeout => (0, 3_600_000),
            NumField::StatsTimeout => (0, 86_400),
            NumField::MaxPartitions | NumField::MaxIconsPe => (0, 10_000),
            _ => (0, u64::MAX),
        }
    }
}

impl StrField {
    pub const ALL: [StrField; 2] = [StrField::PuaCategories, StrField::TempDir];

    pub fn name(self) -> &'static str {
        match self {
            StrField::PuaCategories => "pua_categories",
            StrField::TempDir => "temp_dir",
        }
    }

    pub fn from_name(name: &str) -> Option<StrField> {
        StrField::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn default_value(self) -> &'static str {
        match self {
            StrField::PuaCategories => "",
            StrField::TempDir => "/tmp",
        }
    }
}

/// Typed engine settings store, populated with defaults on construction.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    nums: HashMap<NumField, u64>,
    strs: HashMap<StrField, String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineSettings {
    pub fn new() -> Self {
        let nums = NumField::ALL
            .into_iter()
            .map(|f| (f, f.default_value()))
            .collect();
        let strs = StrField::ALL
            .into_iter()
            .map(|f| (f, f.default_value().to_string()))
            .collect();
        Self { nums, strs }
    }

    pub fn get_num(&self, field: NumField) -> u64 {
        self.nums[&field]
    }

    /// Set a numeric value. Negative values and values outside the key's
    /// legal range are rejected with `InvalidSetting`.
    pub fn set_num(&mut self, field: NumField, value: i64) -> Result<(), SettingError> {
        let (min, max) = field.range();
        let unsigned = u64::try_from(value).map_err(|_| SettingError::InvalidSetting {
            field: field.name().to_string(),
            detail: format!("{value} is negative"),
        })?;
        if unsigned < min || unsigned > max {
            return Err(SettingError::InvalidSetting {
                field: field.name().to_string(),
                detail: format!("{unsigned} outside legal range {min}..={max}"),
            });
        }
        self.nums.insert(field, unsigned);
        Ok(())
    }

    pub fn get_str(&self, field: StrField) -> &str {
        &self.strs[&field]
    }

    pub fn set_str(&mut self, field: StrField, value: &str) -> Result<(), SettingError> {
        match field {
            StrField::TempDir if value.is_empty() => {
                return Err(SettingError::InvalidSetting {
                    field: field.name().to_string(),
                    detail: "temporary directory path must not be empty".to_string(),
                });
            }
            StrField::PuaCategories => {
                validation::validate_pua_categories(value).map_err(|_| {
                    SettingError::InvalidSetting {
                        field: field.name().to_string(),
                        detail: format!("'{value}' is not a valid category list"),
                    }
                })?;
            }
            _ => {}
        }
        self.strs.insert(field, value.to_string());
        Ok(())
    }

    /// Set a numeric key by its string name; unknown names are `Unsupported`.
    pub fn set_num_by_name(&mut self, name: &str, value: i64) -> Result<(), SettingError> {
        let field = NumField::from_name(name).ok_or_else(|| SettingError::Unsupported {
            field: name.to_string(),
        })?;
        self.set_num(field, value)
    }

    /// Apply named numeric overrides (e.g. from a configuration file),
    /// stopping at the first rejected key.
    pub fn apply_overrides<'a, I>(&mut self, overrides: I) -> Result<(), SettingError>
    where
        I: IntoIterator<Item = (&'a str, i64)>,
    {
        for (name, value) in overrides {
            self.set_num_by_name(name, value)?;
        }
        Ok(())
    }
}
