//! Scan-level errors and the engine-wide error-string table.
//!
//! Every error in the workspace taxonomy carries a stable numeric code;
//! [`strerror`] maps any code back to its description so callers can always
//! show code plus message without a side lookup table.

use std::path::PathBuf;

use thiserror::Error;

use smittvakt_config::SettingError;
use smittvakt_detection::{CompileError, LoadError};

/// Which resource limit a scan exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    MaxScanSize,
    MaxFileSize,
    MaxRecursion,
    MaxFiles,
    Timeout,
}

impl LimitKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LimitKind::MaxScanSize => "max scan size",
            LimitKind::MaxFileSize => "max file size",
            LimitKind::MaxRecursion => "max recursion",
            LimitKind::MaxFiles => "max files",
            LimitKind::Timeout => "time limit",
        }
    }
}

/// Errors tied to one scan unit or invocation. Kept cloneable so verdict
/// records can carry them through result streams.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("access denied: {path}")]
    AccessDenied { path: PathBuf },

    #[error("I/O error on {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("resource limit exceeded: {}", .0.as_str())]
    ResourceLimitExceeded(LimitKind),

    #[error("engine fault: {0}")]
    EngineFault(String),
}

impl ScanError {
    pub(crate) fn from_io(path: &std::path::Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => ScanError::NotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => ScanError::AccessDenied {
                path: path.to_path_buf(),
            },
            _ => ScanError::Io {
                path: path.to_path_buf(),
                message: error.to_string(),
            },
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            ScanError::NotFound { .. } => 10,
            ScanError::AccessDenied { .. } => 11,
            ScanError::Io { .. } => 12,
            ScanError::ResourceLimitExceeded(kind) => match kind {
                LimitKind::MaxScanSize => 30,
                LimitKind::MaxFileSize => 31,
                LimitKind::MaxRecursion => 32,
                LimitKind::MaxFiles => 33,
                LimitKind::Timeout => 34,
            },
            ScanError::EngineFault(_) => 50,
        }
    }
}

/// Top-level error for engine operations spanning load, compile, scan, and
/// settings concerns.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Setting(#[from] SettingError),
}

impl EngineError {
    pub fn code(&self) -> u32 {
        match self {
            EngineError::Load(e) => e.code(),
            EngineError::Compile(e) => e.code(),
            EngineError::Scan(e) => e.code(),
            EngineError::Setting(e) => e.code(),
        }
    }
}

/// Description for a stable error code. The table covers the whole
/// workspace taxonomy.
pub fn strerror(code: u32) -> &'static str {
    match code {
        0 => "no error",
        1 => "detection",
        10 => "file or directory not found",
        11 => "access denied",
        12 => "I/O error",
        20 => "malformed database",
        21 => "unsupported database source",
        22 => "empty database",
        23 => "matcher memory ceiling exceeded",
        30 => "max scan size exceeded",
        31 => "max file size exceeded",
        32 => "max recursion exceeded",
        33 => "max files exceeded",
        34 => "scan time limit exceeded",
        40 => "invalid setting value",
        41 => "unsupported setting",
        50 => "engine fault",
        _ => "unknown error code",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_strerror() {
        let samples: Vec<(u32, &str)> = vec![
            (
                ScanError::NotFound {
                    path: PathBuf::from("/x"),
                }
                .code(),
                "file or directory not found",
            ),
            (
                ScanError::ResourceLimitExceeded(LimitKind::Timeout).code(),
                "scan time limit exceeded",
            ),
            (CompileError::EmptyDatabase.code(), "empty database"),
            (
                LoadError::NotFound(PathBuf::from("/db")).code(),
                "file or directory not found",
            ),
            (
                SettingError::Unsupported {
                    field: "x".to_string(),
                }
                .code(),
                "unsupported setting",
            ),
        ];
        for (code, description) in samples {
            assert_eq!(strerror(code), description);
        }
    }

    #[test]
    fn io_errors_map_distinctly() {
        let path = std::path::Path::new("/nope");
        let not_found = ScanError::from_io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(matches!(not_found, ScanError::NotFound { .. }));

        let denied = ScanError::from_io(
            path,
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(denied, ScanError::AccessDenied { .. }));
        assert_ne!(not_found.code(), denied.code());
    }
}
