//! Error types for database loading and matcher compilation.
//!
//! Every variant maps to a stable numeric code; the scan engine's
//! `strerror` table covers the full taxonomy.

use std::path::PathBuf;
use thiserror::Error;

use crate::signatures::parse::ParseError;

/// Errors raised while loading a signature database source.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The source path does not exist.
    #[error("database source not found: {0}")]
    NotFound(PathBuf),

    /// A record could not be parsed. Loading stops at the first bad record;
    /// nothing from the failing file is admitted.
    #[error("malformed database {file} (line {line}): {source}")]
    MalformedDatabase {
        file: PathBuf,
        line: usize,
        #[source]
        source: ParseError,
    },

    /// The source is not a recognized database format or option.
    #[error("unsupported database source: {0}")]
    Unsupported(String),

    /// I/O failure while reading the source.
    #[error("database I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoadError {
    pub fn code(&self) -> u32 {
        match self {
            LoadError::NotFound(_) => 10,
            LoadError::MalformedDatabase { .. } => 20,
            LoadError::Unsupported(_) => 21,
            LoadError::Io(_) => 12,
        }
    }
}

/// Errors raised while compiling a frozen store into a matcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// Zero signatures were admitted into the store.
    #[error("cannot compile an empty signature database")]
    EmptyDatabase,

    /// Trie construction would exceed the configured memory ceiling.
    #[error("matcher construction needs {needed} bytes, ceiling is {ceiling}")]
    ResourceExhausted { needed: u64, ceiling: u64 },
}

impl CompileError {
    pub fn code(&self) -> u32 {
        match self {
            CompileError::EmptyDatabase => 22,
            CompileError::ResourceExhausted { .. } => 23,
        }
    }
}
