//! Database source loading.
//!
//! A source is either a single `.sdb` file or a directory whose `.sdb`
//! files are loaded in lexicographic order (non-recursive). Category
//! admission is controlled by [`LoadOptions`]; malformed records fail the
//! load loudly instead of being skipped.

use std::fs;
use std::path::{Path, PathBuf};

use bitflags::bitflags;
use tracing::{debug, info};

use super::{parse, Category, Signature};
use crate::error::LoadError;

bitflags! {
    /// Options filtering which signature categories a load admits.
    ///
    /// Two aliases are intentional and kept for parity with the historic
    /// flag surface: `INCLUDE_PUA` names the same bit as `PUA`, and
    /// `STANDARD` is the recommended composite of phishing and bytecode
    /// admission (the standard category itself is always admitted).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LoadOptions: u32 {
        /// Load phishing signatures.
        const PHISHING_SIGNATURES = 1 << 1;
        /// Load phishing URL databases.
        const PHISHING_URLS = 1 << 2;
        /// Load signatures for potentially unwanted applications.
        const PUA = 1 << 3;
        /// Only admit records from officially published database files.
        const OFFICIAL_ONLY = 1 << 4;
        /// Load bytecode signatures.
        const BYTECODE = 1 << 5;
        /// Load bytecode signatures lacking a publisher signature.
        const UNSIGNED_BYTECODE = 1 << 6;
        /// Drop PUA signatures even when another flag would admit them.
        const EXCLUDE_PUA = 1 << 8;
        /// Alias of `PUA`.
        const INCLUDE_PUA = Self::PUA.bits();
        /// Recommended composite set.
        const STANDARD = Self::PHISHING_SIGNATURES.bits()
            | Self::PHISHING_URLS.bits()
            | Self::BYTECODE.bits();
    }
}

impl LoadOptions {
    /// Resolve configuration-style option names into a flag set.
    pub fn from_names<I, S>(names: I) -> Result<LoadOptions, LoadError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut options = LoadOptions::empty();
        for name in names {
            options |= match name.as_ref() {
                "standard" => LoadOptions::STANDARD,
                "phishing-signatures" => LoadOptions::PHISHING_SIGNATURES,
                "phishing-urls" => LoadOptions::PHISHING_URLS,
                "pua" => LoadOptions::PUA,
                "include-pua" => LoadOptions::INCLUDE_PUA,
                "exclude-pua" => LoadOptions::EXCLUDE_PUA,
                "official-only" => LoadOptions::OFFICIAL_ONLY,
                "bytecode" => LoadOptions::BYTECODE,
                "unsigned-bytecode" => LoadOptions::UNSIGNED_BYTECODE,
                other => {
                    return Err(LoadError::Unsupported(format!(
                        "unknown load option '{other}'"
                    )))
                }
            };
        }
        Ok(options)
    }

    /// Whether a signature of `category` is admitted under these options.
    pub fn admits(self, category: Category) -> bool {
        match category {
            Category::Standard => true,
            Category::Phishing => {
                self.intersects(LoadOptions::PHISHING_SIGNATURES | LoadOptions::PHISHING_URLS)
            }
            Category::Pua => {
                self.contains(LoadOptions::PUA) && !self.contains(LoadOptions::EXCLUDE_PUA)
            }
            Category::Bytecode => {
                self.intersects(LoadOptions::BYTECODE | LoadOptions::UNSIGNED_BYTECODE)
            }
        }
    }
}

/// Result of one load operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Database files read.
    pub files: usize,
    /// Records appended to the store.
    pub admitted: usize,
    /// Records filtered out by category or provenance.
    pub skipped: usize,
}

impl LoadSummary {
    fn merge(&mut self, other: LoadSummary) {
        self.files += other.files;
        self.admitted += other.admitted;
        self.skipped += other.skipped;
    }
}

const DB_EXTENSION: &str = "sdb";

/// Header marker declaring a file officially published.
const OFFICIAL_MARKER: &str = "#@ official";

pub(crate) fn load_source(
    signatures: &mut Vec<Signature>,
    path: &Path,
    options: LoadOptions,
) -> Result<LoadSummary, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }

    let metadata = fs::metadata(path)?;
    let summary = if metadata.is_dir() {
        load_directory(signatures, path, options)?
    } else {
        load_file(signatures, path, options)?
    };

    info!(
        source = %path.display(),
        files = summary.files,
        admitted = summary.admitted,
        skipped = summary.skipped,
        "Database load complete"
    );
    Ok(summary)
}

fn load_directory(
    signatures: &mut Vec<Signature>,
    dir: &Path,
    options: LoadOptions,
) -> Result<LoadSummary, LoadError> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(DB_EXTENSION)
        })
        .collect();
    files.sort();

    let mut summary = LoadSummary::default();
    for file in files {
        summary.merge(load_file(signatures, &file, options)?);
    }
    Ok(summary)
}

fn load_file(
    signatures: &mut Vec<Signature>,
    file: &Path,
    options: LoadOptions,
) -> Result<LoadSummary, LoadError> {
    if file.extension().and_then(|e| e.to_str()) != Some(DB_EXTENSION) {
        return Err(LoadError::Unsupported(format!(
            "{} is not a .{DB_EXTENSION} database",
            file.display()
        )));
    }

    let content = fs::read_to_string(file)?;
    let official = content.lines().any(|line| line.trim() == OFFICIAL_MARKER);
    let file_admitted = official || !options.contains(LoadOptions::OFFICIAL_ONLY);

    let mut summary = LoadSummary {
        files: 1,
        ..Default::default()
    };

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Malformed records fail the load even when the record would have
        // been filtered out; a bad database is never silently skipped.
        let signature =
            parse::parse_record(line, official).map_err(|source| LoadError::MalformedDatabase {
                file: file.to_path_buf(),
                line: index + 1,
                source,
            })?;

        if file_admitted && options.admits(signature.category()) {
            signatures.push(signature);
            summary.admitted += 1;
        } else {
            summary.skipped += 1;
        }
    }

    debug!(
        file = %file.display(),
        official,
        admitted = summary.admitted,
        skipped = summary.skipped,
        "Loaded database file"
    );
    Ok(summary)
}
