//! Signature database configuration parameters.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

/// Database source location and default load options.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct DatabaseConfig {
    /// Well-known database directory used when no path is given to a load
    /// operation.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// Named load options applied by default (see the detection crate's
    /// `LoadOptions` for the accepted names).
    #[validate(length(min = 1))]
    #[serde(default = "default_options")]
    pub options: Vec<String>,
}

fn default_directory() -> PathBuf {
    PathBuf::from("/var/lib/smittvakt/db")
}

fn default_options() -> Vec<String> {
    vec!["standard".to_string()]
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            options: default_options(),
        }
    }
}
