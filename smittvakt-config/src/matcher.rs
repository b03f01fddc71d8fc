//! Matcher compiler configuration parameters.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

/// Aho-Corasick compiler tunables.
///
/// Trie depth trades memory for match speed: shallower tries consume less
/// memory but produce more candidate verification work per scanned byte.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
#[validate(schema(function = validation::validate_depth_order))]
pub struct MatcherConfig {
    /// Preferred minimum trie depth.
    #[validate(range(min = 1, max = 64))]
    #[serde(default = "default_min_depth")]
    pub ac_min_depth: u32,

    /// Maximum trie depth.
    #[validate(range(min = 1, max = 64))]
    #[serde(default = "default_max_depth")]
    pub ac_max_depth: u32,

    /// Use only the Aho-Corasick matcher.
    #[serde(default = "default_true")]
    pub ac_only: bool,

    /// Compilation memory ceiling in bytes; 0 disables the ceiling.
    #[serde(default = "default_max_memory")]
    pub max_matcher_memory: u64,
}

fn default_min_depth() -> u32 {
    2
}

fn default_max_depth() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_max_memory() -> u64 {
    256 * 1024 * 1024
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            ac_min_depth: default_min_depth(),
            ac_max_depth: default_max_depth(),
            ac_only: default_true(),
            max_matcher_memory: default_max_memory(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn unordered_depths_fail_validation() {
        let config = MatcherConfig {
            ac_min_depth: 8,
            ac_max_depth: 3,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
