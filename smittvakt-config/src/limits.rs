//! Scan limit configuration parameters.
//!
//! Per-scan resource ceilings enforced by the scan engine at every state
//! transition. All values seed the settings registry; the registry remains
//! the authoritative runtime surface.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

/// Resource limits applied to every scan invocation.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct LimitsConfig {
    /// Maximum data scanned per top-level unit, container members included
    /// (bytes).
    #[serde(default = "default_max_scan_size")]
    pub max_scan_size: u64,

    /// Maximum size of one scanned unit (bytes).
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Maximum container recursion depth.
    #[validate(range(min = 0, max = 2048))]
    #[serde(default = "default_max_recursion")]
    pub max_recursion: u32,

    /// Maximum members visited inside one container tree.
    #[serde(default = "default_max_files")]
    pub max_files: u32,

    /// Wall-clock budget per scan unit in milliseconds; 0 disables the
    /// deadline.
    #[serde(default)]
    pub time_limit_ms: u64,

    /// Worker tasks for parallel directory scanning.
    #[validate(range(min = 1, max = 1024))]
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_max_scan_size() -> u64 {
    400 * 1024 * 1024
}

fn default_max_file_size() -> u64 {
    100 * 1024 * 1024
}

fn default_max_recursion() -> u32 {
    16
}

fn default_max_files() -> u32 {
    10_000
}

fn default_workers() -> usize {
    num_cpus::get()
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_scan_size: default_max_scan_size(),
            max_file_size: default_max_file_size(),
            max_recursion: default_max_recursion(),
            max_files: default_max_files(),
            time_limit_ms: 0,
            workers: default_workers(),
        }
    }
}
