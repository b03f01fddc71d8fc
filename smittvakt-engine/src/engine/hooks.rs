//! Pre-scan and post-scan hook points.
//!
//! Hooks let the embedding application whitelist or blacklist a unit
//! independently of signature matching. The pre-scan hook may short-circuit
//! before the matcher runs; the post-scan hook may override the computed
//! verdict.

use std::path::Path;

use crate::verdict::ScanVerdict;

/// The unit a hook is consulted about.
#[derive(Debug, Clone, Copy)]
pub struct ScanUnit<'a> {
    pub data: &'a [u8],
    /// Container recursion depth; 0 for the top-level unit.
    pub depth: u32,
    /// Path of the top-level unit, when scanning came from a file.
    pub origin: Option<&'a Path>,
}

/// Hook outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookDecision {
    /// Proceed with the normal pipeline.
    Continue,
    /// Whitelist: the unit is Clean.
    Clean,
    /// Blacklist: the unit is Infected with the given detection name.
    Infected(String),
}

/// Caller-supplied override points. Both default to no-ops.
pub trait ScanHooks: Send + Sync {
    fn pre_scan(&self, _unit: &ScanUnit<'_>) -> HookDecision {
        HookDecision::Continue
    }

    fn post_scan(&self, _unit: &ScanUnit<'_>, _verdict: &ScanVerdict) -> HookDecision {
        HookDecision::Continue
    }
}
