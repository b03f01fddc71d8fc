//! Per-invocation scan state.
//!
//! A [`ScanContext`] is created at the start of one `scan_file`/`scan_bytes`
//! call, owned exclusively by that call tree (container members included),
//! and dropped at its completion. Limits are snapshotted once from the
//! settings registry; mid-scan settings writes apply to the next invocation.

use std::time::{Duration, Instant};

use smittvakt_config::{EngineSettings, NumField};

use crate::engine::error::{LimitKind, ScanError};

/// Limit snapshot taken at the scan boundary.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScanLimits {
    pub max_scan_size: u64,
    pub max_file_size: u64,
    pub max_recursion: u32,
    pub max_files: u32,
    /// `None` when the time limit is 0 (unlimited).
    pub time_limit: Option<Duration>,
    pub disable_cache: bool,
}

impl ScanLimits {
    pub fn from_settings(settings: &EngineSettings) -> Self {
        let time_limit_ms = settings.get_num(NumField::TimeLimit);
        Self {
            max_scan_size: settings.get_num(NumField::MaxScanSize),
            max_file_size: settings.get_num(NumField::MaxFileSize),
            max_recursion: settings.get_num(NumField::MaxRecursion) as u32,
            max_files: settings.get_num(NumField::MaxFiles) as u32,
            time_limit: (time_limit_ms > 0).then(|| Duration::from_millis(time_limit_ms)),
            disable_cache: settings.get_num(NumField::DisableCache) != 0,
        }
    }
}

/// Mutable per-invocation state.
#[derive(Debug)]
pub(crate) struct ScanContext {
    pub limits: ScanLimits,
    pub started: Instant,
    pub bytes_scanned: u64,
    pub depth: u32,
    pub members_visited: u32,
}

impl ScanContext {
    pub fn new(limits: ScanLimits) -> Self {
        Self {
            limits,
            started: Instant::now(),
            bytes_scanned: 0,
            depth: 0,
            members_visited: 0,
        }
    }

    /// Wall-clock deadline check, run at every state transition.
    pub fn check_deadline(&self) -> Result<(), ScanError> {
        match self.limits.time_limit {
            Some(limit) if self.started.elapsed() > limit => Err(
                ScanError::ResourceLimitExceeded(LimitKind::Timeout),
            ),
            _ => Ok(()),
        }
    }

    /// Account one unit's bytes against the per-unit and cumulative size
    /// limits.
    pub fn admit_unit(&mut self, len: usize) -> Result<(), ScanError> {
        let len = len as u64;
        if len > self.limits.max_file_size {
            return Err(ScanError::ResourceLimitExceeded(LimitKind::MaxFileSize));
        }
        self.bytes_scanned = self.bytes_scanned.saturating_add(len);
        if self.bytes_scanned > self.limits.max_scan_size {
            return Err(ScanError::ResourceLimitExceeded(LimitKind::MaxScanSize));
        }
        Ok(())
    }

    /// Whether container expansion may recurse one level deeper. Truncates
    /// expansion at the bound instead of erroring.
    pub fn may_recurse(&self) -> bool {
        self.depth < self.limits.max_recursion
    }

    /// Account one container member against the member budget.
    pub fn enter_member(&mut self) -> Result<(), ScanError> {
        self.members_visited += 1;
        if self.members_visited > self.limits.max_files {
            return Err(ScanError::ResourceLimitExceeded(LimitKind::MaxFiles));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> ScanLimits {
        ScanLimits {
            max_scan_size: 100,
            max_file_size: 60,
            max_recursion: 2,
            max_files: 3,
            time_limit: None,
            disable_cache: false,
        }
    }

    #[test]
    fn unit_size_limits() {
        let mut ctx = ScanContext::new(limits());
        assert!(ctx.admit_unit(60).is_ok());
        assert_eq!(
            ctx.admit_unit(61).unwrap_err(),
            ScanError::ResourceLimitExceeded(LimitKind::MaxFileSize)
        );
        assert_eq!(
            ctx.admit_unit(50).unwrap_err(),
            ScanError::ResourceLimitExceeded(LimitKind::MaxScanSize)
        );
    }

    #[test]
    fn member_budget() {
        let mut ctx = ScanContext::new(limits());
        assert!(ctx.enter_member().is_ok());
        assert!(ctx.enter_member().is_ok());
        assert!(ctx.enter_member().is_ok());
        assert_eq!(
            ctx.enter_member().unwrap_err(),
            ScanError::ResourceLimitExceeded(LimitKind::MaxFiles)
        );
    }

    #[test]
    fn recursion_gate() {
        let mut ctx = ScanContext::new(limits());
        assert!(ctx.may_recurse());
        ctx.depth = 2;
        assert!(!ctx.may_recurse());
    }

    #[test]
    fn deadline() {
        let mut l = limits();
        l.time_limit = Some(Duration::from_millis(0));
        let ctx = ScanContext::new(l);
        std::thread::sleep(Duration::from_millis(2));
        assert!(ctx.check_deadline().is_err());
    }
}
