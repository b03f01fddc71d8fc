//! # Smittvakt Scan Engine
//!
//! Orchestrates scanning byte streams, files, and directory trees against
//! a compiled signature matcher, under engine-wide resource limits.

pub mod engine;
pub mod fs;
pub mod verdict;

pub use engine::error::{strerror, EngineError, LimitKind, ScanError};
pub use engine::hooks::{HookDecision, ScanHooks, ScanUnit};
pub use engine::options::ScanOptions;
pub use engine::ScanEngine;
pub use verdict::{FileScanRecord, MatchRecord, ScanVerdict};
