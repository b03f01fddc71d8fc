//! # Smittvakt Detection Engine
//!
//! Crate for the signature model, database loading, and multi-pattern
//! matching.

pub mod error;
pub mod matcher;
pub mod signatures;

pub use error::{CompileError, LoadError};
pub use matcher::{CompiledMatcher, MatchHit, MatcherParams};
pub use signatures::{
    Category, FrozenStore, LoadOptions, LoadSummary, PatternToken, Signature, SignatureStore,
    TargetType,
};
