//! Filesystem traversal support.

pub mod walker;

pub use walker::{DirWalker, WalkError};
