//! ## smittvakt-detection::matcher
//! **Depth-bounded Aho-Corasick matching with body verification**
//!
//! ### Expectations:
//! - Single-pass scanning against the whole signature set
//! - Deterministic: identical frozen store and parameters produce identical
//!   match behavior
//! - Compilation never mutates an existing matcher; the engine swaps whole
//!   `Arc`s
//!
//! ### Components:
//! - `trie`: goto/failure construction, DFA completion, memory ceiling
//! - `verify`: anchored token-body verification of trie candidates

mod trie;
mod verify;

use std::sync::Arc;

use tracing::debug;

use crate::error::CompileError;
use crate::signatures::{FrozenStore, Signature, TargetType};

/// Compiler tunables, snapshotted from the settings registry at the
/// compile boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatcherParams {
    /// Preferred minimum trie depth.
    pub min_depth: u32,
    /// Maximum trie depth.
    pub max_depth: u32,
    /// Construction memory ceiling in bytes; 0 disables it.
    pub max_memory: u64,
}

impl Default for MatcherParams {
    fn default() -> Self {
        Self {
            min_depth: 2,
            max_depth: 3,
            max_memory: 256 * 1024 * 1024,
        }
    }
}

/// One confirmed signature occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchHit {
    /// Index into the compiled signature set (load order).
    pub signature: usize,
    /// Byte offset of the match origin.
    pub offset: usize,
}

/// An immutable compiled automaton over one frozen store snapshot.
#[derive(Debug)]
pub struct CompiledMatcher {
    nodes: Vec<trie::Node>,
    signatures: Arc<[Signature]>,
}

impl CompiledMatcher {
    /// Build the automaton. Fails with `EmptyDatabase` when the snapshot
    /// holds no signatures and `ResourceExhausted` when construction would
    /// exceed the memory ceiling.
    pub fn compile(store: &FrozenStore, params: MatcherParams) -> Result<Self, CompileError> {
        let max_depth = params.max_depth.max(1);
        let nodes = trie::build(
            store.signatures(),
            &trie::BuildParams {
                min_depth: params.min_depth.clamp(1, max_depth),
                max_depth,
                max_memory: params.max_memory,
            },
        )?;

        debug!(
            signatures = store.len(),
            nodes = nodes.len(),
            approx_bytes = nodes.len() as u64 * trie::NODE_BYTES,
            "Compiled matcher"
        );

        Ok(Self {
            nodes,
            signatures: store.signatures_arc(),
        })
    }

    pub fn signature(&self, index: usize) -> &Signature {
        &self.signatures[index]
    }

    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    /// First confirmed hit in stream order. Candidates ending on the same
    /// byte are resolved in favor of the earliest-loaded signature.
    pub fn find_first(&self, data: &[u8], recognized: TargetType) -> Option<MatchHit> {
        self.scan(data, recognized, false).into_iter().next()
    }

    /// Every confirmed hit, in stream order.
    pub fn find_all(&self, data: &[u8], recognized: TargetType) -> Vec<MatchHit> {
        self.scan(data, recognized, true)
    }

    fn scan(&self, data: &[u8], recognized: TargetType, collect_all: bool) -> Vec<MatchHit> {
        let mut hits = Vec::new();
        let mut state = 0usize;

        for (position, &byte) in data.iter().enumerate() {
            state = self.nodes[state].next[byte as usize] as usize;
            if self.nodes[state].outputs.is_empty() {
                continue;
            }

            for output in &self.nodes[state].outputs {
                let signature = &self.signatures[output.sig as usize];
                if !signature.target().applies_to(recognized) {
                    continue;
                }
                let origin = position + 1 - output.depth as usize;
                if verify::matches_at(signature.body(), &data[origin..]) {
                    hits.push(MatchHit {
                        signature: output.sig as usize,
                        offset: origin,
                    });
                    if !collect_all {
                        return hits;
                    }
                }
            }
        }
        hits
    }
}
