//! ## smittvakt-detection::signatures
//! **Signature model and store**
//!
//! ### Expectations:
//! - Signatures are immutable after parse
//! - Store order is load order; duplicate names may coexist and the
//!   earliest-loaded signature is reported first (first-match-reported)
//! - `freeze()` hands the compiler an immutable snapshot; later loads only
//!   affect future freezes
//!
//! ### Components:
//! - `parse`: `.sdb` record and hex-body parsing
//! - `load`: file/directory loading filtered by `LoadOptions`

pub mod load;
pub mod parse;

use std::path::Path;
use std::sync::Arc;

pub use load::{LoadOptions, LoadSummary};

use crate::error::LoadError;

/// File type a signature is restricted to. `Any` matches every unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetType {
    Any,
    Pe,
    Elf,
    Pdf,
    Html,
    Ole2,
    Zip,
    Mail,
    Text,
}

impl TargetType {
    /// Whether a signature with this target applies to a unit recognized as
    /// `recognized`.
    pub fn applies_to(self, recognized: TargetType) -> bool {
        self == TargetType::Any || self == recognized
    }
}

/// Signature category, driving load-option admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Standard,
    Phishing,
    Pua,
    Bytecode,
}

/// One element of a signature body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternToken {
    /// Exact byte.
    Byte(u8),
    /// Any single byte (`??`).
    Any,
    /// Half-wildcard byte: `data & mask == value` (`4?` / `?A`).
    Mask { mask: u8, value: u8 },
    /// Byte gap: at least `min`, at most `max` bytes; `None` is unbounded
    /// (`*`, `{n}`, `{n-m}`).
    Gap { min: usize, max: Option<usize> },
}

/// A named detection pattern. Immutable after creation.
#[derive(Debug, Clone)]
pub struct Signature {
    name: String,
    target: TargetType,
    category: Category,
    body: Vec<PatternToken>,
    official: bool,
}

impl Signature {
    /// Build a signature, enforcing the body invariants the automaton
    /// relies on: non-empty, anchored on a leading literal byte, and not
    /// ending in a gap.
    pub fn from_parts(
        name: String,
        target: TargetType,
        category: Category,
        body: Vec<PatternToken>,
        official: bool,
    ) -> Result<Self, parse::ParseError> {
        if body.is_empty() {
            return Err(parse::ParseError::EmptyBody);
        }
        if !matches!(body.first(), Some(PatternToken::Byte(_))) {
            return Err(parse::ParseError::LeadingWildcard);
        }
        if matches!(body.last(), Some(PatternToken::Gap { .. })) {
            return Err(parse::ParseError::TrailingGap);
        }
        Ok(Self {
            name,
            target,
            category,
            body,
            official,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> TargetType {
        self.target
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Whether the signature came from an officially published database
    /// file.
    pub fn official(&self) -> bool {
        self.official
    }

    pub fn body(&self) -> &[PatternToken] {
        &self.body
    }

    /// Leading run of exact literal bytes. The automaton anchors on this
    /// run; `from_parts` guarantees it is non-empty.
    pub fn leading_literals(&self) -> Vec<u8> {
        self.body
            .iter()
            .map_while(|token| match token {
                PatternToken::Byte(b) => Some(*b),
                _ => None,
            })
            .collect()
    }
}

/// Ordered collection of signatures, populated by load operations.
///
/// Name uniqueness is not enforced: databases loaded later may carry names
/// already present, and both stay in the store. Verdicts report the
/// earliest-loaded match (first-match-reported); `find_all` surfaces every
/// hit.
#[derive(Debug, Default)]
pub struct SignatureStore {
    signatures: Vec<Signature>,
}

impl SignatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Signature> {
        self.signatures.iter()
    }

    /// Append a single signature (test and tooling entry point; database
    /// sources go through [`SignatureStore::load`]).
    pub fn add(&mut self, signature: Signature) {
        self.signatures.push(signature);
    }

    /// Load one database source: a single `.sdb` file, or every `.sdb`
    /// file directly inside a directory (non-recursive, lexicographic
    /// order). Admitted signatures are appended; previously compiled
    /// matchers are unaffected.
    pub fn load(
        &mut self,
        path: impl AsRef<Path>,
        options: LoadOptions,
    ) -> Result<LoadSummary, LoadError> {
        load::load_source(&mut self.signatures, path.as_ref(), options)
    }

    /// Immutable snapshot for the compiler. Mutating the store afterwards
    /// only affects future freezes.
    pub fn freeze(&self) -> Arc<FrozenStore> {
        Arc::new(FrozenStore {
            signatures: self.signatures.clone().into(),
        })
    }
}

/// Immutable snapshot of a [`SignatureStore`].
#[derive(Debug)]
pub struct FrozenStore {
    signatures: Arc<[Signature]>,
}

impl FrozenStore {
    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    pub(crate) fn signatures_arc(&self) -> Arc<[Signature]> {
        Arc::clone(&self.signatures)
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}
