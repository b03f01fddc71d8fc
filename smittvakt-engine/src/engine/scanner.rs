//! The per-unit scan state machine.
//!
//! `Start -> PreScan -> {ShortCircuitClean|ShortCircuitInfected|Matching}
//! -> {ContainerExpansion} -> PostScan -> Terminal`. No state is revisited;
//! limit checks run at every transition, and exceeding one is a terminal
//! error for the current unit only.

use tracing::trace;

use smittvakt_detection::{CompiledMatcher, TargetType};

use crate::engine::cache::{CacheKey, CleanCache};
use crate::engine::container;
use crate::engine::context::ScanContext;
use crate::engine::filetype;
use crate::engine::hooks::{HookDecision, ScanHooks, ScanUnit};
use crate::engine::options::ScanOptions;
use crate::verdict::{MatchRecord, ScanVerdict};

/// Read-only references shared by one scan invocation and its container
/// members.
pub(crate) struct ScanPass<'a> {
    pub matcher: &'a CompiledMatcher,
    pub options: ScanOptions,
    pub hooks: Option<&'a dyn ScanHooks>,
    pub cache: &'a CleanCache,
    pub cache_epoch: u64,
}

/// A unit verdict plus the hits collected under `ALL_MATCHES`.
#[derive(Debug)]
pub(crate) struct ScanOutcome {
    pub verdict: ScanVerdict,
    pub matches: Vec<MatchRecord>,
}

enum ScanState {
    PreScan,
    Matching,
    ContainerExpansion {
        current: ScanVerdict,
        recognized: TargetType,
    },
    PostScan(ScanVerdict),
    Terminal(ScanVerdict),
}

pub(crate) fn scan_unit(
    pass: &ScanPass<'_>,
    data: &[u8],
    origin: Option<&std::path::Path>,
    ctx: &mut ScanContext,
) -> ScanOutcome {
    let unit = ScanUnit {
        data,
        depth: ctx.depth,
        origin,
    };
    let mut matches: Vec<MatchRecord> = Vec::new();
    let mut cache_key: Option<CacheKey> = None;
    let mut state = ScanState::PreScan;

    loop {
        // Cancellation is a transition to a terminal error from any state.
        if let Err(error) = ctx.check_deadline() {
            return ScanOutcome {
                verdict: ScanVerdict::Error { error },
                matches,
            };
        }

        state = match state {
            ScanState::PreScan => {
                if let Err(error) = ctx.admit_unit(data.len()) {
                    ScanState::Terminal(ScanVerdict::Error { error })
                } else {
                    match pre_scan(pass.hooks, &unit) {
                        HookDecision::Clean => ScanState::PostScan(ScanVerdict::Clean),
                        HookDecision::Infected(signature) => {
                            ScanState::PostScan(ScanVerdict::Infected { signature })
                        }
                        HookDecision::Continue => {
                            if ctx.limits.disable_cache {
                                ScanState::Matching
                            } else {
                                let key =
                                    CacheKey::new(data, pass.cache_epoch, pass.options.bits());
                                if pass.cache.contains(&key) {
                                    trace!(depth = ctx.depth, "Clean-cache hit");
                                    ScanState::PostScan(ScanVerdict::Clean)
                                } else {
                                    cache_key = Some(key);
                                    ScanState::Matching
                                }
                            }
                        }
                    }
                }
            }

            ScanState::Matching => {
                let recognized = if pass.options.contains(ScanOptions::RAW) {
                    TargetType::Any
                } else {
                    filetype::detect(data)
                };

                if pass.options.contains(ScanOptions::ALL_MATCHES) {
                    let hits = pass.matcher.find_all(data, recognized);
                    let current = match hits.first() {
                        Some(first) => ScanVerdict::Infected {
                            signature: pass.matcher.signature(first.signature).name().to_string(),
                        },
                        None => ScanVerdict::Clean,
                    };
                    matches.extend(hits.into_iter().map(|hit| MatchRecord {
                        signature: pass.matcher.signature(hit.signature).name().to_string(),
                        offset: hit.offset,
                    }));
                    ScanState::ContainerExpansion {
                        current,
                        recognized,
                    }
                } else if let Some(hit) = pass.matcher.find_first(data, recognized) {
                    let signature = pass.matcher.signature(hit.signature).name().to_string();
                    matches.push(MatchRecord {
                        signature: signature.clone(),
                        offset: hit.offset,
                    });
                    // First confirmed hit settles the unit; expansion is
                    // only for exhaustive collection.
                    ScanState::PostScan(ScanVerdict::Infected { signature })
                } else {
                    ScanState::ContainerExpansion {
                        current: ScanVerdict::Clean,
                        recognized,
                    }
                }
            }

            ScanState::ContainerExpansion {
                current,
                recognized,
            } => {
                let expandable = pass.options.contains(ScanOptions::ARCHIVE)
                    && !pass.options.contains(ScanOptions::RAW)
                    && filetype::is_container(recognized)
                    && ctx.may_recurse();

                if !expandable {
                    ScanState::PostScan(current)
                } else {
                    match container::expand(pass, data, ctx, &mut matches) {
                        Ok(Some(promoted)) if !current.is_infected() => {
                            ScanState::PostScan(promoted)
                        }
                        Ok(_) => ScanState::PostScan(current),
                        Err(error) => ScanState::Terminal(ScanVerdict::Error { error }),
                    }
                }
            }

            ScanState::PostScan(verdict) => match post_scan(pass.hooks, &unit, &verdict) {
                HookDecision::Continue => ScanState::Terminal(verdict),
                HookDecision::Clean => ScanState::Terminal(ScanVerdict::Clean),
                HookDecision::Infected(signature) => {
                    ScanState::Terminal(ScanVerdict::Infected { signature })
                }
            },

            ScanState::Terminal(verdict) => {
                // Hook decisions are not part of the cache key, so only
                // hook-free clean verdicts are remembered.
                if verdict.is_clean() && pass.hooks.is_none() {
                    if let Some(key) = cache_key {
                        pass.cache.insert(key);
                    }
                }
                return ScanOutcome { verdict, matches };
            }
        };
    }
}

fn pre_scan(hooks: Option<&dyn ScanHooks>, unit: &ScanUnit<'_>) -> HookDecision {
    hooks
        .map(|h| h.pre_scan(unit))
        .unwrap_or(HookDecision::Continue)
}

fn post_scan(
    hooks: Option<&dyn ScanHooks>,
    unit: &ScanUnit<'_>,
    verdict: &ScanVerdict,
) -> HookDecision {
    hooks
        .map(|h| h.post_scan(unit, verdict))
        .unwrap_or(HookDecision::Continue)
}
