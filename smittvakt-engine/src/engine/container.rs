//! Container expansion.
//!
//! Zip archives are the supported container format: members are extracted
//! in-memory and fed back through the scan pipeline one recursion level
//! deeper. Structural anomalies only become detections when the caller
//! asked for it (`BLOCK_ENCRYPTED` / `BLOCK_BROKEN`); otherwise the member
//! is passed over.

use std::io::{Cursor, Read};

use tracing::{debug, trace};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::engine::context::ScanContext;
use crate::engine::error::{LimitKind, ScanError};
use crate::engine::options::ScanOptions;
use crate::engine::scanner::{self, ScanPass};
use crate::verdict::{MatchRecord, ScanVerdict};

/// Detection name for encrypted archives under `BLOCK_ENCRYPTED`.
pub(crate) const ENCRYPTED_NAME: &str = "Heuristics.Encrypted.Zip";

/// Detection name for malformed archives under `BLOCK_BROKEN`.
pub(crate) const BROKEN_NAME: &str = "Heuristics.Broken.Archive";

/// Expand an archive unit. `Ok(Some(..))` promotes the container's verdict
/// (an infected member or a blocked anomaly); `Ok(None)` means nothing to
/// report; `Err` is a fatal resource-limit failure for this unit.
pub(crate) fn expand(
    pass: &ScanPass<'_>,
    data: &[u8],
    ctx: &mut ScanContext,
    matches: &mut Vec<MatchRecord>,
) -> Result<Option<ScanVerdict>, ScanError> {
    let mut archive = match ZipArchive::new(Cursor::new(data)) {
        Ok(archive) => archive,
        Err(error) => {
            debug!(%error, "Archive did not parse");
            return Ok(broken_verdict(pass.options));
        }
    };

    let all_matches = pass.options.contains(ScanOptions::ALL_MATCHES);
    let mut first_infected: Option<String> = None;

    for index in 0..archive.len() {
        ctx.enter_member()?;

        let member_data = match archive.by_index(index) {
            Ok(mut member) => {
                if !member.is_file() {
                    continue;
                }
                if member.size() > ctx.limits.max_file_size {
                    return Err(ScanError::ResourceLimitExceeded(LimitKind::MaxFileSize));
                }

                let mut buffer = Vec::with_capacity(member.size() as usize);
                // The declared size is untrusted; cap the actual read.
                let cap = ctx.limits.max_file_size.saturating_add(1);
                match (&mut member).take(cap).read_to_end(&mut buffer) {
                    Ok(_) if buffer.len() as u64 > ctx.limits.max_file_size => {
                        return Err(ScanError::ResourceLimitExceeded(LimitKind::MaxFileSize));
                    }
                    Ok(_) => buffer,
                    Err(error) => {
                        debug!(index, %error, "Member extraction failed");
                        match broken_verdict(pass.options) {
                            Some(verdict) => return Ok(Some(verdict)),
                            None => continue,
                        }
                    }
                }
            }
            // Password-protected members surface as unsupported.
            Err(ZipError::UnsupportedArchive(reason)) => {
                trace!(index, reason, "Encrypted or unsupported member");
                if pass.options.contains(ScanOptions::BLOCK_ENCRYPTED) {
                    return Ok(Some(ScanVerdict::Infected {
                        signature: ENCRYPTED_NAME.to_string(),
                    }));
                }
                continue;
            }
            Err(error) => {
                debug!(index, %error, "Member unreadable");
                match broken_verdict(pass.options) {
                    Some(verdict) => return Ok(Some(verdict)),
                    None => continue,
                }
            }
        };

        ctx.depth += 1;
        let outcome = scanner::scan_unit(pass, &member_data, None, ctx);
        ctx.depth -= 1;

        matches.extend(outcome.matches);
        match outcome.verdict {
            ScanVerdict::Infected { signature } => {
                if first_infected.is_none() {
                    first_infected = Some(signature);
                }
                if !all_matches {
                    break;
                }
            }
            ScanVerdict::Error { error } => return Err(error),
            ScanVerdict::Clean => {}
        }
    }

    Ok(first_infected.map(|signature| ScanVerdict::Infected { signature }))
}

fn broken_verdict(options: ScanOptions) -> Option<ScanVerdict> {
    options
        .contains(ScanOptions::BLOCK_BROKEN)
        .then(|| ScanVerdict::Infected {
            signature: BROKEN_NAME.to_string(),
        })
}
