//! Candidate verification.
//!
//! A trie hit only proves the truncated literal prefix occurred; the full
//! token body is re-matched at the candidate origin, including wildcards,
//! nybble masks, and gaps. Gap alternatives backtrack; everything else is a
//! straight two-pointer walk.

use crate::signatures::PatternToken;

/// Whether `body` matches a prefix of `data` anchored at offset 0.
pub(crate) fn matches_at(body: &[PatternToken], data: &[u8]) -> bool {
    match_tokens(body, data)
}

fn match_tokens(body: &[PatternToken], data: &[u8]) -> bool {
    let mut di = 0usize;
    for (ti, token) in body.iter().enumerate() {
        match *token {
            PatternToken::Byte(expected) => {
                if di >= data.len() || data[di] != expected {
                    return false;
                }
                di += 1;
            }
            PatternToken::Any => {
                if di >= data.len() {
                    return false;
                }
                di += 1;
            }
            PatternToken::Mask { mask, value } => {
                if di >= data.len() || data[di] & mask != value {
                    return false;
                }
                di += 1;
            }
            PatternToken::Gap { min, max } => {
                let rest = &body[ti + 1..];
                let lo = match di.checked_add(min) {
                    Some(lo) if lo <= data.len() => lo,
                    _ => return false,
                };
                let hi = match max {
                    Some(max) => di.saturating_add(max).min(data.len()),
                    None => data.len(),
                };
                return (lo..=hi).any(|resume| match_tokens(rest, &data[resume..]));
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signatures::parse::parse_body;

    fn check(body: &str, data: &[u8]) -> bool {
        matches_at(&parse_body(body).unwrap(), data)
    }

    #[test]
    fn literal_prefix_match() {
        assert!(check("414243", b"ABCD"));
        assert!(!check("414243", b"ABD"));
        assert!(!check("414243", b"AB"));
    }

    #[test]
    fn any_and_mask() {
        assert!(check("41??43", b"AxC"));
        assert!(check("414?", b"AB"));
        assert!(!check("414?", b"AR"));
        assert!(check("41?2", b"AB"));
        assert!(!check("41?2", b"AC"));
    }

    #[test]
    fn bounded_gap() {
        assert!(check("41{2}44", b"AxyD"));
        assert!(!check("41{2}44", b"AxD"));
        assert!(check("41{1-3}44", b"AxD"));
        assert!(check("41{1-3}44", b"AxyzD"));
        assert!(!check("41{1-3}44", b"AxyzwD"));
    }

    #[test]
    fn unbounded_gap_backtracks() {
        assert!(check("41*4242", b"AxBxBB"));
        assert!(!check("41*4242", b"AxBxB"));
    }
}
