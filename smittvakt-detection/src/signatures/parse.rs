//! `.sdb` record parsing.
//!
//! One record per line: `name:target:category:hex-body`. The body is a hex
//! string with wildcard extensions: `??` matches any byte, `4?` / `?A`
//! match one nybble, `*` is an unbounded gap, `{n}` and `{n-m}` are bounded
//! gaps.

use thiserror::Error;

use super::{Category, PatternToken, Signature, TargetType};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("record is missing the {0} field")]
    MissingField(&'static str),

    #[error("unknown target type '{0}'")]
    UnknownTarget(String),

    #[error("unknown category '{0}'")]
    UnknownCategory(String),

    #[error("body is empty")]
    EmptyBody,

    #[error("body must begin with a literal byte")]
    LeadingWildcard,

    #[error("body must not end with a gap")]
    TrailingGap,

    #[error("dangling half byte at position {0}")]
    DanglingNybble(usize),

    #[error("invalid character '{1}' at position {0}")]
    InvalidCharacter(usize, char),

    #[error("nothing following ? wildcard at position {0}")]
    ExpectingLowNybble(usize),

    #[error("no closing brace found for opening brace at position {0}")]
    MissingClosingBrace(usize),

    #[error("invalid gap bound at position {0}")]
    InvalidGapBound(usize),

    #[error("gap range start {0} exceeds end {1}")]
    GapRangeOrder(usize, usize),

    #[error("adjacent gaps at position {0}")]
    AdjacentGaps(usize),

    #[error("decoding hex-encoded value: {0}")]
    FromHex(#[from] hex::FromHexError),
}

/// Parse one record line into a signature. `official` tags the signature
/// with the provenance of its database file.
pub fn parse_record(line: &str, official: bool) -> Result<Signature, ParseError> {
    let mut fields = line.splitn(4, ':');
    let name = fields.next().filter(|s| !s.is_empty());
    let target = fields.next().filter(|s| !s.is_empty());
    let category = fields.next().filter(|s| !s.is_empty());
    let body = fields.next().filter(|s| !s.is_empty());

    let name = name.ok_or(ParseError::MissingField("name"))?;
    let target = parse_target(target.ok_or(ParseError::MissingField("target"))?)?;
    let category = parse_category(category.ok_or(ParseError::MissingField("category"))?)?;
    let body = parse_body(body.ok_or(ParseError::MissingField("body"))?)?;

    Signature::from_parts(name.to_string(), target, category, body, official)
}

fn parse_target(keyword: &str) -> Result<TargetType, ParseError> {
    match keyword {
        "any" => Ok(TargetType::Any),
        "pe" => Ok(TargetType::Pe),
        "elf" => Ok(TargetType::Elf),
        "pdf" => Ok(TargetType::Pdf),
        "html" => Ok(TargetType::Html),
        "ole2" => Ok(TargetType::Ole2),
        "zip" => Ok(TargetType::Zip),
        "mail" => Ok(TargetType::Mail),
        "text" => Ok(TargetType::Text),
        other => Err(ParseError::UnknownTarget(other.to_string())),
    }
}

fn parse_category(keyword: &str) -> Result<Category, ParseError> {
    match keyword {
        "standard" => Ok(Category::Standard),
        "phishing" => Ok(Category::Phishing),
        "pua" => Ok(Category::Pua),
        "bytecode" => Ok(Category::Bytecode),
        other => Err(ParseError::UnknownCategory(other.to_string())),
    }
}

/// Parse a hex body into pattern tokens.
pub fn parse_body(body: &str) -> Result<Vec<PatternToken>, ParseError> {
    let mut tokens = Vec::new();
    let mut hex_bytes: Vec<u8> = Vec::new();
    let mut bytes = body.bytes().enumerate();

    // Flush an even run of accumulated hex characters as literal bytes.
    fn flush(
        tokens: &mut Vec<PatternToken>,
        hex_bytes: &mut Vec<u8>,
    ) -> Result<(), ParseError> {
        if !hex_bytes.is_empty() {
            let decoded = hex::decode(&hex_bytes)?;
            tokens.extend(decoded.into_iter().map(PatternToken::Byte));
            hex_bytes.clear();
        }
        Ok(())
    }

    while let Some((pos, byte)) = bytes.next() {
        match byte {
            b'0'..=b'9' | b'a'..=b'f' | b'A'..=b'F' => hex_bytes.push(byte),
            b'?' => {
                // The meaning depends on whether we are mid-byte.
                let high_nybble = if hex_bytes.len() % 2 == 1 {
                    hex_bytes.pop()
                } else {
                    None
                };
                flush(&mut tokens, &mut hex_bytes)?;

                let mut match_byte = [0u8; 1];
                if let Some(high) = high_nybble {
                    // High nybble known, low one wild ("4?").
                    hex::decode_to_slice([high, b'0'], &mut match_byte)?;
                    tokens.push(PatternToken::Mask {
                        mask: 0xf0,
                        value: match_byte[0],
                    });
                } else {
                    // Not mid-byte: the next character decides ("??" / "?A").
                    let (low_pos, low) =
                        bytes.next().ok_or(ParseError::ExpectingLowNybble(pos))?;
                    match low {
                        b'?' => tokens.push(PatternToken::Any),
                        b'0'..=b'9' | b'a'..=b'f' | b'A'..=b'F' => {
                            hex::decode_to_slice([b'0', low], &mut match_byte)?;
                            tokens.push(PatternToken::Mask {
                                mask: 0x0f,
                                value: match_byte[0],
                            });
                        }
                        other => {
                            return Err(ParseError::InvalidCharacter(low_pos, other as char))
                        }
                    }
                }
            }
            b'*' => {
                if hex_bytes.len() % 2 == 1 {
                    return Err(ParseError::DanglingNybble(pos));
                }
                flush(&mut tokens, &mut hex_bytes)?;
                push_gap(&mut tokens, PatternToken::Gap { min: 0, max: None }, pos)?;
            }
            b'{' => {
                if hex_bytes.len() % 2 == 1 {
                    return Err(ParseError::DanglingNybble(pos));
                }
                flush(&mut tokens, &mut hex_bytes)?;
                let mut spec = String::new();
                let mut closed = false;
                for (_, c) in bytes.by_ref() {
                    if c == b'}' {
                        closed = true;
                        break;
                    }
                    spec.push(c as char);
                }
                if !closed {
                    return Err(ParseError::MissingClosingBrace(pos));
                }
                push_gap(&mut tokens, parse_gap_spec(&spec, pos)?, pos)?;
            }
            other => return Err(ParseError::InvalidCharacter(pos, other as char)),
        }
    }

    if hex_bytes.len() % 2 == 1 {
        return Err(ParseError::DanglingNybble(body.len() - 1));
    }
    flush(&mut tokens, &mut hex_bytes)?;
    if tokens.is_empty() {
        return Err(ParseError::EmptyBody);
    }
    Ok(tokens)
}

fn push_gap(
    tokens: &mut Vec<PatternToken>,
    gap: PatternToken,
    pos: usize,
) -> Result<(), ParseError> {
    if matches!(tokens.last(), Some(PatternToken::Gap { .. })) {
        return Err(ParseError::AdjacentGaps(pos));
    }
    tokens.push(gap);
    Ok(())
}

fn parse_gap_spec(spec: &str, pos: usize) -> Result<PatternToken, ParseError> {
    let parse_bound =
        |s: &str| -> Result<usize, ParseError> { s.parse().map_err(|_| ParseError::InvalidGapBound(pos)) };

    match spec.split_once('-') {
        Some((lo, hi)) => {
            let min = parse_bound(lo)?;
            let max = parse_bound(hi)?;
            if min > max {
                return Err(ParseError::GapRangeOrder(min, max));
            }
            Ok(PatternToken::Gap {
                min,
                max: Some(max),
            })
        }
        None => {
            let n = parse_bound(spec)?;
            Ok(PatternToken::Gap {
                min: n,
                max: Some(n),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_hex_body() {
        let tokens = parse_body("414243").unwrap();
        assert_eq!(
            tokens,
            vec![
                PatternToken::Byte(0x41),
                PatternToken::Byte(0x42),
                PatternToken::Byte(0x43),
            ]
        );
    }

    #[test]
    fn wildcards_and_masks() {
        let tokens = parse_body("41??4?{2-4}ff").unwrap();
        assert_eq!(
            tokens,
            vec![
                PatternToken::Byte(0x41),
                PatternToken::Any,
                PatternToken::Mask {
                    mask: 0xf0,
                    value: 0x40
                },
                PatternToken::Gap {
                    min: 2,
                    max: Some(4)
                },
                PatternToken::Byte(0xff),
            ]
        );
    }

    #[test]
    fn low_nybble_mask() {
        let tokens = parse_body("41?a").unwrap();
        assert_eq!(
            tokens[1],
            PatternToken::Mask {
                mask: 0x0f,
                value: 0x0a
            }
        );
    }

    #[test]
    fn unbounded_gap() {
        let tokens = parse_body("4142*43").unwrap();
        assert_eq!(tokens[2], PatternToken::Gap { min: 0, max: None });
    }

    #[test]
    fn malformed_bodies() {
        assert!(matches!(parse_body("4"), Err(ParseError::DanglingNybble(0))));
        assert!(matches!(
            parse_body("41{2"),
            Err(ParseError::MissingClosingBrace(2))
        ));
        assert!(matches!(
            parse_body("41{5-2}42"),
            Err(ParseError::GapRangeOrder(5, 2))
        ));
        assert!(matches!(
            parse_body("41*{3}42"),
            Err(ParseError::AdjacentGaps(_))
        ));
        assert!(matches!(
            parse_body("41zz"),
            Err(ParseError::InvalidCharacter(2, 'z'))
        ));
    }

    #[test]
    fn record_round_trip() {
        let sig = parse_record("Test.Eicar-1:any:standard:414243", false).unwrap();
        assert_eq!(sig.name(), "Test.Eicar-1");
        assert_eq!(sig.target(), TargetType::Any);
        assert_eq!(sig.category(), Category::Standard);
        assert_eq!(sig.body().len(), 3);
    }

    #[test]
    fn record_field_errors() {
        assert!(matches!(
            parse_record("NoBody:any:standard:", false),
            Err(ParseError::MissingField("body"))
        ));
        assert!(matches!(
            parse_record("X:floppy:standard:41", false),
            Err(ParseError::UnknownTarget(_))
        ));
        assert!(matches!(
            parse_record("X:any:malware:41", false),
            Err(ParseError::UnknownCategory(_))
        ));
    }

    #[test]
    fn wildcard_anchor_rejected() {
        assert!(matches!(
            parse_record("X:any:standard:??41", false),
            Err(ParseError::LeadingWildcard)
        ));
    }
}
