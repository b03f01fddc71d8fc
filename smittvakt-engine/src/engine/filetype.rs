//! File type recognition from magic bytes.
//!
//! Only enough typing to drive target-restricted signatures and container
//! expansion; deep format parsing is out of scope.

use smittvakt_detection::TargetType;

const OLE2_MAGIC: &[u8] = &[0xd0, 0xcf, 0x11, 0xe0, 0xa1, 0xb1, 0x1a, 0xe1];

/// Recognize the type of a scanned unit. Unknown binary data maps to
/// `Any`, which only untyped signatures apply to.
pub(crate) fn detect(data: &[u8]) -> TargetType {
    if data.starts_with(b"PK\x03\x04") || data.starts_with(b"PK\x05\x06") {
        return TargetType::Zip;
    }
    if data.starts_with(b"MZ") {
        return TargetType::Pe;
    }
    if data.starts_with(b"\x7fELF") {
        return TargetType::Elf;
    }
    if data.starts_with(b"%PDF-") {
        return TargetType::Pdf;
    }
    if data.starts_with(OLE2_MAGIC) {
        return TargetType::Ole2;
    }
    if looks_like_html(data) {
        return TargetType::Html;
    }
    if looks_like_mail(data) {
        return TargetType::Mail;
    }
    if looks_like_text(data) {
        return TargetType::Text;
    }
    TargetType::Any
}

/// Whether the unit is a container the engine knows how to expand.
pub(crate) fn is_container(recognized: TargetType) -> bool {
    recognized == TargetType::Zip
}

fn looks_like_html(data: &[u8]) -> bool {
    let head = &data[..data.len().min(1024)];
    let lowered = head.to_ascii_lowercase();
    lowered.starts_with(b"<!doctype html") || contains(&lowered, b"<html")
}

fn looks_like_mail(data: &[u8]) -> bool {
    data.starts_with(b"From:") || data.starts_with(b"Received:") || data.starts_with(b"Return-Path:")
}

fn looks_like_text(data: &[u8]) -> bool {
    if data.is_empty() {
        return false;
    }
    data.iter()
        .take(512)
        .all(|&b| b == b'\n' || b == b'\r' || b == b'\t' || (0x20..0x7f).contains(&b))
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
