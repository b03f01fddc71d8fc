use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use smittvakt_config::NumField;
use smittvakt_detection::LoadOptions;

use super::container::{BROKEN_NAME, ENCRYPTED_NAME};
use super::error::{LimitKind, ScanError};
use super::hooks::{HookDecision, ScanHooks, ScanUnit};
use super::options::ScanOptions;
use super::ScanEngine;
use crate::verdict::ScanVerdict;

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn write_db(dir: &Path, name: &str, records: &[String]) {
    let mut file = std::fs::File::create(dir.join(name)).unwrap();
    for record in records {
        writeln!(file, "{record}").unwrap();
    }
}

/// Engine with the EICAR-style test signature loaded and compiled.
fn eicar_engine() -> (ScanEngine, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    write_db(
        dir.path(),
        "test.sdb",
        &[format!("TEST-SIG:any:standard:{}", hex(b"EICAR-STRING"))],
    );

    let engine = ScanEngine::new();
    let summary = engine
        .load_database(dir.path(), LoadOptions::STANDARD)
        .unwrap();
    assert_eq!(summary.admitted, 1);
    (engine, dir)
}

fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut cursor);
        for (name, data) in entries {
            writer
                .start_file(*name, zip::write::FileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
    }
    cursor.into_inner()
}

fn nested_zip(levels: u32, payload: &[u8]) -> Vec<u8> {
    let mut data = payload.to_vec();
    for level in 0..levels {
        data = zip_bytes(&[(&format!("level{level}"), data.as_slice())]);
    }
    data
}

/// Flip the general-purpose "encrypted" bit in every local and central
/// header of a zip produced by `zip_bytes`.
fn mark_encrypted(mut data: Vec<u8>) -> Vec<u8> {
    let mut offsets = Vec::new();
    for i in 0..data.len().saturating_sub(4) {
        if data[i..i + 4] == *b"PK\x03\x04" {
            offsets.push(i + 6);
        } else if data[i..i + 4] == *b"PK\x01\x02" {
            offsets.push(i + 8);
        }
    }
    for offset in offsets {
        data[offset] |= 1;
    }
    data
}

#[test]
fn clean_and_infected_classification() {
    let (engine, _dir) = eicar_engine();

    match engine.scan_bytes(b"...EICAR-STRING...", ScanOptions::STANDARD) {
        ScanVerdict::Infected { signature } => assert_eq!(signature, "TEST-SIG"),
        other => panic!("expected detection, got {other:?}"),
    }
    assert!(engine
        .scan_bytes(b"hello world", ScanOptions::STANDARD)
        .is_clean());
}

#[test]
fn scan_without_database_is_an_engine_fault() {
    let engine = ScanEngine::new();
    match engine.scan_bytes(b"anything", ScanOptions::STANDARD) {
        ScanVerdict::Error { error } => assert_eq!(error.code(), 50),
        other => panic!("expected engine fault, got {other:?}"),
    }
}

#[test]
fn oversized_stream_errors_before_matching() {
    let (engine, _dir) = eicar_engine();
    engine.set_num(NumField::MaxFileSize, 16).unwrap();

    let big = vec![b'x'; 64];
    match engine.scan_bytes(&big, ScanOptions::STANDARD) {
        ScanVerdict::Error { error } => assert_eq!(
            error,
            ScanError::ResourceLimitExceeded(LimitKind::MaxFileSize)
        ),
        other => panic!("expected limit error, got {other:?}"),
    }
}

#[test]
fn scan_file_maps_io_errors_distinctly() {
    let (engine, _dir) = eicar_engine();
    let err = engine
        .scan_file("/no/such/file", ScanOptions::STANDARD)
        .unwrap_err();
    assert!(matches!(err, ScanError::NotFound { .. }));
}

#[test]
fn oversized_file_is_refused_without_reading() {
    let (engine, _dir) = eicar_engine();
    engine.set_num(NumField::MaxFileSize, 8).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.bin");
    std::fs::write(&path, vec![0u8; 1024]).unwrap();

    let verdict = engine.scan_file(&path, ScanOptions::STANDARD).unwrap();
    assert_eq!(
        verdict,
        ScanVerdict::Error {
            error: ScanError::ResourceLimitExceeded(LimitKind::MaxFileSize)
        }
    );
}

#[test]
fn settings_apply_at_the_next_scan_boundary() {
    let (engine, _dir) = eicar_engine();
    let data = vec![b'x'; 64];
    assert!(engine.scan_bytes(&data, ScanOptions::STANDARD).is_clean());

    engine.set_num(NumField::MaxFileSize, 16).unwrap();
    assert!(engine.scan_bytes(&data, ScanOptions::STANDARD).is_error());
}

#[test]
fn two_fresh_loads_match_identically() {
    let dir = tempfile::tempdir().unwrap();
    write_db(
        dir.path(),
        "a.sdb",
        &[
            format!("Sig.One:any:standard:{}", hex(b"oneoneone")),
            format!("Sig.Two:text:standard:{}", hex(b"twotwotwo")),
        ],
    );
    write_db(
        dir.path(),
        "b.sdb",
        &[format!("Sig.Three:any:standard:{}", hex(b"threethree"))],
    );

    let first = ScanEngine::new();
    first.load_database(dir.path(), LoadOptions::STANDARD).unwrap();
    let second = ScanEngine::new();
    second
        .load_database(dir.path(), LoadOptions::STANDARD)
        .unwrap();

    let probes: [&[u8]; 4] = [
        b"zzz oneoneone zzz",
        b"twotwotwo",
        b"threethree and oneoneone",
        b"nothing of note",
    ];
    for probe in probes {
        assert_eq!(
            first.scan_bytes(probe, ScanOptions::STANDARD),
            second.scan_bytes(probe, ScanOptions::STANDARD),
        );
    }
}

#[test]
fn archive_members_are_scanned() {
    let (engine, _dir) = eicar_engine();
    let archive = zip_bytes(&[
        ("clean.txt", b"nothing here".as_slice()),
        ("bad.txt", b"prefix EICAR-STRING suffix".as_slice()),
    ]);

    match engine.scan_bytes(&archive, ScanOptions::STANDARD) {
        ScanVerdict::Infected { signature } => assert_eq!(signature, "TEST-SIG"),
        other => panic!("expected member detection, got {other:?}"),
    }

    // Without the archive flag the container is opaque.
    assert!(engine
        .scan_bytes(&archive, ScanOptions::empty())
        .is_clean());
}

#[test]
fn recursion_bound_truncates_expansion() {
    let (engine, _dir) = eicar_engine();
    let nested = nested_zip(3, b"xx EICAR-STRING xx");

    engine.set_num(NumField::MaxRecursion, 2).unwrap();
    assert!(engine.scan_bytes(&nested, ScanOptions::STANDARD).is_clean());

    engine.set_num(NumField::MaxRecursion, 3).unwrap();
    assert!(engine
        .scan_bytes(&nested, ScanOptions::STANDARD)
        .is_infected());
}

#[test]
fn member_budget_is_fatal_for_the_unit() {
    let (engine, _dir) = eicar_engine();
    engine.set_num(NumField::MaxFiles, 2).unwrap();

    let archive = zip_bytes(&[
        ("a", b"one".as_slice()),
        ("b", b"two".as_slice()),
        ("c", b"three".as_slice()),
    ]);
    match engine.scan_bytes(&archive, ScanOptions::STANDARD) {
        ScanVerdict::Error { error } => assert_eq!(
            error,
            ScanError::ResourceLimitExceeded(LimitKind::MaxFiles)
        ),
        other => panic!("expected max-files error, got {other:?}"),
    }
}

#[test]
fn encrypted_archive_blocking() {
    let (engine, _dir) = eicar_engine();
    let encrypted = mark_encrypted(zip_bytes(&[("secret", b"payload".as_slice())]));

    match engine.scan_bytes(
        &encrypted,
        ScanOptions::STANDARD | ScanOptions::BLOCK_ENCRYPTED,
    ) {
        ScanVerdict::Infected { signature } => assert_eq!(signature, ENCRYPTED_NAME),
        other => panic!("expected encrypted detection, got {other:?}"),
    }

    // Without the flag the anomaly passes silently.
    assert!(engine
        .scan_bytes(&encrypted, ScanOptions::STANDARD)
        .is_clean());
}

#[test]
fn broken_archive_blocking() {
    let (engine, _dir) = eicar_engine();
    let broken = b"PK\x03\x04this is not a real archive at all".to_vec();

    match engine.scan_bytes(&broken, ScanOptions::STANDARD | ScanOptions::BLOCK_BROKEN) {
        ScanVerdict::Infected { signature } => assert_eq!(signature, BROKEN_NAME),
        other => panic!("expected broken detection, got {other:?}"),
    }
    assert!(engine
        .scan_bytes(&broken, ScanOptions::STANDARD)
        .is_clean());
}

#[test]
fn all_matches_collects_every_hit() {
    let dir = tempfile::tempdir().unwrap();
    write_db(
        dir.path(),
        "multi.sdb",
        &[
            format!("Sig.Alpha:any:standard:{}", hex(b"alpha-pattern")),
            format!("Sig.Beta:any:standard:{}", hex(b"beta-pattern")),
        ],
    );
    let engine = ScanEngine::new();
    engine
        .load_database(dir.path(), LoadOptions::STANDARD)
        .unwrap();

    let data = b"alpha-pattern then beta-pattern then alpha-pattern";
    let (verdict, matches) =
        engine.scan_bytes_all(data, ScanOptions::STANDARD | ScanOptions::ALL_MATCHES);
    assert!(verdict.is_infected());
    assert_eq!(matches.len(), 3);
    assert_eq!(matches[0].signature, "Sig.Alpha");
    assert_eq!(matches[0].offset, 0);

    // Without the option the first hit settles the unit.
    let (_, first_only) = engine.scan_bytes_all(data, ScanOptions::STANDARD);
    assert_eq!(first_only.len(), 1);
}

struct Whitelist;
impl ScanHooks for Whitelist {
    fn pre_scan(&self, _unit: &ScanUnit<'_>) -> HookDecision {
        HookDecision::Clean
    }
}

struct Blacklist;
impl ScanHooks for Blacklist {
    fn pre_scan(&self, _unit: &ScanUnit<'_>) -> HookDecision {
        HookDecision::Infected("Hook.Blacklist".to_string())
    }
}

struct PostOverride;
impl ScanHooks for PostOverride {
    fn post_scan(&self, _unit: &ScanUnit<'_>, verdict: &ScanVerdict) -> HookDecision {
        if verdict.is_infected() {
            HookDecision::Clean
        } else {
            HookDecision::Continue
        }
    }
}

#[test]
fn pre_scan_hook_short_circuits() {
    let (engine, _dir) = eicar_engine();

    engine.set_hooks(Arc::new(Whitelist));
    assert!(engine
        .scan_bytes(b"EICAR-STRING", ScanOptions::STANDARD)
        .is_clean());

    engine.set_hooks(Arc::new(Blacklist));
    match engine.scan_bytes(b"harmless", ScanOptions::STANDARD) {
        ScanVerdict::Infected { signature } => assert_eq!(signature, "Hook.Blacklist"),
        other => panic!("expected blacklist detection, got {other:?}"),
    }

    engine.clear_hooks();
    assert!(engine
        .scan_bytes(b"EICAR-STRING", ScanOptions::STANDARD)
        .is_infected());
}

#[test]
fn post_scan_hook_overrides_the_verdict() {
    let (engine, _dir) = eicar_engine();
    engine.set_hooks(Arc::new(PostOverride));
    assert!(engine
        .scan_bytes(b"EICAR-STRING", ScanOptions::STANDARD)
        .is_clean());
}

struct SlowHook;
impl ScanHooks for SlowHook {
    fn pre_scan(&self, _unit: &ScanUnit<'_>) -> HookDecision {
        std::thread::sleep(Duration::from_millis(20));
        HookDecision::Continue
    }
}

#[test]
fn deadline_cancels_the_unit() {
    let (engine, _dir) = eicar_engine();
    engine.set_num(NumField::TimeLimit, 1).unwrap();
    engine.set_hooks(Arc::new(SlowHook));

    match engine.scan_bytes(b"whatever", ScanOptions::STANDARD) {
        ScanVerdict::Error { error } => assert_eq!(
            error,
            ScanError::ResourceLimitExceeded(LimitKind::Timeout)
        ),
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[test]
fn recompile_invalidates_the_clean_cache() {
    let dir = tempfile::tempdir().unwrap();
    write_db(
        dir.path(),
        "first.sdb",
        &[format!("Sig.Old:any:standard:{}", hex(b"old-pattern"))],
    );
    let engine = ScanEngine::new();
    engine
        .load_database(dir.path(), LoadOptions::STANDARD)
        .unwrap();

    let probe = b"fresh-pattern in here";
    assert!(engine.scan_bytes(probe, ScanOptions::STANDARD).is_clean());

    write_db(
        dir.path(),
        "second.sdb",
        &[format!("Sig.New:any:standard:{}", hex(b"fresh-pattern"))],
    );
    engine
        .load_database(dir.path(), LoadOptions::STANDARD)
        .unwrap();

    assert!(engine.scan_bytes(probe, ScanOptions::STANDARD).is_infected());
}

fn scan_fixture_tree() -> (tempfile::TempDir, usize) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("clean.txt"), b"nothing").unwrap();
    std::fs::write(dir.path().join("bad.txt"), b"EICAR-STRING").unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    std::fs::write(dir.path().join("sub/also-bad.txt"), b"xx EICAR-STRING").unwrap();
    std::fs::write(dir.path().join("sub/huge.bin"), vec![0u8; 4096]).unwrap();
    (dir, 4)
}

#[test]
fn directory_scan_isolates_per_file_failures() {
    let (engine, _db) = eicar_engine();
    engine.set_num(NumField::MaxFileSize, 1024).unwrap();
    let (dir, total) = scan_fixture_tree();

    let records = engine
        .scan_directory(dir.path(), ScanOptions::STANDARD, true, 0)
        .unwrap();
    assert_eq!(records.len(), total);

    let infected = records.iter().filter(|r| r.verdict.is_infected()).count();
    let errors = records.iter().filter(|r| r.verdict.is_error()).count();
    let clean = records.iter().filter(|r| r.verdict.is_clean()).count();
    assert_eq!(infected, 2);
    assert_eq!(errors, 1); // huge.bin trips the size limit, walk continues
    assert_eq!(clean, 1);
}

#[test]
fn missing_directory_root_propagates() {
    let (engine, _db) = eicar_engine();
    let err = engine
        .scan_directory("/no/such/root", ScanOptions::STANDARD, true, 0)
        .unwrap_err();
    assert!(matches!(err, ScanError::NotFound { .. }));
}

#[tokio::test]
async fn parallel_directory_scan_matches_sequential() {
    let (engine, _db) = eicar_engine();
    engine.set_num(NumField::MaxFileSize, 1024).unwrap();
    let engine = Arc::new(engine);
    let (dir, total) = scan_fixture_tree();

    let records = engine
        .scan_directory_parallel(dir.path(), ScanOptions::STANDARD, true, 0, 4)
        .await
        .unwrap();
    assert_eq!(records.len(), total);

    let infected = records.iter().filter(|r| r.verdict.is_infected()).count();
    assert_eq!(infected, 2);
}

#[test]
fn metrics_track_scans() {
    let (engine, _dir) = eicar_engine();
    engine.scan_bytes(b"clean data", ScanOptions::STANDARD);
    engine.scan_bytes(b"EICAR-STRING", ScanOptions::STANDARD);

    let text = engine.metrics().gather_metrics().unwrap();
    assert!(text.contains("smittvakt_files_scanned_total 2"));
    assert!(text.contains("smittvakt_infected_total 1"));
}
