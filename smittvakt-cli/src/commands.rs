use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};

use smittvakt_config::SmittvaktConfig;
use smittvakt_detection::{Category, LoadOptions, SignatureStore};
use smittvakt_engine::{strerror, EngineError, ScanEngine, ScanOptions, ScanVerdict};

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a file or directory tree against the signature database
    Scan(ScanArgs),
    /// Load a database source and print its statistics
    DbInfo(DbInfoArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// File or directory to scan
    pub path: PathBuf,

    /// Database file or directory; defaults to the configured directory
    #[arg(short, long)]
    pub database: Option<PathBuf>,

    /// Do not descend into subdirectories
    #[arg(long)]
    pub no_recurse: bool,

    /// Maximum directory depth (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    pub max_depth: u32,

    /// Collect every matching signature instead of stopping at the first
    #[arg(long)]
    pub all_matches: bool,

    /// Do not expand archive members
    #[arg(long)]
    pub no_archive: bool,

    /// Report encrypted archives as detections
    #[arg(long)]
    pub block_encrypted: bool,

    /// Report broken archives and executables as detections
    #[arg(long)]
    pub block_broken: bool,

    /// Parallel scan workers (0 = configured default)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,
}

#[derive(Args, Debug, Clone)]
pub struct DbInfoArgs {
    /// Database file or directory
    pub path: PathBuf,
}

fn engine_error(error: EngineError) -> anyhow::Error {
    let code = error.code();
    anyhow::anyhow!("[{code}] {}: {error}", strerror(code))
}

fn scan_options(args: &ScanArgs) -> ScanOptions {
    let mut options = ScanOptions::STANDARD;
    if args.no_archive {
        options &= !ScanOptions::ARCHIVE;
    }
    if args.all_matches {
        options |= ScanOptions::ALL_MATCHES;
    }
    if args.block_encrypted {
        options |= ScanOptions::BLOCK_ENCRYPTED;
    }
    if args.block_broken {
        options |= ScanOptions::BLOCK_BROKEN;
    }
    options
}

pub async fn run_scan(args: ScanArgs, config: SmittvaktConfig) -> anyhow::Result<ExitCode> {
    let engine =
        Arc::new(ScanEngine::with_config(&config).map_err(engine_error)?);

    let database = args
        .database
        .clone()
        .unwrap_or_else(|| config.database.directory.clone());
    let load_options =
        LoadOptions::from_names(&config.database.options).map_err(|e| engine_error(e.into()))?;

    let summary = engine
        .load_database(&database, load_options)
        .map_err(engine_error)?;
    info!(
        database = %database.display(),
        signatures = summary.admitted,
        "Database loaded and compiled"
    );

    let options = scan_options(&args);
    let started = Instant::now();
    let mut scanned = 0usize;
    let mut infected = 0usize;
    let mut errors = 0usize;

    if args.path.is_dir() {
        let jobs = if args.jobs == 0 {
            config.limits.workers
        } else {
            args.jobs
        };
        let records = engine
            .scan_directory_parallel(&args.path, options, !args.no_recurse, args.max_depth, jobs)
            .await
            .map_err(|e| engine_error(e.into()))?;

        for record in &records {
            println!("{}: {}", record.path.display(), record.verdict);
            tally(&record.verdict, &mut scanned, &mut infected, &mut errors);
        }
    } else {
        let verdict = engine
            .scan_file(&args.path, options)
            .map_err(|e| engine_error(e.into()))?;
        println!("{}: {}", args.path.display(), verdict);
        tally(&verdict, &mut scanned, &mut infected, &mut errors);
    }

    println!("----------- SCAN SUMMARY -----------");
    println!("Known signatures: {}", engine.signature_count());
    println!("Scanned files: {scanned}");
    println!("Infected files: {infected}");
    println!("Errors: {errors}");
    println!("Time: {:.3} sec", started.elapsed().as_secs_f64());

    if config.telemetry.metrics_enabled {
        if let Ok(text) = engine.metrics().gather_metrics() {
            debug!(metrics = %text, "Prometheus exposition");
        }
    }

    Ok(if infected > 0 {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}

fn tally(verdict: &ScanVerdict, scanned: &mut usize, infected: &mut usize, errors: &mut usize) {
    *scanned += 1;
    if verdict.is_infected() {
        *infected += 1;
    } else if verdict.is_error() {
        *errors += 1;
    }
}

pub fn run_dbinfo(args: DbInfoArgs) -> anyhow::Result<ExitCode> {
    // Admit everything so the counts describe the database, not a policy.
    let options = LoadOptions::STANDARD | LoadOptions::PUA | LoadOptions::UNSIGNED_BYTECODE;

    let mut store = SignatureStore::new();
    let summary = store
        .load(&args.path, options)
        .map_err(|e| engine_error(e.into()))?;

    let count_of = |category: Category| store.iter().filter(|s| s.category() == category).count();
    let official = store.iter().filter(|s| s.official()).count();

    println!("Database: {}", args.path.display());
    println!("Files: {}", summary.files);
    println!("Signatures: {}", store.len());
    println!("  standard: {}", count_of(Category::Standard));
    println!("  phishing: {}", count_of(Category::Phishing));
    println!("  pua: {}", count_of(Category::Pua));
    println!("  bytecode: {}", count_of(Category::Bytecode));
    println!("Officially published: {official}");

    Ok(ExitCode::SUCCESS)
}
