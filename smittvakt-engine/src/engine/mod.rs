//! ## smittvakt-engine::engine
//! **Scan orchestration**
//!
//! One `ScanEngine` owns a settings registry, a signature store, the
//! published matcher slot, optional hooks, the clean-file cache, and a
//! metrics recorder. Engines are independent: nothing mutable is shared
//! across instances, and the process-wide bring-up runs exactly once.

pub(crate) mod cache;
pub(crate) mod container;
pub(crate) mod context;
pub mod error;
pub(crate) mod filetype;
pub mod hooks;
pub mod options;
pub(crate) mod scanner;

#[cfg(test)]
mod tests;

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use smittvakt_config::{
    EngineSettings, NumField, SettingError, SmittvaktConfig, StrField,
};
use smittvakt_detection::{
    CompiledMatcher, LoadOptions, LoadSummary, MatcherParams, SignatureStore,
};
use smittvakt_telemetry::{EventLogger, MetricsRecorder};

use crate::fs::DirWalker;
use crate::verdict::{FileScanRecord, MatchRecord, ScanVerdict};

use self::cache::CleanCache;
use self::context::{ScanContext, ScanLimits};
use self::error::{EngineError, LimitKind, ScanError};
use self::hooks::ScanHooks;
use self::options::ScanOptions;
use self::scanner::{ScanOutcome, ScanPass};

static ENGINE_INIT: OnceCell<()> = OnceCell::new();

/// Process-wide bring-up, run lazily before the first engine is
/// constructed. Idempotent; later calls are no-ops.
fn ensure_initialized() {
    ENGINE_INIT.get_or_init(|| {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            "Scan engine runtime initialized"
        );
    });
}

/// A signature-matching scan engine instance.
pub struct ScanEngine {
    settings: RwLock<EngineSettings>,
    store: Mutex<SignatureStore>,
    /// Published matcher; replaced whole so in-flight scans keep their Arc.
    matcher: RwLock<Option<Arc<CompiledMatcher>>>,
    /// Bumped on every publish; stale clean-cache keys die with the epoch.
    matcher_epoch: AtomicU64,
    hooks: RwLock<Option<Arc<dyn ScanHooks>>>,
    cache: CleanCache,
    metrics: MetricsRecorder,
}

impl Default for ScanEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanEngine {
    pub fn new() -> Self {
        ensure_initialized();
        Self {
            settings: RwLock::new(EngineSettings::new()),
            store: Mutex::new(SignatureStore::new()),
            matcher: RwLock::new(None),
            matcher_epoch: AtomicU64::new(0),
            hooks: RwLock::new(None),
            cache: CleanCache::new(),
            metrics: MetricsRecorder::new(),
        }
    }

    /// Construct with a registry seeded from loaded configuration.
    pub fn with_config(config: &SmittvaktConfig) -> Result<Self, EngineError> {
        let engine = Self::new();
        *engine.settings.write() = config.engine_settings()?;
        Ok(engine)
    }

    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    pub fn set_hooks(&self, hooks: Arc<dyn ScanHooks>) {
        *self.hooks.write() = Some(hooks);
    }

    pub fn clear_hooks(&self) {
        *self.hooks.write() = None;
    }

    // Settings registry passthroughs. Writes apply at the next
    // compile/scan boundary.

    pub fn get_num(&self, field: NumField) -> u64 {
        self.settings.read().get_num(field)
    }

    pub fn set_num(&self, field: NumField, value: i64) -> Result<(), SettingError> {
        self.settings.write().set_num(field, value)
    }

    pub fn get_str(&self, field: StrField) -> String {
        self.settings.read().get_str(field).to_string()
    }

    pub fn set_str(&self, field: StrField, value: &str) -> Result<(), SettingError> {
        self.settings.write().set_str(field, value)
    }

    /// Signatures currently in the store (loaded, not necessarily
    /// published).
    pub fn signature_count(&self) -> usize {
        self.store.lock().len()
    }

    /// Load a database source and publish a fresh matcher, mirroring the
    /// load-then-compile pairing of the classic engine API. Failures
    /// propagate; there is no silent fallback.
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn load_database(
        &self,
        path: impl AsRef<Path>,
        options: LoadOptions,
    ) -> Result<LoadSummary, EngineError> {
        let summary = self.store.lock().load(path.as_ref(), options)?;
        self.compile()?;
        Ok(summary)
    }

    /// Freeze the store, compile, and atomically publish the replacement
    /// matcher. In-flight scans keep the previous one until they finish.
    pub fn compile(&self) -> Result<(), EngineError> {
        let frozen = self.store.lock().freeze();
        let params = {
            let settings = self.settings.read();
            MatcherParams {
                min_depth: settings.get_num(NumField::AcMinDepth) as u32,
                max_depth: settings.get_num(NumField::AcMaxDepth) as u32,
                max_memory: settings.get_num(NumField::MaxMatcherMemory),
            }
        };

        let compiled = Arc::new(CompiledMatcher::compile(&frozen, params)?);
        *self.matcher.write() = Some(compiled);
        let epoch = self.matcher_epoch.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(epoch, signatures = frozen.len(), "Published matcher");
        Ok(())
    }

    fn current_matcher(&self) -> Result<Arc<CompiledMatcher>, ScanError> {
        self.matcher.read().clone().ok_or_else(|| {
            ScanError::EngineFault("no compiled matcher; load a database first".to_string())
        })
    }

    /// Scan an in-memory unit.
    pub fn scan_bytes(&self, data: &[u8], options: ScanOptions) -> ScanVerdict {
        self.scan_outcome(data, options, None).verdict
    }

    /// Scan an in-memory unit and report every collected hit (pair with
    /// [`ScanOptions::ALL_MATCHES`]).
    pub fn scan_bytes_all(
        &self,
        data: &[u8],
        options: ScanOptions,
    ) -> (ScanVerdict, Vec<MatchRecord>) {
        let outcome = self.scan_outcome(data, options, None);
        (outcome.verdict, outcome.matches)
    }

    fn scan_outcome(
        &self,
        data: &[u8],
        options: ScanOptions,
        origin: Option<&Path>,
    ) -> ScanOutcome {
        let matcher = match self.current_matcher() {
            Ok(matcher) => matcher,
            Err(error) => {
                return ScanOutcome {
                    verdict: ScanVerdict::Error { error },
                    matches: Vec::new(),
                }
            }
        };

        let limits = ScanLimits::from_settings(&self.settings.read());
        let hooks = self.hooks.read().clone();
        let mut ctx = ScanContext::new(limits);
        let pass = ScanPass {
            matcher: &matcher,
            options,
            hooks: hooks.as_deref(),
            cache: &self.cache,
            cache_epoch: self.matcher_epoch.load(Ordering::Acquire),
        };

        let started = Instant::now();
        let outcome = scanner::scan_unit(&pass, data, origin, &mut ctx);

        self.metrics.inc_files_scanned();
        self.metrics
            .observe_scan_latency_ns(started.elapsed().as_nanos() as f64);
        if let ScanVerdict::Infected { signature } = &outcome.verdict {
            self.metrics.inc_infected();
            let shown_origin = origin
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "memory".to_string());
            EventLogger::log_detection(&shown_origin, signature);
        }
        outcome
    }

    /// Open and scan one file. IO failures on the open/read path are
    /// returned as `Err`, distinct from scan-level error verdicts.
    #[instrument(skip(self, options), fields(path = %path.as_ref().display()))]
    pub fn scan_file(
        &self,
        path: impl AsRef<Path>,
        options: ScanOptions,
    ) -> Result<ScanVerdict, ScanError> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|e| ScanError::from_io(path, e))?;
        if !metadata.is_file() {
            return Err(ScanError::Io {
                path: path.to_path_buf(),
                message: "not a regular file".to_string(),
            });
        }

        // Size-check before reading: an oversized file is refused without
        // pulling its body through the matcher.
        let max_file_size = self.settings.read().get_num(NumField::MaxFileSize);
        if metadata.len() > max_file_size {
            return Ok(ScanVerdict::Error {
                error: ScanError::ResourceLimitExceeded(LimitKind::MaxFileSize),
            });
        }

        let data = std::fs::read(path).map_err(|e| ScanError::from_io(path, e))?;
        Ok(self.scan_outcome(&data, options, Some(path)).verdict)
    }

    /// Walk a directory tree and scan every file, sequentially. Per-file
    /// failures become `Error` records in the result stream; the walk is
    /// never aborted by one bad file.
    #[instrument(skip(self, options), fields(root = %root.as_ref().display()))]
    pub fn scan_directory(
        &self,
        root: impl AsRef<Path>,
        options: ScanOptions,
        recurse: bool,
        max_depth: u32,
    ) -> Result<Vec<FileScanRecord>, ScanError> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(ScanError::NotFound {
                path: root.to_path_buf(),
            });
        }

        let mut records = Vec::new();
        for item in DirWalker::new(root, max_depth, recurse) {
            records.push(self.scan_walk_item(item, options));
        }
        Ok(records)
    }

    /// Parallel variant: N worker tasks over the walked file list, joined
    /// before the aggregate is returned. Record order is not guaranteed.
    #[instrument(skip(self, options), fields(root = %root.as_ref().display(), jobs))]
    pub async fn scan_directory_parallel(
        self: &Arc<Self>,
        root: impl AsRef<Path>,
        options: ScanOptions,
        recurse: bool,
        max_depth: u32,
        jobs: usize,
    ) -> Result<Vec<FileScanRecord>, ScanError> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(ScanError::NotFound {
                path: root.to_path_buf(),
            });
        }

        let jobs = jobs.max(1);
        let mut records = Vec::new();
        let mut files = Vec::new();
        for item in DirWalker::new(root, max_depth, recurse) {
            match item {
                Ok(path) => files.push(path),
                Err(error) => records.push(walk_error_record(error)),
            }
        }

        let chunk_size = files.len().div_ceil(jobs).max(1);
        let mut tasks = Vec::new();
        for chunk in files.chunks(chunk_size) {
            let engine = Arc::clone(self);
            let chunk = chunk.to_vec();
            tasks.push(tokio::task::spawn_blocking(move || {
                chunk
                    .into_iter()
                    .map(|path| {
                        let verdict = match engine.scan_file(&path, options) {
                            Ok(verdict) => verdict,
                            Err(error) => ScanVerdict::Error { error },
                        };
                        FileScanRecord { path, verdict }
                    })
                    .collect::<Vec<_>>()
            }));
        }

        for task in tasks {
            match task.await {
                Ok(chunk_records) => records.extend(chunk_records),
                Err(error) => {
                    warn!(%error, "Scan worker task failed");
                    return Err(ScanError::EngineFault(format!(
                        "scan worker panicked: {error}"
                    )));
                }
            }
        }
        Ok(records)
    }

    fn scan_walk_item(
        &self,
        item: Result<std::path::PathBuf, crate::fs::WalkError>,
        options: ScanOptions,
    ) -> FileScanRecord {
        match item {
            Ok(path) => {
                let verdict = match self.scan_file(&path, options) {
                    Ok(verdict) => verdict,
                    Err(error) => ScanVerdict::Error { error },
                };
                FileScanRecord { path, verdict }
            }
            Err(error) => walk_error_record(error),
        }
    }
}

fn walk_error_record(error: crate::fs::WalkError) -> FileScanRecord {
    let path = error.path.clone();
    FileScanRecord {
        path: path.clone(),
        verdict: ScanVerdict::Error {
            error: ScanError::from_io(&path, error.source),
        },
    }
}
