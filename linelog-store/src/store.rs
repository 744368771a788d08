//! The log store: one lock around {file write, index update}.

use std::cell::Cell;
use std::io::Write;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{Local, NaiveDateTime};

use linelog_index::lookup;
use linelog_index::{OffsetIndexer, RebuildOutcome};

use crate::catalog::{list_log_files, LogFileDescriptor};
use crate::config::{ConsoleTarget, StoreConfig};
use crate::error::{io_err, CatalogError, StoreError};
use crate::paths::{index_file_path, log_file_path, platform_provider, PathProvider};
use crate::record::{render_line, std_fields, Fields, Level};
use crate::rotation::RotatingFile;

thread_local! {
    static HOLDING_SINK: Cell<bool> = const { Cell::new(false) };
}

/// Whether the current thread holds a store's sink lock. Records emitted
/// in that state (the store's own diagnostics) cannot be stored.
pub(crate) fn holding_sink() -> bool {
    HOLDING_SINK.with(Cell::get)
}

/// Sink lock guard that marks the thread as holding it.
struct SinkGuard<'a> {
    sink: MutexGuard<'a, Sink>,
}

impl Deref for SinkGuard<'_> {
    type Target = Sink;

    fn deref(&self) -> &Sink {
        &self.sink
    }
}

impl DerefMut for SinkGuard<'_> {
    fn deref_mut(&mut self) -> &mut Sink {
        &mut self.sink
    }
}

impl Drop for SinkGuard<'_> {
    fn drop(&mut self) {
        HOLDING_SINK.with(|held| held.set(false));
    }
}

/// State guarded by the sink lock.
#[derive(Debug)]
struct Sink {
    file: RotatingFile,
    indexer: OffsetIndexer,
}

impl Sink {
    fn append(&mut self, line: &[u8]) -> Result<(), StoreError> {
        let Sink { file, indexer } = self;
        file.write_line(line, &mut *indexer)
            .map_err(|e| io_err(file.path(), e))?;
        indexer.update()?;
        Ok(())
    }
}

/// Indexed, rotating log file shared by every caller in the process.
///
/// Construct once and share by reference or `Arc`. Logging through a store
/// never fails the caller: write and index errors are reported as `tracing`
/// warnings and the record is dropped from the file.
#[derive(Debug)]
pub struct LogStore {
    config: StoreConfig,
    log_dir: PathBuf,
    std_fields: Fields,
    sink: Mutex<Sink>,
}

impl LogStore {
    /// Open a store in the platform's default log directory (unless the
    /// config names one).
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        Self::open_with(config, platform_provider().as_ref())
    }

    /// Open a store, resolving the log directory through `provider`.
    ///
    /// Only an invalid config is an error. The index is resumed from its
    /// last entry or rebuilt; a failure there is reported and the store
    /// still opens.
    pub fn open_with(config: StoreConfig, provider: &dyn PathProvider) -> Result<Self, StoreError> {
        config.validate()?;
        let log_dir = config.resolve_log_dir(provider);
        let log_path = log_file_path(&log_dir, &config.app_name);
        let index_path = index_file_path(&log_dir, &config.app_name);

        let mut indexer = OffsetIndexer::new(&log_path, &index_path);
        match indexer.resume() {
            Ok(source) => tracing::debug!(
                log = %log_path.display(),
                cursor = indexer.cursor(),
                ?source,
                "offset index ready"
            ),
            Err(err) => tracing::warn!(
                index = %index_path.display(),
                error = %err,
                "offset index unavailable at startup"
            ),
        }

        let file = RotatingFile::new(&log_path, config.app_name.clone(), config.rotation.clone());
        Ok(Self {
            std_fields: std_fields(),
            log_dir,
            sink: Mutex::new(Sink { file, indexer }),
            config,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn log_path(&self) -> PathBuf {
        log_file_path(&self.log_dir, &self.config.app_name)
    }

    pub fn index_path(&self) -> PathBuf {
        index_file_path(&self.log_dir, &self.config.app_name)
    }

    /// Byte offset up to which the active log file is indexed.
    pub fn cursor(&self) -> u64 {
        self.lock().indexer.cursor()
    }

    pub fn info(&self, message: &str) {
        self.emit(Level::Info, message, &Fields::new());
    }

    pub fn warning(&self, message: &str) {
        self.emit(Level::Warning, message, &Fields::new());
    }

    pub fn error(&self, message: &str) {
        self.emit(Level::Error, message, &Fields::new());
    }

    /// Record `message` now.
    pub fn emit(&self, level: Level, message: &str, fields: &Fields) {
        self.emit_at(Local::now().naive_local(), level, message, fields);
    }

    /// Record `message` with an explicit timestamp.
    ///
    /// The file write and its index update happen under the sink lock; the
    /// console copy is written after the lock is released. Records emitted
    /// on a thread already inside the sink lock are dropped.
    pub fn emit_at(&self, ts: NaiveDateTime, level: Level, message: &str, fields: &Fields) {
        if level < self.config.level || holding_sink() {
            return;
        }

        let mut merged = self.std_fields.clone();
        merged.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        let line = render_line(ts, level, &merged, message);

        {
            let mut sink = self.lock();
            if let Err(err) = sink.append(line.as_bytes()) {
                tracing::warn!(error = %err, "log record dropped");
            }
        }

        self.write_console(&line);
    }

    /// Rotation event from an external rotation component: the active file
    /// has been replaced. Reopens the file and rebuilds the index.
    pub fn on_rotate(&self) {
        let mut sink = self.lock();
        sink.file.reopen();
        if let Err(err) = sink.indexer.on_rotate() {
            tracing::warn!(error = %err, "index rebuild after rotation failed");
        }
    }

    /// Rebuild the index from the whole active file.
    pub fn rebuild_index(&self) -> Result<RebuildOutcome, StoreError> {
        Ok(self.lock().indexer.rebuild()?)
    }

    /// Lines covered by the index of the active file.
    pub fn line_count(&self) -> Result<u64, StoreError> {
        let _sink = self.lock();
        Ok(lookup::line_count(&self.index_path())?)
    }

    /// Bytes of line `n` (1-based) of the active file, located via the index.
    pub fn read_line(&self, n: u64) -> Result<Vec<u8>, StoreError> {
        let _sink = self.lock();
        Ok(lookup::read_line(&self.log_path(), &self.index_path(), n)?)
    }

    /// Describe the log files in this store's directory.
    pub fn catalog(&self) -> Result<Vec<LogFileDescriptor>, CatalogError> {
        list_log_files(&self.log_dir)
    }

    fn lock(&self) -> SinkGuard<'_> {
        let sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        HOLDING_SINK.with(|held| held.set(true));
        SinkGuard { sink }
    }

    fn write_console(&self, line: &str) {
        match self.config.console {
            ConsoleTarget::Stdout => std::io::stdout().lock().write_all(line.as_bytes()).ok(),
            ConsoleTarget::Stderr => std::io::stderr().lock().write_all(line.as_bytes()).ok(),
            ConsoleTarget::Off => None,
        };
    }
}
