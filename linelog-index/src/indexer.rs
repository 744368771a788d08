//! Cursor-owning index state.
//!
//! [`OffsetIndexer`] pairs one log file with its index and remembers how far
//! the log has been indexed. It is not synchronized; the owner serializes
//! access together with the writes to the log.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::codec::{entry_count, read_last_offset, SENTINEL};
use crate::error::{io_err, IndexError};
use crate::incremental::{self, UpdateOutcome};
use crate::rebuild::{self, RebuildOutcome};

/// How the cursor was initialized by [`OffsetIndexer::resume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeSource {
    /// Read from the last entry of an existing index.
    LastEntry,
    /// Produced by a full rebuild.
    Rebuilt,
}

#[derive(Debug)]
pub struct OffsetIndexer {
    log_path: PathBuf,
    index_path: PathBuf,
    cursor: u64,
}

impl OffsetIndexer {
    /// An indexer with the cursor at 0. Nothing is read or written.
    pub fn new(log_path: impl Into<PathBuf>, index_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
            index_path: index_path.into(),
            cursor: 0,
        }
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Byte offset up to which the log has been indexed.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Initialize the cursor at startup.
    ///
    /// Rebuilds when no index exists, when the last entry cannot be decoded,
    /// or when the index points past the end of the log.
    pub fn resume(&mut self) -> Result<ResumeSource, IndexError> {
        if !self.index_path.exists() {
            self.rebuild()?;
            return Ok(ResumeSource::Rebuilt);
        }

        match self.last_indexed_offset() {
            Ok(cursor) => {
                self.cursor = cursor;
                Ok(ResumeSource::LastEntry)
            }
            Err(err) if err.needs_rebuild() => {
                tracing::warn!(
                    index = %self.index_path.display(),
                    error = %err,
                    "offset index unusable, rebuilding"
                );
                self.rebuild()?;
                Ok(ResumeSource::Rebuilt)
            }
            Err(err) => Err(err),
        }
    }

    /// Discard the index and regenerate it from the whole log.
    pub fn rebuild(&mut self) -> Result<RebuildOutcome, IndexError> {
        let outcome = rebuild::rebuild(&self.log_path, &self.index_path)?;
        self.cursor = outcome.cursor;
        Ok(outcome)
    }

    /// Index lines appended since the cursor.
    ///
    /// A log shorter than the cursor has been replaced or truncated behind
    /// our back and is handled like a rotation.
    pub fn update(&mut self) -> Result<UpdateOutcome, IndexError> {
        let log_len = fs::metadata(&self.log_path)
            .map_err(|e| io_err(&self.log_path, e))?
            .len();
        if log_len < self.cursor {
            tracing::warn!(
                log = %self.log_path.display(),
                cursor = self.cursor,
                log_len,
                "log shrank below indexed offset, rebuilding index"
            );
            let rebuilt = self.on_rotate()?;
            return Ok(UpdateOutcome {
                cursor: rebuilt.cursor,
                appended: rebuilt.lines,
            });
        }

        let outcome = incremental::update(&self.log_path, &self.index_path, self.cursor)?;
        self.cursor = outcome.cursor;
        Ok(outcome)
    }

    /// React to the active log file having been rotated: drop the stale
    /// index and rebuild it against the new active file.
    pub fn on_rotate(&mut self) -> Result<RebuildOutcome, IndexError> {
        match fs::remove_file(&self.index_path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => tracing::warn!(
                index = %self.index_path.display(),
                error = %err,
                "failed to remove stale index"
            ),
        }
        self.rebuild()
    }

    fn last_indexed_offset(&self) -> Result<u64, IndexError> {
        let last = read_last_offset(&self.index_path)?;
        let corrupt = |reason: String| IndexError::Corrupt {
            path: self.index_path.clone(),
            reason,
        };

        // A sentinel-only index covers no bytes.
        if entry_count(&self.index_path)? == 1 {
            return if last == SENTINEL {
                Ok(0)
            } else {
                Err(corrupt(format!("first entry is {last}, expected sentinel")))
            };
        }
        if last < 0 {
            return Err(corrupt(format!("negative last offset {last}")));
        }

        let log_len = match fs::metadata(&self.log_path) {
            Ok(meta) => meta.len(),
            Err(err) if err.kind() == ErrorKind::NotFound => 0,
            Err(err) => return Err(io_err(&self.log_path, err)),
        };
        let last = last as u64;
        if last > log_len {
            return Err(corrupt(format!(
                "last offset {last} is past the end of the log ({log_len} bytes)"
            )));
        }
        Ok(last)
    }
}
