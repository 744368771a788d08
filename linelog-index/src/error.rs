//! Error types for linelog-index.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The index file is too short to hold a single entry.
    #[error("index at {path} is truncated ({len} bytes, need at least 8)")]
    Truncated { path: PathBuf, len: u64 },

    /// The index file exists but its content cannot be trusted.
    #[error("index at {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// A line number outside `1..=line_count` was requested.
    #[error("line {line} out of range (index holds {count} lines)")]
    LineOutOfRange { line: u64, count: u64 },
}

impl IndexError {
    /// Whether this error means the index must be rebuilt rather than
    /// reported. Missing files count: there is nothing to resume from.
    pub fn needs_rebuild(&self) -> bool {
        match self {
            IndexError::Truncated { .. } | IndexError::Corrupt { .. } => true,
            IndexError::Io { source, .. } => matches!(
                source.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::UnexpectedEof
            ),
            IndexError::LineOutOfRange { .. } => false,
        }
    }
}

/// Convenience constructor for [`IndexError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> IndexError {
    IndexError::Io {
        path: path.into(),
        source,
    }
}
