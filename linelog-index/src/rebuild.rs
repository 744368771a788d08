//! Full rescan of a log file into a fresh offset index.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;

use crate::codec::{write_entry, SENTINEL};
use crate::error::{io_err, IndexError};
use crate::scan::{line_lengths, TrailingFragment};

/// Result of a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildOutcome {
    /// Byte offset covered by the new index.
    pub cursor: u64,
    /// Number of lines indexed, trailing fragment included.
    pub lines: u64,
}

/// Regenerate the index at `index_path` from the whole of `log_path`.
///
/// Any existing index content is discarded. A trailing fragment with no
/// terminating newline is counted as a line so that a write in flight still
/// gets a provisional offset. A missing log file is indexed as empty.
pub fn rebuild(log_path: &Path, index_path: &Path) -> Result<RebuildOutcome, IndexError> {
    if let Some(dir) = index_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }

    let index = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(index_path)
        .map_err(|e| io_err(index_path, e))?;
    let mut index = BufWriter::new(index);
    write_entry(&mut index, SENTINEL).map_err(|e| io_err(index_path, e))?;

    let log = match File::open(log_path) {
        Ok(file) => Some(file),
        Err(err) if err.kind() == ErrorKind::NotFound => None,
        Err(err) => return Err(io_err(log_path, err)),
    };

    let mut outcome = RebuildOutcome { cursor: 0, lines: 0 };
    if let Some(log) = log {
        for len in line_lengths(BufReader::new(log), TrailingFragment::Count) {
            outcome.cursor += len.map_err(|e| io_err(log_path, e))?;
            outcome.lines += 1;
            write_entry(&mut index, outcome.cursor as i64).map_err(|e| io_err(index_path, e))?;
        }
    }

    index.flush().map_err(|e| io_err(index_path, e))?;
    tracing::debug!(
        log = %log_path.display(),
        lines = outcome.lines,
        cursor = outcome.cursor,
        "offset index rebuilt"
    );
    Ok(outcome)
}
