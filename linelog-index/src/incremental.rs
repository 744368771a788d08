//! Extend an existing index with lines appended since the cursor.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use crate::codec::{write_entry, SENTINEL};
use crate::error::{io_err, IndexError};
use crate::scan::{line_lengths, TrailingFragment};

/// Result of an incremental update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// New cursor after the update.
    pub cursor: u64,
    /// Entries appended to the index by this update.
    pub appended: u64,
}

/// Index every complete line of `log_path` found after byte `cursor`.
///
/// A trailing fragment with no newline is left for a later call. An empty
/// index file gets the sentinel before any offset. When the scan fails no
/// entry is written and the cursor is not advanced.
pub fn update(log_path: &Path, index_path: &Path, cursor: u64) -> Result<UpdateOutcome, IndexError> {
    let mut log = File::open(log_path).map_err(|e| io_err(log_path, e))?;
    log.seek(SeekFrom::Start(cursor))
        .map_err(|e| io_err(log_path, e))?;

    let mut offsets = Vec::new();
    let mut consumed = 0u64;
    for len in line_lengths(BufReader::new(log), TrailingFragment::Defer) {
        consumed += len.map_err(|e| io_err(log_path, e))?;
        offsets.push(cursor + consumed);
    }

    let index = OpenOptions::new()
        .append(true)
        .create(true)
        .open(index_path)
        .map_err(|e| io_err(index_path, e))?;
    let fresh = index.metadata().map_err(|e| io_err(index_path, e))?.len() == 0;

    let mut index = BufWriter::new(index);
    if fresh {
        write_entry(&mut index, SENTINEL).map_err(|e| io_err(index_path, e))?;
    }
    for offset in &offsets {
        write_entry(&mut index, *offset as i64).map_err(|e| io_err(index_path, e))?;
    }
    index.flush().map_err(|e| io_err(index_path, e))?;

    Ok(UpdateOutcome {
        cursor: cursor + consumed,
        appended: offsets.len() as u64,
    })
}
