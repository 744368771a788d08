//! Random access through the index, and consistency checks against the log.

use std::fs::{self, File};
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::Path;

use crate::codec::{checked_len, read_entry, ENTRY_SIZE, SENTINEL};
use crate::error::{io_err, IndexError};

/// Decode every entry of the index, sentinel included.
pub fn read_offsets(path: &Path) -> Result<Vec<i64>, IndexError> {
    let file = File::open(path).map_err(|e| io_err(path, e))?;
    let count = checked_len(path, &file)? / ENTRY_SIZE;
    let mut reader = BufReader::new(file);
    (0..count)
        .map(|_| read_entry(&mut reader).map_err(|e| io_err(path, e)))
        .collect()
}

/// Read the `k`-th entry (0 is the sentinel). `None` past the end.
pub fn entry_at(path: &Path, k: u64) -> Result<Option<i64>, IndexError> {
    let mut file = File::open(path).map_err(|e| io_err(path, e))?;
    let count = checked_len(path, &file)? / ENTRY_SIZE;
    if k >= count {
        return Ok(None);
    }
    file.seek(SeekFrom::Start(k * ENTRY_SIZE))
        .map_err(|e| io_err(path, e))?;
    read_entry(&mut file).map(Some).map_err(|e| io_err(path, e))
}

/// Lines covered by the index.
pub fn line_count(path: &Path) -> Result<u64, IndexError> {
    Ok(crate::codec::entry_count(path)?.saturating_sub(1))
}

/// Byte range of line `n` (1-based) in the log.
pub fn line_span(index: &Path, n: u64) -> Result<Range<u64>, IndexError> {
    let count = line_count(index)?;
    if n == 0 || n > count {
        return Err(IndexError::LineOutOfRange { line: n, count });
    }
    let start = if n == 1 {
        0
    } else {
        offset_entry(index, n - 1)?
    };
    let end = offset_entry(index, n)?;
    if end < start {
        return Err(IndexError::Corrupt {
            path: index.to_path_buf(),
            reason: format!("entry {n} ({end}) precedes entry {} ({start})", n - 1),
        });
    }
    Ok(start..end)
}

/// Bytes of line `n` (1-based), newline included when present.
pub fn read_line(log: &Path, index: &Path, n: u64) -> Result<Vec<u8>, IndexError> {
    let span = line_span(index, n)?;
    let mut file = File::open(log).map_err(|e| io_err(log, e))?;
    file.seek(SeekFrom::Start(span.start))
        .map_err(|e| io_err(log, e))?;
    let mut buf = vec![0u8; (span.end - span.start) as usize];
    file.read_exact(&mut buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => IndexError::Corrupt {
            path: index.to_path_buf(),
            reason: format!("line {n} ends past the end of {}", log.display()),
        },
        _ => io_err(log, e),
    })?;
    Ok(buf)
}

fn offset_entry(index: &Path, k: u64) -> Result<u64, IndexError> {
    match entry_at(index, k)? {
        Some(v) if v >= 0 => Ok(v as u64),
        Some(v) => Err(IndexError::Corrupt {
            path: index.to_path_buf(),
            reason: format!("negative offset {v} at entry {k}"),
        }),
        None => Err(IndexError::Corrupt {
            path: index.to_path_buf(),
            reason: format!("entry {k} missing"),
        }),
    }
}

/// How the index relates to the current length of its log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexHealth {
    /// Last offset equals the log length.
    Consistent,
    /// The log holds bytes the index does not cover yet.
    Behind { unindexed: u64 },
    /// The index points past the end of the log (log replaced or truncated).
    Ahead { excess: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub entries: u64,
    pub lines: u64,
    pub last_offset: u64,
    pub log_len: u64,
    pub health: IndexHealth,
}

/// Check that the index starts with the sentinel and never decreases, and
/// compare its last offset with the length of the log.
pub fn verify(log: &Path, index: &Path) -> Result<VerifyReport, IndexError> {
    let offsets = read_offsets(index)?;
    let corrupt = |reason: String| IndexError::Corrupt {
        path: index.to_path_buf(),
        reason,
    };

    match offsets.first() {
        Some(&SENTINEL) => {}
        Some(other) => return Err(corrupt(format!("first entry is {other}, expected sentinel"))),
        None => return Err(corrupt("index is empty".to_string())),
    }

    let mut last = 0i64;
    for (k, &value) in offsets.iter().enumerate().skip(1) {
        if value < last {
            return Err(corrupt(format!("entry {k} ({value}) is below entry {} ({last})", k - 1)));
        }
        last = value;
    }
    let last_offset = last as u64;

    let log_len = match fs::metadata(log) {
        Ok(meta) => meta.len(),
        Err(err) if err.kind() == ErrorKind::NotFound => 0,
        Err(err) => return Err(io_err(log, err)),
    };

    let health = if last_offset == log_len {
        IndexHealth::Consistent
    } else if last_offset < log_len {
        IndexHealth::Behind {
            unindexed: log_len - last_offset,
        }
    } else {
        IndexHealth::Ahead {
            excess: last_offset - log_len,
        }
    };

    Ok(VerifyReport {
        entries: offsets.len() as u64,
        lines: offsets.len() as u64 - 1,
        last_offset,
        log_len,
        health,
    })
}
