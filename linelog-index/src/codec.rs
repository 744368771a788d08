//! On-disk encoding of the offset index.
//!
//! The file is a bare sequence of 8-byte little-endian signed integers with no
//! header other than the sentinel entry.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{io_err, IndexError};

/// First entry of every initialized index. Not an offset.
pub const SENTINEL: i64 = 1;

/// Width of one entry in bytes.
pub const ENTRY_SIZE: u64 = 8;

/// Write one encoded entry to `w`.
pub fn write_entry<W: Write>(w: &mut W, value: i64) -> std::io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

/// Append one entry to the index at `path`, creating the file if absent.
pub fn append_offset(path: &Path, value: i64) -> Result<(), IndexError> {
    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map_err(|e| io_err(path, e))?;
    write_entry(&mut file, value).map_err(|e| io_err(path, e))
}

/// Decode the final entry of the index at `path`.
///
/// Fails with [`IndexError::Truncated`] when the file holds less than one
/// entry and with [`IndexError::Corrupt`] when its length is not a whole
/// number of entries.
pub fn read_last_offset(path: &Path) -> Result<i64, IndexError> {
    let mut file = File::open(path).map_err(|e| io_err(path, e))?;
    let len = file.metadata().map_err(|e| io_err(path, e))?.len();
    if len < ENTRY_SIZE {
        return Err(IndexError::Truncated {
            path: path.to_path_buf(),
            len,
        });
    }
    checked_len(path, &file)?;
    file.seek(SeekFrom::End(-(ENTRY_SIZE as i64)))
        .map_err(|e| io_err(path, e))?;
    read_entry(&mut file).map_err(|e| io_err(path, e))
}

/// Number of entries in the index, sentinel included.
pub fn entry_count(path: &Path) -> Result<u64, IndexError> {
    let file = File::open(path).map_err(|e| io_err(path, e))?;
    Ok(checked_len(path, &file)? / ENTRY_SIZE)
}

pub(crate) fn read_entry<R: Read>(r: &mut R) -> std::io::Result<i64> {
    let mut buf = [0u8; ENTRY_SIZE as usize];
    r.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

/// File length, rejecting lengths that are not a multiple of [`ENTRY_SIZE`].
pub(crate) fn checked_len(path: &Path, file: &File) -> Result<u64, IndexError> {
    let len = file.metadata().map_err(|e| io_err(path, e))?.len();
    if len % ENTRY_SIZE != 0 {
        return Err(IndexError::Corrupt {
            path: path.to_path_buf(),
            reason: format!("length {len} is not a multiple of {ENTRY_SIZE}"),
        });
    }
    Ok(len)
}
