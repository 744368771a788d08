//! Listing of the log files in a log directory.
//!
//! Start time comes from the first line of each file, end time from its
//! modification time. Nothing is cached; every call reads the directory.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::{DateTime, Local, NaiveDateTime};
use serde::Serialize;

use crate::error::{catalog_io_err, CatalogError};
use crate::paths::LOG_EXTENSION;
use crate::record::{parse_timestamp, TIMESTAMP_WIDTH};

/// ISO-8601 local wall-clock time without offset.
pub const CATALOG_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// ISO-8601 local time with UTC offset, the serialized form of catalog times.
pub const CATALOG_ZONED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogFileDescriptor {
    pub name: String,
    pub size: u64,
    #[serde(with = "catalog_time")]
    pub start_time: NaiveDateTime,
    #[serde(with = "catalog_time")]
    pub end_time: NaiveDateTime,
}

/// Describe every `*.log` file in `dir`, ordered by start time then name.
///
/// Fails as a whole if any file cannot be read or its first line does not
/// start with a timestamp.
pub fn list_log_files(dir: &Path) -> Result<Vec<LogFileDescriptor>, CatalogError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| catalog_io_err(dir, e))? {
        let entry = entry.map_err(|e| catalog_io_err(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| catalog_io_err(&path, e))?;
        if !file_type.is_file() || path.extension().map_or(true, |ext| ext != LOG_EXTENSION) {
            continue;
        }

        let meta = fs::metadata(&path).map_err(|e| catalog_io_err(&path, e))?;
        let modified = meta.modified().map_err(|e| catalog_io_err(&path, e))?;
        files.push(LogFileDescriptor {
            name: entry.file_name().to_string_lossy().into_owned(),
            size: meta.len(),
            start_time: start_time(&path)?,
            end_time: DateTime::<Local>::from(modified).naive_local(),
        });
    }

    files.sort_by(|a, b| {
        a.start_time
            .cmp(&b.start_time)
            .then_with(|| a.name.cmp(&b.name))
    });
    Ok(files)
}

/// Timestamp of the first line of `path`; now for an empty file.
pub fn start_time(path: &Path) -> Result<NaiveDateTime, CatalogError> {
    let file = File::open(path).map_err(|e| catalog_io_err(path, e))?;
    let mut first = Vec::new();
    BufReader::new(file)
        .read_until(b'\n', &mut first)
        .map_err(|e| catalog_io_err(path, e))?;

    if first.is_empty() {
        return Ok(Local::now().naive_local());
    }
    parse_timestamp(&first).ok_or_else(|| CatalogError::StartTime {
        path: path.to_path_buf(),
        reason: format!(
            "first line does not start with a {TIMESTAMP_WIDTH}-byte timestamp: {:?}",
            String::from_utf8_lossy(&first[..first.len().min(TIMESTAMP_WIDTH)])
        ),
    })
}

mod catalog_time {
    use chrono::{Local, NaiveDateTime, TimeZone};
    use serde::Serializer;

    use super::{CATALOG_TIME_FORMAT, CATALOG_ZONED_FORMAT};

    /// Wall-clock times skipped by a DST change have no offset and are
    /// written without one.
    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        match Local.from_local_datetime(ts).earliest() {
            Some(local) => s.collect_str(&local.format(CATALOG_ZONED_FORMAT)),
            None => s.collect_str(&ts.format(CATALOG_TIME_FORMAT)),
        }
    }
}
