//! Size-based rotation of the active log file.
//!
//! When a write would push `<app>.log` past the configured size, the file is
//! renamed to `<app>-<stamp>.log` (never onto an existing backup), a fresh empty `<app>.log` is opened and the
//! [`RotationObserver`] is told, all before the pending line is written.
//! Rotated files are then gzip-compressed and pruned by count and age.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{Duration, Local, NaiveDateTime};
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::config::RotationPolicy;
use crate::paths::{backup_file_name, parse_backup_time, COMPRESSED_EXTENSION};

/// Receives the rotation event synchronously, before the write that caused it.
pub trait RotationObserver {
    fn rotated(&mut self, active: &Path);
}

impl RotationObserver for linelog_index::OffsetIndexer {
    fn rotated(&mut self, active: &Path) {
        if let Err(err) = self.on_rotate() {
            tracing::warn!(
                path = %active.display(),
                error = %err,
                "index rebuild after rotation failed"
            );
        }
    }
}

#[derive(Debug)]
pub struct RotatingFile {
    path: PathBuf,
    app: String,
    policy: RotationPolicy,
    file: Option<File>,
    size: u64,
}

impl RotatingFile {
    /// The file is opened lazily on the first write.
    pub fn new(path: impl Into<PathBuf>, app: impl Into<String>, policy: RotationPolicy) -> Self {
        Self {
            path: path.into(),
            app: app.into(),
            policy,
            file: None,
            size: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `line`, rotating first if it would not fit under the limit.
    ///
    /// Returns `true` if a rotation happened. A line larger than the limit
    /// is still written, alone in a fresh file.
    pub fn write_line(
        &mut self,
        line: &[u8],
        observer: &mut dyn RotationObserver,
    ) -> io::Result<bool> {
        self.open_if_needed()?;

        let len = line.len() as u64;
        let mut rotated = false;
        if self.size > 0 && self.size + len > self.policy.max_bytes() {
            self.rotate()?;
            observer.rotated(&self.path);
            rotated = true;
        }

        let file = self.open_if_needed()?;
        file.write_all(line)?;
        file.flush()?;
        self.size += len;
        Ok(rotated)
    }

    /// Drop the handle so the next write reopens the path, picking up a file
    /// that was replaced externally.
    pub fn reopen(&mut self) {
        self.file = None;
        self.size = 0;
    }

    /// Rotate now. Returns the path of the rotated file.
    pub fn rotate(&mut self) -> io::Result<PathBuf> {
        self.file = None;
        let dir = self.dir();
        let backup = unused_backup_path(&dir, &self.app, Local::now().naive_local());
        fs::rename(&self.path, &backup)?;

        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&self.path)?;
        self.file = Some(file);
        self.size = 0;

        match prune_backups(&dir, &self.app, &self.policy, Local::now().naive_local()) {
            Ok(pruned) if pruned.compressed + pruned.removed > 0 => tracing::debug!(
                compressed = pruned.compressed,
                removed = pruned.removed,
                "rotated logs post-processed"
            ),
            Ok(_) => {}
            Err(err) => tracing::warn!(
                dir = %dir.display(),
                error = %err,
                "rotated log post-processing failed"
            ),
        }
        Ok(backup)
    }

    fn dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    fn open_if_needed(&mut self) -> io::Result<&mut File> {
        if self.file.is_none() {
            let dir = self.dir();
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(&dir)?;
            }
            let file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(&self.path)?;
            self.size = file.metadata()?.len();
            self.file = Some(file);
        }
        match self.file.as_mut() {
            Some(file) => Ok(file),
            None => Err(io::Error::other("log file handle unavailable")),
        }
    }
}

/// First backup name for `rotated_at` that exists neither plain nor compressed.
fn unused_backup_path(dir: &Path, app: &str, rotated_at: NaiveDateTime) -> PathBuf {
    (0..u32::MAX)
        .map(|seq| dir.join(backup_file_name(app, rotated_at, seq)))
        .find(|path| !path.exists() && !compressed_path(path).exists())
        .unwrap_or_else(|| dir.join(backup_file_name(app, rotated_at, u32::MAX)))
}

fn compressed_path(path: &Path) -> PathBuf {
    let mut target = path.as_os_str().to_owned();
    target.push(format!(".{COMPRESSED_EXTENSION}"));
    PathBuf::from(target)
}

/// What [`prune_backups`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneOutcome {
    pub compressed: usize,
    pub removed: usize,
}

/// Compress rotated files of `app` in `dir` and delete those past the
/// retention limits. Newest backups are kept first.
pub fn prune_backups(
    dir: &Path,
    app: &str,
    policy: &RotationPolicy,
    now: NaiveDateTime,
) -> io::Result<PruneOutcome> {
    let mut outcome = PruneOutcome::default();
    let mut backups: Vec<((NaiveDateTime, u32), PathBuf)> = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(stamp) = parse_backup_time(app, &name) {
            backups.push((stamp, entry.path()));
        }
    }
    backups.sort_by(|a, b| b.0.cmp(&a.0));

    let cutoff = (policy.max_age_days > 0)
        .then(|| now - Duration::days(policy.max_age_days as i64));

    for (position, ((rotated_at, _), path)) in backups.into_iter().enumerate() {
        let over_count = policy.max_backups > 0 && position >= policy.max_backups;
        let too_old = cutoff.is_some_and(|cutoff| rotated_at < cutoff);
        if over_count || too_old {
            match fs::remove_file(&path) {
                Ok(()) => outcome.removed += 1,
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(err),
            }
            continue;
        }

        let compressed = path.extension().is_some_and(|ext| ext == COMPRESSED_EXTENSION);
        if policy.compress && !compressed {
            compress_file(&path)?;
            outcome.compressed += 1;
        }
    }
    Ok(outcome)
}

/// Gzip `path` to `<path>.gz` and remove the original. Fails rather than
/// overwrite an existing `<path>.gz`.
pub fn compress_file(path: &Path) -> io::Result<PathBuf> {
    let target = compressed_path(path);

    let mut reader = BufReader::new(File::open(path)?);
    let out = OpenOptions::new().write(true).create_new(true).open(&target)?;
    let mut encoder = GzEncoder::new(BufWriter::new(out), Compression::default());
    io::copy(&mut reader, &mut encoder)?;
    encoder.finish()?.flush()?;

    fs::remove_file(path)?;
    Ok(target)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
