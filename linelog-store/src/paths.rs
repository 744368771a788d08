use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

pub const LOG_EXTENSION: &str = "log";
pub const INDEX_EXTENSION: &str = "idx";
pub const COMPRESSED_EXTENSION: &str = "gz";

/// Timestamp embedded in rotated file names (`<app>-<stamp>.log`).
pub const BACKUP_STAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";

/// Where an application keeps its log directory.
///
/// One implementation per platform, picked at runtime by
/// [`platform_provider`]; [`FixedDir`] pins an explicit directory.
pub trait PathProvider: Send + Sync {
    fn log_dir(&self, app: &str) -> PathBuf;
}

/// `/var/log/<app>`
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxPaths;

impl PathProvider for LinuxPaths {
    fn log_dir(&self, app: &str) -> PathBuf {
        PathBuf::from("/var/log").join(app)
    }
}

/// `%ProgramData%\<app>\Logs`
#[derive(Debug, Clone, Default)]
pub struct WindowsPaths {
    program_data: Option<OsString>,
}

impl WindowsPaths {
    pub fn from_env() -> Self {
        Self {
            program_data: std::env::var_os("ProgramData"),
        }
    }
}

impl PathProvider for WindowsPaths {
    fn log_dir(&self, app: &str) -> PathBuf {
        let root = self
            .program_data
            .clone()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(r"C:\ProgramData"));
        root.join(app).join("Logs")
    }
}

/// `~/Library/Logs/<app>`, or `/Library/Logs/<app>` without a home directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct MacPaths;

impl PathProvider for MacPaths {
    fn log_dir(&self, app: &str) -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/"))
            .join("Library")
            .join("Logs")
            .join(app)
    }
}

/// A fixed log directory regardless of platform.
#[derive(Debug, Clone)]
pub struct FixedDir(pub PathBuf);

impl PathProvider for FixedDir {
    fn log_dir(&self, _app: &str) -> PathBuf {
        self.0.clone()
    }
}

/// Provider for the platform this process runs on.
pub fn platform_provider() -> Box<dyn PathProvider> {
    match std::env::consts::OS {
        "windows" => Box::new(WindowsPaths::from_env()),
        "macos" => Box::new(MacPaths),
        _ => Box::new(LinuxPaths),
    }
}

/// `<dir>/<app>.log`
pub fn log_file_path(dir: &Path, app: &str) -> PathBuf {
    dir.join(format!("{app}.{LOG_EXTENSION}"))
}

/// `<dir>/<app>.log.idx`
pub fn index_file_path(dir: &Path, app: &str) -> PathBuf {
    dir.join(format!("{app}.{LOG_EXTENSION}.{INDEX_EXTENSION}"))
}

/// `<app>-2024-01-01T00-00-00.000.log`, or `<app>-2024-01-01T00-00-00.000-<seq>.log`
/// for the `seq`-th further backup rotated within the same millisecond.
pub fn backup_file_name(app: &str, rotated_at: NaiveDateTime, seq: u32) -> String {
    let stamp = rotated_at.format(BACKUP_STAMP_FORMAT);
    match seq {
        0 => format!("{app}-{stamp}.{LOG_EXTENSION}"),
        seq => format!("{app}-{stamp}-{seq}.{LOG_EXTENSION}"),
    }
}

/// Rotation time and sequence number of a backup named by
/// [`backup_file_name`], compressed or not.
pub fn parse_backup_time(app: &str, file_name: &str) -> Option<(NaiveDateTime, u32)> {
    let name = file_name
        .strip_suffix(&format!(".{COMPRESSED_EXTENSION}"))
        .unwrap_or(file_name);
    let stamp = name
        .strip_prefix(app)?
        .strip_prefix('-')?
        .strip_suffix(&format!(".{LOG_EXTENSION}"))?;

    if let Ok(at) = NaiveDateTime::parse_from_str(stamp, BACKUP_STAMP_FORMAT) {
        return Some((at, 0));
    }
    let (stamp, seq) = stamp.rsplit_once('-')?;
    let seq = seq.parse::<u32>().ok().filter(|seq| *seq > 0)?;
    let at = NaiveDateTime::parse_from_str(stamp, BACKUP_STAMP_FORMAT).ok()?;
    Some((at, seq))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn index_sits_next_to_log() {
        let dir = Path::new("/tmp/logs");
        assert_eq!(log_file_path(dir, "agent"), dir.join("agent.log"));
        assert_eq!(index_file_path(dir, "agent"), dir.join("agent.log.idx"));
    }

    #[test]
    fn backup_names_round_trip_through_parse() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_milli_opt(13, 5, 7, 42)
            .unwrap();
        let name = backup_file_name("agent", at, 0);
        assert_eq!(name, "agent-2024-03-09T13-05-07.042.log");
        assert_eq!(parse_backup_time("agent", &name), Some((at, 0)));
        assert_eq!(parse_backup_time("agent", &format!("{name}.gz")), Some((at, 0)));

        let name = backup_file_name("agent", at, 3);
        assert_eq!(name, "agent-2024-03-09T13-05-07.042-3.log");
        assert_eq!(parse_backup_time("agent", &name), Some((at, 3)));
        assert_eq!(parse_backup_time("agent", &format!("{name}.gz")), Some((at, 3)));
    }

    #[test]
    fn foreign_files_are_not_backups() {
        assert_eq!(parse_backup_time("agent", "agent.log"), None);
        assert_eq!(parse_backup_time("agent", "other-2024-03-09T13-05-07.042.log"), None);
        assert_eq!(parse_backup_time("agent", "agent-notes.log"), None);
        assert_eq!(parse_backup_time("agent", "agent-2024-03-09T13-05-07.042-x.log"), None);
        assert_eq!(parse_backup_time("agent", "agent-2024-03-09T13-05-07.042-0.log"), None);
    }

    #[test]
    fn providers_place_app_directory() {
        assert_eq!(LinuxPaths.log_dir("agent"), PathBuf::from("/var/log/agent"));
        let win = WindowsPaths {
            program_data: Some(OsString::from("D:\\Data")),
        };
        assert!(win.log_dir("agent").ends_with(Path::new("agent").join("Logs")));
        assert_eq!(
            FixedDir(PathBuf::from("/srv/x")).log_dir("agent"),
            PathBuf::from("/srv/x")
        );
    }
}
