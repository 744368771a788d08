//! Store configuration.
//!
//! Every field has a default, so an empty YAML document is a valid config:
//!
//! ```yaml
//! app_name: agent
//! log_dir: /srv/agent/logs     # optional; platform default otherwise
//! level: info
//! console: stdout              # stdout | stderr | off
//! rotation:
//!   max_size_mb: 50
//!   max_backups: 10
//!   max_age_days: 7
//!   compress: true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, StoreError};
use crate::paths::{index_file_path, log_file_path, PathProvider};
use crate::record::Level;

pub const DEFAULT_APP_NAME: &str = "linelog";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub app_name: String,
    pub log_dir: Option<PathBuf>,
    /// Records below this level are dropped.
    pub level: Level,
    pub console: ConsoleTarget,
    pub rotation: RotationPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            log_dir: None,
            level: Level::Info,
            console: ConsoleTarget::Stdout,
            rotation: RotationPolicy::default(),
        }
    }
}

/// Console stream receiving a copy of every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleTarget {
    #[default]
    Stdout,
    Stderr,
    Off,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationPolicy {
    /// Size in megabytes past which the active file is rotated.
    pub max_size_mb: u64,
    /// Rotated files kept; 0 keeps all.
    pub max_backups: usize,
    /// Age in days past which rotated files are deleted; 0 keeps all.
    pub max_age_days: u64,
    /// Gzip rotated files.
    pub compress: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_size_mb: 50,
            max_backups: 10,
            max_age_days: 7,
            compress: true,
        }
    }
}

impl RotationPolicy {
    pub fn max_bytes(&self) -> u64 {
        self.max_size_mb.saturating_mul(1024 * 1024)
    }
}

impl StoreConfig {
    /// Load a YAML config from `path`.
    ///
    /// Returns `StoreError::ConfigNotFound` if absent and
    /// `StoreError::Parse` (with path context) if malformed.
    pub fn load_at(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Err(StoreError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&contents).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.app_name.trim().is_empty() {
            return Err(StoreError::InvalidConfig("app_name must not be empty".into()));
        }
        if self.app_name.contains(['/', '\\']) {
            return Err(StoreError::InvalidConfig(format!(
                "app_name '{}' must not contain path separators",
                self.app_name
            )));
        }
        if self.rotation.max_size_mb == 0 {
            return Err(StoreError::InvalidConfig(
                "rotation.max_size_mb must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// The configured directory, or the provider's default for this app.
    pub fn resolve_log_dir(&self, provider: &dyn PathProvider) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| provider.log_dir(&self.app_name))
    }

    pub fn log_file_path(&self, provider: &dyn PathProvider) -> PathBuf {
        log_file_path(&self.resolve_log_dir(provider), &self.app_name)
    }

    pub fn index_file_path(&self, provider: &dyn PathProvider) -> PathBuf {
        index_file_path(&self.resolve_log_dir(provider), &self.app_name)
    }
}
