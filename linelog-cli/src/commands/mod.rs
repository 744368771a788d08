pub mod catalog;
pub mod emit;
pub mod index;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use linelog_store::{platform_provider, StoreConfig};

/// Options shared by every command: which store to operate on.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// YAML store config.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log directory; overrides the config and the platform default.
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    /// Application name; the log file is `<app>.log`.
    #[arg(long, global = true)]
    pub app: Option<String>,
}

impl StoreArgs {
    /// Config from `--config` (or defaults) with command-line overrides.
    pub fn load_config(&self) -> Result<StoreConfig> {
        let mut config = match &self.config {
            Some(path) => StoreConfig::load_at(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => StoreConfig::default(),
        };
        if let Some(dir) = &self.dir {
            config.log_dir = Some(dir.clone());
        }
        if let Some(app) = &self.app {
            config.app_name = app.clone();
        }
        config.validate().context("invalid store config")?;
        Ok(config)
    }

    /// Resolved `(log file, index file)` paths.
    pub fn paths(&self) -> Result<(PathBuf, PathBuf)> {
        let config = self.load_config()?;
        let provider = platform_provider();
        Ok((
            config.log_file_path(provider.as_ref()),
            config.index_file_path(provider.as_ref()),
        ))
    }
}
