//! Indexed, size-rotated log store.
//!
//! A [`LogStore`] is the only write path into `<app>.log`. Every emitted line
//! is appended under one lock together with the matching offset entry in
//! `<app>.log.idx`, so any line can later be located without a scan.
//!
//! - [`store`]: [`LogStore`]: emit, rotation event, index access
//! - [`rotation`]: size-based rotation with compression and retention
//! - [`catalog`]: listing of current and rotated log files
//! - [`record`]: levels, fields and the fixed line layout
//! - [`config`]: [`StoreConfig`]
//! - [`paths`]: [`PathProvider`] and file naming
//! - [`layer`]: `tracing` layer feeding a store

pub mod catalog;
pub mod config;
mod error;
pub mod layer;
pub mod paths;
pub mod record;
pub mod rotation;
pub mod store;

pub use catalog::{list_log_files, LogFileDescriptor};
pub use config::{ConsoleTarget, RotationPolicy, StoreConfig};
pub use error::{CatalogError, StoreError};
pub use layer::LogStoreLayer;
pub use paths::{platform_provider, FixedDir, PathProvider};
pub use record::{Fields, Level};
pub use store::LogStore;
