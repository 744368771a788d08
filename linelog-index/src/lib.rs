//! Offset index for newline-delimited log files.
//!
//! The index is a flat file of little-endian `i64` entries living next to the
//! log (`<app>.log.idx`). Entry 0 is the sentinel `1`; entry `k` is the byte
//! length of the log after its `k`-th complete line.
//!
//! - [`codec`]: append / read entries
//! - [`scan`]: newline splitting with the two trailing-fragment modes
//! - [`rebuild`]: full rescan from byte 0
//! - [`incremental`]: extend the index from a cursor
//! - [`indexer`]: cursor-owning state machine used by the log store
//! - [`lookup`]: locate lines and verify an index against its log

pub mod codec;
pub mod error;
pub mod incremental;
pub mod indexer;
pub mod lookup;
pub mod rebuild;
pub mod scan;

pub use codec::{append_offset, read_last_offset, ENTRY_SIZE, SENTINEL};
pub use error::IndexError;
pub use incremental::UpdateOutcome;
pub use indexer::{OffsetIndexer, ResumeSource};
pub use rebuild::RebuildOutcome;
pub use lookup::{verify, IndexHealth, VerifyReport};
pub use scan::TrailingFragment;
