//! Levels, fields and the fixed line layout.
//!
//! ```text
//! 2024-01-01 00:00:00 [INFO] [pid:4242] [proc:agent] [version:0.1.11] message
//! ```
//!
//! The first [`TIMESTAMP_WIDTH`] bytes of every line are the timestamp; the
//! catalog relies on that.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const TIMESTAMP_WIDTH: usize = 19;

/// Structured fields attached to a record, rendered sorted by key.
pub type Fields = BTreeMap<String, String>;

/// Severity of a record. Ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    #[default]
    Info,
    #[serde(alias = "warn")]
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Trace => write!(f, "TRACE"),
            Level::Debug => write!(f, "DEBUG"),
            Level::Info => write!(f, "INFO"),
            Level::Warning => write!(f, "WARNING"),
            Level::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warning),
            "error" => Ok(Level::Error),
            other => Err(format!(
                "unknown level '{other}'; expected: trace, debug, info, warning, error"
            )),
        }
    }
}

impl From<&tracing::Level> for Level {
    fn from(level: &tracing::Level) -> Self {
        if *level == tracing::Level::ERROR {
            Level::Error
        } else if *level == tracing::Level::WARN {
            Level::Warning
        } else if *level == tracing::Level::INFO {
            Level::Info
        } else if *level == tracing::Level::DEBUG {
            Level::Debug
        } else {
            Level::Trace
        }
    }
}

/// Fields stamped on every record of this process: `pid`, `proc`, `version`.
pub fn std_fields() -> Fields {
    let proc = std::env::args_os()
        .next()
        .and_then(|arg0| {
            Path::new(&arg0)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
        })
        .unwrap_or_default();

    let mut fields = Fields::new();
    fields.insert("pid".to_string(), std::process::id().to_string());
    fields.insert("proc".to_string(), proc);
    fields.insert("version".to_string(), env!("CARGO_PKG_VERSION").to_string());
    fields
}

/// Render one newline-terminated line.
///
/// Carriage returns and newlines inside the message or field values are
/// escaped so that one record is always exactly one line.
pub fn render_line(ts: NaiveDateTime, level: Level, fields: &Fields, message: &str) -> String {
    let mut line = String::with_capacity(64 + message.len());
    let _ = write!(line, "{} [{level}]", ts.format(TIMESTAMP_FORMAT));
    for (key, value) in fields {
        let _ = write!(line, " [{}:{}]", escape(key), escape(value));
    }
    line.push(' ');
    line.push_str(&escape(message));
    line.push('\n');
    line
}

/// Parse the leading timestamp of a rendered line.
pub fn parse_timestamp(line: &[u8]) -> Option<NaiveDateTime> {
    let head = std::str::from_utf8(line.get(..TIMESTAMP_WIDTH)?).ok()?;
    NaiveDateTime::parse_from_str(head, TIMESTAMP_FORMAT).ok()
}

fn escape(s: &str) -> Cow<'_, str> {
    if !s.contains(['\n', '\r']) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.replace('\r', "\\r").replace('\n', "\\n"))
}
