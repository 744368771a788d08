//! `linelog index`: rebuild, verify and query the offset index.

use std::io::Write;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use colored::Colorize;
use serde_json::json;

use linelog_index::{lookup, verify, IndexHealth, OffsetIndexer};

use super::StoreArgs;

#[derive(Subcommand, Debug)]
pub enum IndexCommand {
    /// Regenerate the index from the whole active log file.
    Rebuild,

    /// Check the index against the active log file.
    Verify {
        /// Emit machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print one line of the active log file, located through the index.
    Show {
        /// Line number, starting at 1.
        line: u64,
    },
}

pub fn run(command: IndexCommand, store_args: &StoreArgs) -> Result<()> {
    let (log_path, index_path) = store_args.paths()?;

    match command {
        IndexCommand::Rebuild => {
            let mut indexer = OffsetIndexer::new(&log_path, &index_path);
            let outcome = indexer
                .rebuild()
                .with_context(|| format!("failed to rebuild {}", index_path.display()))?;
            println!(
                "✓ rebuilt {} ({} lines, {} bytes)",
                index_path.display(),
                outcome.lines,
                outcome.cursor
            );
        }
        IndexCommand::Verify { json } => {
            let report = verify(&log_path, &index_path)
                .with_context(|| format!("index {} is unusable", index_path.display()))?;
            let (key, label) = match report.health {
                IndexHealth::Consistent => ("consistent", "CONSISTENT".green().bold()),
                IndexHealth::Behind { .. } => ("behind", "BEHIND".yellow().bold()),
                IndexHealth::Ahead { .. } => ("ahead", "AHEAD".red().bold()),
            };

            if json {
                let payload = json!({
                    "health": key,
                    "entries": report.entries,
                    "lines": report.lines,
                    "last_offset": report.last_offset,
                    "log_len": report.log_len,
                });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&payload)
                        .context("failed to serialize verify JSON")?
                );
            } else {
                println!(
                    "{label} {} lines, indexed {} of {} bytes",
                    report.lines, report.last_offset, report.log_len
                );
            }

            if let IndexHealth::Ahead { excess } = report.health {
                bail!("index points {excess} bytes past the end of the log; run `linelog index rebuild`");
            }
        }
        IndexCommand::Show { line } => {
            let bytes = lookup::read_line(&log_path, &index_path, line)
                .with_context(|| format!("cannot read line {line}"))?;
            std::io::stdout()
                .write_all(&bytes)
                .context("failed to write line")?;
        }
    }
    Ok(())
}
