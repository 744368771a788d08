//! `linelog catalog`: list log files with size and time range.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use linelog_store::catalog::CATALOG_TIME_FORMAT;
use linelog_store::{list_log_files, platform_provider, LogFileDescriptor};

use super::StoreArgs;

/// Arguments for `linelog catalog`.
#[derive(Args, Debug)]
pub struct CatalogArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct CatalogTableRow {
    #[tabled(rename = "file")]
    name: String,
    #[tabled(rename = "size")]
    size: String,
    #[tabled(rename = "start")]
    start: String,
    #[tabled(rename = "end")]
    end: String,
}

impl CatalogArgs {
    pub fn run(self, store_args: &StoreArgs) -> Result<()> {
        let config = store_args.load_config()?;
        let dir = config.resolve_log_dir(platform_provider().as_ref());
        let files = list_log_files(&dir)
            .with_context(|| format!("failed to list log files in {}", dir.display()))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&files).context("failed to serialize catalog JSON")?
            );
            return Ok(());
        }

        print_table(&dir.display().to_string(), files);
        Ok(())
    }
}

fn print_table(dir: &str, files: Vec<LogFileDescriptor>) {
    let total: u64 = files.iter().map(|f| f.size).sum();
    println!(
        "{} | {} files | {}",
        dir.bold(),
        files.len(),
        human_size(total)
    );

    if files.is_empty() {
        println!("No log files.");
        return;
    }

    let rows: Vec<CatalogTableRow> = files
        .into_iter()
        .map(|f| CatalogTableRow {
            name: f.name,
            size: human_size(f.size),
            start: f.start_time.format(CATALOG_TIME_FORMAT).to_string(),
            end: f.end_time.format(CATALOG_TIME_FORMAT).to_string(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
