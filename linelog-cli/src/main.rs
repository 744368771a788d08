//! linelog: operate an indexed log directory.
//!
//! # Usage
//!
//! ```text
//! linelog [--config <yaml>] [--dir <log dir>] [--app <name>] <command>
//! linelog emit <message> [--level info] [--field key=value]...
//! linelog catalog [--json]
//! linelog index rebuild
//! linelog index verify [--json]
//! linelog index show <line>
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{catalog::CatalogArgs, emit::EmitArgs, index::IndexCommand, StoreArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "linelog",
    version,
    about = "Append to, list and index line-oriented log files",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append one record to the active log file.
    Emit(EmitArgs),

    /// List log files with size and time range.
    Catalog(CatalogArgs),

    /// Rebuild, verify or query the offset index.
    Index {
        #[command(subcommand)]
        command: IndexCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Emit(args) => args.run(&cli.store),
        Commands::Catalog(args) => args.run(&cli.store),
        Commands::Index { command } => commands::index::run(command, &cli.store),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
