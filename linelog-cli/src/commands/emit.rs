//! `linelog emit`: append one record through the store.

use anyhow::{Context, Result};
use clap::Args;

use linelog_store::{Fields, Level, LogStore};

use super::StoreArgs;

/// Arguments for `linelog emit`.
#[derive(Args, Debug)]
pub struct EmitArgs {
    /// Message text.
    pub message: String,

    /// Record level: trace, debug, info, warning, error.
    #[arg(long, default_value = "info")]
    pub level: Level,

    /// Extra field, repeatable.
    #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_field)]
    pub fields: Vec<(String, String)>,
}

impl EmitArgs {
    pub fn run(self, store_args: &StoreArgs) -> Result<()> {
        let config = store_args.load_config()?;
        let store = LogStore::open(config).context("failed to open log store")?;

        let fields: Fields = self.fields.into_iter().collect();
        store.emit(self.level, &self.message, &fields);
        Ok(())
    }
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}
