//! Administrative commands for the hierarchical access lookup table.
//!
//! The binary (`lineage-admin`) is a thin shell over [`run`], which tests drive
//! directly with a parsed [`args::Cli`].

pub mod args;
pub mod commands;
pub mod logging;

use anyhow::Context;
use args::{Cli, Command};
use lineage_configs::LineageConfig;
use lineage_core::{Lineage, NeutralPolicy, NoopAlterer};
use lineage_store::Database;
use std::sync::Arc;

/// Configuration from `--config` (or defaults), then environment, then flags.
pub fn load_config(cli: &Cli) -> anyhow::Result<LineageConfig> {
    let mut config = match &cli.config {
        Some(path) => LineageConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => {
            let mut config = LineageConfig::default();
            config.apply_env_overrides();
            config
        },
    };
    if let Some(database) = &cli.database {
        config.database.path = database.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Execute the parsed command. `Ok(false)` means it ran but reported failures.
pub fn run(cli: &Cli, config: LineageConfig) -> anyhow::Result<bool> {
    match &cli.command {
        Command::Regenerate { wrapper_ids } => {
            let lineage = Lineage::open(config, Arc::new(NeutralPolicy), Arc::new(NoopAlterer))?;
            let outcome = commands::regenerate(&lineage, wrapper_ids)?;
            println!("{}", outcome.summary());
            Ok(outcome.is_success())
        },
        Command::InitSchema { with_entities } => {
            let db = Database::open(&config.database.path)?;
            commands::init_schema(&db, &config, *with_entities)?;
            println!("Initialized schema in {}", db.location());
            Ok(true)
        },
    }
}
