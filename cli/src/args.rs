use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// lineage-admin - maintenance for the hierarchical access lookup table
#[derive(Parser, Debug)]
#[command(name = "lineage-admin")]
#[command(version)]
#[command(about = "Maintain the hierarchical access lookup table", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML); built-in defaults when omitted
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Database file, overriding the configuration
    #[arg(long = "database")]
    pub database: Option<String>,

    /// Log at debug level
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Rebuild the lookup table, fully or for selected wrappers
    Regenerate {
        /// Comma-separated wrapper ids, e.g. `2,6`; rebuilds everything when omitted
        #[arg(long = "wrapper-ids", value_delimiter = ',')]
        wrapper_ids: Vec<i64>,
    },
    /// Create the lookup table if missing
    InitSchema {
        /// Also create the entity base and field tables described by the configuration
        #[arg(long = "with-entities")]
        with_entities: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scoped_regenerate() {
        let cli = Cli::try_parse_from(["lineage-admin", "--config", "lineage.toml", "regenerate", "--wrapper-ids", "2,6"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("lineage.toml")));
        assert_eq!(cli.command, Command::Regenerate { wrapper_ids: vec![2, 6] });
    }

    #[test]
    fn test_parse_full_regenerate() {
        let cli = Cli::try_parse_from(["lineage-admin", "regenerate"]).unwrap();
        assert_eq!(cli.command, Command::Regenerate { wrapper_ids: vec![] });
    }

    #[test]
    fn test_rejects_non_numeric_ids() {
        assert!(Cli::try_parse_from(["lineage-admin", "regenerate", "--wrapper-ids", "2,x"]).is_err());
    }
}
