use clap::Parser;
use lineage_cli::args::Cli;
use lineage_cli::{load_config, logging, run};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            return ExitCode::from(2);
        },
    };

    if let Err(err) = logging::init_logging(&config.logging, cli.verbose) {
        eprintln!("Warning: logging disabled: {:#}", err);
    }

    match run(&cli, config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            log::error!("{:#}", err);
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        },
    }
}
