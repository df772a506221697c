mod cli;
mod commands;
mod config;
mod logging;

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = if cli.verbose {
        true
    } else {
        logging::env_flag()
    };
    logging::init(verbose, cli.log_format);
    let config = AppConfig::load(&cli.config)?;
    match cli.command {
        Commands::Run => commands::run(&config),
        Commands::Watch {
            interval,
            max_polls,
        } => commands::watch(&config, interval, max_polls),
        Commands::InitIndex => commands::init_index(&config),
        Commands::Scan => commands::scan(&config),
        Commands::Stats => commands::stats(&config),
    }
}
