use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::logging::LogFormat;

#[derive(Parser, Debug)]
#[command(
    name = "invoice-dedup",
    version,
    about = "OCR, embed and deduplicate invoices dropped into an inbox directory"
)]
pub struct Cli {
    #[arg(long, global = true, default_value = "invoice-dedup.toml")]
    pub config: PathBuf,
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub verbose: bool,
    #[arg(long = "log-format", global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process whatever is in the inbox once and exit
    Run,
    /// Poll the inbox on a fixed interval
    Watch {
        /// Seconds between polls; overrides pipeline.poll_interval_secs
        #[arg(long)]
        interval: Option<u64>,
        /// Stop after this many polls
        #[arg(long = "max-polls")]
        max_polls: Option<usize>,
    },
    /// Create the vector index if it does not exist yet
    InitIndex,
    /// List the files the next run would pick up
    Scan,
    /// Show the index schema and entry count
    Stats,
}
