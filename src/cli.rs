use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "nomadnet-releases",
    version,
    about = "Mirror GitHub releases onto a NomadNet node and count asset downloads. Runs one sync cycle when no command is given."
)]
pub struct Args {
    #[arg(
        long,
        global = true,
        env = "NOMADNET_RELEASES_CONFIG",
        help = "Path to config.json, defaults to ./config.json"
    )]
    pub config: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        default_value = "info",
        help = "Log filter used when RUST_LOG is not set"
    )]
    pub log_level: String,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run one sync cycle (the default)
    Sync,
    /// Record a download of FILENAME and print the new count
    Count { filename: String },
    /// Print the download count of FILENAME
    Show { filename: String },
    /// Resolve FILENAME for download, record it, print path and count
    Download { filename: String },
}

pub fn parse_args() -> Args {
    Args::parse()
}
