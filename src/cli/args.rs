use std::path::PathBuf;

use clap::Parser;

use crate::Commands;

/// Main CLI application arguments
#[derive(Parser, Debug)]
#[clap(
    version,
    about = "Notes with an AI assistant, kept in memory for the length of a session"
)]
pub struct Cli {
    /// Path to the configuration file
    #[clap(short = 'c', long, value_parser)]
    pub config: Option<PathBuf>,

    /// Start with an empty workspace instead of the sample notes
    #[clap(long)]
    pub empty: bool,

    /// Verbose output mode
    #[clap(short, long)]
    pub verbose: bool,
}

/// One line typed at the interactive prompt
#[derive(Parser, Debug)]
#[clap(no_binary_name = true, disable_version_flag = true)]
pub struct PromptLine {
    #[clap(subcommand)]
    pub command: Commands,
}
