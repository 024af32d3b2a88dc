use std::path::PathBuf;

use clap::Parser;

use crate::application::data::{ColorChoice, LogLevel};

/// Runs filesystem commands against an in-memory tree.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    /// Script with one command per line, `-` reads standard input
    #[clap(default_value = "-")]
    pub script: PathBuf,

    /// YAML manifest used to seed the tree before the script runs
    #[clap(long, short)]
    pub manifest: Option<PathBuf>,

    #[clap(long, short, default_value = "warn", value_enum)]
    pub log_level: LogLevel,

    #[clap(long, default_value = "auto", value_enum)]
    pub color: ColorChoice,
}
