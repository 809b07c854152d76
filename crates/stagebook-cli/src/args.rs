//! Command-line argument definitions for the Stagebook CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments select the treatment file and configuration
//! file, control logging verbosity, and decide whether warnings fail the run.

use clap::Parser;

/// Command-line arguments for the Stagebook linter
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the treatment file, in its JSON encoding
    #[arg(help = "Path to the treatment file (JSON encoding; block-style YAML is rejected)")]
    pub input: String,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Exit with a failure status if any diagnostic is reported
    #[arg(long)]
    pub deny_warnings: bool,
}
