use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uploadcheck::export::ExportFormat;

#[derive(Parser)]
#[command(name = "uploadcheck")]
#[command(
    author,
    version,
    about = "Find local movies that are safe to upload without duplicating tracker content"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Walk directories and parse every movie file found
    Scan {
        /// Directories to scan
        #[arg(required = true)]
        dirs: Vec<PathBuf>,
    },

    /// Match scanned files to catalog identities
    Resolve,

    /// Look up resolved files on the configured trackers
    Search {
        /// Only query this tracker
        #[arg(short, long)]
        tracker: Option<String>,
    },

    /// Inspect files with mediainfo for audio and subtitle languages
    Verify,

    /// Assign a safety tier to every file
    Classify,

    /// Write classified files to disk
    Export {
        /// Output format
        #[arg(short, long, value_enum, default_value = "txt")]
        format: ExportFormat,

        /// Include risky files in the upload list
        #[arg(long)]
        allow_risky: bool,

        /// Output directory (defaults to the data directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run every stage in order
    Run {
        /// Directories to scan
        #[arg(required = true)]
        dirs: Vec<PathBuf>,
    },

    /// Show per-stage counts from the record store
    Status,

    /// Check configuration, API keys and external tools
    Check,
}
