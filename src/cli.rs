use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hlsforge")]
#[command(author, version, about = "Transcode a video into an adaptive-bitrate HLS package")]
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
    /// Transcode a video into an HLS package
    Transcode {
        /// Input video file
        input: PathBuf,

        /// Output directory (created if absent)
        output: PathBuf,

        /// Rendition ladder JSON file (overrides the config)
        #[arg(short, long)]
        ladder: Option<PathBuf>,

        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Refuse to write into a non-empty output directory
        #[arg(long)]
        require_empty: bool,

        /// Print job events to stderr as JSON lines
        #[arg(long)]
        events: bool,
    },

    /// Print the encoder arguments for a transcode without running it
    Plan {
        /// Input video file
        input: PathBuf,

        /// Output directory
        output: PathBuf,

        /// Rendition ladder JSON file (overrides the config)
        #[arg(short, long)]
        ladder: Option<PathBuf>,
    },

    /// Print the master playlist for a ladder
    Playlist {
        /// Rendition ladder JSON file (overrides the config)
        #[arg(short, long)]
        ladder: Option<PathBuf>,
    },

    /// Print the built-in rendition ladder as JSON
    DefaultLadder,

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
