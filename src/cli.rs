use clap::{Parser, Subcommand};
use clipforge_av::QualityTier;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "clipforge")]
#[command(author, version, about = "Convert media files into upload-ready formats")]
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
    /// Convert a video to MP4, lowering quality to fit a size limit
    Video {
        /// Video file to convert
        #[arg(required = true)]
        input: PathBuf,

        /// Requested quality tier (highest, 1080p, medium, low)
        #[arg(short, long)]
        tier: Option<QualityTier>,

        /// Maximum output size, e.g. 25MB or 2000000
        #[arg(short, long, value_parser = parse_limit)]
        limit: Option<u64>,

        /// Keep the source file after a successful conversion
        #[arg(long)]
        keep_source: bool,

        /// Directory to write the converted file to
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Convert an audio file to AAC in an M4A container
    Audio {
        /// Audio file to convert
        #[arg(required = true)]
        input: PathBuf,

        /// Output file
        #[arg(required = true)]
        output: PathBuf,
    },

    /// Probe a media file and display information
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

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

fn parse_limit(s: &str) -> Result<u64, String> {
    match clipforge::config::parse_byte_size(s) {
        Ok(0) => Err("limit must be greater than 0".to_string()),
        Ok(bytes) => Ok(bytes),
        Err(e) => Err(e.to_string()),
    }
}
