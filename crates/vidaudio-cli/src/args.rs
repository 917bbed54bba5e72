use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vidaudio")]
#[command(author, version, about = "Extract audio from YouTube videos or local video files")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// YouTube URL to process (shorthand for `youtube <URL>`)
    #[arg(value_name = "URL")]
    pub url: Option<String>,

    /// Directory the audio file is saved into
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract audio from a YouTube URL
    Youtube {
        /// YouTube URL
        url: String,
    },

    /// Extract the audio track of a local video file
    File {
        /// Video file (mp4, mkv, avi, mov, webm, flv)
        path: PathBuf,
    },

    /// Interactive session that keeps the latest result per source
    Session,

    /// Check external tools
    Doctor,

    /// Show configuration
    Config,
}
