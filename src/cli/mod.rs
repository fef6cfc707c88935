use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ytt",
    about = "ytt - Retrieve YouTube caption transcripts",
    version,
    long_about = "A CLI tool for retrieving caption transcripts from YouTube videos. Discovers the available caption tracks, picks the best one for your language preferences (human-authored captions beat auto-generated ones), and renders the transcript as text, JSON, SRT, or WebVTT."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Retrieve transcripts for one or more videos
    Get {
        /// Video IDs or YouTube URLs (watch, youtu.be, embed, shorts)
        #[arg(value_name = "VIDEO", required = true)]
        videos: Vec<String>,

        /// Preferred language, repeatable in priority order (defaults to the configured list)
        #[arg(short, long, value_name = "LANG")]
        language: Vec<String>,

        /// Output file path (prints to console if not specified; single video only)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Include timestamps in text output (srt/vtt formats always include timestamps)
        #[arg(long)]
        timestamps: bool,
    },

    /// List the available caption tracks for a video
    Tracks {
        /// Video ID or YouTube URL
        #[arg(value_name = "VIDEO")]
        video: String,
    },

    /// Show or initialize configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON with timestamps
    Json,
    /// SRT subtitle format
    Srt,
    /// WebVTT format
    Vtt,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Srt => write!(f, "srt"),
            OutputFormat::Vtt => write!(f, "vtt"),
        }
    }
}
