use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "clipforge")]
#[command(author, version, about = "Generative short-clip pipeline")]
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
    /// Generate a clip from a text prompt through the full pipeline
    Generate {
        /// Prompt describing the clip
        #[arg(required = true)]
        prompt: String,

        /// Scratch directory for this run (overrides config)
        #[arg(long)]
        scratch: Option<PathBuf>,
    },

    /// Cut seconds off the end of a video, or of every mp4 in a directory
    Trim {
        /// Input video file or directory
        #[arg(required = true)]
        input: PathBuf,

        /// Seconds to cut from the end
        #[arg(short, long, default_value_t = 10.0)]
        seconds: f64,

        /// Output file (single input) or directory (batch)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract the last frame of a video as a JPEG still
    LastFrame {
        /// Video to read
        #[arg(required = true)]
        video: PathBuf,

        /// Output image path (defaults to <stem>_last_frame.jpg)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Concatenate media files with the concat demuxer (stream copy)
    Concat {
        /// Input files in order, or a single directory to sweep in
        /// file name order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Extension to match when the input is a directory
        #[arg(long, default_value = "mp4")]
        ext: String,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Check that required external tools are available
    CheckTools,
}
