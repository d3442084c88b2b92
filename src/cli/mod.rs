use clap::{ Parser, Subcommand };
use std::path::PathBuf;

pub mod commands;
pub mod ui;

#[derive(Parser)]
#[command(
    name = "hal-annotator",
    about = "Builds hallucination-correction datasets from model-generated image descriptions",
    version,
    author,
    long_about = None
)]
pub struct HalCli {
    /// Sets the log level (error, warn, info, debug, trace)
    #[arg(short, long, global = true, default_value = "info")]
    pub log_level: String,

    /// Path to the model gateway configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline over an input dataset
    Annotate {
        /// Input dataset: JSON array of {image, prompt, initial_response}
        #[arg(short, long)]
        input: PathBuf,

        /// Output dataset path
        #[arg(short, long)]
        output: PathBuf,

        /// Directory the dataset's image names are relative to
        #[arg(long)]
        image_root: Option<PathBuf>,

        /// Verification strategy (per-claim, combined)
        #[arg(long, default_value = "per-claim")]
        verification_mode: String,

        /// Re-review the combined annotations once before correcting
        #[arg(long, default_value = "false")]
        double_check: bool,

        /// Only offer hallucination / non-hallucination verdicts
        #[arg(long, default_value = "false")]
        no_subjective: bool,

        /// Process at most this many samples
        #[arg(long)]
        limit: Option<usize>,

        /// Rewrite the output after every N completed samples
        #[arg(long)]
        checkpoint_every: Option<usize>,

        /// Stop at the first failed sample
        #[arg(long, default_value = "false")]
        fail_fast: bool,

        /// Overwrite the output without asking
        #[arg(short, long, default_value = "false")]
        force: bool,
    },

    /// Extract atomic claims from a description
    Extract {
        /// Description to split into claims
        #[arg(short, long)]
        description: String,
    },

    /// Verify a single claim against an image
    Verify {
        /// Image path or URL
        #[arg(short, long)]
        image: String,

        /// Claim to verify
        #[arg(long)]
        claim: String,

        /// Only offer hallucination / non-hallucination verdicts
        #[arg(long, default_value = "false")]
        no_subjective: bool,
    },
}
