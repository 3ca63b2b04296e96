use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "imgspeed", version, about = "Image download speed test server and client")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v for verbose, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode: suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: platform config dir, imgspeed/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve generated test images over HTTP
    Serve(ServeArgs),

    /// Measure download speed against an image URL
    Probe(ProbeArgs),

    /// Write a generated test image to disk
    Generate(GenerateArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the `imgspeed serve` command.
#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Address to bind (default from config: 0.0.0.0)
    #[arg(long)]
    pub bind: Option<String>,

    /// Port to listen on (default from config: 5000)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Arguments for the `imgspeed probe` command.
#[derive(clap::Args, Debug)]
pub struct ProbeArgs {
    /// URL of the image to download (default: random image from Picsum)
    pub url: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Number of times to run the test
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    pub multiple: u32,

    /// Print results as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `imgspeed generate` command.
#[derive(clap::Args, Debug)]
pub struct GenerateArgs {
    /// Image width in pixels
    #[arg(long, requires = "height", conflicts_with = "target_kb")]
    pub width: Option<u32>,

    /// Image height in pixels
    #[arg(long, requires = "width", conflicts_with = "target_kb")]
    pub height: Option<u32>,

    /// Approximate output size in KB
    #[arg(long, required_unless_present = "width")]
    pub target_kb: Option<u32>,

    /// Output file
    #[arg(short, long)]
    pub output: PathBuf,
}

/// Arguments for the `imgspeed completions` command.
#[derive(clap::Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
