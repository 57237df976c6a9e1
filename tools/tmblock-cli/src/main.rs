//! TMBlock CLI: composite or remove a logo on raw video files.
//!
//! Usage:
//!   tmblock composite [OPTIONS]   Run the filter over a raw RGB24 stream
//!   tmblock config [OPTIONS]      Show or write the effective configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tmblock_common::config::{LoggingConfig, SyncMode};
use tmblock_frame_model::Rational;

mod commands;
mod rawvideo;

use rawvideo::FrameSize;

#[derive(Parser)]
#[command(
    name = "tmblock",
    about = "Embed or remove a logo on raw video streams",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the filter over a raw RGB24 file and a raw RGBA logo file
    Composite {
        /// Primary input (packed RGB24 frames)
        #[arg(short, long)]
        input: PathBuf,

        /// Primary frame size, WxH
        #[arg(short, long)]
        size: FrameSize,

        /// Logo input (packed RGBA frames)
        #[arg(short, long)]
        logo: PathBuf,

        /// Logo frame size, wxh
        #[arg(long)]
        logo_size: FrameSize,

        /// Logo x offset in pixels (overrides the config file)
        #[arg(short = 'x', long, allow_hyphen_values = true)]
        offset_x: Option<i32>,

        /// Logo y offset in pixels (overrides the config file)
        #[arg(short = 'y', long, allow_hyphen_values = true)]
        offset_y: Option<i32>,

        /// Transform: embed|pre|post (overrides the config file)
        #[arg(short, long)]
        func: Option<String>,

        /// Pairing strategy: fifo|timestamp (overrides the config file)
        #[arg(long)]
        sync: Option<SyncMode>,

        /// Frame rate of both inputs, N or N/D
        #[arg(long, default_value = "25", value_parser = rawvideo::parse_frame_rate)]
        fps: Rational,

        /// Reuse the first logo frame for every primary frame
        #[arg(long)]
        still_logo: bool,

        /// Config file (defaults to the standard location)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output file (packed RGB24 frames)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the effective configuration as JSON
    Config {
        /// Config file to read instead of the standard location
        #[arg(long)]
        path: Option<PathBuf>,

        /// Write the configuration back, creating the file if missing
        #[arg(long)]
        write: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tmblock_common::logging::init_logging(&LoggingConfig::for_verbosity(cli.verbose));

    match cli.command {
        Commands::Composite {
            input,
            size,
            logo,
            logo_size,
            offset_x,
            offset_y,
            func,
            sync,
            fps,
            still_logo,
            config,
            output,
        } => commands::composite::run(commands::composite::CompositeArgs {
            input,
            size,
            logo,
            logo_size,
            offset_x,
            offset_y,
            func,
            sync,
            fps,
            still_logo,
            config,
            output,
        }),
        Commands::Config { path, write } => commands::config::run(path, write),
    }
}
