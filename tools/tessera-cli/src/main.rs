//! Tessera CLI - inspection and test tools
//!
//! # Commands
//!
//! - `tessera inspect <file>` - Print the header and root motion of an animation file
//! - `tessera edge-distance` - Run edge-distance propagation on the CPU backend
//! - `tessera gen-wave <out>` - Write a procedural wave animation for testing

mod edge_distance;
mod gen_wave;
mod inspect;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Tessera CLI - animation and post-processing tools
#[derive(Parser)]
#[command(name = "tessera")]
#[command(about = "Inspection and test tools for the tessera engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the header and per-frame root translation of an animation file
    Inspect(inspect::InspectArgs),

    /// Propagate edge distances from one seeded edge pixel on the CPU backend
    EdgeDistance(edge_distance::EdgeDistanceArgs),

    /// Write a procedural wave animation
    GenWave(gen_wave::GenWaveArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect(args) => inspect::execute(args),
        Commands::EdgeDistance(args) => edge_distance::execute(args),
        Commands::GenWave(args) => gen_wave::execute(args),
    }
}
