//! # cloudsync
//!
//! CLI tool for exercising the cloudsync engine and delta codec.
//!
//! ## Commands
//!
//! - `delta diff`: Generate a delta packet between two files
//! - `delta apply`: Apply a delta packet to a base file
//! - `delta inspect`: Describe a delta packet
//! - `demo`: Run the engine against in-memory stores
//! - `strategies`: List the synchronization strategies
//!
//! ## Example
//!
//! ```bash
//! # Generate and apply a delta
//! cloudsync delta diff old.bin new.bin -o patch.delta
//! cloudsync delta apply old.bin patch.delta -o out.bin
//!
//! # Sync 20 generated files with the full strategy
//! cloudsync demo --files 20 --strategy full
//!
//! # Use a configuration file
//! cloudsync -v demo --config cloudsync.toml
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use sync_engine::StrategyKind;

mod commands;

use commands::{delta, demo, strategies};

/// CLI tool for exercising the cloudsync engine.
#[derive(Parser, Debug)]
#[command(name = "cloudsync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Delta packet tools
    Delta {
        #[command(subcommand)]
        command: DeltaCommands,
    },

    /// Run the engine against in-memory stores
    Demo {
        /// Number of files to generate
        #[arg(long, default_value = "12")]
        files: usize,

        /// Strategy to use (full, delta, scheduled, selective)
        #[arg(long, short)]
        strategy: Option<StrategyKind>,

        /// Engine configuration file (TOML)
        #[arg(long, short)]
        config: Option<PathBuf>,
    },

    /// List the synchronization strategies
    Strategies,
}

#[derive(Subcommand, Debug)]
enum DeltaCommands {
    /// Generate a packet turning OLD into NEW
    Diff {
        /// Base file
        old: PathBuf,
        /// Target file
        new: PathBuf,
        /// Where to write the packet
        #[arg(long, short)]
        output: PathBuf,
    },

    /// Apply PACKET to OLD
    Apply {
        /// Base file
        old: PathBuf,
        /// Delta packet
        packet: PathBuf,
        /// Where to write the result
        #[arg(long, short)]
        output: PathBuf,
        /// Refuse packets declaring more output bytes than this
        #[arg(long)]
        max_output: Option<u64>,
    },

    /// Describe a packet
    Inspect {
        /// Delta packet
        packet: PathBuf,
        /// Check the packet's base hash against this file
        #[arg(long)]
        base: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Delta { command } => match command {
            DeltaCommands::Diff { old, new, output } => {
                delta::diff(&old, &new, &output).await?;
            }
            DeltaCommands::Apply {
                old,
                packet,
                output,
                max_output,
            } => {
                delta::apply(&old, &packet, &output, max_output).await?;
            }
            DeltaCommands::Inspect { packet, base } => {
                delta::inspect(&packet, base.as_deref()).await?;
            }
        },
        Commands::Demo {
            files,
            strategy,
            config,
        } => {
            demo::run(files, strategy, config.as_deref()).await?;
        }
        Commands::Strategies => {
            strategies::run()?;
        }
    }

    Ok(())
}
