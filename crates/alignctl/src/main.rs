//! alignctl - score/performance MIDI alignment from the command line
//!
//! Subcommands:
//! - `alignctl batch` - Align every performance in the dataset
//! - `alignctl align <performance>` - Align one performance
//! - `alignctl config` - Show the effective configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dynaconf::DynaConfig;

mod commands;
mod params;
mod telemetry;

#[derive(Parser)]
#[command(name = "alignctl")]
#[command(about = "Align performed MIDI to its score and extract per-note dynamics")]
#[command(version)]
struct Cli {
    /// Config file, replacing ./dynalign.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Align every performance listed in the metadata table
    Batch {
        /// Dataset root (overrides paths.dataset_dir)
        #[arg(short, long)]
        dataset: Option<PathBuf>,

        /// Output root (overrides paths.output_dir)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Worker threads, 0 for one per core (overrides batch.workers)
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Align one performance and print its table
    Align {
        /// Performance path as listed in the metadata table
        performance: String,

        /// Dataset root (overrides paths.dataset_dir)
        #[arg(short, long)]
        dataset: Option<PathBuf>,

        /// Write the table here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Print statistics and anomalies as JSON on stderr
        #[arg(long)]
        report: bool,
    },

    /// Show the effective configuration and its sources
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) = DynaConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;

    telemetry::init(&config.telemetry.log_level)?;

    match cli.command {
        Commands::Batch { dataset, out, jobs } => {
            commands::batch(&config, dataset, out, jobs)?;
        }
        Commands::Align {
            performance,
            dataset,
            out,
            report,
        } => {
            commands::align(&config, &performance, dataset, out.as_deref(), report)?;
        }
        Commands::Config => {
            commands::show_config(&config, &sources)?;
        }
    }

    Ok(())
}
