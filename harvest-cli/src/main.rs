//! Command-line front end for the planting inversion.
//!
//! `run` loads a TOML run file and delegates the inversion to
//! [`run::run`]; `synth` writes synthetic observation files to invert.

mod config;
mod output;
mod run;
mod synth;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "harvest-cli")]
#[command(about = "Robust 3-D gravity inversion by planting anomalous densities")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an inversion described by a TOML run file
    Run {
        /// Run file
        config: PathBuf,
    },
    /// Write a synthetic observation file for a single prism
    Synth(synth::SynthArgs),
}

/// Parses the command line and dispatches to the chosen subcommand.
///
/// Logging goes through `tracing`. Without `RUST_LOG` both crates log at
/// `info`.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("harvest_core=info,harvest_cli=info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { config } => {
            let cfg = config::RunConfig::load(&config)?;
            let summary = run::run(&cfg)?;
            tracing::info!(
                seeds = summary.seeds,
                accretions = summary.accretions,
                final_goal = summary.final_goal,
                final_misfit = summary.final_misfit,
                "done"
            );
            for file in &summary.files {
                println!("{}", file.display());
            }
            Ok(())
        }
        Commands::Synth(args) => synth::synth(&args),
    }
}
