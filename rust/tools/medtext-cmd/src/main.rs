use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod utils;

#[derive(Parser)]
#[command(name = "medtext-cmd")]
#[command(about = "Command-line utility for medtext document stores")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the vocabulary and all stores of an index from a text file
    Import(commands::import::ImportArgs),

    /// Display summary information about an index
    Inspect {
        /// Basename of the index files
        basename: String,
    },

    /// Print one document of an index
    Dump {
        /// Basename of the index files
        basename: String,

        /// Document index
        document: u32,

        /// Include the tracked term frequencies
        #[arg(long)]
        frequencies: bool,

        /// Include the character ranges of the tokens
        #[arg(long)]
        positions: bool,
    },

    /// Verify the document store against itself and its vocabulary
    Check {
        /// Basename of the index files
        basename: String,
    },
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Import(args) => {
            let summary = commands::import::run(&args)?;
            utils::print_json(&summary)?;
        }
        Commands::Inspect { basename } => {
            let summary = commands::inspect::run(&basename)?;
            utils::print_json(&summary)?;
        }
        Commands::Dump {
            basename,
            document,
            frequencies,
            positions,
        } => {
            let dump = commands::dump::run(&basename, document, frequencies, positions)?;
            utils::print_json(&dump)?;
        }
        Commands::Check { basename } => {
            let report = commands::check::run(&basename)?;
            utils::print_json(&report)?;
            if !report.is_consistent() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
