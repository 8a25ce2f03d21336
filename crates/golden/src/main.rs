//! Golden image comparison launcher
//!
//! Compares a dirty directory tree against a trusted golden tree and labels
//! every golden file as unchanged, changed or missing.

use anyhow::Result;
use clap::{Parser, Subcommand};
use golden_core::DigestAlgorithm;
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;

#[derive(Parser, Debug)]
#[command(
    name = "golden",
    version,
    about = "Compare a dirty file tree against a golden image"
)]
struct Cli {
    /// Enable verbose logging (debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Config file (default: ~/.golden_image/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare a dirty tree against a golden tree and label the golden files
    Compare {
        /// Trusted reference tree
        #[arg(long)]
        golden: PathBuf,

        /// Tree under examination
        #[arg(long)]
        dirty: PathBuf,

        /// Display name of the golden tree (default: directory name)
        #[arg(long)]
        golden_name: Option<String>,

        /// Display name of the dirty tree, used in the missing-file label
        #[arg(long)]
        dirty_name: Option<String>,

        /// Number of comparison workers
        #[arg(short = 'w', long)]
        workers: Option<usize>,

        /// Content digest: md5, sha256 or blake3
        #[arg(short = 'a', long)]
        algorithm: Option<DigestAlgorithm>,

        /// Label store file (default: ~/.golden_image/labels.json)
        #[arg(long)]
        labels: Option<PathBuf>,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,

        /// List golden files that could not be compared
        #[arg(long)]
        show_unresolved: bool,
    },

    /// Show labels in a label store
    Labels {
        /// Label store file (default: ~/.golden_image/labels.json)
        #[arg(long)]
        labels: Option<PathBuf>,

        /// Only show labels attached to this file
        #[arg(long)]
        file: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show effective configuration and paths
    Config {
        /// Write a default config file (to --config or ~/.golden_image/config.toml)
        #[arg(long)]
        init: bool,

        /// Overwrite an existing config file with --init
        #[arg(long, requires = "init")]
        force: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn command_wants_json(command: &Commands) -> bool {
    match command {
        Commands::Compare { json, .. } => *json,
        Commands::Labels { json, .. } => *json,
        Commands::Config { json, .. } => *json,
    }
}

fn run_command(cli: Cli) -> Result<()> {
    let config = cli.config;
    match cli.command {
        Commands::Compare {
            golden,
            dirty,
            golden_name,
            dirty_name,
            workers,
            algorithm,
            labels,
            json,
            show_unresolved,
        } => cli::compare::run(cli::compare::CompareArgs {
            config,
            golden,
            dirty,
            golden_name,
            dirty_name,
            workers,
            algorithm,
            labels,
            json,
            show_unresolved,
        }),
        Commands::Labels { labels, file, json } => cli::labels::run(cli::labels::LabelsArgs {
            config,
            labels,
            file,
            json,
        }),
        Commands::Config { init, force, json } => cli::config::run(cli::config::ConfigArgs {
            config,
            init,
            force,
            json,
        }),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let json_mode = command_wants_json(&cli.command);

    if let Err(err) = golden_logging::init_logging(golden_logging::LogConfig {
        app_name: "golden",
        verbose: cli.verbose,
        quiet: json_mode,
    }) {
        eprintln!("Warning: failed to initialize logging: {:#}", err);
    }

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if json_mode {
                cli::error::print_json_error(&err);
            } else {
                cli::error::print_error(&err);
            }
            ExitCode::from(1)
        }
    }
}
