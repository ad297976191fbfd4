//! BeatMapper CLI - rhythm chart generation from audio analysis
//!
//! This binary generates difficulty-tiered note charts from analyzer output
//! and inspects existing charts.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use beatmapper_cli::commands;
use beatmapper_cli::commands::generate::GenerateOptions;
use beatmapper_spec::{DifficultyTier, Strategy};

/// BeatMapper - Adaptive Rhythm Chart Generator
#[derive(Parser)]
#[command(name = "beatmapper")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a chart from an analysis file
    Generate {
        /// Path to the analyzer output (JSON)
        #[arg(short, long)]
        analysis: PathBuf,

        /// Difficulty tier (easy, medium, hard, extreme)
        #[arg(short, long)]
        tier: DifficultyTier,

        /// Output chart path (default: stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Existing chart to use as timing reference
        #[arg(long)]
        reference: Option<PathBuf>,

        /// Track duration in seconds (required if the analysis is unusable)
        #[arg(long)]
        duration: Option<f64>,

        /// Seed for humanisation
        #[arg(long, default_value_t = 0)]
        seed: u32,

        /// Config profile (default, strict, relaxed)
        #[arg(long, default_value = "default")]
        profile: String,

        /// Config file overriding the profile
        #[arg(long)]
        config: Option<PathBuf>,

        /// Force the starting strategy
        #[arg(long)]
        strategy: Option<Strategy>,

        /// Write the generation report (JSON) to this path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Print statistics for an existing chart
    Inspect {
        /// Path to the chart CSV
        #[arg(short, long)]
        chart: PathBuf,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Print the difficulty tier table for a profile
    Tiers {
        /// Config profile (default, strict, relaxed)
        #[arg(long, default_value = "default")]
        profile: String,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Generate {
            analysis,
            tier,
            out,
            reference,
            duration,
            seed,
            profile,
            config,
            strategy,
            report,
            json,
        } => commands::generate::run(&GenerateOptions {
            analysis,
            tier,
            out,
            reference,
            duration,
            seed,
            profile,
            config,
            strategy,
            report,
            json,
        }),
        Commands::Inspect { chart, json } => commands::inspect::run(&chart, json),
        Commands::Tiers { profile, json } => commands::tiers::run(&profile, json),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}
