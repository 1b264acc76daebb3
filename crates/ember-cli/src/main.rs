//! Ember CLI - Command-line interface for the Ember particle engine

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{simulate, validate};

#[derive(Parser)]
#[command(name = "ember")]
#[command(about = "Headless runner for Ember particle emitters", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run emitters for a number of fixed-size frames and report statistics
    Simulate {
        /// Path to an emitter file (TOML with [[emitter]] tables)
        file: String,

        /// Number of frames to simulate
        #[arg(long, default_value = "600")]
        frames: u32,

        /// Frame delta in seconds (clamped to 0.25)
        #[arg(long, default_value = "0.016666668")]
        dt: f64,

        /// Reseed every emitter for a reproducible run (emitter i gets seed + i)
        #[arg(long)]
        seed: Option<u64>,

        /// Output format (text or json)
        #[arg(long, default_value = "text", value_parser = parse_format)]
        format: String,

        /// Print a line every N frames (text format only)
        #[arg(long)]
        every: Option<u32>,
    },

    /// Check an emitter file for configuration errors
    Validate {
        /// Path to an emitter file
        file: String,
    },
}

fn parse_format(s: &str) -> Result<String, String> {
    match s {
        "text" | "json" => Ok(s.to_string()),
        _ => Err(format!("unknown format '{}'; valid values: text, json", s)),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Simulate {
            file,
            frames,
            dt,
            seed,
            format,
            every,
        } => simulate::run(simulate::SimulateArgs {
            file,
            frames,
            dt,
            seed,
            format,
            every,
        }),
        Commands::Validate { file } => validate::run(&file),
    }
}
