//! voxsim CLI: simulation, tensile tests, benchmarking and debugging.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "voxsim")]
#[command(version, about = "voxsim: voxel lattice soft-body mechanics")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation from an input file.
    Simulate {
        /// Simulation input (TOML, or JSON by extension).
        input: PathBuf,

        /// Write final results as JSON.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Stop after this many steps, whatever the input's stop condition.
        #[arg(long)]
        max_steps: Option<u64>,

        /// Write a binary state snapshot at the end of the run.
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Write telemetry events as JSON lines.
        #[arg(long)]
        events: Option<PathBuf>,
    },

    /// Run a quasi-static tensile test from an input file.
    Tensile {
        input: PathBuf,

        /// Override the number of increments.
        #[arg(short = 'n', long)]
        increments: Option<u32>,

        /// Write the rows as CSV.
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Run the benchmark suite.
    Benchmark {
        /// cantilever, tensile_pair, floor_drop, thermal_block or all.
        #[arg(short, long, default_value = "all")]
        scenario: String,

        /// Cap every scenario at this many steps.
        #[arg(long)]
        max_steps: Option<u64>,

        /// Output CSV file path.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Inspect a state snapshot, optionally against another one.
    Inspect {
        path: PathBuf,

        #[arg(long)]
        compare: Option<PathBuf>,
    },

    /// Validate a simulation input.
    Validate {
        input: PathBuf,
    },
}

fn main() {
    // RUST_LOG=debug also shows the per-step telemetry of `simulate`.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Simulate {
            input,
            output,
            max_steps,
            snapshot,
            events,
        } => commands::simulate(&input, output.as_deref(), max_steps, snapshot.as_deref(), events.as_deref()),
        Commands::Tensile { input, increments, csv } => commands::tensile(&input, increments, csv.as_deref()),
        Commands::Benchmark {
            scenario,
            max_steps,
            output,
        } => commands::benchmark(&scenario, max_steps, output.as_deref()),
        Commands::Inspect { path, compare } => commands::inspect(&path, compare.as_deref()),
        Commands::Validate { input } => commands::validate(&input),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
