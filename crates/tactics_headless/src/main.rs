//! Headless battle runner.
//!
//! Plays a battle scenario without any frontend and prints a JSON report to
//! stdout. Logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Play the scenario's configured number of rounds
//! cargo run -p tactics_headless -- run --scenario scenarios/rain_skirmish.ron
//!
//! # Override the round count and pretty-print the report
//! cargo run -p tactics_headless -- run --scenario scenarios/rain_skirmish.ron --rounds 5 --pretty
//!
//! # Validate a scenario
//! cargo run -p tactics_headless -- validate scenarios/rain_skirmish.ron
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tactics_headless::{run_scenario_file, Scenario};

#[derive(Parser)]
#[command(name = "tactics_headless")]
#[command(about = "Headless battle runner for scenario testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a scenario and print the battle report
    Run {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: PathBuf,

        /// Number of rounds (defaults to the scenario's)
        #[arg(short, long)]
        rounds: Option<u32>,

        /// Pretty-print the JSON report
        #[arg(long)]
        pretty: bool,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check a scenario for errors without playing it
    Validate {
        /// Scenario file to check
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs to stderr, stdout is for the report
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let result = match cli.command {
        Commands::Run {
            scenario,
            rounds,
            pretty,
            output,
        } => cmd_run(&scenario, rounds, pretty, output.as_deref()),
        Commands::Validate { path } => cmd_validate(&path),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            tracing::error!("{message}");
            ExitCode::FAILURE
        }
    }
}

/// Play a scenario and emit its report
fn cmd_run(
    scenario: &std::path::Path,
    rounds: Option<u32>,
    pretty: bool,
    output: Option<&std::path::Path>,
) -> Result<(), String> {
    tracing::info!(scenario = %scenario.display(), "Running scenario");

    let report = run_scenario_file(scenario, rounds).map_err(|e| e.to_string())?;
    let json = report.to_json(pretty).map_err(|e| e.to_string())?;

    match output {
        Some(path) => {
            std::fs::write(path, json).map_err(|e| format!("{}: {e}", path.display()))?;
            tracing::info!(path = %path.display(), "Report written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Validate a scenario file
fn cmd_validate(path: &std::path::Path) -> Result<(), String> {
    let scenario = Scenario::load(path).map_err(|e| e.to_string())?;
    let problems = scenario.problems();
    if problems.is_empty() {
        tracing::info!(
            scenario = %scenario.name,
            combatants = scenario.combatants.len(),
            events = scenario.events.len(),
            "Scenario is valid"
        );
        return Ok(());
    }

    for problem in &problems {
        tracing::warn!("{problem}");
    }
    Err(format!("{} problem(s) in {}", problems.len(), path.display()))
}
