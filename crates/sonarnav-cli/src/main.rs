//! `sonarnav` – command line front end for the reactive sonar navigator.
//!
//! ```text
//! sonarnav run [--config PATH] [--cycles N] [--json]
//! sonarnav decide 1.0 1.0 0.7 1.0 1.0 1.0 1.0 1.0
//! sonarnav config [--write]
//! ```
//!
//! `run` drives the kinematic P3-DX simulator until its step budget runs out,
//! the cycle limit is hit or Ctrl-C is pressed.  Ctrl-C only raises the
//! shutdown flag; the control loop notices it at the next cycle boundary and
//! the simulation is stopped on the way out.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, Subcommand};
use colored::Colorize;
use sonarnav_control::Decision;
use sonarnav_hal::world::{SimSession, SimStats};
use sonarnav_runtime::{
    ControlLoop, ControlLoopConfig, ReactiveController, TelemetryConfig, init_tracing,
};
use sonarnav_types::{Action, NavError, RunSummary};
use thiserror::Error;
use tracing::{error, info, warn};

use config::{Config, ConfigError};

#[derive(Debug, Parser)]
#[command(name = "sonarnav", version, about = "Reactive sonar obstacle avoidance")]
struct Cli {
    /// Config file (defaults to ~/.sonarnav/config.toml).
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the control loop against the simulator.
    Run {
        /// Stop after N cycles.
        #[arg(long)]
        cycles: Option<u64>,

        /// Print the run summary as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Make a single decision from the given sonar readings.
    Decide {
        /// Sonar distances, sensor 0 first.
        #[arg(required = true, num_args = 1.., allow_negative_numbers = true)]
        readings: Vec<f32>,
    },

    /// Print the effective configuration as TOML.
    Config {
        /// Also save it to the config file.
        #[arg(long)]
        write: bool,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Nav(#[from] NavError),

    #[error("Failed to encode summary: {0}")]
    Json(#[from] serde_json::Error),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _telemetry = init_tracing(&TelemetryConfig::from_env("sonarnav"));

    let result = match cli.command {
        Command::Run { cycles, json } => run(cli.config, cycles, json),
        Command::Decide { readings } => {
            decide(cli.config, &readings).map(|decision| print_decision(&decision))
        }
        Command::Config { write } => show_config(cli.config, write),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "sonarnav failed");
            eprintln!("{}: {}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

fn run(path: Option<PathBuf>, cycles: Option<u64>, json: bool) -> Result<(), CliError> {
    let mut cfg = config::load(path.as_deref())?;
    if cycles.is_some() {
        cfg.run.max_cycles = cycles;
    }

    if !json {
        print_banner();
    }

    let (summary, stats) = simulate(&cfg)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
        println!(
            "  Final pose   x={:.2} y={:.2} heading={:.2} rad",
            stats.pose.x, stats.pose.y, stats.pose.heading
        );
        let collisions = if stats.collisions == 0 {
            "0".green()
        } else {
            stats.collisions.to_string().yellow()
        };
        println!("  Collisions   {collisions}");
        println!();
    }
    Ok(())
}

/// Drive the simulator described by `cfg` to the end of a run.
fn simulate(cfg: &Config) -> Result<(RunSummary, SimStats), CliError> {
    let controller = ReactiveController::new(cfg.controller.clone())?;
    let mut lifecycle = SimSession::new(cfg.sim.clone())?;
    let mut sonar = lifecycle.clone();
    let mut drive = lifecycle.clone();

    let control = ControlLoop::new(
        controller,
        ControlLoopConfig {
            max_cycles: cfg.run.max_cycles,
        },
    );
    install_ctrlc(control.shutdown_handle());

    info!(
        obstacles = cfg.sim.obstacles.len(),
        step_budget = ?cfg.sim.step_budget,
        max_cycles = ?cfg.run.max_cycles,
        "starting control run"
    );
    let summary = control.run(&mut lifecycle, &mut sonar, &mut drive)?;
    Ok((summary, lifecycle.stats()?))
}

fn decide(path: Option<PathBuf>, readings: &[f32]) -> Result<Decision, CliError> {
    let cfg = config::load(path.as_deref())?;
    let controller = ReactiveController::new(cfg.controller)?;
    Ok(controller.compute_movement(readings)?)
}

fn show_config(path: Option<PathBuf>, write: bool) -> Result<(), CliError> {
    let cfg: Config = config::load(path.as_deref())?;
    print!("{}", cfg.to_toml()?);

    if write {
        let target = path.unwrap_or_else(config::config_path);
        config::save_to(&cfg, &target)?;
        eprintln!(
            "{} Config saved to {}",
            "✓".green().bold(),
            target.display().to_string().bold()
        );
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn install_ctrlc(flag: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!();
        eprintln!(
            "{}",
            "⚠  Ctrl-C received – stopping after the current cycle …"
                .yellow()
                .bold()
        );
        flag.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; the run can only end on its own");
    }
}

fn print_banner() {
    println!();
    println!(
        "  {} {}",
        "sonarnav".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Reactive sonar obstacle avoidance · simulated P3-DX");
    println!();
}

fn print_decision(decision: &Decision) {
    println!(
        "  Danger   left={:.3} center={:.3} right={:.3}",
        decision.danger.left, decision.danger.center, decision.danger.right
    );
    println!(
        "  Action   {}",
        paint(decision.action, decision.action.as_str())
    );
    println!(
        "  Speeds   left={:.2} right={:.2}",
        decision.speeds.left, decision.speeds.right
    );
}

fn print_summary(summary: &RunSummary) {
    let elapsed = summary.finished_at - summary.started_at;
    println!("  {} {}", "Run".bold(), summary.run_id.to_string().dimmed());
    println!(
        "  Cycles       {} in {} ms ({:?})",
        summary.cycles.to_string().bold(),
        elapsed.num_milliseconds(),
        summary.termination
    );
    for action in Action::ALL {
        let label = format!("{:<14}", action.as_str());
        println!(
            "  {} {}",
            paint(action, label.as_str()),
            summary.action_counts.get(action)
        );
    }
}

fn paint(action: Action, text: impl Colorize) -> colored::ColoredString {
    match action {
        Action::Advance => text.green(),
        Action::TurnLeft | Action::TurnRight => text.yellow(),
        Action::EmergencyTurn => text.red().bold(),
    }
}
