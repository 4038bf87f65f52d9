//! oransim scenario runner
//!
//! Runs one near-RT RIC scenario on simulated time:
//! - CLI argument parsing
//! - Scenario loading and validation
//! - Simulation run and shutdown
//! - Optional JSON audit of every command and logic-module query
//!
//! # Usage
//!
//! ```bash
//! oran-sim -c config/scenario.yaml --audit-out audit.json
//! ```

mod radio;
mod scenario;

use std::fs::File;
use std::io::BufWriter;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{error, info};

use oransim_common::{init_logging, load_yaml, LogLevel, SimTime};
use oransim_ric::e2_terminator::E2Stats;
use oransim_ric::repository::{CommandLogEntry, LmQueryLogEntry};
use oransim_ric::ric::RicStats;

use crate::scenario::ScenarioConfig;

/// oransim - near-RT RIC scenario runner
#[derive(Parser, Debug)]
#[command(name = "oran-sim")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the scenario file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config_file: String,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long = "log-level", default_value = "info")]
    log_level: LogLevel,

    /// Override the scenario seed
    #[arg(short = 's', long = "seed")]
    seed: Option<u64>,

    /// Override the scenario duration (seconds)
    #[arg(short = 'd', long = "duration")]
    duration_s: Option<f64>,

    /// Write the command and query audit to this file (JSON)
    #[arg(long = "audit-out", value_name = "FILE")]
    audit_out: Option<String>,
}

/// Final state of one cell
#[derive(Debug, Serialize)]
struct CellSummary {
    cell_id: u16,
    tx_power_dbm: f64,
    energy_j: f64,
}

/// Everything written by `--audit-out`
#[derive(Debug, Serialize)]
struct Audit<'a> {
    seed: u64,
    end_time: SimTime,
    ric: RicStats,
    e2: E2Stats,
    handovers: u32,
    cells: Vec<CellSummary>,
    commands: &'a [CommandLogEntry],
    queries: &'a [LmQueryLogEntry],
}

fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(args.log_level);

    println!("oransim - near-RT RIC scenario runner");
    println!("=====================================");

    match run_scenario(args) {
        Ok(()) => {
            info!("Scenario finished successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Scenario failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Main scenario execution logic
fn run_scenario(args: Args) -> Result<()> {
    info!("Loading scenario from: {}", args.config_file);
    let mut scenario: ScenarioConfig = load_yaml(&args.config_file)
        .with_context(|| format!("Failed to load scenario from {}", args.config_file))?;
    if let Some(seed) = args.seed {
        scenario.seed = seed;
    }
    if let Some(duration_s) = args.duration_s {
        scenario.duration_s = duration_s;
    }

    let (mut sim, world) = scenario.build()?;

    sim.start();
    let events = sim.run_until(SimTime::from_secs_f64(scenario.duration_s));
    info!("Handled {} events up to {}", events, sim.now());
    sim.stop();

    let ric = sim.ric();
    let stats = ric.stats();
    info!(
        "Queries: {} started, {} timed out; responses: {} on time, {} late",
        stats.queries, stats.queries_timed_out, stats.responses_on_time, stats.responses_late
    );
    info!("Commands dispatched: {}", stats.commands_dispatched);
    info!(
        "Repository: {} samples stored, {} arrived out of order",
        ric.data().samples_stored(),
        ric.data().out_of_order_samples()
    );

    let world = world.borrow();
    let handovers: u32 = world.ues().iter().map(|u| u.handovers).sum();
    let cells: Vec<CellSummary> = world
        .cells()
        .iter()
        .map(|c| CellSummary {
            cell_id: c.cell_id,
            tx_power_dbm: c.tx_power_dbm,
            energy_j: c.energy_j,
        })
        .collect();
    for cell in &cells {
        info!(
            "Cell {}: tx power {:.1} dBm, {:.0} J left",
            cell.cell_id, cell.tx_power_dbm, cell.energy_j
        );
    }
    info!("Handovers completed: {}", handovers);

    if let Some(path) = &args.audit_out {
        let audit = Audit {
            seed: scenario.seed,
            end_time: sim.now(),
            ric: stats,
            e2: ric.e2().stats(),
            handovers,
            cells,
            commands: ric.data().command_log(),
            queries: ric.data().query_log(),
        };
        let file = File::create(path).with_context(|| format!("Failed to create {path}"))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &audit)
            .with_context(|| format!("Failed to write audit to {path}"))?;
        info!("Audit written to {}", path);
    }

    Ok(())
}
