//! Test utility functions for integration tests
//!
//! Provides logging setup and helpers for reading the command audit log.

use tracing_subscriber::{fmt, EnvFilter};

use oransim_common::SimTime;
use oransim_ric::repository::CommandSource;
use oransim_ric::{Command, DataRepository};

/// Initialize logging for tests
///
/// Uses RUST_LOG environment variable if set, otherwise defaults to "info"
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
}

/// Simulated time from seconds
pub fn secs(s: f64) -> SimTime {
    SimTime::from_secs_f64(s)
}

/// Commands proposed by the named logic module, with their query time
pub fn lm_commands(data: &DataRepository, lm_name: &str) -> Vec<(SimTime, Command)> {
    data.command_log()
        .iter()
        .filter(|e| matches!(&e.source, CommandSource::LogicModule(name) if name == lm_name))
        .map(|e| (e.time, e.command.clone()))
        .collect()
}

/// Commands handed to the E2 terminator, with their dispatch time
pub fn dispatched_commands(data: &DataRepository) -> Vec<(SimTime, Command)> {
    data.command_log()
        .iter()
        .filter(|e| e.source == CommandSource::E2Terminator)
        .map(|e| (e.time, e.command.clone()))
        .collect()
}
