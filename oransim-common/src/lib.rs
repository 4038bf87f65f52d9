//! Common types and utilities for oransim
//!
//! This crate provides the identifiers, simulated time base, random-variable
//! streams, configuration structures and logging setup shared by the RIC
//! core and the scenario runner.

pub mod config;
pub mod error;
pub mod logging;
pub mod random;
pub mod sim_time;
pub mod types;

pub use config::{
    ConflictMitigationPolicy, EnergySavingConfig, FlatEnergySavingConfig, LateCommandPolicy,
    RicConfig, RsrpHandoverConfig, TerminatorConfig, load_yaml, load_yaml_from_str,
};
pub use error::Error;
pub use logging::{init_logging, init_logging_with_filter, log_e2_message, Direction, LogLevel};
pub use random::{RandomStream, RandomVariable};
pub use sim_time::SimTime;
pub use types::*;
