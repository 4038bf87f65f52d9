//! Logging infrastructure for oransim
//!
//! This module provides configurable logging using the `tracing` crate and a
//! helper for logging E2 protocol exchanges in a uniform shape.

use std::fmt;
use std::str::FromStr;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

use crate::sim_time::SimTime;
use crate::types::NodeId;

/// Default verbosity for every target, unless `RUST_LOG` says otherwise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogLevel(LevelFilter);

impl LogLevel {
    /// Every E2 message and repository write
    pub const TRACE: Self = Self(LevelFilter::TRACE);
    /// E2 messages and per-query decisions
    pub const DEBUG: Self = Self(LevelFilter::DEBUG);
    /// Lifecycle, commands and run summary
    pub const INFO: Self = Self(LevelFilter::INFO);
    /// Configuration warnings and dropped commands
    pub const WARN: Self = Self(LevelFilter::WARN);
    /// Failures only
    pub const ERROR: Self = Self(LevelFilter::ERROR);
    /// Nothing
    pub const OFF: Self = Self(LevelFilter::OFF);

    /// The underlying filter
    pub fn filter(self) -> LevelFilter {
        self.0
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::INFO
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_string().to_ascii_lowercase())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        let name = if name == "warning" { "warn" } else { name.as_str() };
        if name.is_empty() {
            return Err("empty log level".to_string());
        }
        LevelFilter::from_str(name)
            .map(Self)
            .map_err(|_| format!("unknown log level: {s}"))
    }
}

/// Installs the global subscriber with `level` as the default directive.
///
/// `RUST_LOG` directives are layered on top. Calling this twice is harmless;
/// the second call does nothing.
pub fn init_logging(level: LogLevel) {
    let filter = EnvFilter::builder()
        .with_default_directive(level.filter().into())
        .from_env_lossy();
    install(filter);
}

/// Initialize logging with a custom filter string.
///
/// Allows fine-grained control over which modules log at which levels.
///
/// # Example
///
/// ```
/// use oransim_common::logging::init_logging_with_filter;
///
/// // Default to info, but show every repository write
/// init_logging_with_filter("info,oransim_ric::repository=trace");
/// ```
pub fn init_logging_with_filter(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    install(filter);
}

fn install(filter: EnvFilter) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_span_events(FmtSpan::NONE)
        .try_init();
}

/// Message direction relative to the RIC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Node to RIC
    Uplink,
    /// RIC to node
    Downlink,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Uplink => write!(f, "UL"),
            Direction::Downlink => write!(f, "DL"),
        }
    }
}

/// Log an E2 message at debug level.
///
/// # Example
///
/// ```
/// use oransim_common::logging::{log_e2_message, Direction};
/// use oransim_common::{NodeId, SimTime};
///
/// log_e2_message(Direction::Uplink, "RegistrationRequest", NodeId::new(3), SimTime::ZERO);
/// ```
pub fn log_e2_message(direction: Direction, msg_type: &str, node_id: NodeId, at: SimTime) {
    tracing::debug!(
        direction = %direction,
        msg_type = msg_type,
        node_id = node_id.value(),
        time = %at,
        "{} E2 {}",
        direction,
        msg_type
    );
}
