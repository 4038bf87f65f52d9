//! Configuration structures for the RIC, terminators and logic modules
//!
//! Every component receives a plain configuration struct at construction.
//! All structs deserialize from YAML with per-field defaults, so a scenario
//! file only needs to name the values it changes.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::random::RandomVariable;

/// What to do with commands from a logic module that answered after the
/// query's maximum wait time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LateCommandPolicy {
    /// Discard late commands
    #[default]
    Drop,
    /// Keep late commands and dispatch them with the next query's commands
    Save,
}

impl fmt::Display for LateCommandPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LateCommandPolicy::Drop => write!(f, "DROP"),
            LateCommandPolicy::Save => write!(f, "SAVE"),
        }
    }
}

/// Which conflict mitigation policy filters commands before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictMitigationPolicy {
    /// Forward every command unchanged
    #[default]
    PassThrough,
    /// One handover per UE per query, merged transmit power deltas per base station
    SuppressDuplicates,
}

/// Near-RT RIC (orchestrator) configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RicConfig {
    /// Interval between logic-module queries (seconds)
    pub lm_query_interval_s: f64,
    /// Maximum time to wait for logic modules after a query (seconds, 0 = no limit)
    pub lm_query_max_wait_s: f64,
    /// Handling of commands that arrive after the maximum wait time
    pub late_command_policy: LateCommandPolicy,
    /// Nodes not re-registered within this time are considered inactive (seconds)
    pub e2_node_inactivity_threshold_s: f64,
    /// Interval between inactivity sweeps
    pub e2_node_inactivity_interval: RandomVariable,
    /// One-way delay for RIC-to-node messages (registration responses, commands)
    pub transmission_delay: RandomVariable,
    /// Conflict mitigation policy
    pub conflict_mitigation: ConflictMitigationPolicy,
}

impl Default for RicConfig {
    fn default() -> Self {
        Self {
            lm_query_interval_s: 5.0,
            lm_query_max_wait_s: 0.0,
            late_command_policy: LateCommandPolicy::Drop,
            e2_node_inactivity_threshold_s: 2.0,
            e2_node_inactivity_interval: RandomVariable::constant(5.0),
            transmission_delay: RandomVariable::constant(0.0),
            conflict_mitigation: ConflictMitigationPolicy::PassThrough,
        }
    }
}

impl RicConfig {
    /// Query interval as a duration
    pub fn lm_query_interval(&self) -> Duration {
        Duration::from_secs_f64(self.lm_query_interval_s.max(0.0))
    }

    /// Maximum wait time, `None` when unlimited
    pub fn lm_query_max_wait(&self) -> Option<Duration> {
        if self.lm_query_max_wait_s > 0.0 {
            Some(Duration::from_secs_f64(self.lm_query_max_wait_s))
        } else {
            None
        }
    }

    /// Inactivity threshold as a duration
    pub fn e2_node_inactivity_threshold(&self) -> Duration {
        Duration::from_secs_f64(self.e2_node_inactivity_threshold_s.max(0.0))
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.lm_query_interval_s.is_finite() && self.lm_query_interval_s > 0.0) {
            return Err(Error::Config(format!(
                "lm_query_interval_s must be positive, got {}",
                self.lm_query_interval_s
            )));
        }
        if !(self.lm_query_max_wait_s.is_finite() && self.lm_query_max_wait_s >= 0.0) {
            return Err(Error::Config(format!(
                "lm_query_max_wait_s must be non-negative, got {}",
                self.lm_query_max_wait_s
            )));
        }
        if !(self.e2_node_inactivity_threshold_s.is_finite()
            && self.e2_node_inactivity_threshold_s > 0.0)
        {
            return Err(Error::Config(format!(
                "e2_node_inactivity_threshold_s must be positive, got {}",
                self.e2_node_inactivity_threshold_s
            )));
        }
        self.e2_node_inactivity_interval
            .validate("e2_node_inactivity_interval")?;
        self.transmission_delay.validate("transmission_delay")?;
        Ok(())
    }
}

/// E2 node terminator configuration (per network element).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminatorConfig {
    /// Interval between (re-)registration requests
    pub registration_interval: RandomVariable,
    /// Interval between report flushes
    pub send_interval: RandomVariable,
    /// One-way delay for node-to-RIC messages
    pub transmission_delay: RandomVariable,
    /// Lowest transmit power a power command may set (dBm)
    pub tx_power_min_dbm: f64,
    /// Highest transmit power a power command may set (dBm)
    pub tx_power_max_dbm: f64,
}

impl Default for TerminatorConfig {
    fn default() -> Self {
        Self {
            registration_interval: RandomVariable::constant(1.0),
            send_interval: RandomVariable::constant(1.0),
            transmission_delay: RandomVariable::constant(0.0),
            tx_power_min_dbm: 0.0,
            tx_power_max_dbm: 70.0,
        }
    }
}

impl TerminatorConfig {
    /// Validates the configuration
    pub fn validate(&self) -> Result<(), Error> {
        self.registration_interval.validate("registration_interval")?;
        self.send_interval.validate("send_interval")?;
        self.transmission_delay.validate("transmission_delay")?;
        if self.send_interval.mean() <= 0.0 {
            return Err(Error::Config("send_interval must have a positive mean".into()));
        }
        if self.registration_interval.mean() <= 0.0 {
            return Err(Error::Config(
                "registration_interval must have a positive mean".into(),
            ));
        }
        if self.tx_power_min_dbm > self.tx_power_max_dbm {
            return Err(Error::Config(format!(
                "tx power bounds inverted: min {} > max {}",
                self.tx_power_min_dbm, self.tx_power_max_dbm
            )));
        }
        Ok(())
    }
}

/// RSRP-based handover logic module configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsrpHandoverConfig {
    /// Minimum RSRP advantage of the best cell over the serving cell (dB)
    pub hysteresis_margin_db: f64,
    /// Averaging window for RSRP samples (seconds)
    pub time_window_s: f64,
    /// Minimum time between two handovers of the same UE (seconds)
    pub hold_off_s: f64,
    /// Simulated processing delay of the module
    pub processing_delay: RandomVariable,
}

impl Default for RsrpHandoverConfig {
    fn default() -> Self {
        Self {
            hysteresis_margin_db: 3.0,
            time_window_s: 1.0,
            hold_off_s: 1.5,
            processing_delay: RandomVariable::constant(0.0),
        }
    }
}

impl RsrpHandoverConfig {
    /// Validates the configuration
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.hysteresis_margin_db.is_finite() && self.hysteresis_margin_db >= 0.0) {
            return Err(Error::Config("hysteresis_margin_db must be >= 0".into()));
        }
        if !(self.time_window_s.is_finite() && self.time_window_s >= 0.0) {
            return Err(Error::Config("time_window_s must be >= 0".into()));
        }
        if !(self.hold_off_s.is_finite() && self.hold_off_s >= 0.0) {
            return Err(Error::Config("hold_off_s must be >= 0".into()));
        }
        self.processing_delay.validate("processing_delay")
    }
}

/// Energy-saving logic module configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergySavingConfig {
    /// Desired energy efficiency (bits per joule)
    pub target_efficiency_bits_per_joule: f64,
    /// Transmit power step per decision (dB, positive)
    pub step_size_db: f64,
    /// Half-width of the dead band around the target
    pub epsilon: f64,
    /// Simulated processing delay of the module
    pub processing_delay: RandomVariable,
}

impl Default for EnergySavingConfig {
    fn default() -> Self {
        Self {
            target_efficiency_bits_per_joule: 1e6,
            step_size_db: 1.0,
            epsilon: 1e-6,
            processing_delay: RandomVariable::constant(0.0),
        }
    }
}

impl EnergySavingConfig {
    /// Validates the configuration
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.target_efficiency_bits_per_joule.is_finite()
            && self.target_efficiency_bits_per_joule >= 0.0)
        {
            return Err(Error::Config(
                "target_efficiency_bits_per_joule must be >= 0".into(),
            ));
        }
        if !(self.step_size_db.is_finite() && self.step_size_db >= 0.0) {
            return Err(Error::Config("step_size_db must be >= 0".into()));
        }
        if !(self.epsilon.is_finite() && self.epsilon >= 0.0) {
            return Err(Error::Config("epsilon must be >= 0".into()));
        }
        self.processing_delay.validate("processing_delay")
    }
}

/// Legacy flat-broadcast energy-saving module configuration.
///
/// Same knobs as [`EnergySavingConfig`]; kept as a separate type so scenario
/// files state explicitly which controller they enable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlatEnergySavingConfig {
    /// Controller parameters
    #[serde(flatten)]
    pub controller: EnergySavingConfig,
}

/// Loads any configuration struct from a YAML file.
pub fn load_yaml<T, P>(path: P) -> Result<T, Error>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let contents = std::fs::read_to_string(path)?;
    load_yaml_from_str(&contents)
}

/// Loads any configuration struct from a YAML string.
pub fn load_yaml_from_str<T>(yaml: &str) -> Result<T, Error>
where
    T: for<'de> Deserialize<'de>,
{
    Ok(serde_yaml::from_str(yaml)?)
}
