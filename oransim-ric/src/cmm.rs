//! Conflict mitigation
//!
//! Sits between the logic modules and the E2 terminator. Receives every
//! command collected for one query (saved late commands first, then module
//! responses in module order) and returns the subset to dispatch.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use oransim_common::{ConflictMitigationPolicy, NodeId, Rnti};

use crate::command::{Command, CommandAction};

/// Filter over the command batch of one query
pub trait ConflictMitigation {
    /// Policy name
    fn name(&self) -> &str;

    /// Returns the commands to dispatch
    fn filter(&mut self, commands: Vec<Command>) -> Vec<Command>;
}

/// Builds the module for a configured policy
pub fn from_policy(policy: ConflictMitigationPolicy) -> Box<dyn ConflictMitigation> {
    match policy {
        ConflictMitigationPolicy::PassThrough => Box::new(PassThrough),
        ConflictMitigationPolicy::SuppressDuplicates => Box::new(SuppressDuplicates),
    }
}

/// Dispatches everything unchanged
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThrough;

impl ConflictMitigation for PassThrough {
    fn name(&self) -> &str {
        "pass_through"
    }

    fn filter(&mut self, commands: Vec<Command>) -> Vec<Command> {
        commands
    }
}

/// Resolves commands that contend for the same resource.
///
/// - Handovers: one per (base station, RNTI); the first one wins.
/// - Power changes: deltas for the same base station are summed into one
///   command at the position of the first.
#[derive(Debug, Default)]
pub struct SuppressDuplicates;

impl ConflictMitigation for SuppressDuplicates {
    fn name(&self) -> &str {
        "suppress_duplicates"
    }

    fn filter(&mut self, commands: Vec<Command>) -> Vec<Command> {
        let before = commands.len();
        let mut handovers: HashSet<(NodeId, Rnti)> = HashSet::new();
        let mut power_slot: HashMap<NodeId, usize> = HashMap::new();
        let mut out: Vec<Command> = Vec::with_capacity(before);

        for command in commands {
            match *command.action() {
                CommandAction::Handover { target_rnti, .. } => {
                    if handovers.insert((command.target(), target_rnti)) {
                        out.push(command);
                    } else {
                        debug!("Suppressing conflicting {}", command);
                    }
                }
                CommandAction::TxPowerDelta { delta_db } => {
                    let target = command.target();
                    match power_slot.get(&target) {
                        Some(&idx) => {
                            let merged = match *out[idx].action() {
                                CommandAction::TxPowerDelta { delta_db: first } => first + delta_db,
                                CommandAction::Handover { .. } => delta_db,
                            };
                            debug!("Merging {} into slot {}", command, idx);
                            out[idx] = Command::tx_power_delta(target, merged);
                        }
                        None => {
                            power_slot.insert(target, out.len());
                            out.push(command);
                        }
                    }
                }
            }
        }

        let removed = before - out.len();
        if removed > 0 {
            info!("Conflict mitigation removed {} of {} commands", removed, before);
        }
        out
    }
}
