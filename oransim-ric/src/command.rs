//! Actuation commands
//!
//! Commands are created by logic modules during a query, may be dropped by
//! the conflict mitigation module, and are consumed by the terminator they
//! target.

use std::fmt;

use serde::{Deserialize, Serialize};

use oransim_common::{CellId, NodeId, Rnti};

use crate::error::CommandError;

/// What a command asks the target element to do
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CommandAction {
    /// Hand the UE identified by `target_rnti` over to `target_cell_id`
    Handover {
        /// RNTI of the UE in the serving cell
        target_rnti: Rnti,
        /// Cell to hand over to
        target_cell_id: CellId,
    },
    /// Change transmit power by `delta_db`
    TxPowerDelta {
        /// Power change (dB)
        delta_db: f64,
    },
}

impl CommandAction {
    /// Short name of the action
    pub fn kind(&self) -> &'static str {
        match self {
            CommandAction::Handover { .. } => "Handover",
            CommandAction::TxPowerDelta { .. } => "TxPowerDelta",
        }
    }
}

/// A command addressed to exactly one E2 node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    target: NodeId,
    action: CommandAction,
}

impl Command {
    /// Creates a command for `target`
    pub fn new(target: NodeId, action: CommandAction) -> Self {
        Self { target, action }
    }

    /// Handover command addressed to the serving base station
    pub fn handover(serving_enb: NodeId, target_rnti: Rnti, target_cell_id: CellId) -> Self {
        Self::new(
            serving_enb,
            CommandAction::Handover {
                target_rnti,
                target_cell_id,
            },
        )
    }

    /// Transmit power change addressed to a base station
    pub fn tx_power_delta(enb: NodeId, delta_db: f64) -> Self {
        Self::new(enb, CommandAction::TxPowerDelta { delta_db })
    }

    /// Target node
    pub fn target(&self) -> NodeId {
        self.target
    }

    /// Requested action
    pub fn action(&self) -> &CommandAction {
        &self.action
    }

    /// Checks the command can be applied by anyone at all
    pub fn validate(&self) -> Result<(), CommandError> {
        if !self.target.is_registered() {
            return Err(CommandError::Malformed(
                "command addressed to unregistered node id 0".into(),
            ));
        }
        if let CommandAction::TxPowerDelta { delta_db } = self.action {
            if !delta_db.is_finite() {
                return Err(CommandError::Malformed(format!(
                    "non-finite power delta {delta_db}"
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action {
            CommandAction::Handover {
                target_rnti,
                target_cell_id,
            } => write!(
                f,
                "Handover(node={}, rnti={}, cell={})",
                self.target, target_rnti, target_cell_id
            ),
            CommandAction::TxPowerDelta { delta_db } => {
                write!(f, "TxPowerDelta(node={}, delta={:+.2}dB)", self.target, delta_db)
            }
        }
    }
}
