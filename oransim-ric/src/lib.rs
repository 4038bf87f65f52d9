//! Near-RT RIC control loop
//!
//! This crate provides the RIC side and the network-element side of the E2
//! interface and the decision loop between them:
//! - E2 node terminators that register, report and apply commands
//! - The RIC-side terminator that grants node ids and dispatches commands
//! - A time-indexed data repository
//! - Logic modules (RSRP handover, energy saving) and conflict mitigation
//! - The orchestrator that queries logic modules on a fixed period
//!
//! Everything runs on a single simulated timeline driven by [`Simulation`].

pub mod cmm;
pub mod command;
pub mod e2_terminator;
pub mod element;
pub mod error;
pub mod event;
pub mod lm;
pub mod node_terminator;
pub mod report;
pub mod reporter;
pub mod repository;
pub mod ric;
pub mod simulation;

pub use cmm::{ConflictMitigation, PassThrough, SuppressDuplicates};
pub use command::{Command, CommandAction};
pub use e2_terminator::RicE2Terminator;
pub use element::{
    AppCounters, CellMeasurement, HandoverControl, NetworkElement, ServingCell, TxPowerControl,
};
pub use error::{CommandError, RepositoryError, RicError};
pub use event::{Event, EventId, Scheduler, TerminatorHandle};
pub use lm::{EnergySavingLm, FlatEnergySavingLm, LogicModule, RsrpHandoverLm};
pub use node_terminator::{E2NodeTerminator, TerminatorState};
pub use report::{Report, ReportPayload, RsrpRsrq};
pub use reporter::Reporter;
pub use repository::DataRepository;
pub use ric::NearRtRic;
pub use simulation::Simulation;
