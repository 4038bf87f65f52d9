//! Logic modules
//!
//! A logic module reads the data repository when the RIC queries it and
//! proposes commands. The RIC charges each invocation a processing delay
//! drawn from the module's own distribution; the module itself runs
//! instantly on the query's timestamp.

pub mod energy_saving;
pub mod flat_energy_saving;
pub mod rsrp_handover;

pub use energy_saving::EnergySavingLm;
pub use flat_energy_saving::FlatEnergySavingLm;
pub use rsrp_handover::RsrpHandoverLm;

use oransim_common::{RandomVariable, SimTime};

use crate::command::Command;
use crate::repository::DataRepository;

/// A decision component queried periodically by the RIC
pub trait LogicModule {
    /// Name used in logs and the audit trail
    fn name(&self) -> &str;

    /// Distribution of the simulated processing delay
    fn processing_delay(&self) -> &RandomVariable;

    /// Clears state carried between queries. Called when the RIC activates.
    fn reset(&mut self) {}

    /// Reads the repository as of `now` and proposes commands.
    ///
    /// Commands are logged to the repository's audit trail by the module.
    fn run(&mut self, now: SimTime, data: &mut DataRepository) -> Vec<Command>;
}
