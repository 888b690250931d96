//! Deterministic simulation ordering via `SystemSet` phases.
//!
//! Every system in `FixedUpdate` belongs to one of these sets, which are
//! configured as a chain.  The chain is the crate's ordering contract: the
//! map scan reseeds the power network before the power pass runs, the power
//! pass finishes (including its shortage check) before tile flags are
//! applied, and aggregation only reads state the earlier phases produced.
//!
//! ```text
//! PreSim  →  Simulation  →  PostSim
//! ```
//!
//! * **PreSim** – tick counter, map scan (source discovery, census plant
//!   counts, meltdown rolls).
//! * **Simulation** – the power pass and flag application; the valve update
//!   runs here too but shares no state with the power chain.
//! * **PostSim** – census history roll and load-notification republish.
//!   These only read simulation state.

use bevy::prelude::*;

/// Ordered phases for systems running in the `FixedUpdate` schedule.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    /// Pre-simulation setup: tick counter, map scan.
    PreSim,
    /// Core simulation: power propagation, flag application, valves.
    Simulation,
    /// Post-simulation aggregation: census history, republished events.
    PostSim,
}
