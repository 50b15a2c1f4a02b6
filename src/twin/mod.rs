//! Digital twin: compartmental accumulation of inhaled, ingested and
//! dermally absorbed particles.
//!
//! Organs are compartments. Each exposure route delivers a configured
//! fraction of its particles to each organ ([`crate::config::TransferParameters`]);
//! the rest is excreted. The resulting [`OrganBurdenTable`] is a pure
//! function of the exposure record and the parameter table.

pub mod integrator;
mod organ;
mod simulator;
mod table;

pub use integrator::{IntegratorConfig, RK4Integrator};
pub use organ::Organ;
pub use simulator::{run_digital_twin, AccumulationSimulator};
pub use table::{OrganBurden, OrganBurdenTable};
