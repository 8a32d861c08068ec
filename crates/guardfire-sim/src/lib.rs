//! Fire-control decision engine for guardfire.
//!
//! Owns a hecs world of the vessels a host reports, selects targets and
//! weapons for every engine-driven platform, and returns the trigger, launch
//! and countermeasure events the host should execute.

pub mod context;
pub mod engagement;
pub mod engine;
pub mod launch_zone;
pub mod logging;
pub mod registry;
pub mod sensors;
pub mod systems;

pub use engine::{FireControlEngine, SimConfig};
pub use guardfire_core as core;
pub use sensors::{NoSensors, SensorSuite};

#[cfg(test)]
mod tests;
