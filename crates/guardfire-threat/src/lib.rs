//! Threat response for guardfire.
//!
//! Turns incoming-projectile scan results into debounced warning flags and
//! countermeasure dispensing sequences. Runs beside the offensive pipeline
//! and never selects targets or weapons.

pub mod countermeasures;
pub mod monitor;
pub mod profiles;

pub use guardfire_core as core;
