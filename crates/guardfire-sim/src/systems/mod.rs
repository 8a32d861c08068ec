//! Decision systems run by the engine each tick.
//!
//! Systems are functions over the engagement state and the shared context.
//! They do not own state; everything they keep between ticks lives in
//! `EngagementState`.

pub mod envelope;
pub mod guard;
pub mod matcher;
pub mod ripple;
pub mod scoring;
pub mod targeting;
pub mod tasks;
pub mod threat;
