//! Components attached to vessels in the simulation world.
//!
//! Every vessel or projectile the engine can reason about carries
//! `Kinematics` and `VesselInfo`. Guided projectiles also carry `MissileInfo`.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::types::{Acceleration, Position, Velocity};

/// Handle of a world entity as seen from outside the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

/// Platforms are world entities that also run a decision engine.
pub type PlatformId = EntityId;

/// Allegiance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamId(pub u16);

/// Motion state and attitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    pub position: Position,
    pub velocity: Velocity,
    pub acceleration: Acceleration,
    /// Nose direction (unit vector, world frame).
    pub forward: DVec3,
    /// Roof direction (unit vector, world frame).
    pub up: DVec3,
}

impl Default for Kinematics {
    fn default() -> Self {
        Self {
            position: Position::default(),
            velocity: Velocity::default(),
            acceleration: Acceleration::default(),
            forward: DVec3::Y,
            up: DVec3::Z,
        }
    }
}

impl Kinematics {
    /// Position extrapolated `secs` ahead at constant velocity.
    pub fn predicted_position(&self, secs: f64) -> Position {
        self.position.extrapolate(&self.velocity, secs)
    }

    /// Direction of travel, falling back to the nose when stationary.
    pub fn travel_direction(&self) -> DVec3 {
        self.velocity.direction().unwrap_or(self.forward)
    }
}

/// Identity and classification of a vessel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselInfo {
    pub name: String,
    pub team: TeamId,
    pub situation: Situation,
    pub is_missile: bool,
    /// Disabled by an EMP or electrolaser; still present but harmless.
    pub debilitated: bool,
    pub vip: bool,
    /// Total mass (kg).
    pub mass: f64,
    /// Bounding radius (m).
    pub radius: f64,
    /// Number of weapons carried.
    pub weapon_count: u32,
    /// Radar transmitting (anti-radiation missiles can home on it).
    pub radar_emitting: bool,
    /// What this vessel is currently attacking, when known.
    pub engaging: Option<EntityId>,
}

impl Default for VesselInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            team: TeamId::default(),
            situation: Situation::Flying,
            is_missile: false,
            debilitated: false,
            vip: false,
            mass: 1000.0,
            radius: 5.0,
            weapon_count: 0,
            radar_emitting: false,
            engaging: None,
        }
    }
}

/// Extra data for projectiles in flight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MissileInfo {
    /// Launching vessel.
    pub source: Option<EntityId>,
    /// Vessel the projectile is homing on.
    pub target: Option<EntityId>,
    pub kind: IncomingKind,
}
