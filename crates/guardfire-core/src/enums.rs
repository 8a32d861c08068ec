//! Enumeration types used throughout the engine.

use serde::{Deserialize, Serialize};

/// Where a vessel currently is relative to the ground and water.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Situation {
    /// In the air (or in space).
    #[default]
    Flying,
    /// Resting on the ground.
    Landed,
    /// Floating on the water surface.
    Splashed,
    /// Below the water surface (altitude under `SUBMERGED_ALTITUDE`).
    Submerged,
}

impl Situation {
    /// Landed or floating on the surface.
    pub fn is_surface(self) -> bool {
        matches!(self, Situation::Landed | Situation::Splashed)
    }
}

/// Target classification bucket used by the envelope matcher ladders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetBucket {
    /// A guided or unguided projectile in flight.
    Missile,
    /// An airborne vessel.
    Airborne,
    /// Landed or splashed vessel.
    Surface,
    /// Submerged vessel.
    Submerged,
}

/// Weapon class tag, without the per-class payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponKind {
    Gun,
    Rocket,
    Laser,
    Missile,
    Bomb,
    /// Ship-launched weapon (torpedo or depth charge).
    Slw,
}

impl WeaponKind {
    /// Direct-fire classes that use the turret sequence and autofire.
    pub fn is_direct_fire(self) -> bool {
        matches!(self, WeaponKind::Gun | WeaponKind::Rocket | WeaponKind::Laser)
    }
}

/// Top-level target selection behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionMode {
    /// Nearest target, with a bonus for the current one to prevent thrashing.
    ClosestWithHysteresis,
    /// Maximise the weighted priority score.
    #[default]
    WeightedPriority,
    /// Target engaged by the fewest friendlies.
    LeastEngaged,
}

/// Guard-mode controller state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuardPhase {
    /// Guard mode off. No autonomous decisions are made.
    #[default]
    Disabled,
    /// Waiting for the next scan or holding no target.
    Scanning,
    /// A target and weapon are selected and a sequence is running.
    Engaging,
    /// A missile or bomb sequence holds the launch lock.
    Cooldown,
}

/// Fuze type of a gun or rocket round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FuzeType {
    #[default]
    Impact,
    Timed,
    Proximity,
    Flak,
    Delay,
}

impl FuzeType {
    /// Fuzes that detonate near rather than on the target.
    pub fn is_airburst(self) -> bool {
        matches!(self, FuzeType::Timed | FuzeType::Proximity | FuzeType::Flak)
    }
}

/// How a missile or guided bomb acquires its target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetingMode {
    #[default]
    None,
    Radar,
    Heat,
    Laser,
    Gps,
    AntiRadiation,
}

/// Flight guidance law of a missile or guided bomb.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuidanceMode {
    /// Dumb munition.
    #[default]
    Unguided,
    AirToAir,
    AirToGround,
    /// Ballistic arc onto a fixed point (guided bombs, artillery rockets).
    AgmBallistic,
    Cruise,
}

/// Ship-launched weapon family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlwKind {
    #[default]
    Torpedo,
    DepthCharge,
}

/// Classification of a projectile flying toward a platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncomingKind {
    Heat,
    Radar,
    AntiRadiation,
    /// Laser or GPS guided, or anything else guided at us.
    #[default]
    Other,
    /// Gunfire or rockets aimed at us.
    DirectFire,
}

/// Defensive countermeasure family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Countermeasure {
    Flare,
    Chaff,
    Jammer,
}

/// Which sensor lock a missile sequence is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockKind {
    Radar,
    Heat,
    Laser,
    AntiRadiation,
}
