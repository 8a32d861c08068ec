//! Weapon descriptors: read-only snapshots of one weapon instance's capability.
//!
//! Descriptors are supplied by the host when a platform is registered and
//! replaced wholesale through `on_structural_change`. The engine never mutates
//! them; ammo, heat and crew status are refreshed by the host.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::types::angle_between_deg;
use crate::types::project_on_plane;

/// Stable identifier of a weapon instance, unique per platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WeaponId(pub u32);

/// Stable identifier of a group of instances sharing one weapon definition.
/// Assigned when the platform inventory is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WeaponGroupId(pub u32);

/// Gun round and mount properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GunSpec {
    /// Bore diameter (mm).
    pub caliber_mm: f64,
    /// Projectile mass (kg).
    pub bullet_mass: f64,
    /// Muzzle velocity (m/s).
    pub bullet_velocity: f64,
    pub fuze: FuzeType,
    /// Sub-projectiles per shot (canister/shotgun rounds), 1 for solid shot.
    pub projectiles_per_shot: u32,
}

/// Unguided rocket properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RocketSpec {
    /// Motor acceleration (m/s²).
    pub acceleration: f64,
    /// Warhead blast radius (m).
    pub blast_radius: f64,
    pub fuze: FuzeType,
}

/// Directed-energy weapon properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaserSpec {
    /// Damage per second at the aperture.
    pub power: f64,
    /// Electrolasers disable rather than destroy.
    pub electrolaser: bool,
}

/// Guided missile properties, including the static launch envelope inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissileSpec {
    pub guidance: GuidanceMode,
    pub targeting: TargetingMode,
    /// Motor thrust (N).
    pub thrust: f64,
    /// Loaded missile mass (kg).
    pub mass: f64,
    /// Maximum turn rate (deg/s).
    pub max_turn_rate: f64,
    /// Control authority, in multiples of gravity.
    pub max_torque: f64,
    /// Angle-of-attack limit for aerodynamic missiles (deg), `None` when not aerodynamic.
    pub max_aoa: Option<f64>,
    /// Speed the missile is designed to fly at (m/s).
    pub optimum_airspeed: f64,
    /// Warhead blast radius (m).
    pub blast_radius: f64,
    /// Time the missile falls before its motor lights (s).
    pub drop_time: f64,
    /// Minimum launcher speed for a launch (m/s).
    pub min_launch_speed: f64,
    /// Seeker field of view half-angle (deg).
    pub max_off_boresight: f64,
    /// Seeker can lock from any aspect.
    pub all_aspect: bool,
    /// Electromagnetic pulse warhead.
    pub emp: bool,
}

impl MissileSpec {
    /// Thrust plus turn rate, used to rank missiles against each other.
    pub fn tdps(&self) -> f64 {
        self.thrust + self.max_turn_rate
    }

    /// Peak motor acceleration (m/s²), zero when mass is unknown.
    pub fn acceleration(&self) -> f64 {
        if self.mass > 0.0 {
            self.thrust / self.mass
        } else {
            0.0
        }
    }

    pub fn is_guided(&self) -> bool {
        self.guidance != GuidanceMode::Unguided
    }
}

/// Free-fall bomb properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BombSpec {
    /// Blast radius (m).
    pub blast_radius: f64,
    /// Guidance, `Unguided` for dumb bombs.
    pub guidance: GuidanceMode,
    pub targeting: TargetingMode,
    /// Submunition count, 1 for unitary warheads.
    pub cluster_count: u32,
}

/// Ship-launched weapon properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlwSpec {
    pub kind: SlwKind,
    pub blast_radius: f64,
    pub targeting: TargetingMode,
    /// Free fall before the motor starts (s); non-zero for air-dropped torpedoes.
    pub drop_time: f64,
}

/// Closed weapon class with its per-class payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "class")]
pub enum WeaponClass {
    Gun(GunSpec),
    Rocket(RocketSpec),
    Laser(LaserSpec),
    Missile(MissileSpec),
    Bomb(BombSpec),
    Slw(SlwSpec),
}

impl WeaponClass {
    pub fn kind(&self) -> WeaponKind {
        match self {
            WeaponClass::Gun(_) => WeaponKind::Gun,
            WeaponClass::Rocket(_) => WeaponKind::Rocket,
            WeaponClass::Laser(_) => WeaponKind::Laser,
            WeaponClass::Missile(_) => WeaponKind::Missile,
            WeaponClass::Bomb(_) => WeaponKind::Bomb,
            WeaponClass::Slw(_) => WeaponKind::Slw,
        }
    }

    /// Blast radius of the warhead, zero for kinetic rounds and lasers.
    pub fn blast_radius(&self) -> f64 {
        match self {
            WeaponClass::Rocket(r) => r.blast_radius,
            WeaponClass::Missile(m) => m.blast_radius,
            WeaponClass::Bomb(b) => b.blast_radius,
            WeaponClass::Slw(s) => s.blast_radius,
            WeaponClass::Gun(_) | WeaponClass::Laser(_) => 0.0,
        }
    }

    /// Targeting mode of guided classes.
    pub fn targeting(&self) -> TargetingMode {
        match self {
            WeaponClass::Missile(m) => m.targeting,
            WeaponClass::Bomb(b) => b.targeting,
            WeaponClass::Slw(s) => s.targeting,
            _ => TargetingMode::None,
        }
    }
}

/// Ammunition state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum Ammo {
    /// Counted rounds remaining.
    Rounds(u32),
    /// Powered from the electrical system; never runs dry.
    ElectricCharge,
    /// No ammunition tracking.
    #[default]
    Unlimited,
}

/// Mechanical readiness reported by the host each tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Readiness {
    pub ammo: Ammo,
    pub overheated: bool,
    pub reloading: bool,
    /// `Some(false)` when the weapon needs a gunner and has none.
    pub crew_present: Option<bool>,
    /// Gun spin-up, chambering and similar delays are complete or nearly so.
    pub can_fire_soon: bool,
}

impl Default for Readiness {
    fn default() -> Self {
        Self {
            ammo: Ammo::Unlimited,
            overheated: false,
            reloading: false,
            crew_present: None,
            can_fire_soon: true,
        }
    }
}

impl Readiness {
    /// Ammunition check, honouring the engine-wide unlimited override.
    pub fn has_ammo(&self, unlimited_override: bool) -> bool {
        match self.ammo {
            Ammo::Rounds(n) => unlimited_override || n > 0,
            Ammo::ElectricCharge | Ammo::Unlimited => true,
        }
    }
}

/// Turret traverse limits and mount frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Turret {
    /// Total yaw traverse (deg), centred on `base_forward`.
    pub yaw_range: f64,
    /// Lowest elevation (deg).
    pub min_pitch: f64,
    /// Highest elevation (deg).
    pub max_pitch: f64,
    /// Mount forward axis in world frame.
    pub base_forward: DVec3,
    /// Mount up axis in world frame.
    pub base_up: DVec3,
}

impl Turret {
    /// Whether the turret can point along `direction` within `tolerance_deg`.
    ///
    /// A zero-length direction is out of reach.
    pub fn can_reach(&self, direction: DVec3, tolerance_deg: f64) -> bool {
        if direction.length_squared() <= f64::EPSILON {
            return false;
        }
        let flat = project_on_plane(direction, self.base_up);
        // Straight up or down: yaw is irrelevant, only pitch matters.
        let yaw = angle_between_deg(flat, self.base_forward).unwrap_or(0.0);
        let Some(from_up) = angle_between_deg(self.base_up, direction) else {
            return false;
        };
        let pitch = 90.0 - from_up;
        let pitch_ok =
            pitch >= self.min_pitch - tolerance_deg && pitch <= self.max_pitch + tolerance_deg;
        yaw < self.yaw_range / 2.0 + tolerance_deg && pitch_ok
    }

    /// Fully traversing mounts aim themselves and need no firing tolerance.
    pub fn is_free_aiming(&self) -> bool {
        self.yaw_range >= 5.0 && (self.max_pitch - self.min_pitch) >= 5.0
    }
}

/// Read-only snapshot of one weapon instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponDescriptor {
    pub id: WeaponId,
    /// Weapon definition name; instances with the same name form a ripple group.
    pub name: String,
    pub class: WeaponClass,
    /// Minimum engagement range (m).
    pub min_range: f64,
    /// Maximum engagement range (m).
    pub max_range: f64,
    /// Rounds per minute (or launches per minute for rails).
    pub rpm: f64,
    /// Operator-assigned tie-break; higher wins.
    pub priority: i32,
    pub turret: Option<Turret>,
    pub readiness: Readiness,
}

impl WeaponDescriptor {
    pub fn kind(&self) -> WeaponKind {
        self.class.kind()
    }
}
