//! Events emitted by the engine for the host to act on.
//!
//! The engine never fires a weapon itself; it emits trigger, launch and
//! dispense events that the host executes against its physics.

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, PlatformId};
use crate::enums::*;
use crate::weapon::{WeaponGroupId, WeaponId};

/// Warning flags raised by the threat response monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Warning {
    UnderAttack,
    UnderFire,
    MissileIncoming,
}

/// Everything the engine asks of the host, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    // --- Guard state ---
    GuardModeChanged { platform: PlatformId, enabled: bool },
    /// Current target replaced (or cleared).
    TargetChanged {
        platform: PlatformId,
        target: Option<EntityId>,
    },
    /// Registry engagement count incremented.
    Engaged { platform: PlatformId, target: EntityId },
    /// Registry engagement count decremented.
    Disengaged { platform: PlatformId, target: EntityId },
    SecondaryTargetsChanged {
        platform: PlatformId,
        targets: Vec<EntityId>,
    },
    WeaponSelected {
        platform: PlatformId,
        weapon: WeaponId,
        kind: WeaponKind,
    },

    // --- Sensors ---
    /// Radar should be switched on.
    RadarRequested { platform: PlatformId },
    /// A lock of the given kind should be attempted.
    LockRequested {
        platform: PlatformId,
        target: EntityId,
        kind: LockKind,
    },

    // --- Weapons ---
    /// Point one turret at a target.
    TurretAssigned {
        platform: PlatformId,
        weapon: WeaponId,
        target: EntityId,
        /// Firing tolerance (deg); zero for free-aiming turrets.
        firing_tolerance: f64,
    },
    AutofireChanged {
        platform: PlatformId,
        group: WeaponGroupId,
        enabled: bool,
    },
    /// Pull the trigger of one direct-fire instance this tick.
    TriggerPulled {
        platform: PlatformId,
        weapon: WeaponId,
        target: EntityId,
    },
    MissileLaunched {
        platform: PlatformId,
        weapon: WeaponId,
        target: EntityId,
    },
    BombReleased {
        platform: PlatformId,
        weapon: WeaponId,
        target: EntityId,
    },
    /// Bomb run overshot; the pilot should extend and re-attack.
    ExtendRequested { platform: PlatformId, target: EntityId },

    // --- Threat response ---
    WarningChanged {
        platform: PlatformId,
        warning: Warning,
        active: bool,
    },
    CountermeasureDispensed {
        platform: PlatformId,
        kind: Countermeasure,
    },
    JammerChanged { platform: PlatformId, active: bool },
    /// Asked a teammate to take over a shooter.
    HelpRequested {
        platform: PlatformId,
        ally: PlatformId,
        target: EntityId,
    },
}
