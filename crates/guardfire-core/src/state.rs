//! Per-platform state snapshots returned from each tick.

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, PlatformId};
use crate::enums::*;
use crate::events::EngineEvent;
use crate::weapon::{WeaponGroupId, WeaponId};

/// Ripple scheduler state of one weapon group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RippleSnapshot {
    pub group: WeaponGroupId,
    pub name: String,
    pub enabled: bool,
    pub index: usize,
    pub size: usize,
    /// Combined rate of fire (rpm).
    pub combined_rpm: f64,
}

/// Decision state of one platform after a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformSnapshot {
    pub platform: PlatformId,
    pub phase: GuardPhase,
    pub current_target: Option<EntityId>,
    pub current_weapon: Option<WeaponId>,
    pub weapon_kind: Option<WeaponKind>,
    pub secondary_targets: Vec<EntityId>,
    pub override_target: Option<EntityId>,
    /// Seconds until the next scan.
    pub next_scan_in: f64,
    /// A missile or bomb sequence holds the launch lock.
    pub firing_missile: bool,
    pub missiles_away: u32,
    pub missile_incoming: bool,
    pub under_attack: bool,
    pub under_fire: bool,
    pub ripple: Vec<RippleSnapshot>,
}

/// Output of one platform tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: u64,
    pub elapsed_secs: f64,
    pub snapshot: PlatformSnapshot,
    pub events: Vec<EngineEvent>,
}
