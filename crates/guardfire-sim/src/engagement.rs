//! Engagement data model: the decision state one platform carries between
//! ticks.
//!
//! Stored in `FireControlEngine`'s platform map, NOT as ECS entities.

use guardfire_core::components::{EntityId, PlatformId, TeamId};
use guardfire_core::config::GuardConfig;
use guardfire_core::enums::{GuardPhase, WeaponKind};
use guardfire_core::settings::RipplePreferences;
use guardfire_core::state::PlatformSnapshot;
use guardfire_core::weapon::{WeaponDescriptor, WeaponId};
use guardfire_threat::monitor::MonitorState;

use crate::systems::ripple::RippleScheduler;
use crate::systems::tasks::{BombTask, MissileTask, TurretTask};

/// A target forced on the platform for a limited time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverrideTarget {
    pub target: EntityId,
    pub expires_at: f64,
}

/// Sequence holding the launch lock. Scanning pauses while one runs.
#[derive(Debug, Clone, PartialEq)]
pub enum LaunchTask {
    Missile(MissileTask),
    Bomb(BombTask),
}

impl LaunchTask {
    pub fn target(&self) -> EntityId {
        match self {
            LaunchTask::Missile(task) => task.target,
            LaunchTask::Bomb(task) => task.target,
        }
    }
}

/// Per-platform guard state.
#[derive(Debug, Clone)]
pub struct EngagementState {
    pub platform: PlatformId,
    pub team: TeamId,
    pub config: GuardConfig,
    pub weapons: Vec<WeaponDescriptor>,
    pub ripple: RippleScheduler,
    pub monitor: MonitorState,
    pub guard_enabled: bool,

    // --- Selection ---
    pub current_target: Option<EntityId>,
    pub current_weapon: Option<WeaponId>,
    pub weapon_kind: Option<WeaponKind>,
    pub secondary_targets: Vec<EntityId>,
    pub override_target: Option<OverrideTarget>,

    // --- Timing ---
    /// Seconds until the next scan.
    pub scan_timer: f64,
    pub force_rescan: bool,

    // --- Sequences ---
    pub turret_task: Option<TurretTask>,
    pub launch_task: Option<LaunchTask>,
    /// Launches of the running sequence.
    pub sequence_launches: u32,
    /// Own missiles known to be flying at the current target.
    pub missiles_away: u32,
}

impl EngagementState {
    pub fn new(
        platform: PlatformId,
        team: TeamId,
        config: GuardConfig,
        weapons: Vec<WeaponDescriptor>,
        prefs: &mut RipplePreferences,
        first_scan_in: f64,
    ) -> Self {
        let ripple = RippleScheduler::build(&weapons, prefs);
        Self {
            platform,
            team,
            config,
            weapons,
            ripple,
            monitor: MonitorState::default(),
            guard_enabled: false,
            current_target: None,
            current_weapon: None,
            weapon_kind: None,
            secondary_targets: Vec::new(),
            override_target: None,
            scan_timer: first_scan_in,
            force_rescan: false,
            turret_task: None,
            launch_task: None,
            sequence_launches: 0,
            missiles_away: 0,
        }
    }

    pub fn phase(&self) -> GuardPhase {
        if !self.guard_enabled {
            GuardPhase::Disabled
        } else if self.launch_task.is_some() {
            GuardPhase::Cooldown
        } else if self.current_target.is_some() && self.current_weapon.is_some() {
            GuardPhase::Engaging
        } else {
            GuardPhase::Scanning
        }
    }

    pub fn weapon(&self, id: WeaponId) -> Option<&WeaponDescriptor> {
        self.weapons.iter().find(|w| w.id == id)
    }

    pub fn snapshot(&self) -> PlatformSnapshot {
        PlatformSnapshot {
            platform: self.platform,
            phase: self.phase(),
            current_target: self.current_target,
            current_weapon: self.current_weapon,
            weapon_kind: self.weapon_kind,
            secondary_targets: self.secondary_targets.clone(),
            override_target: self.override_target.map(|o| o.target),
            next_scan_in: self.scan_timer.max(0.0),
            firing_missile: self.launch_task.is_some(),
            missiles_away: self.missiles_away,
            missile_incoming: self.monitor.missile_incoming(),
            under_attack: self.monitor.under_attack(),
            under_fire: self.monitor.under_fire(),
            ripple: self.ripple.snapshots(),
        }
    }
}
