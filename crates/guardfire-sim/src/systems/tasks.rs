//! Guard sequences as polled task objects.
//!
//! Each task stores its own resume condition (a time threshold or a
//! predicate) and is advanced once per tick by the guard controller. Tasks
//! emit host events but never fire on their own: launch and release steps
//! are returned to the controller, which picks the instance and re-validates
//! the envelope.

use guardfire_core::components::{EntityId, Kinematics, PlatformId};
use guardfire_core::config::TimingConfig;
use guardfire_core::constants::GRAVITY;
use guardfire_core::enums::{LockKind, TargetingMode};
use guardfire_core::events::EngineEvent;
use guardfire_core::target::TargetRecord;
use guardfire_core::types::Position;
use guardfire_core::weapon::{WeaponDescriptor, WeaponGroupId};

use crate::launch_zone::{launch_authorized, LaunchProfile};
use crate::sensors::SensorSuite;

/// Progress of a task after one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Running,
    Finished,
}

// --- Turret sequence ---

/// Inputs of one turret task poll.
pub struct TurretContext<'a> {
    pub platform: PlatformId,
    pub now: f64,
    /// Target still known and visible to the team.
    pub target_visible: bool,
    pub in_guard_range: bool,
    /// At least one group instance passes the envelope check this tick.
    pub weapon_feasible: bool,
    pub members: &'a [&'a WeaponDescriptor],
    /// Gimbal tolerance for turrets that cannot aim freely (deg).
    pub tolerance: f64,
    pub burst_length: f64,
    pub timing: &'a TimingConfig,
}

/// Slave a group's turrets to the target and hold autofire.
#[derive(Debug, Clone, PartialEq)]
pub struct TurretTask {
    pub group: WeaponGroupId,
    pub target: EntityId,
    started_at: f64,
    slaved: bool,
    burst_until: f64,
}

impl TurretTask {
    pub fn start(
        platform: PlatformId,
        group: WeaponGroupId,
        target: EntityId,
        now: f64,
        events: &mut Vec<EngineEvent>,
    ) -> Self {
        events.push(EngineEvent::LockRequested {
            platform,
            target,
            kind: LockKind::Radar,
        });
        Self {
            group,
            target,
            started_at: now,
            slaved: false,
            burst_until: now,
        }
    }

    /// Turrets are slaved and autofire is on.
    pub fn is_firing(&self) -> bool {
        self.slaved
    }

    pub fn poll(&mut self, ctx: &TurretContext, events: &mut Vec<EngineEvent>) -> TaskStatus {
        if !ctx.target_visible || !ctx.in_guard_range {
            self.cancel(ctx.platform, events);
            return TaskStatus::Finished;
        }

        if !self.slaved {
            if ctx.now - self.started_at < ctx.timing.turret_lock_wait {
                return TaskStatus::Running;
            }
            for weapon in ctx.members {
                if let Some(turret) = &weapon.turret {
                    let firing_tolerance = if turret.is_free_aiming() {
                        0.0
                    } else {
                        ctx.tolerance
                    };
                    events.push(EngineEvent::TurretAssigned {
                        platform: ctx.platform,
                        weapon: weapon.id,
                        target: self.target,
                        firing_tolerance,
                    });
                }
            }
            events.push(EngineEvent::AutofireChanged {
                platform: ctx.platform,
                group: self.group,
                enabled: true,
            });
            self.slaved = true;
            self.burst_until = ctx.now + ctx.burst_length;
            return TaskStatus::Running;
        }

        if ctx.now >= self.burst_until {
            if !ctx.weapon_feasible {
                self.cancel(ctx.platform, events);
                return TaskStatus::Finished;
            }
            self.burst_until = ctx.now + ctx.burst_length;
        }
        TaskStatus::Running
    }

    /// Stop autofire if it was enabled.
    pub fn cancel(&mut self, platform: PlatformId, events: &mut Vec<EngineEvent>) {
        if self.slaved {
            events.push(EngineEvent::AutofireChanged {
                platform,
                group: self.group,
                enabled: false,
            });
            self.slaved = false;
        }
    }
}

// --- Missile sequence ---

/// Result of one missile task poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissileStep {
    Waiting,
    /// Lock held and launch authorized: the controller should launch now.
    Launch,
    Finished { fired: bool },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum MissileStage {
    Slewing { until: f64 },
    Locking { deadline: f64, next_attempt: f64 },
    Launching { next_launch: f64 },
    Done,
}

/// Inputs of one missile task poll.
pub struct MissileContext<'a> {
    pub platform: PlatformId,
    pub now: f64,
    pub own: &'a Kinematics,
    pub own_surface: bool,
    pub target: &'a TargetRecord,
    pub weapon: &'a WeaponDescriptor,
    pub missiles_away: u32,
    pub max_missiles: u32,
    pub timing: &'a TimingConfig,
}

/// Lock, authorize and launch one or more missiles of a group.
#[derive(Debug, Clone, PartialEq)]
pub struct MissileTask {
    pub group: WeaponGroupId,
    pub target: EntityId,
    lock: Option<LockKind>,
    window: f64,
    stage: MissileStage,
    launches: u32,
    /// Delay between launches when rippling; `None` launches once.
    ripple_interval: Option<f64>,
}

/// Lock a missile with `targeting` needs before launch. GPS and unguided
/// missiles launch on authorization alone.
pub fn lock_kind(targeting: TargetingMode) -> Option<LockKind> {
    match targeting {
        TargetingMode::Radar => Some(LockKind::Radar),
        TargetingMode::Heat => Some(LockKind::Heat),
        TargetingMode::Laser => Some(LockKind::Laser),
        TargetingMode::AntiRadiation => Some(LockKind::AntiRadiation),
        TargetingMode::Gps | TargetingMode::None => None,
    }
}

impl MissileTask {
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        platform: PlatformId,
        weapon: &WeaponDescriptor,
        group: WeaponGroupId,
        target: EntityId,
        now: f64,
        scan_interval: f64,
        ripple_interval: Option<f64>,
        timing: &TimingConfig,
        events: &mut Vec<EngineEvent>,
    ) -> Self {
        let lock = lock_kind(weapon.class.targeting());
        let window = match lock {
            Some(LockKind::Radar) => timing.radar_lock_timeout,
            Some(LockKind::Heat) => (timing.lock_window_fraction * scan_interval).max(timing.heat_lock_min),
            Some(LockKind::Laser) | Some(LockKind::AntiRadiation) => {
                timing.lock_window_fraction * scan_interval
            }
            None => 0.0,
        };
        if lock == Some(LockKind::Radar) {
            events.push(EngineEvent::RadarRequested { platform });
        }
        if let Some(kind) = lock {
            events.push(EngineEvent::LockRequested {
                platform,
                target,
                kind,
            });
        }

        let stage = if weapon.turret.is_some() {
            events.push(EngineEvent::TurretAssigned {
                platform,
                weapon: weapon.id,
                target,
                firing_tolerance: 0.0,
            });
            MissileStage::Slewing {
                until: now + timing.missile_turret_timeout,
            }
        } else {
            MissileStage::Locking {
                deadline: now + window,
                next_attempt: now,
            }
        };

        Self {
            group,
            target,
            lock,
            window,
            stage,
            launches: 0,
            ripple_interval,
        }
    }

    pub fn launches(&self) -> u32 {
        self.launches
    }

    pub fn poll(&mut self, ctx: &MissileContext, sensors: &mut dyn SensorSuite) -> MissileStep {
        if let MissileStage::Slewing { until } = self.stage {
            let direction = ctx.own.position.offset_to(&ctx.target.kinematics.position);
            let on_target = ctx
                .weapon
                .turret
                .as_ref()
                .map_or(true, |t| t.can_reach(direction, 0.0));
            if on_target {
                self.stage = MissileStage::Locking {
                    deadline: ctx.now + self.window,
                    next_attempt: ctx.now,
                };
            } else if ctx.now >= until {
                return self.finish();
            } else {
                return MissileStep::Waiting;
            }
        }

        if let MissileStage::Locking {
            deadline,
            next_attempt,
        } = self.stage
        {
            let locked = self.check_lock(ctx, sensors, next_attempt);
            if locked && self.authorized(ctx) && ctx.missiles_away < ctx.max_missiles {
                self.stage = MissileStage::Launching {
                    next_launch: ctx.now,
                };
            } else if ctx.now >= deadline {
                tracing::debug!(target_id = self.target.0, "missile.lock_expired");
                return self.finish();
            } else {
                return MissileStep::Waiting;
            }
        }

        match self.stage {
            MissileStage::Launching { next_launch } => {
                if ctx.missiles_away >= ctx.max_missiles {
                    return self.finish();
                }
                if ctx.now >= next_launch {
                    MissileStep::Launch
                } else {
                    MissileStep::Waiting
                }
            }
            _ => self.finish(),
        }
    }

    /// The controller launched a missile for this task.
    pub fn launched(&mut self, now: f64) {
        self.launches += 1;
        self.stage = match self.ripple_interval {
            Some(interval) => MissileStage::Launching {
                next_launch: now + interval,
            },
            None => MissileStage::Done,
        };
    }

    fn finish(&mut self) -> MissileStep {
        self.stage = MissileStage::Done;
        MissileStep::Finished {
            fired: self.launches > 0,
        }
    }

    fn check_lock(
        &mut self,
        ctx: &MissileContext,
        sensors: &mut dyn SensorSuite,
        next_attempt: f64,
    ) -> bool {
        let target_pos = ctx.target.kinematics.position;
        match self.lock {
            None => true,
            Some(LockKind::Radar) => {
                if ctx.now < next_attempt {
                    return false;
                }
                if let MissileStage::Locking { next_attempt, .. } = &mut self.stage {
                    *next_attempt = ctx.now + ctx.timing.lock_retry_interval;
                }
                sensors.try_lock(ctx.platform, self.target, LockKind::Radar)
            }
            Some(LockKind::Heat) => sensors.try_lock(ctx.platform, self.target, LockKind::Heat),
            Some(LockKind::Laser) => sensors
                .designated_point(ctx.platform, LockKind::Laser)
                .is_some_and(|p| p.range_to(&target_pos) < ctx.timing.laser_match_distance),
            Some(LockKind::AntiRadiation) => sensors
                .designated_point(ctx.platform, LockKind::AntiRadiation)
                .is_some_and(|p| p.range_to(&target_pos) < ctx.timing.anti_rad_match_distance),
        }
    }

    fn authorized(&self, ctx: &MissileContext) -> bool {
        LaunchProfile::from_weapon(ctx.weapon).is_some_and(|profile| {
            launch_authorized(
                &profile,
                ctx.own,
                ctx.own_surface,
                &ctx.target.kinematics,
                ctx.target.is_surface(),
            )
        })
    }
}

// --- Bomb sequence ---

/// Result of one bomb task poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BombStep {
    Waiting,
    /// Aim point inside the release radius: the controller should release now.
    Release,
    Finished { released: bool },
}

/// Inputs of one bomb task poll.
pub struct BombContext<'a> {
    pub platform: PlatformId,
    pub now: f64,
    pub own: &'a Kinematics,
    pub target: &'a TargetRecord,
    pub missiles_away: u32,
    pub max_missiles: u32,
    pub timing: &'a TimingConfig,
}

/// Fly the aim point onto the target and release.
#[derive(Debug, Clone, PartialEq)]
pub struct BombTask {
    pub group: WeaponGroupId,
    pub target: EntityId,
    deadline: f64,
    radius: f64,
    prev_distance: Option<f64>,
    releases: u32,
    next_release: f64,
    release_interval: f64,
    done: bool,
}

impl BombTask {
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        weapon: &WeaponDescriptor,
        group: WeaponGroupId,
        target: EntityId,
        now: f64,
        scan_interval: f64,
        max_missiles: u32,
        release_interval: f64,
        timing: &TimingConfig,
    ) -> Self {
        let blast = weapon.class.blast_radius();
        let spread = (1 + max_missiles / 2) as f64;
        let radius = (blast * spread.min(1.5)).max(timing.bomb_min_radius);
        Self {
            group,
            target,
            deadline: now + scan_interval.max(timing.bomb_min_duration),
            radius,
            prev_distance: None,
            releases: 0,
            next_release: now,
            release_interval,
            done: false,
        }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn releases(&self) -> u32 {
        self.releases
    }

    pub fn poll(&mut self, ctx: &BombContext, events: &mut Vec<EngineEvent>) -> BombStep {
        if self.done || ctx.now >= self.deadline {
            return self.finish();
        }
        if ctx.own.up.z < 0.0 {
            tracing::debug!(target_id = self.target.0, "bomb.abort_inverted");
            return self.finish();
        }
        if ctx.missiles_away >= ctx.max_missiles {
            return self.finish();
        }

        let target_pos = ctx.target.kinematics.position;
        let impact = bomb_impact_point(ctx.own, target_pos.z);
        let aim_distance = impact.horizontal_range_to(&target_pos);
        let opening = self.prev_distance.is_some_and(|prev| aim_distance > prev);
        self.prev_distance = Some(aim_distance);
        if aim_distance < self.radius {
            // Follow-on releases only wait on the interval; the first waits for the closest pass
            if self.releases > 0 {
                return if ctx.now >= self.next_release {
                    BombStep::Release
                } else {
                    BombStep::Waiting
                };
            }
            if opening {
                return BombStep::Release;
            }
        }

        let to_target = ctx.own.position.offset_to(&target_pos);
        let along = ctx.own.velocity.x * to_target.x + ctx.own.velocity.y * to_target.y;
        let range = ctx.own.position.horizontal_range_to(&target_pos);
        if along < 0.0 && range < ctx.timing.bomb_extend_distance {
            events.push(EngineEvent::ExtendRequested {
                platform: ctx.platform,
                target: self.target,
            });
            return self.finish();
        }
        BombStep::Waiting
    }

    /// The controller released a bomb for this task.
    pub fn released(&mut self, now: f64) {
        self.releases += 1;
        self.next_release = now + self.release_interval;
    }

    fn finish(&mut self) -> BombStep {
        self.done = true;
        BombStep::Finished {
            released: self.releases > 0,
        }
    }
}

/// Where a bomb released now lands at `ground_altitude`, ignoring drag.
pub fn bomb_impact_point(own: &Kinematics, ground_altitude: f64) -> Position {
    let height = own.position.z - ground_altitude;
    let vz = own.velocity.z;
    let disc = vz * vz + 2.0 * GRAVITY * height;
    let fall_time = if height <= 0.0 || disc < 0.0 {
        0.0
    } else {
        (vz + disc.sqrt()) / GRAVITY
    };
    Position::new(
        own.position.x + own.velocity.x * fall_time,
        own.position.y + own.velocity.y * fall_time,
        ground_altitude,
    )
}
