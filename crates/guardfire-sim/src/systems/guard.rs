//! Guard controller: the per-platform decision loop.
//!
//! Each tick expires the override target, runs the threat monitor, counts
//! down the scan timer, re-selects targets when it fires and advances the
//! running sequences. Weapons only fire through the ripple scheduler, after
//! the envelope check passes again for the instance that would fire.

use guardfire_core::commands::EngineCommand;
use guardfire_core::components::{EntityId, Kinematics, VesselInfo};
use guardfire_core::constants::SECONDARY_TURRET_TOLERANCE_DEG;
use guardfire_core::enums::WeaponKind;
use guardfire_core::events::EngineEvent;
use guardfire_core::target::TargetRecord;
use guardfire_core::weapon::{WeaponDescriptor, WeaponGroupId, WeaponId};

use super::envelope::{self, EnvelopeContext};
use super::scoring::ScoringContext;
use super::targeting::{missiles_in_flight, smart_find_target, TargetingInput};
use super::tasks::{
    BombContext, BombStep, BombTask, MissileContext, MissileStep, MissileTask, TaskStatus, TurretContext,
    TurretTask,
};
use super::threat::{self, AllyStatus};
use crate::context::{entity_id, SimulationContext};
use crate::engagement::{EngagementState, LaunchTask, OverrideTarget};
use crate::registry::TargetRegistry;
use crate::sensors::SensorSuite;

/// Clock and team information for one platform tick.
pub struct GuardInput<'a> {
    pub now: f64,
    pub dt: f64,
    pub tick: u64,
    pub allies: &'a [AllyStatus],
}

/// Advance one platform by one tick.
pub fn run(
    state: &mut EngagementState,
    ctx: &mut SimulationContext,
    sensors: &mut dyn SensorSuite,
    input: &GuardInput,
    events: &mut Vec<EngineEvent>,
    commands: &mut Vec<EngineCommand>,
) {
    let platform = state.platform;
    let now = input.now;
    let (Some(own), Some(own_info)) = (ctx.kinematics(platform), ctx.info(platform)) else {
        return;
    };

    // Step 1: expire the override target
    if state.override_target.is_some_and(|o| now >= o.expires_at) {
        tracing::debug!(platform = platform.0, "guard.override_expired");
        state.override_target = None;
    }

    // Step 2: threat response, independent of the guard loop
    let credit = threat::run(state, &ctx.registry, &own, input.allies, now, input.dt, events, commands);

    if !state.guard_enabled {
        return;
    }

    // Step 3: scan timer runs twice as fast with a missile incoming
    state.scan_timer -= input.dt;
    if state.monitor.missile_incoming() {
        state.scan_timer -= input.dt;
    }
    state.scan_timer -= credit;

    // Step 4: drop a target that left the registry
    if state.current_target.is_some_and(|t| !ctx.registry.contains(t)) {
        clear_target(state, &mut ctx.registry, events);
    }

    // Step 5: re-select while no launch sequence holds the lock
    if state.launch_task.is_none() && (state.force_rescan || state.scan_timer <= 0.0) {
        state.force_rescan = false;
        state.scan_timer = state.config.scan_interval;
        scan(state, ctx, sensors, &own, &own_info, now, events);
    }

    // Step 6: advance sequences
    run_turret(state, &ctx.registry, sensors, &own, &own_info, input, events);
    run_launch(state, &ctx.registry, sensors, &own, &own_info, now, events);

    state.missiles_away = match state.current_target {
        Some(target) => missiles_in_flight(&ctx.registry, platform, target).max(state.sequence_launches),
        None => 0,
    };
}

/// Replace the current target, keeping registry engagement counts balanced.
pub fn set_target(
    state: &mut EngagementState,
    registry: &mut TargetRegistry,
    target: Option<EntityId>,
    events: &mut Vec<EngineEvent>,
) {
    let platform = state.platform;
    let previous = state.current_target;
    if previous == target {
        return;
    }
    if let Some(old) = previous {
        registry.disengage(old, state.team, platform);
        events.push(EngineEvent::Disengaged { platform, target: old });
    }
    if let Some(new) = target {
        registry.engage(new, state.team, platform);
        events.push(EngineEvent::Engaged { platform, target: new });
    }
    state.current_target = target;
    state.sequence_launches = 0;
    events.push(EngineEvent::TargetChanged { platform, target });
    tracing::info!(
        platform = platform.0,
        previous = previous.map(|t| t.0),
        target_id = target.map(|t| t.0),
        "guard.target_changed"
    );
}

/// Stop every sequence and release the target.
pub fn clear_target(state: &mut EngagementState, registry: &mut TargetRegistry, events: &mut Vec<EngineEvent>) {
    let platform = state.platform;
    if let Some(mut task) = state.turret_task.take() {
        task.cancel(platform, events);
    }
    state.launch_task = None;
    set_target(state, registry, None, events);
    state.current_weapon = None;
    state.weapon_kind = None;
    if !state.secondary_targets.is_empty() {
        state.secondary_targets.clear();
        events.push(EngineEvent::SecondaryTargetsChanged {
            platform,
            targets: Vec::new(),
        });
    }
}

/// Leave guard mode: release everything and forget the override.
pub fn disable(state: &mut EngagementState, registry: &mut TargetRegistry, events: &mut Vec<EngineEvent>) {
    clear_target(state, registry, events);
    state.override_target = None;
    state.force_rescan = false;
}

/// Full shutdown for a scene change, including the threat monitor.
pub fn shutdown(state: &mut EngagementState, registry: &mut TargetRegistry, events: &mut Vec<EngineEvent>) {
    disable(state, registry, events);
    let update = state.monitor.reset();
    threat::emit_update(state.platform, update, events);
}

fn scan(
    state: &mut EngagementState,
    ctx: &mut SimulationContext,
    sensors: &mut dyn SensorSuite,
    own: &Kinematics,
    own_info: &VesselInfo,
    now: f64,
    events: &mut Vec<EngineEvent>,
) {
    let platform = state.platform;
    let team_vips: Vec<EntityId> = ctx
        .world
        .query::<&VesselInfo>()
        .iter()
        .filter(|(_, info)| info.team == state.team && info.vip)
        .map(|(entity, _)| entity_id(entity))
        .collect();
    let max_weapon_range = state.weapons.iter().map(|w| w.max_range).fold(0.0, f64::max);

    let result = {
        let input = TargetingInput {
            platform,
            team: state.team,
            own,
            own_situation: own_info.situation,
            now,
            config: &state.config,
            weapons: &state.weapons,
            scoring: ScoringContext {
                platform,
                team: state.team,
                own,
                own_mass: own_info.mass,
                own_weapon_count: state.weapons.len() as u32,
                current_target: state.current_target,
                incoming_threat: state.monitor.incoming_threat,
                threatened: state.monitor.missile_incoming() || state.monitor.under_fire(),
                max_weapon_range,
                teammates: ctx.teammates(state.team),
                team_vips: &team_vips,
                weights: &state.config.weights,
                target_bias: state.config.target_bias,
            },
            current_target: state.current_target,
            override_target: state.override_target.map(|o| o.target),
            pending_launches: state.sequence_launches,
        };
        smart_find_target(&ctx.registry, &input, &*sensors)
    };

    // An override that failed to produce a weapon is dropped; a used one is refreshed
    if let Some(forced) = state.override_target {
        state.override_target = match result.primary {
            Some(pick) if pick.via_override => Some(OverrideTarget {
                expires_at: now + state.config.timing.override_duration,
                ..forced
            }),
            _ => None,
        };
    }

    if result.request_radar {
        sensors.enable_radar(platform);
        events.push(EngineEvent::RadarRequested { platform });
    }

    let Some(pick) = result.primary else {
        if state.current_target.is_some() {
            tracing::debug!(platform = platform.0, "guard.no_target");
        }
        clear_target(state, &mut ctx.registry, events);
        return;
    };
    let (Some(weapon), Some(kind)) = (pick.selection.weapon, pick.selection.kind) else {
        return;
    };

    set_target(state, &mut ctx.registry, Some(pick.target), events);
    if state.current_weapon != Some(weapon) {
        state.current_weapon = Some(weapon);
        state.weapon_kind = Some(kind);
        events.push(EngineEvent::WeaponSelected { platform, weapon, kind });
    }
    start_sequence(state, weapon, pick.target, now, events);

    if state.secondary_targets != result.secondaries {
        state.secondary_targets = result.secondaries;
        events.push(EngineEvent::SecondaryTargetsChanged {
            platform,
            targets: state.secondary_targets.clone(),
        });
    }
    assign_secondary_turrets(state, &ctx.registry, own, events);
}

/// Start the sequence for `weapon`, or keep the running one when it already
/// covers the same group and target.
fn start_sequence(
    state: &mut EngagementState,
    weapon_id: WeaponId,
    target: EntityId,
    now: f64,
    events: &mut Vec<EngineEvent>,
) {
    let platform = state.platform;
    let (Some(group_id), Some(weapon)) = (state.ripple.group_of(weapon_id), state.weapon(weapon_id).cloned()) else {
        return;
    };
    let group = state.ripple.group(group_id);
    let rippling = group.is_some_and(|g| g.is_rippling());
    let delay = group.map_or(0.0, |g| g.delay());

    let kind = weapon.kind();
    if kind.is_direct_fire() {
        let keep = state
            .turret_task
            .as_ref()
            .is_some_and(|t| t.group == group_id && t.target == target);
        if !keep {
            if let Some(mut old) = state.turret_task.take() {
                old.cancel(platform, events);
            }
            state.turret_task = Some(TurretTask::start(platform, group_id, target, now, events));
        }
        return;
    }

    if let Some(mut old) = state.turret_task.take() {
        old.cancel(platform, events);
    }
    let config = &state.config;
    let task = if kind == WeaponKind::Bomb {
        let release_interval = if rippling {
            delay
        } else {
            config.timing.single_release_interval
        };
        LaunchTask::Bomb(BombTask::start(
            &weapon,
            group_id,
            target,
            now,
            config.scan_interval,
            config.max_missiles_on_target,
            release_interval,
            &config.timing,
        ))
    } else {
        LaunchTask::Missile(MissileTask::start(
            platform,
            &weapon,
            group_id,
            target,
            now,
            config.scan_interval,
            rippling.then_some(delay),
            &config.timing,
            events,
        ))
    };
    tracing::debug!(platform = platform.0, target_id = target.0, weapon = %weapon.name, "guard.sequence_started");
    state.launch_task = Some(task);
}

/// Point free turrets of other groups at the secondary targets.
fn assign_secondary_turrets(
    state: &EngagementState,
    registry: &TargetRegistry,
    own: &Kinematics,
    events: &mut Vec<EngineEvent>,
) {
    let primary_group = state.current_weapon.and_then(|w| state.ripple.group_of(w));
    let mut assigned: Vec<WeaponId> = Vec::new();
    for target in &state.secondary_targets {
        let Some(record) = registry.get(*target) else {
            continue;
        };
        let direction = own.position.offset_to(&record.kinematics.position);
        for weapon in &state.weapons {
            if !weapon.kind().is_direct_fire()
                || assigned.contains(&weapon.id)
                || state.ripple.group_of(weapon.id) == primary_group
            {
                continue;
            }
            let Some(turret) = &weapon.turret else {
                continue;
            };
            if turret.can_reach(direction, SECONDARY_TURRET_TOLERANCE_DEG) {
                assigned.push(weapon.id);
                events.push(EngineEvent::TurretAssigned {
                    platform: state.platform,
                    weapon: weapon.id,
                    target: *target,
                    firing_tolerance: SECONDARY_TURRET_TOLERANCE_DEG,
                });
            }
        }
    }
}

/// Target record for this tick, refreshed by a sensor sample when one exists.
fn target_record(
    registry: &TargetRegistry,
    sensors: &mut dyn SensorSuite,
    state: &EngagementState,
    target: EntityId,
) -> Option<TargetRecord> {
    let mut record = registry.get(target)?.clone();
    if let Some(sample) = sensors.sample(state.platform, target) {
        record.kinematics = sample;
    }
    Some(record)
}

fn group_members(weapons: &[WeaponDescriptor], state_group: &[WeaponId]) -> Vec<WeaponDescriptor> {
    state_group
        .iter()
        .filter_map(|id| weapons.iter().find(|w| w.id == *id))
        .cloned()
        .collect()
}

/// Instances of the group that pass the envelope check right now.
fn ready_instances(members: &[WeaponDescriptor], env: &EnvelopeContext) -> Vec<WeaponId> {
    members
        .iter()
        .filter(|w| envelope::check(w, env).feasible)
        .map(|w| w.id)
        .collect()
}

fn members_of(state: &EngagementState, group: WeaponGroupId) -> Vec<WeaponDescriptor> {
    state
        .ripple
        .group(group)
        .map(|g| group_members(&state.weapons, &g.members))
        .unwrap_or_default()
}

fn run_turret(
    state: &mut EngagementState,
    registry: &TargetRegistry,
    sensors: &mut dyn SensorSuite,
    own: &Kinematics,
    own_info: &VesselInfo,
    input: &GuardInput,
    events: &mut Vec<EngineEvent>,
) {
    let Some(mut task) = state.turret_task.take() else {
        return;
    };
    let platform = state.platform;
    let now = input.now;
    let Some(record) = target_record(registry, sensors, state, task.target) else {
        task.cancel(platform, events);
        state.force_rescan = true;
        return;
    };

    let config = &state.config;
    let distance = own.position.range_to(&record.kinematics.position);
    let members = members_of(state, task.group);
    let env = EnvelopeContext {
        own,
        own_situation: own_info.situation,
        target: &record,
        distance,
        tuning: &config.tuning,
        unlimited_ammo: config.unlimited_ammo,
        range_cap: config.max_engagement_range,
    };
    let ready = ready_instances(&members, &env);
    let member_refs: Vec<&WeaponDescriptor> = members.iter().collect();
    let turret_ctx = TurretContext {
        platform,
        now,
        target_visible: registry.can_see(
            state.team,
            task.target,
            now,
            config.scan_interval,
            &own.position,
            config.guard_range,
        ),
        in_guard_range: distance <= config.guard_range,
        weapon_feasible: !ready.is_empty(),
        members: &member_refs,
        tolerance: envelope::gimbal_tolerance(own_info.situation, &config.tuning),
        burst_length: config.burst_length(),
        timing: &config.timing,
    };

    match task.poll(&turret_ctx, events) {
        TaskStatus::Running => {
            if task.is_firing() {
                if let Some(group) = state.ripple.group_mut(task.group) {
                    for weapon in group.fire(now, input.tick, &ready) {
                        events.push(EngineEvent::TriggerPulled {
                            platform,
                            weapon,
                            target: task.target,
                        });
                    }
                }
            }
            state.turret_task = Some(task);
        }
        TaskStatus::Finished => {
            tracing::debug!(platform = platform.0, target_id = task.target.0, "guard.turret_released");
            state.force_rescan = true;
        }
    }
}

fn run_launch(
    state: &mut EngagementState,
    registry: &TargetRegistry,
    sensors: &mut dyn SensorSuite,
    own: &Kinematics,
    own_info: &VesselInfo,
    now: f64,
    events: &mut Vec<EngineEvent>,
) {
    let Some(task) = state.launch_task.take() else {
        return;
    };
    let platform = state.platform;
    let target = task.target();
    let Some(record) = target_record(registry, sensors, state, target) else {
        state.force_rescan = true;
        return;
    };
    let missiles_away = missiles_in_flight(registry, platform, target).max(state.sequence_launches);
    let config = state.config.clone();
    let env = EnvelopeContext {
        own,
        own_situation: own_info.situation,
        target: &record,
        distance: own.position.range_to(&record.kinematics.position),
        tuning: &config.tuning,
        unlimited_ammo: config.unlimited_ammo,
        range_cap: config.max_engagement_range,
    };

    match task {
        LaunchTask::Missile(mut task) => {
            let members = members_of(state, task.group);
            let Some(weapon) = members.first() else {
                return;
            };
            let missile_ctx = MissileContext {
                platform,
                now,
                own,
                own_surface: own_info.situation.is_surface(),
                target: &record,
                weapon,
                missiles_away,
                max_missiles: config.max_missiles_on_target,
                timing: &config.timing,
            };
            match task.poll(&missile_ctx, sensors) {
                MissileStep::Waiting => state.launch_task = Some(LaunchTask::Missile(task)),
                MissileStep::Launch => {
                    let ready = ready_instances(&members, &env);
                    let picked = state.ripple.group_mut(task.group).and_then(|g| g.advance(&ready));
                    match picked {
                        Some(weapon) => {
                            events.push(EngineEvent::MissileLaunched {
                                platform,
                                weapon,
                                target,
                            });
                            tracing::info!(platform = platform.0, target_id = target.0, weapon = weapon.0, "guard.missile_launched");
                            task.launched(now);
                            state.sequence_launches += 1;
                            state.launch_task = Some(LaunchTask::Missile(task));
                        }
                        None => {
                            tracing::debug!(platform = platform.0, target_id = target.0, "guard.no_ready_launcher");
                        }
                    }
                }
                MissileStep::Finished { fired } => {
                    tracing::debug!(platform = platform.0, target_id = target.0, fired, "guard.missile_sequence_done");
                }
            }
        }
        LaunchTask::Bomb(mut task) => {
            let members = members_of(state, task.group);
            let bomb_ctx = BombContext {
                platform,
                now,
                own,
                target: &record,
                missiles_away,
                max_missiles: config.max_missiles_on_target,
                timing: &config.timing,
            };
            match task.poll(&bomb_ctx, events) {
                BombStep::Waiting => state.launch_task = Some(LaunchTask::Bomb(task)),
                BombStep::Release => {
                    let ready = ready_instances(&members, &env);
                    if let Some(weapon) = state.ripple.group_mut(task.group).and_then(|g| g.advance(&ready)) {
                        events.push(EngineEvent::BombReleased {
                            platform,
                            weapon,
                            target,
                        });
                        tracing::info!(platform = platform.0, target_id = target.0, weapon = weapon.0, "guard.bomb_released");
                        task.released(now);
                        state.sequence_launches += 1;
                        state.launch_task = Some(LaunchTask::Bomb(task));
                    }
                }
                BombStep::Finished { released } => {
                    tracing::debug!(platform = platform.0, target_id = target.0, released, "guard.bomb_run_done");
                }
            }
        }
    }
}
