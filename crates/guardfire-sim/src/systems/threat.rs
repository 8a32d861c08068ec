//! Threat response system: builds the platform's threat scan from the
//! registry, runs the monitor and turns its output into events and commands.
//!
//! Help requests are routed through the command queue so a teammate's state
//! is only changed at its own tick boundary.

use guardfire_core::commands::EngineCommand;
use guardfire_core::components::{EntityId, Kinematics, PlatformId};
use guardfire_core::enums::IncomingKind;
use guardfire_core::events::EngineEvent;
use guardfire_core::types::Position;
use guardfire_threat::countermeasures::DispenseAction;
use guardfire_threat::monitor::{DirectFireThreat, IncomingMissile, MonitorUpdate, ThreatContext, ThreatScan};

use crate::engagement::EngagementState;
use crate::registry::TargetRegistry;

/// A teammate's position and current target, captured before the tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllyStatus {
    pub platform: PlatformId,
    pub position: Position,
    pub current_target: Option<EntityId>,
}

/// Collect incoming missiles and direct fire aimed at `platform`.
pub fn scan_threats(registry: &TargetRegistry, state: &EngagementState, own: &Kinematics) -> ThreatScan {
    let mut scan = ThreatScan::default();
    let mut closest_fire: Option<(f64, DirectFireThreat)> = None;

    for record in registry.iter() {
        let Some(missile) = record.missile else {
            continue;
        };
        if missile.target != Some(state.platform) || record.team() == state.team {
            continue;
        }
        let distance = own.position.range_to(&record.kinematics.position);

        if missile.kind == IncomingKind::DirectFire {
            let Some(shooter) = missile.source else {
                continue;
            };
            let threat = DirectFireThreat {
                shooter,
                position: record.kinematics.position,
                miss_distance: miss_distance(own, &record.kinematics),
            };
            if closest_fire.as_ref().map_or(true, |(d, _)| distance < *d) {
                closest_fire = Some((distance, threat));
            }
            continue;
        }

        scan.missiles.push(IncomingMissile {
            id: record.id,
            kind: missile.kind,
            source: missile.source,
            position: record.kinematics.position,
            velocity: record.kinematics.velocity,
            distance,
        });
    }

    scan.missiles.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));
    scan.firing_at_me = closest_fire.map(|(_, threat)| threat);
    scan
}

/// Closest approach of a projectile to the platform, assuming both hold
/// their current velocity.
pub fn miss_distance(own: &Kinematics, projectile: &Kinematics) -> f64 {
    let rel_pos = own.position.offset_to(&projectile.position);
    let rel_vel = projectile.velocity.to_dvec3() - own.velocity.to_dvec3();
    let speed_sq = rel_vel.length_squared();
    if speed_sq <= f64::EPSILON {
        return rel_pos.length();
    }
    let t = (-rel_pos.dot(rel_vel) / speed_sq).max(0.0);
    (rel_pos + rel_vel * t).length()
}

/// Run the monitor for one tick. Returns the scan timer credit.
#[allow(clippy::too_many_arguments)]
pub fn run(
    state: &mut EngagementState,
    registry: &TargetRegistry,
    own: &Kinematics,
    allies: &[AllyStatus],
    now: f64,
    dt: f64,
    events: &mut Vec<EngineEvent>,
    commands: &mut Vec<EngineCommand>,
) -> f64 {
    let scan = scan_threats(registry, state, own);
    let ctx = ThreatContext {
        scan: &scan,
        own_velocity: own.velocity,
        now,
        dt,
        engage_missiles: state.config.engage_missiles,
        has_target: state.current_target.is_some(),
        scan_interval: state.config.scan_interval,
        countermeasures: &state.config.countermeasures,
        timing: &state.config.timing,
    };
    let update = state.monitor.update(&ctx);

    if let Some(shooter) = update.help_request {
        request_help(state, registry, own, allies, shooter, events, commands);
    }
    let credit = update.scan_credit;
    emit_update(state.platform, update, events);
    credit
}

/// Translate warning transitions and dispenser actions into host events.
pub fn emit_update(platform: PlatformId, update: MonitorUpdate, events: &mut Vec<EngineEvent>) {
    for (warning, active) in update.warnings {
        events.push(EngineEvent::WarningChanged {
            platform,
            warning,
            active,
        });
    }
    for action in update.actions {
        events.push(match action {
            DispenseAction::Drop(kind) => EngineEvent::CountermeasureDispensed { platform, kind },
            DispenseAction::JammerOn => EngineEvent::JammerChanged { platform, active: true },
            DispenseAction::JammerOff => EngineEvent::JammerChanged { platform, active: false },
        });
    }
}

/// Hand a shooter to the nearest teammate. When the shooter is our own
/// target and the teammate is busy, the two platforms swap targets.
fn request_help(
    state: &EngagementState,
    registry: &TargetRegistry,
    own: &Kinematics,
    allies: &[AllyStatus],
    shooter: EntityId,
    events: &mut Vec<EngineEvent>,
    commands: &mut Vec<EngineCommand>,
) {
    let hostile = registry.get(shooter).is_some_and(|r| r.team() != state.team);
    if !hostile {
        return;
    }
    let Some(ally) = allies
        .iter()
        .filter(|a| a.platform != state.platform)
        .min_by(|a, b| {
            own.position
                .range_to(&a.position)
                .total_cmp(&own.position.range_to(&b.position))
                .then(a.platform.cmp(&b.platform))
        })
    else {
        return;
    };

    let duration_secs = state.config.timing.override_duration;
    if state.current_target == Some(shooter) {
        if let Some(ally_target) = ally.current_target {
            commands.push(EngineCommand::SetOverrideTarget {
                platform: state.platform,
                target: ally_target,
                duration_secs,
            });
        }
    }
    commands.push(EngineCommand::SetOverrideTarget {
        platform: ally.platform,
        target: shooter,
        duration_secs,
    });
    events.push(EngineEvent::HelpRequested {
        platform: state.platform,
        ally: ally.platform,
        target: shooter,
    });
    tracing::info!(
        platform = state.platform.0,
        ally = ally.platform.0,
        target_id = shooter.0,
        "threat.help_requested"
    );
}
