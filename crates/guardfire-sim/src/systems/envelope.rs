//! Engagement envelope: can this weapon instance engage this target right now?

use guardfire_core::components::Kinematics;
use guardfire_core::config::MatcherTuning;
use guardfire_core::enums::{Situation, TargetingMode};
use guardfire_core::target::TargetRecord;
use guardfire_core::weapon::{WeaponClass, WeaponDescriptor};

use crate::launch_zone::{launch_zone, LaunchProfile};

/// Platform and target state shared by every envelope check of one selection.
pub struct EnvelopeContext<'a> {
    pub own: &'a Kinematics,
    pub own_situation: Situation,
    pub target: &'a TargetRecord,
    /// Selection distance, between positions predicted one second ahead (m).
    pub distance: f64,
    pub tuning: &'a MatcherTuning,
    pub unlimited_ammo: bool,
    /// Cap on any computed range (m).
    pub range_cap: f64,
}

/// Outcome of one feasibility check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvelopeCheck {
    pub feasible: bool,
    /// The weapon needs the radar switched on to be employed.
    pub request_radar: bool,
}

impl EnvelopeCheck {
    fn infeasible() -> Self {
        Self::default()
    }

    fn feasible(request_radar: bool) -> Self {
        Self {
            feasible: true,
            request_radar,
        }
    }
}

/// Gimbal tolerance granted to turrets in the platform's current situation.
pub fn gimbal_tolerance(situation: Situation, tuning: &MatcherTuning) -> f64 {
    if situation.is_surface() {
        tuning.gimbal_tolerance_surface
    } else {
        tuning.gimbal_tolerance_flying
    }
}

/// Full feasibility test of `weapon` against the target in `ctx`.
pub fn check(weapon: &WeaponDescriptor, ctx: &EnvelopeContext) -> EnvelopeCheck {
    if !ctx.distance.is_finite() || ctx.distance > weapon.max_range * ctx.tuning.range_margin {
        return EnvelopeCheck::infeasible();
    }
    let readiness = &weapon.readiness;
    if readiness.overheated || readiness.reloading || readiness.crew_present == Some(false) {
        return EnvelopeCheck::infeasible();
    }

    match &weapon.class {
        // No min range rejection here; the matcher penalizes these inside it
        WeaponClass::Gun(_) | WeaponClass::Rocket(_) | WeaponClass::Laser(_) => {
            if let Some(turret) = &weapon.turret {
                let direction = ctx.own.position.offset_to(&ctx.target.kinematics.position);
                let tolerance = gimbal_tolerance(ctx.own_situation, ctx.tuning);
                if !turret.can_reach(direction, tolerance) {
                    return EnvelopeCheck::infeasible();
                }
            }
            if matches!(weapon.class, WeaponClass::Gun(_)) && !readiness.can_fire_soon {
                return EnvelopeCheck::infeasible();
            }
            if !readiness.has_ammo(ctx.unlimited_ammo) {
                return EnvelopeCheck::infeasible();
            }
            EnvelopeCheck::feasible(false)
        }
        WeaponClass::Missile(missile) => {
            if ctx.distance < weapon.min_range || !readiness.has_ammo(ctx.unlimited_ammo) {
                return EnvelopeCheck::infeasible();
            }
            let request_radar = missile.targeting == TargetingMode::Radar;
            if ctx.own.velocity.speed() <= missile.min_launch_speed {
                return EnvelopeCheck {
                    feasible: false,
                    request_radar,
                };
            }
            let Some(profile) = LaunchProfile::from_weapon(weapon) else {
                return EnvelopeCheck::infeasible();
            };
            let zone = launch_zone(
                &profile,
                ctx.own,
                ctx.own_situation.is_surface(),
                &ctx.target.kinematics,
                ctx.range_cap,
            );
            EnvelopeCheck {
                feasible: zone.contains(ctx.distance),
                request_radar,
            }
        }
        WeaponClass::Bomb(_) => {
            if ctx.distance < weapon.min_range || !readiness.has_ammo(ctx.unlimited_ammo) {
                return EnvelopeCheck::infeasible();
            }
            if ctx.own_situation == Situation::Flying {
                EnvelopeCheck::feasible(false)
            } else {
                EnvelopeCheck::infeasible()
            }
        }
        WeaponClass::Slw(slw) => {
            if ctx.distance < weapon.min_range || !readiness.has_ammo(ctx.unlimited_ammo) {
                return EnvelopeCheck::infeasible();
            }
            EnvelopeCheck::feasible(slw.targeting == TargetingMode::Radar)
        }
    }
}
