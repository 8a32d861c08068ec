//! Target scoring engine: weighted priority terms and the target selectors
//! used by the guard pipeline.
//!
//! Every function here is pure. Candidate lists are already filtered to the
//! visible threats a platform may consider; selectors only rank them.

use guardfire_core::components::{EntityId, Kinematics, PlatformId, TeamId};
use guardfire_core::config::TargetWeights;
use guardfire_core::constants::*;
use guardfire_core::enums::SelectionMode;
use guardfire_core::target::TargetRecord;
use guardfire_core::types::angle_between_deg;

/// Everything the weighted score needs to know about the scoring platform.
pub struct ScoringContext<'a> {
    pub platform: PlatformId,
    pub team: TeamId,
    pub own: &'a Kinematics,
    pub own_mass: f64,
    pub own_weapon_count: u32,
    pub current_target: Option<EntityId>,
    /// Source of the closest incoming threat.
    pub incoming_threat: Option<EntityId>,
    /// A missile is incoming or the platform is under fire.
    pub threatened: bool,
    /// Longest engagement range of any carried weapon (m).
    pub max_weapon_range: f64,
    /// Other engine-driven platforms on the team.
    pub teammates: usize,
    /// VIP vessels of the platform's team.
    pub team_vips: &'a [EntityId],
    pub weights: &'a TargetWeights,
    pub target_bias: f64,
}

// --- Priority terms ---

/// Closer targets score higher. Zero when no weapon range is known.
pub fn range_term(distance: f64, max_weapon_range: f64) -> f64 {
    if max_weapon_range <= 0.0 {
        return 0.0;
    }
    1.0 - (distance / max_weapon_range).clamp(0.0, 1.0)
}

/// Antenna train angle: targets ahead of the nose score higher.
pub fn ata_term(own: &Kinematics, target: &TargetRecord) -> f64 {
    let Some(los) = own.position.offset_to(&target.kinematics.position).try_normalize() else {
        return 0.0;
    };
    let Some(fwd) = own.forward.try_normalize() else {
        return 0.0;
    };
    let c = (los.dot(fwd) + 1.0) / 2.0;
    c * c
}

/// Targets pulling hard along their own axis are more dangerous.
pub fn accel_term(target: &TargetRecord) -> f64 {
    let Some(fwd) = target.kinematics.forward.try_normalize() else {
        return 0.0;
    };
    let along = target.kinematics.acceleration.to_dvec3().dot(fwd).abs();
    0.1 * (along / GRAVITY).clamp(0.0, 10.0)
}

/// Targets that will reach us soon score higher.
pub fn closure_term(own: &Kinematics, target: &TargetRecord) -> f64 {
    let distance = own.position.range_to(&target.kinematics.position);
    let relative = (target.kinematics.velocity.to_dvec3() - own.velocity.to_dvec3()).length();
    if relative <= f64::EPSILON {
        return 0.0;
    }
    1.0 - (distance / relative).clamp(0.0, CLOSURE_TIME_CAP_SECS) / CLOSURE_TIME_CAP_SECS
}

/// Better armed targets score higher. Zero for unarmed targets.
pub fn weapons_term(target_weapons: u32, own_weapons: u32) -> f64 {
    if target_weapons == 0 {
        return 0.0;
    }
    let tw = target_weapons as f64;
    ((tw - own_weapons as f64) / tw).max(0.0)
}

/// Targets already engaged by many teammates score lower.
pub fn friendlies_term(engaging: usize, teammates: usize) -> f64 {
    if teammates == 0 {
        return 0.0;
    }
    let others = engaging.saturating_sub(1) as f64;
    1.0 - (others / teammates as f64).clamp(0.0, 1.0)
}

/// Full weight for the vessel that is currently shooting at us.
pub fn threat_term(target: EntityId, incoming_threat: Option<EntityId>, threatened: bool) -> f64 {
    if threatened && incoming_threat == Some(target) {
        1.0
    } else {
        0.0
    }
}

/// Angle over distance: targets ahead of the flight path and close by.
pub fn aod_term(own: &Kinematics, target: &TargetRecord) -> f64 {
    let los = own.position.offset_to(&target.kinematics.position);
    let distance = los.length();
    let theta = angle_between_deg(own.travel_direction(), los).unwrap_or(180.0);
    let half_cos = (theta.to_radians() / 2.0).cos();
    let score = (half_cos * half_cos + 1.0) * 100.0 / distance.max(10.0);
    (score / 2.0).clamp(0.0, 1.0)
}

/// Heavier targets score higher, lighter ones lower.
pub fn mass_term(target_mass: f64, own_mass: f64) -> f64 {
    if target_mass <= 0.0 || own_mass <= 0.0 {
        return 0.0;
    }
    ((target_mass / own_mass).log10() / 2.0).clamp(-1.0, 1.0)
}

/// The target is attacking one of our VIPs.
pub fn protect_vip_term(target: &TargetRecord, team_vips: &[EntityId]) -> f64 {
    match target.info.engaging {
        Some(victim) if team_vips.contains(&victim) => 1.0,
        _ => 0.0,
    }
}

pub fn attack_vip_term(target: &TargetRecord) -> f64 {
    if target.info.vip {
        1.0
    } else {
        0.0
    }
}

/// Weighted priority score of `target`. Higher is more attractive.
pub fn score(target: &TargetRecord, ctx: &ScoringContext) -> f64 {
    let w = ctx.weights;
    let distance = ctx.own.position.range_to(&target.kinematics.position);
    let sum = w.range * range_term(distance, ctx.max_weapon_range)
        + w.ata * ata_term(ctx.own, target)
        + w.aod * aod_term(ctx.own, target)
        + w.accel * accel_term(target)
        + w.closure_time * closure_term(ctx.own, target)
        + w.weapons * weapons_term(target.info.weapon_count, ctx.own_weapon_count)
        + w.mass * mass_term(target.info.mass, ctx.own_mass)
        + w.friendlies_engaging * friendlies_term(target.num_engaging(ctx.team), ctx.teammates)
        + w.threat * threat_term(target.id, ctx.incoming_threat, ctx.threatened)
        + w.protect_vip * protect_vip_term(target, ctx.team_vips)
        + w.attack_vip * attack_vip_term(target);

    let bias = if ctx.current_target == Some(target.id) {
        ctx.target_bias
    } else {
        1.0
    };
    let total = bias * (1.0 + sum);
    if total.is_finite() {
        total
    } else {
        f64::MIN
    }
}

// --- Selectors ---

fn distance(own: &Kinematics, target: &TargetRecord) -> f64 {
    own.position.range_to(&target.kinematics.position)
}

/// Nearest target, favouring the current one and targets ahead of the flight path.
pub fn closest_with_hysteresis(
    candidates: &[&TargetRecord],
    own: &Kinematics,
    current: Option<EntityId>,
) -> Option<EntityId> {
    candidates
        .iter()
        .map(|t| {
            let los = own.position.offset_to(&t.kinematics.position);
            let d = los.length().max(1.0);
            let theta = angle_between_deg(own.travel_direction(), los).unwrap_or(0.0);
            let half_cos = (theta.to_radians() / 2.0).cos();
            let bearing = (CLOSEST_BEARING_BIAS - 1.0) * half_cos * half_cos + 1.0;
            let hysteresis = if current == Some(t.id) {
                CLOSEST_HYSTERESIS
            } else {
                1.0
            };
            (t.id, hysteresis * bearing / d)
        })
        .fold(None, |best: Option<(EntityId, f64)>, (id, s)| match best {
            Some((_, b)) if b >= s => best,
            _ => Some((id, s)),
        })
        .map(|(id, _)| id)
}

/// Highest weighted score.
pub fn highest_priority(candidates: &[&TargetRecord], ctx: &ScoringContext) -> Option<EntityId> {
    candidates
        .iter()
        .map(|t| (t.id, score(t, ctx)))
        .fold(None, |best: Option<(EntityId, f64)>, (id, s)| match best {
            Some((_, b)) if b >= s => best,
            _ => Some((id, s)),
        })
        .map(|(id, _)| id)
}

/// Fewest friendlies engaging, then closest.
pub fn least_engaged(
    candidates: &[&TargetRecord],
    team: TeamId,
    own: &Kinematics,
) -> Option<EntityId> {
    min_by_key(candidates, |t| (t.num_engaging(team) as f64, distance(own, t)))
}

/// Plain nearest target.
pub fn closest(candidates: &[&TargetRecord], own: &Kinematics) -> Option<EntityId> {
    min_by_key(candidates, |t| (0.0, distance(own, t)))
}

/// Missile homing on `platform` that few friendlies are already shooting at.
pub fn missile_targeting_me(
    candidates: &[&TargetRecord],
    platform: PlatformId,
    team: TeamId,
    own: &Kinematics,
) -> Option<EntityId> {
    let mine: Vec<&TargetRecord> = candidates
        .iter()
        .copied()
        .filter(|t| {
            t.is_missile()
                && t.is_missile_targeting(platform)
                && t.num_engaging(team) < MAX_FRIENDLIES_ON_TARGET
        })
        .collect();
    least_engaged(&mine, team, own)
}

/// Nearest missile nobody on the team is engaging.
pub fn unengaged_missile(
    candidates: &[&TargetRecord],
    team: TeamId,
    own: &Kinematics,
) -> Option<EntityId> {
    let free: Vec<&TargetRecord> = candidates
        .iter()
        .copied()
        .filter(|t| t.is_missile() && t.num_engaging(team) == 0)
        .collect();
    closest(&free, own)
}

pub fn least_engaged_missile(
    candidates: &[&TargetRecord],
    team: TeamId,
    own: &Kinematics,
) -> Option<EntityId> {
    let missiles: Vec<&TargetRecord> = candidates.iter().copied().filter(|t| t.is_missile()).collect();
    least_engaged(&missiles, team, own)
}

pub fn closest_missile(candidates: &[&TargetRecord], own: &Kinematics) -> Option<EntityId> {
    let missiles: Vec<&TargetRecord> = candidates.iter().copied().filter(|t| t.is_missile()).collect();
    closest(&missiles, own)
}

/// Dogfight pick: nose-on and close, skipping targets two friendlies already hold.
pub fn air_to_air(candidates: &[&TargetRecord], team: TeamId, own: &Kinematics) -> Option<EntityId> {
    let fwd = own.forward.try_normalize()?;
    candidates
        .iter()
        .filter(|t| t.is_flying() && !t.is_missile() && t.num_engaging(team) < MAX_FRIENDLIES_ON_TARGET)
        .filter_map(|t| {
            let los = own.position.offset_to(&t.kinematics.position);
            let d = los.length();
            let dir = los.try_normalize()?;
            Some((t.id, dir.dot(fwd) + 500.0 / (d + 100.0)))
        })
        .fold(None, |best: Option<(EntityId, f64)>, (id, s)| match best {
            Some((_, b)) if b >= s => best,
            _ => Some((id, s)),
        })
        .map(|(id, _)| id)
}

/// Pick according to the configured selection mode.
pub fn select_by_mode(
    mode: SelectionMode,
    candidates: &[&TargetRecord],
    ctx: &ScoringContext,
) -> Option<EntityId> {
    match mode {
        SelectionMode::ClosestWithHysteresis => {
            closest_with_hysteresis(candidates, ctx.own, ctx.current_target)
        }
        SelectionMode::WeightedPriority => highest_priority(candidates, ctx),
        SelectionMode::LeastEngaged => least_engaged(candidates, ctx.team, ctx.own),
    }
}

fn min_by_key(
    candidates: &[&TargetRecord],
    key: impl Fn(&TargetRecord) -> (f64, f64),
) -> Option<EntityId> {
    candidates
        .iter()
        .map(|t| (t.id, key(t)))
        .fold(None, |best: Option<(EntityId, (f64, f64))>, (id, k)| match best {
            Some((_, b)) if b.0 < k.0 || (b.0 == k.0 && b.1 <= k.1) => best,
            _ => Some((id, k)),
        })
        .map(|(id, _)| id)
}
