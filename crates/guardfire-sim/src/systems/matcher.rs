//! Engagement envelope matcher: picks the weapon best suited to a target.
//!
//! Feasible weapons are ranked by a per-class attractiveness value inside a
//! ladder chosen by the target bucket. Iteration follows inventory order, so
//! equal candidates resolve to the first one listed.

use guardfire_core::enums::{GuidanceMode, Situation, SlwKind, TargetBucket, TargetingMode, WeaponKind};
use guardfire_core::types::angle_between_deg;
use guardfire_core::weapon::{WeaponClass, WeaponDescriptor, WeaponId};

use super::envelope::{check, EnvelopeContext};

/// Guns below this caliber cannot reach a fully submerged hull (mm).
const WATER_PENETRATING_CALIBER_MM: f64 = 75.0;

/// Horizontal speed under which a surface target counts as stationary (m/s).
const STATIONARY_SPEED: f64 = 1.0;

/// Underwater lasers reach this fraction of their rated range.
const UNDERWATER_LASER_RANGE_FRACTION: f64 = 0.1;

/// Everything the matcher reads besides the inventory.
pub struct MatchContext<'a> {
    pub envelope: EnvelopeContext<'a>,
    /// Guns are preferred inside this range (m).
    pub gun_range: f64,
    /// Missiles and bombs already in flight toward the target.
    pub missiles_away: u32,
    pub max_missiles: u32,
    /// The radar warning receiver currently sees the target's emitter.
    pub rwr_sees_target: bool,
}

/// Matcher outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub weapon: Option<WeaponId>,
    pub kind: Option<WeaponKind>,
    /// At least one checked weapon wants the radar on.
    pub request_radar: bool,
}

/// Running best candidate and the class values it was chosen on.
struct Pick<'w> {
    weapon: Option<&'w WeaponDescriptor>,
    rate: f64,
    tdps: f64,
    impact: f64,
    blast: f64,
    bomb_blast: f64,
    rocket_power: f64,
    rocket_accel: f64,
    priority: i32,
}

impl Default for Pick<'_> {
    fn default() -> Self {
        Self {
            weapon: None,
            rate: -1.0,
            tdps: 0.0,
            impact: -1.0,
            blast: -1.0,
            bomb_blast: -1.0,
            rocket_power: -1.0,
            rocket_accel: -1.0,
            priority: -1,
        }
    }
}

impl<'w> Pick<'w> {
    fn is_some(&self) -> bool {
        self.weapon.is_some()
    }

    fn kind(&self) -> Option<WeaponKind> {
        self.weapon.map(WeaponDescriptor::kind)
    }

    fn is(&self, kind: WeaponKind) -> bool {
        self.kind() == Some(kind)
    }

    /// A missile is held that was ranked on its thrust and turn rate.
    fn holds_ranked_missile(&self) -> bool {
        self.is(WeaponKind::Missile) && self.tdps > 0.0
    }

    /// Held weapon outranks a candidate of `priority`.
    fn outranks(&self, priority: i32) -> bool {
        self.is_some() && self.priority > priority
    }

    fn take(&mut self, weapon: &'w WeaponDescriptor) {
        self.weapon = Some(weapon);
    }

    /// Priority first, then the rate value.
    fn offer_rate(&mut self, weapon: &'w WeaponDescriptor, rate: f64) {
        if self.priority < weapon.priority || self.rate < rate {
            self.take(weapon);
            self.rate = rate;
            self.priority = weapon.priority;
        }
    }
}

/// Choose the weapon to employ against the target in `ctx`.
pub fn select_weapon(weapons: &[WeaponDescriptor], ctx: &MatchContext) -> Selection {
    let target = ctx.envelope.target;
    if weapons.is_empty() || (target.is_missile() && (target.is_splashed() || target.is_submerged())) {
        return Selection::default();
    }

    let mut request_radar = false;
    let feasible: Vec<&WeaponDescriptor> = weapons
        .iter()
        .filter(|w| {
            let result = check(w, &ctx.envelope);
            request_radar |= result.request_radar;
            result.feasible
        })
        .collect();

    let chosen = match target.bucket() {
        TargetBucket::Missile => intercept_missile(&feasible, ctx),
        TargetBucket::Airborne => engage_air(&feasible, ctx),
        TargetBucket::Surface => engage_surface(&feasible, ctx),
        TargetBucket::Submerged => engage_submerged(&feasible, ctx),
    };

    match chosen {
        Some(w) => {
            tracing::debug!(weapon = w.id.0, name = %w.name, target_id = target.id.0, "matcher.selected");
            Selection {
                weapon: Some(w.id),
                kind: Some(w.kind()),
                request_radar,
            }
        }
        None => Selection {
            request_radar,
            ..Selection::default()
        },
    }
}

fn is_turreted(weapon: &WeaponDescriptor) -> bool {
    weapon
        .turret
        .as_ref()
        .is_some_and(|t| t.yaw_range > 0.0 || t.max_pitch > 0.0)
}

fn inside_min_range(weapon: &WeaponDescriptor, ctx: &MatchContext) -> bool {
    ctx.envelope.distance < weapon.min_range
}

/// A fixed mount pointing too far away from the target.
fn outside_firing_angle(weapon: &WeaponDescriptor, ctx: &MatchContext) -> bool {
    if weapon.turret.is_some() {
        return false;
    }
    let own = ctx.envelope.own;
    let los = own.position.offset_to(&ctx.envelope.target.kinematics.position);
    angle_between_deg(own.forward, los).map_or(true, |a| a > ctx.envelope.tuning.fixed_fire_angle)
}

fn cluster_factor(projectiles: u32) -> f64 {
    if projectiles > 1 {
        1.0 + (projectiles / 2) as f64 / 100.0
    } else {
        1.0
    }
}

fn own_in_water(ctx: &MatchContext) -> bool {
    matches!(
        ctx.envelope.own_situation,
        Situation::Splashed | Situation::Submerged
    )
}

fn target_horizontal_speed(ctx: &MatchContext) -> f64 {
    ctx.envelope.target.kinematics.velocity.horizontal_speed()
}

/// Lasers, then guns, then rockets, then missiles.
fn intercept_missile<'w>(
    feasible: &[&'w WeaponDescriptor],
    ctx: &MatchContext,
) -> Option<&'w WeaponDescriptor> {
    let tuning = ctx.envelope.tuning;
    let mut pick = Pick::default();

    for &weapon in feasible {
        match &weapon.class {
            WeaponClass::Laser(laser) => {
                if laser.electrolaser {
                    continue;
                }
                return Some(weapon);
            }
            WeaponClass::Gun(gun) => {
                let mut rate = weapon.rpm;
                if pick.is_some() && is_turreted(weapon) {
                    rate *= tuning.turret_intercept_bonus;
                }
                if gun.fuze.is_airburst() {
                    rate *= tuning.airburst_bonus;
                }
                rate *= cluster_factor(gun.projectiles_per_shot);
                if inside_min_range(weapon, ctx) {
                    rate *= tuning.min_range_penalty;
                }
                if pick.is_some() && pick.rate > rate {
                    continue;
                }
                pick.take(weapon);
                pick.rate = rate;
            }
            WeaponClass::Rocket(rocket) => {
                let mut rate = weapon.rpm / tuning.rocket_rpm_divisor;
                if pick.is_some() && is_turreted(weapon) {
                    rate *= tuning.turret_intercept_bonus;
                }
                if pick.is_some() && pick.rocket_accel < rocket.acceleration {
                    rate *= tuning.faster_rocket_bonus;
                }
                if !rocket.fuze.is_airburst() {
                    rate *= tuning.contact_rocket_intercept_penalty;
                }
                if inside_min_range(weapon, ctx) {
                    rate *= tuning.min_range_penalty;
                }
                if pick.is_some() && pick.rate > rate {
                    continue;
                }
                let beats = if pick.is(WeaponKind::Gun) {
                    pick.rate * tuning.rocket_over_gun_margin < rate
                } else {
                    pick.rate < rate
                };
                if beats {
                    pick.take(weapon);
                    pick.rocket_accel = rocket.acceleration;
                    pick.rate = rate;
                }
            }
            WeaponClass::Missile(missile) => {
                let tdps = missile.tdps();
                if pick.is_some() && (pick.is(WeaponKind::Gun) || pick.tdps > tdps) {
                    continue;
                }
                pick.take(weapon);
                pick.tdps = tdps;
            }
            WeaponClass::Bomb(_) | WeaponClass::Slw(_) => {}
        }
    }
    pick.weapon
}

/// Missiles at range, then guns and lasers by rate of fire, then rockets.
fn engage_air<'w>(
    feasible: &[&'w WeaponDescriptor],
    ctx: &MatchContext,
) -> Option<&'w WeaponDescriptor> {
    let tuning = ctx.envelope.tuning;
    let target = ctx.envelope.target;
    let distance = ctx.envelope.distance;
    let mut pick = Pick::default();

    for &weapon in feasible {
        match &weapon.class {
            WeaponClass::Rocket(rocket) => {
                if pick.holds_ranked_missile() || pick.outranks(weapon.priority) {
                    continue;
                }
                let mut rate = weapon.rpm;
                if pick.is_some() && is_turreted(weapon) {
                    rate *= tuning.turret_intercept_bonus;
                }
                if pick.is_some() && pick.rocket_accel < rocket.acceleration {
                    rate *= tuning.faster_rocket_bonus;
                }
                rate *= if rocket.fuze.is_airburst() {
                    tuning.airburst_bonus
                } else {
                    tuning.impact_rocket_penalty
                };
                if outside_firing_angle(weapon, ctx) {
                    rate *= tuning.off_angle_penalty;
                }
                if inside_min_range(weapon, ctx) {
                    rate *= tuning.min_range_penalty;
                }
                rate /= tuning.rocket_rpm_divisor;
                if pick.priority < weapon.priority
                    || (pick.priority == weapon.priority && pick.rate < rate)
                {
                    pick.take(weapon);
                    pick.rate = rate;
                    pick.rocket_accel = rocket.acceleration;
                    pick.priority = weapon.priority;
                }
            }
            WeaponClass::Gun(gun) => {
                if pick.outranks(weapon.priority) {
                    continue;
                }
                // Large aircraft are ranked by caliber, small ones by rate of fire.
                let large_target = target.info.radius > tuning.large_air_target_radius;
                let mut value = if large_target { gun.caliber_mm } else { weapon.rpm };
                if weapon.turret.as_ref().is_some_and(|t| t.yaw_range > 0.0) {
                    value *= tuning.turret_bonus;
                }
                if gun.fuze.is_airburst() {
                    value *= tuning.airburst_bonus;
                }
                if !large_target {
                    value *= cluster_factor(gun.projectiles_per_shot);
                }
                if outside_firing_angle(weapon, ctx) {
                    value *= tuning.off_angle_penalty;
                }
                if inside_min_range(weapon, ctx) {
                    value *= tuning.min_range_penalty;
                }
                let rate = if large_target {
                    value * tuning.caliber_scale
                } else {
                    value
                };
                if pick.holds_ranked_missile() {
                    continue;
                }
                pick.offer_rate(weapon, rate);
            }
            WeaponClass::Laser(laser) => {
                if laser.electrolaser && target.info.debilitated {
                    continue;
                }
                if pick.outranks(weapon.priority) {
                    continue;
                }
                let mut rate = weapon.rpm * laser.power;
                if weapon.turret.as_ref().is_some_and(|t| t.yaw_range > 0.0) {
                    rate *= tuning.turret_bonus;
                }
                if inside_min_range(weapon, ctx) {
                    rate *= tuning.laser_min_range_penalty;
                }
                pick.offer_rate(weapon, rate);
            }
            WeaponClass::Missile(missile) => {
                if ctx.missiles_away >= ctx.max_missiles {
                    continue;
                }
                if missile.emp && target.info.debilitated {
                    continue;
                }
                let mut tdps = missile.tdps();
                if distance < weapon.min_range {
                    tdps = -tdps;
                }
                let own_surface = ctx.envelope.own_situation.is_surface();
                if !pick.is_some() {
                    pick.take(weapon);
                    pick.tdps = tdps;
                } else if !own_surface || distance > ctx.gun_range {
                    if pick.tdps > tdps {
                        continue;
                    }
                    pick.take(weapon);
                    pick.tdps = tdps;
                }
            }
            WeaponClass::Bomb(_) | WeaponClass::Slw(_) => {}
        }
    }
    pick.weapon
}

/// Guns, then rockets, then bombs, then missiles, by impact and yield.
fn engage_surface<'w>(
    feasible: &[&'w WeaponDescriptor],
    ctx: &MatchContext,
) -> Option<&'w WeaponDescriptor> {
    let tuning = ctx.envelope.tuning;
    let target = ctx.envelope.target;
    let distance = ctx.envelope.distance;
    let missiles_left = ctx.missiles_away < ctx.max_missiles;
    let mut pick = Pick::default();

    for &weapon in feasible {
        match &weapon.class {
            WeaponClass::Gun(gun) => {
                if distance > ctx.gun_range && pick.is_some() {
                    continue;
                }
                let fully_submerged =
                    target.kinematics.position.z + target.info.radius < 0.0;
                if fully_submerged && gun.caliber_mm < WATER_PENETRATING_CALIBER_MM {
                    continue;
                }
                if pick.priority > weapon.priority {
                    continue;
                }
                let mut rate = weapon.rpm;
                if target.info.radius > tuning.large_surface_target_radius {
                    rate *= gun.bullet_mass * gun.bullet_velocity;
                }
                let traverse = weapon
                    .turret
                    .as_ref()
                    .map_or(0.0, |t| t.yaw_range * t.max_pitch);
                if traverse > 0.0 {
                    rate *= tuning.turret_bonus;
                }
                if inside_min_range(weapon, ctx) {
                    rate *= tuning.min_range_penalty;
                }
                if pick.priority < weapon.priority {
                    pick.take(weapon);
                    pick.impact = rate;
                    pick.priority = weapon.priority;
                } else {
                    if pick.is(WeaponKind::Rocket) {
                        continue;
                    }
                    if pick.impact < rate {
                        pick.take(weapon);
                        pick.impact = rate;
                        pick.priority = weapon.priority;
                    }
                }
            }
            WeaponClass::Rocket(rocket) => {
                if pick.priority > weapon.priority {
                    continue;
                }
                let power = rocket.blast_radius;
                let better = pick.priority < weapon.priority || pick.rocket_power < power;
                if better && distance >= power {
                    pick.take(weapon);
                    pick.rocket_power = power;
                    pick.priority = weapon.priority;
                }
            }
            WeaponClass::Bomb(bomb) => {
                if ctx.envelope.own_situation.is_surface()
                    || pick.is(WeaponKind::Missile)
                    || !missiles_left
                {
                    continue;
                }
                let mut blast = bomb.blast_radius;
                let mut unguided = false;
                if bomb.guidance == GuidanceMode::Unguided {
                    if pick.bomb_blast > blast || distance < blast {
                        continue;
                    }
                    pick.bomb_blast = blast;
                    pick.take(weapon);
                    unguided = true;
                }
                if target_horizontal_speed(ctx) > STATIONARY_SPEED {
                    if distance < blast {
                        continue;
                    }
                    blast *= bomb.cluster_count as f64 * tuning.cluster_bonus;
                    if pick.bomb_blast > blast {
                        continue;
                    }
                    pick.bomb_blast = blast;
                    pick.take(weapon);
                }
                if bomb.guidance == GuidanceMode::AgmBallistic {
                    let held = if unguided {
                        pick.bomb_blast / 2.0
                    } else {
                        pick.bomb_blast
                    };
                    if held > blast || distance < blast {
                        continue;
                    }
                    pick.bomb_blast = blast;
                    pick.take(weapon);
                }
            }
            WeaponClass::Missile(missile) => {
                if !missiles_left {
                    continue;
                }
                let blast = missile.blast_radius;
                let mut agm = false;
                if target_horizontal_speed(ctx) < STATIONARY_SPEED {
                    let fixed_point = missile.targeting == TargetingMode::Gps
                        || matches!(
                            missile.guidance,
                            GuidanceMode::Cruise | GuidanceMode::AgmBallistic | GuidanceMode::Unguided
                        );
                    if fixed_point {
                        if pick.is_some() && pick.blast > blast {
                            continue;
                        }
                        pick.blast = blast;
                        pick.take(weapon);
                        agm = true;
                        if distance > weapon.min_range {
                            return pick.weapon;
                        }
                    }
                }
                if missile.targeting == TargetingMode::AntiRadiation {
                    if ctx.rwr_sees_target {
                        if pick.is_some() && pick.blast > blast {
                            continue;
                        }
                        pick.blast = blast;
                        pick.take(weapon);
                    }
                } else if missile.targeting == TargetingMode::Laser {
                    if pick.is_some() && pick.blast > blast {
                        continue;
                    }
                    pick.blast = blast;
                    pick.take(weapon);
                } else if !agm {
                    if pick.is_some() && pick.blast > blast {
                        continue;
                    }
                    pick.blast = blast;
                    pick.take(weapon);
                }
            }
            WeaponClass::Slw(slw) => {
                if !target.is_splashed() || !missiles_left {
                    continue;
                }
                // Flying platforms only drop air-launched torpedoes
                if !ctx.envelope.own_situation.is_surface() && slw.drop_time <= 0.0 {
                    continue;
                }
                if pick.blast > slw.blast_radius || distance < slw.blast_radius {
                    continue;
                }
                pick.blast = slw.blast_radius;
                pick.take(weapon);
            }
            WeaponClass::Laser(_) => {}
        }
    }
    pick.weapon
}

/// Depth charges while above the target, torpedoes otherwise. Submerged
/// platforms may also use rockets and lasers at close range.
fn engage_submerged<'w>(
    feasible: &[&'w WeaponDescriptor],
    ctx: &MatchContext,
) -> Option<&'w WeaponDescriptor> {
    let tuning = ctx.envelope.tuning;
    let distance = ctx.envelope.distance;
    let above_target = !own_in_water(ctx)
        || ctx.envelope.own.position.z > ctx.envelope.target.kinematics.position.z;
    let own_submerged = ctx.envelope.own_situation == Situation::Submerged;
    let mut pick = Pick::default();
    let mut fallback_torpedo = None;

    for &weapon in feasible {
        match &weapon.class {
            WeaponClass::Slw(slw) => {
                if distance < slw.blast_radius {
                    continue;
                }
                let torpedo_ok =
                    slw.kind == SlwKind::Torpedo && ctx.missiles_away < ctx.max_missiles;
                if above_target {
                    if slw.kind == SlwKind::DepthCharge {
                        return Some(weapon);
                    }
                    if torpedo_ok && fallback_torpedo.is_none() {
                        fallback_torpedo = Some(weapon);
                    }
                } else if torpedo_ok {
                    return Some(weapon);
                }
            }
            WeaponClass::Rocket(rocket) if own_submerged => {
                if pick.priority > weapon.priority {
                    continue;
                }
                let power = rocket.blast_radius;
                let better = pick.priority < weapon.priority || pick.rocket_power < power;
                if better && distance >= power {
                    pick.take(weapon);
                    pick.rocket_power = power;
                    pick.priority = weapon.priority;
                }
            }
            WeaponClass::Laser(laser) if own_submerged => {
                if distance > weapon.max_range * UNDERWATER_LASER_RANGE_FRACTION {
                    continue;
                }
                if laser.electrolaser || pick.outranks(weapon.priority) {
                    continue;
                }
                let mut rate = weapon.rpm * laser.power;
                if weapon.turret.as_ref().is_some_and(|t| t.yaw_range > 0.0) {
                    rate *= tuning.turret_bonus;
                }
                if inside_min_range(weapon, ctx) {
                    rate *= tuning.laser_min_range_penalty;
                }
                pick.offer_rate(weapon, rate);
            }
            _ => {}
        }
    }
    pick.weapon.or(fallback_torpedo)
}
