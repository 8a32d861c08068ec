//! Threat response monitor.
//!
//! Consumes one scan result per tick and produces warning transitions,
//! countermeasure actions and requests for the guard controller. Warnings
//! are hysteresis timers: they stay raised while detections keep arriving
//! and clear one reset window after the last one.

use guardfire_core::components::EntityId;
use guardfire_core::config::{CountermeasureConfig, TimingConfig};
use guardfire_core::enums::IncomingKind;
use guardfire_core::events::Warning;
use guardfire_core::types::{Position, Velocity};

use crate::countermeasures::{closing_time, DispenseAction, Dispenser};
use crate::profiles::get_response;

/// A guided projectile flying toward the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMissile {
    pub id: EntityId,
    pub kind: IncomingKind,
    /// Launching vessel, when known.
    pub source: Option<EntityId>,
    pub position: Position,
    pub velocity: Velocity,
    pub distance: f64,
}

/// Gunfire or rockets aimed at the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectFireThreat {
    pub shooter: EntityId,
    pub position: Position,
    /// Predicted miss distance of the incoming rounds (m).
    pub miss_distance: f64,
}

/// Result of one guard view scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThreatScan {
    /// Incoming missiles, closest first.
    pub missiles: Vec<IncomingMissile>,
    pub firing_at_me: Option<DirectFireThreat>,
}

/// Input to the monitor for one platform tick.
pub struct ThreatContext<'a> {
    pub scan: &'a ThreatScan,
    pub own_velocity: Velocity,
    pub now: f64,
    pub dt: f64,
    /// Missiles are valid targets for this platform.
    pub engage_missiles: bool,
    /// The guard controller currently holds a target.
    pub has_target: bool,
    pub scan_interval: f64,
    pub countermeasures: &'a CountermeasureConfig,
    pub timing: &'a TimingConfig,
}

/// Output of one monitor update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorUpdate {
    /// Warning flags that changed this tick.
    pub warnings: Vec<(Warning, bool)>,
    pub actions: Vec<DispenseAction>,
    /// Seconds to take off the guard scan timer.
    pub scan_credit: f64,
    /// Shooter to hand to the nearest teammate.
    pub help_request: Option<EntityId>,
}

/// Debounced warning flag.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct WarningTimer {
    active: bool,
    last_detected: f64,
}

impl WarningTimer {
    fn trigger(&mut self, now: f64) -> bool {
        self.last_detected = now;
        let rising = !self.active;
        self.active = true;
        rising
    }

    fn expire(&mut self, now: f64, window: f64) -> bool {
        if self.active && now - self.last_detected >= window {
            self.active = false;
            return true;
        }
        false
    }
}

/// Threat state owned by one platform.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorState {
    missile_incoming: WarningTimer,
    under_attack: WarningTimer,
    under_fire: WarningTimer,
    /// Vessel behind the closest threat.
    pub incoming_threat: Option<EntityId>,
    /// Closest incoming missile.
    pub incoming_missile: Option<EntityId>,
    /// Distance of the closest incoming missile (m), `f64::MAX` when none.
    pub incoming_distance: f64,
    distance_expires_at: Option<f64>,
    prior_shooter: Option<EntityId>,
    /// Time the current shooter has kept firing at us (s).
    pub incoming_fire_time: f64,
    pub incoming_miss_distance: f64,
    pub dispenser: Dispenser,
}

impl Default for MonitorState {
    fn default() -> Self {
        Self {
            missile_incoming: WarningTimer::default(),
            under_attack: WarningTimer::default(),
            under_fire: WarningTimer::default(),
            incoming_threat: None,
            incoming_missile: None,
            incoming_distance: f64::MAX,
            distance_expires_at: None,
            prior_shooter: None,
            incoming_fire_time: 0.0,
            incoming_miss_distance: f64::MAX,
            dispenser: Dispenser::default(),
        }
    }
}

impl MonitorState {
    pub fn missile_incoming(&self) -> bool {
        self.missile_incoming.active
    }

    pub fn under_attack(&self) -> bool {
        self.under_attack.active
    }

    pub fn under_fire(&self) -> bool {
        self.under_fire.active
    }

    /// Process one scan result.
    pub fn update(&mut self, ctx: &ThreatContext) -> MonitorUpdate {
        let mut update = MonitorUpdate::default();
        let now = ctx.now;

        // Step 1: incoming missiles
        self.incoming_threat = None;
        match ctx.scan.missiles.first() {
            Some(closest) => {
                if self.missile_incoming.trigger(now) {
                    update.warnings.push((Warning::MissileIncoming, true));
                }
                self.incoming_distance = closest.distance;
                self.incoming_threat = closest.source;
                self.incoming_missile = Some(closest.id);
                let closing = closing_time(closest.distance, &closest.velocity, &ctx.own_velocity);

                if self.dispenser.start_salvo(closing, ctx.countermeasures, now) {
                    tracing::debug!(closing, "countermeasures.salvo");
                }
                self.respond_to_missiles(ctx, closing, &mut update);
            }
            None => {
                self.incoming_distance = f64::MAX;
                self.incoming_missile = None;
            }
        }

        // Step 2: direct fire
        match &ctx.scan.firing_at_me {
            Some(fire) => {
                if ctx.scan.missiles.is_empty() {
                    self.incoming_threat = Some(fire.shooter);
                }
                let new_shooter = self.prior_shooter != Some(fire.shooter);
                if new_shooter {
                    self.prior_shooter = Some(fire.shooter);
                    self.incoming_fire_time = 0.0;
                } else {
                    self.incoming_fire_time += ctx.dt;
                }
                self.incoming_miss_distance = fire.miss_distance;

                let profile = get_response(IncomingKind::DirectFire);
                if profile.under_attack && self.under_attack.trigger(now) {
                    update.warnings.push((Warning::UnderAttack, true));
                }
                let rising = profile.under_fire && self.under_fire.trigger(now);
                if rising {
                    update.warnings.push((Warning::UnderFire, true));
                }
                if profile.request_help && (rising || new_shooter) {
                    update.help_request = Some(fire.shooter);
                }
            }
            None => {
                self.incoming_fire_time = 0.0;
                self.prior_shooter = None;
            }
        }

        // Step 3: expire warnings
        let window = ctx.timing.warning_reset;
        if self.missile_incoming.expire(now, window) {
            update.warnings.push((Warning::MissileIncoming, false));
        }
        if self.under_attack.expire(now, window) {
            update.warnings.push((Warning::UnderAttack, false));
        }
        if self.under_fire.expire(now, window) {
            update.warnings.push((Warning::UnderFire, false));
        }
        if self.distance_expires_at.is_some_and(|t| now >= t) {
            self.distance_expires_at = None;
            self.incoming_distance = f64::MAX;
        }

        // Step 4: advance dispensing sequences
        update.actions = self.dispenser.poll(now);
        update
    }

    fn respond_to_missiles(&mut self, ctx: &ThreatContext, closing: f64, update: &mut MonitorUpdate) {
        let now = ctx.now;
        let mut kinds: Vec<IncomingKind> = ctx.scan.missiles.iter().map(|m| m.kind).collect();
        kinds.sort_by_key(|k| *k as u8);
        kinds.dedup();

        for kind in kinds {
            let profile = get_response(kind);
            if profile.under_attack && self.under_attack.trigger(now) {
                update.warnings.push((Warning::UnderAttack, true));
            }
            if profile.flares && self.dispenser.start_flares(closing, ctx.countermeasures, now) {
                self.distance_expires_at = Some(now + ctx.timing.threat_distance_reset);
                tracing::debug!(closing, "countermeasures.flares");
            }
            if profile.chaff && self.dispenser.start_chaff(closing, ctx.countermeasures, now) {
                tracing::debug!(closing, "countermeasures.chaff");
            }
            if profile.jammer && self.dispenser.start_jammer(ctx.countermeasures, now) {
                tracing::debug!("countermeasures.jammer");
            }
            if profile.rescan_early && ctx.engage_missiles && !ctx.has_target {
                update.scan_credit += ctx.scan_interval / 2.0;
            }
        }
    }

    /// Clear every flag and stop all sequences. Returns the warnings that
    /// were lowered and any dispenser shutdown actions.
    pub fn reset(&mut self) -> MonitorUpdate {
        let mut update = MonitorUpdate::default();
        for (timer, warning) in [
            (&mut self.missile_incoming, Warning::MissileIncoming),
            (&mut self.under_attack, Warning::UnderAttack),
            (&mut self.under_fire, Warning::UnderFire),
        ] {
            if timer.active {
                timer.active = false;
                update.warnings.push((warning, false));
            }
        }
        update.actions = self.dispenser.cancel_all();
        *self = Self::default();
        update
    }
}
