//! Target selection pipeline.
//!
//! Walks a fixed order of selectors and stops at the first target for which
//! the envelope matcher finds a weapon. Each target is tried at most once per
//! scan. Secondary targets are picked the same way after the primary.

use std::collections::BTreeSet;

use guardfire_core::components::{EntityId, Kinematics, PlatformId, TeamId};
use guardfire_core::config::GuardConfig;
use guardfire_core::constants::SELECTION_LOOKAHEAD_SECS;
use guardfire_core::enums::{IncomingKind, Situation, TargetBucket};
use guardfire_core::target::TargetRecord;
use guardfire_core::types::angle_between_deg;
use guardfire_core::weapon::WeaponDescriptor;

use super::envelope::EnvelopeContext;
use super::matcher::{select_weapon, MatchContext, Selection};
use super::scoring::{self, ScoringContext};
use crate::registry::TargetRegistry;
use crate::sensors::SensorSuite;

/// Platform state the pipeline reads.
pub struct TargetingInput<'a> {
    pub platform: PlatformId,
    pub team: TeamId,
    pub own: &'a Kinematics,
    pub own_situation: Situation,
    pub now: f64,
    pub config: &'a GuardConfig,
    pub weapons: &'a [WeaponDescriptor],
    pub scoring: ScoringContext<'a>,
    pub current_target: Option<EntityId>,
    pub override_target: Option<EntityId>,
    /// Launches against the current target the world does not show yet.
    pub pending_launches: u32,
}

/// A target with a weapon able to engage it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetPick {
    pub target: EntityId,
    pub selection: Selection,
    /// Chosen through the override target.
    pub via_override: bool,
}

/// Outcome of one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub primary: Option<TargetPick>,
    pub secondaries: Vec<EntityId>,
    pub request_radar: bool,
}

/// Whether `record` may be considered as a target at all.
pub fn is_candidate(record: &TargetRecord, registry: &TargetRegistry, input: &TargetingInput) -> bool {
    if record.id == input.platform || !record.is_threat_to(input.team) {
        return false;
    }
    if record.missile.is_some_and(|m| m.kind == IncomingKind::DirectFire) {
        return false;
    }
    let config = input.config;
    let allowed = match record.bucket() {
        TargetBucket::Missile => config.engage_missiles,
        TargetBucket::Airborne => config.engage_air,
        TargetBucket::Surface => config.engage_surface,
        TargetBucket::Submerged => config.engage_submerged,
    };
    allowed && is_visible(record, registry, input)
}

/// Fresh team detection, or inside the guard range and field of view.
fn is_visible(record: &TargetRecord, registry: &TargetRegistry, input: &TargetingInput) -> bool {
    let config = input.config;
    if registry.can_see(input.team, record.id, input.now, config.scan_interval, &input.own.position, 0.0) {
        return true;
    }
    let los = input.own.position.offset_to(&record.kinematics.position);
    if los.length() >= config.guard_range {
        return false;
    }
    config.guard_angle >= 360.0
        || angle_between_deg(input.own.forward, los).is_some_and(|a| a <= config.guard_angle / 2.0)
}

/// Missiles from `platform` in flight toward `target`.
pub fn missiles_in_flight(registry: &TargetRegistry, platform: PlatformId, target: EntityId) -> u32 {
    registry
        .iter()
        .filter(|r| {
            r.missile.is_some_and(|m| {
                m.source == Some(platform) && m.target == Some(target) && m.kind != IncomingKind::DirectFire
            })
        })
        .count() as u32
}

/// Run the envelope matcher for one target.
pub fn match_target(
    record: &TargetRecord,
    registry: &TargetRegistry,
    input: &TargetingInput,
    sensors: &dyn SensorSuite,
) -> Selection {
    let distance = input
        .own
        .predicted_position(SELECTION_LOOKAHEAD_SECS)
        .range_to(&record.kinematics.predicted_position(SELECTION_LOOKAHEAD_SECS));
    let mut missiles_away = missiles_in_flight(registry, input.platform, record.id);
    if input.current_target == Some(record.id) {
        missiles_away = missiles_away.max(input.pending_launches);
    }
    let ctx = MatchContext {
        envelope: EnvelopeContext {
            own: input.own,
            own_situation: input.own_situation,
            target: record,
            distance,
            tuning: &input.config.tuning,
            unlimited_ammo: input.config.unlimited_ammo,
            range_cap: input.config.max_engagement_range,
        },
        gun_range: input.config.gun_range,
        missiles_away,
        max_missiles: input.config.max_missiles_on_target,
        rwr_sees_target: sensors.rwr_sees(input.platform, record.id),
    };
    select_weapon(input.weapons, &ctx)
}

/// Pick the primary target and any secondaries.
pub fn smart_find_target(
    registry: &TargetRegistry,
    input: &TargetingInput,
    sensors: &dyn SensorSuite,
) -> ScanResult {
    let candidates: Vec<&TargetRecord> = registry
        .targets(input.team)
        .filter(|r| is_candidate(r, registry, input))
        .collect();

    let mut finder = Finder {
        registry,
        input,
        sensors,
        tried: BTreeSet::new(),
        request_radar: false,
    };
    let primary = finder.find(&candidates, true);

    let mut secondaries = Vec::new();
    if let Some(pick) = &primary {
        let extra = input.config.multi_target_count.saturating_sub(1) as usize;
        finder.tried.clear();
        finder.tried.insert(pick.target);
        while secondaries.len() < extra {
            match finder.find(&candidates, false) {
                Some(secondary) => secondaries.push(secondary.target),
                None => break,
            }
        }
    }

    ScanResult {
        primary,
        secondaries,
        request_radar: finder.request_radar,
    }
}

struct Finder<'a> {
    registry: &'a TargetRegistry,
    input: &'a TargetingInput<'a>,
    sensors: &'a dyn SensorSuite,
    tried: BTreeSet<EntityId>,
    request_radar: bool,
}

impl<'a> Finder<'a> {
    fn untried<'r>(&self, candidates: &[&'r TargetRecord], keep: impl Fn(&TargetRecord) -> bool) -> Vec<&'r TargetRecord> {
        candidates
            .iter()
            .copied()
            .filter(|c| !self.tried.contains(&c.id) && keep(c))
            .collect()
    }

    /// Match a weapon against `id`, marking it tried.
    fn attempt(&mut self, id: Option<EntityId>, via_override: bool) -> Option<TargetPick> {
        let id = id?;
        if !self.tried.insert(id) {
            return None;
        }
        let record = self.registry.get(id)?;
        let selection = match_target(record, self.registry, self.input, self.sensors);
        self.request_radar |= selection.request_radar;
        selection.weapon.map(|_| TargetPick {
            target: id,
            selection,
            via_override,
        })
    }

    fn find(&mut self, candidates: &[&TargetRecord], allow_override: bool) -> Option<TargetPick> {
        let input = self.input;
        let own = input.own;
        let team = input.team;
        let mode = input.config.selection_mode;

        // Step 1: override target
        if allow_override {
            let forced = input
                .override_target
                .filter(|id| self.registry.get(*id).is_some_and(|r| r.is_threat_to(team)));
            if let Some(pick) = self.attempt(forced, true) {
                return Some(pick);
            }
        }

        // Step 2: missiles coming for us, then missiles nobody is shooting at
        if input.config.engage_missiles {
            let pool = self.untried(candidates, |_| true);
            let mine = scoring::missile_targeting_me(&pool, input.platform, team, own);
            if let Some(pick) = self.attempt(mine, false) {
                return Some(pick);
            }
            let pool = self.untried(candidates, |_| true);
            if let Some(pick) = self.attempt(scoring::unengaged_missile(&pool, team, own), false) {
                return Some(pick);
            }
        }

        // Step 3: airborne threats while flying
        if input.own_situation == Situation::Flying {
            let air = self.untried(candidates, |c| c.is_flying() && !c.is_missile());
            let choice = scoring::select_by_mode(mode, &air, &input.scoring);
            if let Some(pick) = self.attempt(choice, false) {
                return Some(pick);
            }
            let pool = self.untried(candidates, |_| true);
            if let Some(pick) = self.attempt(scoring::air_to_air(&pool, team, own), false) {
                return Some(pick);
            }
        }

        // Step 4: any vessel threat, by selection mode
        let vessels = self.untried(candidates, |c| !c.is_missile());
        let choice = scoring::select_by_mode(mode, &vessels, &input.scoring);
        if let Some(pick) = self.attempt(choice, false) {
            return Some(pick);
        }

        // Step 5: closest vessel
        let vessels = self.untried(candidates, |c| !c.is_missile());
        if let Some(pick) = self.attempt(scoring::closest(&vessels, own), false) {
            return Some(pick);
        }

        // Step 6: remaining missiles
        let missiles = self.untried(candidates, |c| c.is_missile());
        if let Some(pick) = self.attempt(scoring::least_engaged_missile(&missiles, team, own), false) {
            return Some(pick);
        }
        let missiles = self.untried(candidates, |c| c.is_missile());
        if let Some(pick) = self.attempt(scoring::closest_missile(&missiles, own), false) {
            return Some(pick);
        }

        // Step 7: everything not tried yet
        let rest = self.untried(candidates, |_| true);
        for record in rest {
            if let Some(pick) = self.attempt(Some(record.id), false) {
                return Some(pick);
            }
        }
        None
    }
}
