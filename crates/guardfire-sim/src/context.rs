//! Simulation context: the explicitly owned session state shared by every
//! platform's decision engine.
//!
//! Holds the hecs world of vessels, the target registry, team rosters, the
//! clock and the RNG. Lifetime is one match: `init` at the start, `teardown`
//! at the end. Nothing here is process-wide.

use std::collections::BTreeMap;

use hecs::{Entity, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use guardfire_core::components::*;
use guardfire_core::constants::SUBMERGED_ALTITUDE;
use guardfire_core::enums::Situation;
use guardfire_core::types::SimTime;

use crate::registry::TargetRegistry;

/// Convert a world entity into the handle used across the API.
pub fn entity_id(entity: Entity) -> EntityId {
    EntityId(entity.to_bits().get())
}

/// Resolve an API handle back into a world entity.
pub fn entity_of(id: EntityId) -> Option<Entity> {
    Entity::from_bits(id.0)
}

/// Session state shared by all platforms.
pub struct SimulationContext {
    pub world: World,
    pub registry: TargetRegistry,
    /// Platforms running a decision engine, by team.
    pub rosters: BTreeMap<TeamId, Vec<PlatformId>>,
    pub time: SimTime,
    pub rng: ChaCha8Rng,
    seed: u64,
}

impl SimulationContext {
    pub fn new(seed: u64) -> Self {
        Self {
            world: World::new(),
            registry: TargetRegistry::default(),
            rosters: BTreeMap::new(),
            time: SimTime::default(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Start a fresh match: empty world, registry and rosters, clock at zero,
    /// RNG reseeded.
    pub fn init(&mut self) {
        self.teardown();
        self.time = SimTime::default();
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        tracing::info!(seed = self.seed, "context.init");
    }

    /// Release everything owned by the match.
    pub fn teardown(&mut self) {
        self.world.clear();
        self.registry.clear();
        self.rosters.clear();
    }

    pub fn now(&self) -> f64 {
        self.time.elapsed_secs
    }

    /// Add a vessel or projectile to the world.
    pub fn spawn_vessel(
        &mut self,
        info: VesselInfo,
        kinematics: Kinematics,
        missile: Option<MissileInfo>,
    ) -> EntityId {
        let entity = match missile {
            Some(m) => self.world.spawn((info, kinematics, m)),
            None => self.world.spawn((info, kinematics)),
        };
        let id = entity_id(entity);
        if missile.is_some() {
            self.registry.track(&self.world, id);
        }
        id
    }

    /// Remove an entity from the world and the registry.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        self.registry.remove(id);
        self.registry.disengage_all(id);
        self.unenroll(id);
        match entity_of(id) {
            Some(entity) => self.world.despawn(entity).is_ok(),
            None => false,
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        entity_of(id).is_some_and(|e| self.world.contains(e))
    }

    /// Replace the kinematics of an entity. Depth below the submerged
    /// altitude reclassifies it as submerged; surfacing makes it splashed.
    pub fn update_kinematics(&mut self, id: EntityId, kinematics: Kinematics) -> bool {
        let Some(entity) = entity_of(id) else {
            return false;
        };
        let Ok(mut kin) = self.world.get::<&mut Kinematics>(entity) else {
            return false;
        };
        *kin = kinematics;
        drop(kin);
        if let Ok(mut info) = self.world.get::<&mut VesselInfo>(entity) {
            info.situation = classify_depth(info.situation, kinematics.position.z);
        }
        true
    }

    /// Replace the classification of an entity.
    pub fn update_info(&mut self, id: EntityId, info: VesselInfo) -> bool {
        let Some(entity) = entity_of(id) else {
            return false;
        };
        match self.world.get::<&mut VesselInfo>(entity) {
            Ok(mut current) => {
                *current = info;
                true
            }
            Err(_) => false,
        }
    }

    /// A sensor of `team` saw `id` this instant.
    pub fn report_detection(&mut self, team: TeamId, id: EntityId) -> bool {
        let now = self.now();
        self.registry.report(&self.world, team, id, now)
    }

    pub fn kinematics(&self, id: EntityId) -> Option<Kinematics> {
        let entity = entity_of(id)?;
        self.world.get::<&Kinematics>(entity).ok().map(|k| *k)
    }

    pub fn info(&self, id: EntityId) -> Option<VesselInfo> {
        let entity = entity_of(id)?;
        self.world
            .get::<&VesselInfo>(entity)
            .ok()
            .map(|i| (*i).clone())
    }

    pub fn team_of(&self, id: EntityId) -> Option<TeamId> {
        let entity = entity_of(id)?;
        self.world.get::<&VesselInfo>(entity).ok().map(|i| i.team)
    }

    /// Number of other engine-driven platforms on `team`.
    pub fn teammates(&self, team: TeamId) -> usize {
        self.rosters
            .get(&team)
            .map_or(0, |r| r.len().saturating_sub(1))
    }

    pub(crate) fn enroll(&mut self, team: TeamId, platform: PlatformId) {
        let roster = self.rosters.entry(team).or_default();
        if !roster.contains(&platform) {
            roster.push(platform);
        }
    }

    pub(crate) fn unenroll(&mut self, platform: PlatformId) {
        for roster in self.rosters.values_mut() {
            roster.retain(|p| *p != platform);
        }
        self.rosters.retain(|_, r| !r.is_empty());
    }
}

fn classify_depth(current: Situation, altitude: f64) -> Situation {
    if altitude < SUBMERGED_ALTITUDE {
        Situation::Submerged
    } else if current == Situation::Submerged {
        Situation::Splashed
    } else {
        current
    }
}
