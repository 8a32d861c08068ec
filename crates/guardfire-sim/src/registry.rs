//! Target registry: every vessel and missile some team has detected.
//!
//! Records are shared by all platforms. Detection times are kept per team and
//! engagement lists per team, so one registry serves every side of a match.

use std::collections::BTreeMap;

use hecs::World;

use guardfire_core::components::{EntityId, Kinematics, MissileInfo, PlatformId, TeamId, VesselInfo};
use guardfire_core::constants::VISIBILITY_MEMORY_SECS;
use guardfire_core::target::TargetRecord;
use guardfire_core::types::Position;

use crate::context::entity_of;

/// Known targets keyed by entity.
#[derive(Debug, Clone, Default)]
pub struct TargetRegistry {
    records: BTreeMap<EntityId, TargetRecord>,
}

impl TargetRegistry {
    /// Record a detection of `id` by `team`. Creates the record from the
    /// world when the entity is new. Returns `false` if the entity is gone.
    pub fn report(&mut self, world: &World, team: TeamId, id: EntityId, now: f64) -> bool {
        if !self.records.contains_key(&id) {
            let Some(record) = read_record(world, id) else {
                return false;
            };
            self.records.insert(id, record);
        }
        match self.records.get_mut(&id) {
            Some(record) => {
                record.detected.insert(team, now);
                true
            }
            None => false,
        }
    }

    /// Track `id` without crediting any team with a detection. Projectiles
    /// are tracked this way so threat scans and missile counts see them.
    pub fn track(&mut self, world: &World, id: EntityId) -> bool {
        if self.records.contains_key(&id) {
            return true;
        }
        match read_record(world, id) {
            Some(record) => {
                self.records.insert(id, record);
                true
            }
            None => false,
        }
    }

    /// Pull the latest kinematics and classification from the world and drop
    /// records whose entity no longer exists.
    pub fn refresh(&mut self, world: &World) {
        let mut gone = Vec::new();
        for (id, record) in self.records.iter_mut() {
            match read_components(world, *id) {
                Some((info, kinematics, missile)) => {
                    record.info = info;
                    record.kinematics = kinematics;
                    record.missile = missile;
                }
                None => gone.push(*id),
            }
        }
        for id in gone {
            tracing::debug!(entity = id.0, "registry.drop");
            self.records.remove(&id);
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&TargetRecord> {
        self.records.get(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn remove(&mut self, id: EntityId) -> Option<TargetRecord> {
        self.records.remove(&id)
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Mark `platform` as engaging `id`. Engaging twice is a no-op.
    pub fn engage(&mut self, id: EntityId, team: TeamId, platform: PlatformId) -> bool {
        let Some(record) = self.records.get_mut(&id) else {
            return false;
        };
        let list = record.engaged_by.entry(team).or_default();
        if list.contains(&platform) {
            return false;
        }
        list.push(platform);
        true
    }

    /// Remove `platform` from the engagement list of `id`. Unknown pairs are ignored.
    pub fn disengage(&mut self, id: EntityId, team: TeamId, platform: PlatformId) -> bool {
        let Some(record) = self.records.get_mut(&id) else {
            return false;
        };
        let Some(list) = record.engaged_by.get_mut(&team) else {
            return false;
        };
        let before = list.len();
        list.retain(|p| *p != platform);
        let removed = list.len() != before;
        if list.is_empty() {
            record.engaged_by.remove(&team);
        }
        removed
    }

    /// Drop `platform` from every engagement list, e.g. when it leaves the match.
    pub fn disengage_all(&mut self, platform: PlatformId) {
        for record in self.records.values_mut() {
            for list in record.engaged_by.values_mut() {
                list.retain(|p| *p != platform);
            }
            record.engaged_by.retain(|_, list| !list.is_empty());
        }
    }

    pub fn num_friendlies_engaging(&self, id: EntityId, team: TeamId) -> usize {
        self.records.get(&id).map_or(0, |r| r.num_engaging(team))
    }

    /// A target stays visible while the team's detection is fresh, or while
    /// it is inside the observer's guard range.
    pub fn can_see(
        &self,
        team: TeamId,
        id: EntityId,
        now: f64,
        scan_interval: f64,
        observer: &Position,
        guard_range: f64,
    ) -> bool {
        let Some(record) = self.records.get(&id) else {
            return false;
        };
        let memory = scan_interval.max(VISIBILITY_MEMORY_SECS);
        if record.detected.get(&team).is_some_and(|t| now - t < memory) {
            return true;
        }
        observer.range_to(&record.kinematics.position) < guard_range
    }

    /// Records detected by `team`, excluding its own members.
    pub fn targets(&self, team: TeamId) -> impl Iterator<Item = &TargetRecord> {
        self.records
            .values()
            .filter(move |r| r.team() != team && r.detected.contains_key(&team))
    }

    pub fn iter(&self) -> impl Iterator<Item = &TargetRecord> {
        self.records.values()
    }
}

fn read_components(
    world: &World,
    id: EntityId,
) -> Option<(VesselInfo, Kinematics, Option<MissileInfo>)> {
    let entity = entity_of(id)?;
    let info = (*world.get::<&VesselInfo>(entity).ok()?).clone();
    let kinematics = *world.get::<&Kinematics>(entity).ok()?;
    let missile = world.get::<&MissileInfo>(entity).ok().map(|m| *m);
    Some((info, kinematics, missile))
}

fn read_record(world: &World, id: EntityId) -> Option<TargetRecord> {
    let (info, kinematics, missile) = read_components(world, id)?;
    let mut record = TargetRecord::new(id, info, kinematics);
    record.missile = missile;
    Some(record)
}
