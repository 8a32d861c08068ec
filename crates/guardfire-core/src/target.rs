//! Target records shared between the registry, scoring and matching.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, Kinematics, MissileInfo, PlatformId, TeamId, VesselInfo};
use crate::enums::{Situation, TargetBucket};

/// Known hostile entity or missile, as tracked by the target registry.
///
/// Consumers read records; only the registry mutates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRecord {
    pub id: EntityId,
    pub info: VesselInfo,
    pub kinematics: Kinematics,
    pub missile: Option<MissileInfo>,
    /// Latest time each team detected this entity (seconds).
    pub detected: BTreeMap<TeamId, f64>,
    /// Platforms engaging this entity, per team.
    pub engaged_by: BTreeMap<TeamId, Vec<PlatformId>>,
}

impl TargetRecord {
    pub fn new(id: EntityId, info: VesselInfo, kinematics: Kinematics) -> Self {
        Self {
            id,
            info,
            kinematics,
            missile: None,
            detected: BTreeMap::new(),
            engaged_by: BTreeMap::new(),
        }
    }

    pub fn team(&self) -> TeamId {
        self.info.team
    }

    pub fn is_missile(&self) -> bool {
        self.info.is_missile
    }

    pub fn is_flying(&self) -> bool {
        self.info.situation == Situation::Flying
    }

    pub fn is_surface(&self) -> bool {
        self.info.situation.is_surface()
    }

    pub fn is_splashed(&self) -> bool {
        self.info.situation == Situation::Splashed
    }

    pub fn is_submerged(&self) -> bool {
        self.info.situation == Situation::Submerged
    }

    /// Matcher ladder this record falls into.
    pub fn bucket(&self) -> TargetBucket {
        if self.info.is_missile {
            return TargetBucket::Missile;
        }
        match self.info.situation {
            Situation::Flying => TargetBucket::Airborne,
            Situation::Landed | Situation::Splashed => TargetBucket::Surface,
            Situation::Submerged => TargetBucket::Submerged,
        }
    }

    /// Hostile to `team` and able to do harm.
    pub fn is_threat_to(&self, team: TeamId) -> bool {
        self.info.team != team && !self.info.debilitated
    }

    /// Number of platforms of `team` engaging this record.
    pub fn num_engaging(&self, team: TeamId) -> usize {
        self.engaged_by.get(&team).map_or(0, Vec::len)
    }

    /// Number of platforms of any team engaging this record.
    pub fn total_engaging(&self) -> usize {
        self.engaged_by.values().map(Vec::len).sum()
    }

    /// Is this a missile homing on `platform`?
    pub fn is_missile_targeting(&self, platform: PlatformId) -> bool {
        self.missile.is_some_and(|m| m.target == Some(platform))
    }
}
