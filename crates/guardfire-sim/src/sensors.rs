//! Sensor collaborators supplied by the host.
//!
//! The engine never models radar, heat or laser seekers. It asks the host
//! for their results through `SensorSuite`, once per tick.

use guardfire_core::components::{EntityId, Kinematics, PlatformId};
use guardfire_core::enums::LockKind;
use guardfire_core::types::Position;

/// Sensor answers for one platform tick.
pub trait SensorSuite {
    /// Fresh kinematics of `target`, when a sensor has a valid sample.
    fn sample(&mut self, platform: PlatformId, target: EntityId) -> Option<Kinematics>;

    /// Attempt a lock of `kind` on `target`. Returns whether a lock is held.
    fn try_lock(&mut self, platform: PlatformId, target: EntityId, kind: LockKind) -> bool;

    /// Switch the platform's radar on.
    fn enable_radar(&mut self, platform: PlatformId);

    /// The radar warning receiver sees an emitter on `target`.
    fn rwr_sees(&self, platform: PlatformId, target: EntityId) -> bool;

    /// Point currently designated for a laser, GPS or anti-radiation weapon.
    fn designated_point(&self, platform: PlatformId, kind: LockKind) -> Option<Position>;
}

/// A host without any sensors: nothing is sampled and no lock is acquired.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSensors;

impl SensorSuite for NoSensors {
    fn sample(&mut self, _platform: PlatformId, _target: EntityId) -> Option<Kinematics> {
        None
    }

    fn try_lock(&mut self, _platform: PlatformId, _target: EntityId, _kind: LockKind) -> bool {
        false
    }

    fn enable_radar(&mut self, _platform: PlatformId) {}

    fn rwr_sees(&self, _platform: PlatformId, _target: EntityId) -> bool {
        false
    }

    fn designated_point(&self, _platform: PlatformId, _kind: LockKind) -> Option<Position> {
        None
    }
}
