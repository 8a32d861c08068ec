//! Fire scheduler: staggers trigger pulses across instances of one weapon.
//!
//! Instances sharing a definition name form a group with a stable
//! `WeaponGroupId`. With ripple on, one instance fires per delay window and
//! the slot index cycles through the group; with ripple off every feasible
//! instance fires every tick.

use std::collections::BTreeMap;

use guardfire_core::constants::RIPPLE_RPM_CAP;
use guardfire_core::enums::WeaponKind;
use guardfire_core::settings::{RippleOption, RipplePreferences};
use guardfire_core::state::RippleSnapshot;
use guardfire_core::weapon::{WeaponDescriptor, WeaponGroupId, WeaponId};

/// Eligibility comparisons tolerate this much float drift (s).
const TIME_EPSILON: f64 = 1e-9;

/// Scheduler state of one weapon group.
#[derive(Debug, Clone, PartialEq)]
pub struct RippleGroup {
    pub id: WeaponGroupId,
    pub name: String,
    pub kind: WeaponKind,
    /// Instances in slot order.
    pub members: Vec<WeaponId>,
    pub combined_rpm: f64,
    /// Fastest single instance (rpm).
    pub instance_rpm: f64,
    pub option: RippleOption,
    index: usize,
    next_eligible: f64,
    last_fired_tick: Option<u64>,
}

impl RippleGroup {
    fn new(id: WeaponGroupId, weapon: &WeaponDescriptor, option: RippleOption) -> Self {
        Self {
            id,
            name: weapon.name.clone(),
            kind: weapon.kind(),
            members: Vec::new(),
            combined_rpm: 0.0,
            instance_rpm: 0.0,
            option,
            index: 0,
            next_eligible: 0.0,
            last_fired_tick: None,
        }
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// Current slot, clamped into `[0, size)`.
    pub fn index(&self) -> usize {
        self.index.min(self.members.len().saturating_sub(1))
    }

    pub fn next_eligible(&self) -> f64 {
        self.next_eligible
    }

    /// Fast direct-fire weapons always fire together.
    pub fn can_ripple(&self) -> bool {
        !(self.kind.is_direct_fire() && self.instance_rpm >= RIPPLE_RPM_CAP)
    }

    pub fn is_rippling(&self) -> bool {
        self.option.enabled && self.can_ripple() && self.members.len() > 1
    }

    /// Delay between successive pulses of the group (s).
    pub fn delay(&self) -> f64 {
        let rpm = if self.kind.is_direct_fire() {
            self.combined_rpm
        } else {
            self.option.rpm
        };
        if rpm > 0.0 {
            60.0 / rpm
        } else {
            0.0
        }
    }

    /// Instances that fire this tick, given the ones able to fire.
    ///
    /// Ripple off: every ready instance. Ripple on: at most one instance per
    /// tick and per delay window, starting at the current slot and skipping
    /// instances that are not ready.
    pub fn fire(&mut self, now: f64, tick: u64, ready: &[WeaponId]) -> Vec<WeaponId> {
        if !self.is_rippling() {
            return self
                .members
                .iter()
                .copied()
                .filter(|id| ready.contains(id))
                .collect();
        }
        if self.last_fired_tick == Some(tick) || now + TIME_EPSILON < self.next_eligible {
            return Vec::new();
        }
        match self.advance(ready) {
            Some(id) => {
                self.next_eligible = now + self.delay();
                self.last_fired_tick = Some(tick);
                vec![id]
            }
            None => Vec::new(),
        }
    }

    /// Hand out the next ready instance in slot order and move the index past it.
    pub fn advance(&mut self, ready: &[WeaponId]) -> Option<WeaponId> {
        let n = self.members.len();
        if n == 0 {
            return None;
        }
        let start = self.index();
        for step in 0..n {
            let slot = (start + step) % n;
            if ready.contains(&self.members[slot]) {
                self.index = (slot + 1) % n;
                return Some(self.members[slot]);
            }
        }
        None
    }

    pub fn snapshot(&self) -> RippleSnapshot {
        RippleSnapshot {
            group: self.id,
            name: self.name.clone(),
            enabled: self.option.enabled,
            index: self.index(),
            size: self.size(),
            combined_rpm: self.combined_rpm,
        }
    }
}

/// All weapon groups of one platform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RippleScheduler {
    groups: BTreeMap<WeaponGroupId, RippleGroup>,
    by_weapon: BTreeMap<WeaponId, WeaponGroupId>,
}

impl RippleScheduler {
    /// Group `weapons` by definition name, in inventory order. Missing
    /// preferences are stored with their defaults.
    pub fn build(weapons: &[WeaponDescriptor], prefs: &mut RipplePreferences) -> Self {
        let mut scheduler = Self::default();
        let mut by_name: BTreeMap<&str, WeaponGroupId> = BTreeMap::new();

        for weapon in weapons {
            let next_id = WeaponGroupId(by_name.len() as u32);
            let id = *by_name.entry(weapon.name.as_str()).or_insert(next_id);
            let group = scheduler.groups.entry(id).or_insert_with(|| {
                let option = prefs.entry(&weapon.name, RippleOption::default());
                RippleGroup::new(id, weapon, option)
            });
            group.members.push(weapon.id);
            group.combined_rpm += weapon.rpm.max(0.0);
            group.instance_rpm = group.instance_rpm.max(weapon.rpm);
            scheduler.by_weapon.insert(weapon.id, id);
        }
        scheduler
    }

    /// Rebuild after an inventory change, keeping slot and timing state of
    /// groups whose name survived.
    pub fn rebuild(&self, weapons: &[WeaponDescriptor], prefs: &mut RipplePreferences) -> Self {
        let mut next = Self::build(weapons, prefs);
        for group in next.groups.values_mut() {
            let Some(old) = self.groups.values().find(|g| g.name == group.name) else {
                continue;
            };
            group.next_eligible = old.next_eligible;
            group.index = old.index;
            if group.index >= group.members.len() {
                tracing::warn!(
                    group = %group.name,
                    index = group.index,
                    size = group.members.len(),
                    "ripple.index_clamped"
                );
                group.index = group.index();
            }
        }
        next
    }

    pub fn group_of(&self, weapon: WeaponId) -> Option<WeaponGroupId> {
        self.by_weapon.get(&weapon).copied()
    }

    pub fn group(&self, id: WeaponGroupId) -> Option<&RippleGroup> {
        self.groups.get(&id)
    }

    pub fn group_mut(&mut self, id: WeaponGroupId) -> Option<&mut RippleGroup> {
        self.groups.get_mut(&id)
    }

    pub fn groups(&self) -> impl Iterator<Item = &RippleGroup> {
        self.groups.values()
    }

    /// Apply a ripple preference to the group named `name`.
    pub fn set_option(&mut self, name: &str, option: RippleOption) -> bool {
        match self.groups.values_mut().find(|g| g.name == name) {
            Some(group) => {
                group.option = option;
                true
            }
            None => false,
        }
    }

    pub fn snapshots(&self) -> Vec<RippleSnapshot> {
        self.groups.values().map(RippleGroup::snapshot).collect()
    }
}
