//! Fire-control engine: the public entry point of the crate.
//!
//! `FireControlEngine` owns the simulation context and the engagement state
//! of every engine-driven platform, processes queued commands at tick
//! boundaries and produces a `TickReport` per platform tick. It never fires
//! anything itself; the host executes the events it returns.

use std::collections::{BTreeMap, VecDeque};

use rand::Rng;
use thiserror::Error;

use guardfire_core::commands::EngineCommand;
use guardfire_core::components::{EntityId, PlatformId};
use guardfire_core::config::{ConfigError, GuardConfig};
use guardfire_core::constants::DEFAULT_RIPPLE_RPM;
use guardfire_core::events::EngineEvent;
use guardfire_core::settings::{
    PersistedSettings, RippleOption, RippleParseError, RipplePreferences, GUARD_CONFIG_KEY, RIPPLE_KEY,
};
use guardfire_core::state::{PlatformSnapshot, TickReport};
use guardfire_core::types::SimTime;
use guardfire_core::weapon::WeaponDescriptor;

use crate::context::SimulationContext;
use crate::engagement::{EngagementState, LaunchTask, OverrideTarget};
use crate::sensors::SensorSuite;
use crate::systems::guard::{self, GuardInput};
use crate::systems::ripple::RippleScheduler;
use crate::systems::threat::AllyStatus;

/// Configuration for starting a new engine.
pub struct SimConfig {
    /// RNG seed for determinism. Same seed = same event stream.
    pub seed: u64,
    /// Multiplier applied to every `dt` passed to a tick.
    pub time_scale: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            time_scale: 1.0,
        }
    }
}

/// Failure to apply persisted settings. Nothing is applied on error.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Ripple(#[from] RippleParseError),
}

/// The decision engine. Owns the context and all per-platform state.
pub struct FireControlEngine {
    context: SimulationContext,
    platforms: BTreeMap<PlatformId, EngagementState>,
    command_queue: VecDeque<EngineCommand>,
    /// Events raised outside a platform tick, delivered with its next report.
    pending_events: BTreeMap<PlatformId, Vec<EngineEvent>>,
    ripple_prefs: RipplePreferences,
    default_config: GuardConfig,
    time_scale: f64,
}

impl FireControlEngine {
    pub fn new(config: SimConfig) -> Self {
        Self {
            context: SimulationContext::new(config.seed),
            platforms: BTreeMap::new(),
            command_queue: VecDeque::new(),
            pending_events: BTreeMap::new(),
            ripple_prefs: RipplePreferences::default(),
            default_config: GuardConfig::default(),
            time_scale: config.time_scale,
        }
    }

    pub fn context(&self) -> &SimulationContext {
        &self.context
    }

    /// Mutable access for the host to spawn, move and report vessels.
    pub fn context_mut(&mut self) -> &mut SimulationContext {
        &mut self.context
    }

    pub fn time(&self) -> SimTime {
        self.context.time
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Configuration given to platforms added from now on.
    pub fn default_config(&self) -> &GuardConfig {
        &self.default_config
    }

    // --- Platforms ---

    /// Attach a decision engine to a vessel already in the world. The first
    /// scan is staggered randomly inside one scan interval.
    pub fn add_platform(&mut self, platform: PlatformId, weapons: Vec<WeaponDescriptor>) -> bool {
        if self.platforms.contains_key(&platform) {
            return false;
        }
        let Some(info) = self.context.info(platform) else {
            tracing::warn!(platform = platform.0, "engine.unknown_vessel");
            return false;
        };
        let config = self.default_config.clone();
        let interval = config.scan_interval;
        let first_scan_in = if interval > 0.0 {
            self.context.rng.gen_range(0.0..interval)
        } else {
            0.0
        };
        let state = EngagementState::new(
            platform,
            info.team,
            config,
            weapons,
            &mut self.ripple_prefs,
            first_scan_in,
        );
        self.context.enroll(info.team, platform);
        self.platforms.insert(platform, state);
        tracing::info!(platform = platform.0, team = info.team.0, first_scan_in, "engine.platform_added");
        true
    }

    /// Detach a platform. Returns the shutdown events (autofire off, jammer
    /// off, disengagement) the host should still apply.
    pub fn remove_platform(&mut self, platform: PlatformId) -> Vec<EngineEvent> {
        let Some(mut state) = self.platforms.remove(&platform) else {
            return Vec::new();
        };
        let mut events = self.pending_events.remove(&platform).unwrap_or_default();
        guard::shutdown(&mut state, &mut self.context.registry, &mut events);
        self.context.unenroll(platform);
        tracing::info!(platform = platform.0, "engine.platform_removed");
        events
    }

    /// Replace a platform's guard configuration after validating it.
    pub fn configure(&mut self, platform: PlatformId, config: GuardConfig) -> Result<bool, ConfigError> {
        config.validate()?;
        Ok(match self.platforms.get_mut(&platform) {
            Some(state) => {
                state.config = config;
                true
            }
            None => false,
        })
    }

    // --- Commands ---

    /// Queue a command for processing at the next tick boundary.
    pub fn queue_command(&mut self, command: EngineCommand) {
        self.command_queue.push_back(command);
    }

    pub fn set_guard_mode(&mut self, platform: PlatformId, enabled: bool) {
        self.queue_command(EngineCommand::SetGuardMode { platform, enabled });
    }

    pub fn set_override_target(&mut self, platform: PlatformId, target: EntityId, duration_secs: f64) {
        self.queue_command(EngineCommand::SetOverrideTarget {
            platform,
            target,
            duration_secs,
        });
    }

    pub fn force_rescan(&mut self, platform: PlatformId) {
        self.queue_command(EngineCommand::ForceRescan { platform });
    }

    pub fn set_ripple(&mut self, platform: PlatformId, weapon_name: &str, option: RippleOption) {
        self.queue_command(EngineCommand::SetRipple {
            platform,
            weapon_name: weapon_name.to_string(),
            option,
        });
    }

    // --- Ticking ---

    /// Advance one platform by `dt` seconds and advance the shared clock.
    /// Hosts driving several platforms should use `tick_all`.
    pub fn tick(&mut self, platform: PlatformId, dt: f64, sensors: &mut dyn SensorSuite) -> Option<TickReport> {
        if !self.platforms.contains_key(&platform) {
            return None;
        }
        let dt = self.scaled(dt);
        self.process_commands();
        self.context.registry.refresh(&self.context.world);

        let events = self.step_platform(platform, dt, sensors);
        self.context.time.advance(dt);
        self.report(platform, events)
    }

    /// Advance every platform by `dt` seconds, in platform order, then
    /// advance the shared clock once.
    pub fn tick_all(&mut self, dt: f64, sensors: &mut dyn SensorSuite) -> Vec<TickReport> {
        let dt = self.scaled(dt);
        self.process_commands();
        self.context.registry.refresh(&self.context.world);

        let ids: Vec<PlatformId> = self.platforms.keys().copied().collect();
        let stepped: Vec<(PlatformId, Vec<EngineEvent>)> = ids
            .into_iter()
            .map(|platform| (platform, self.step_platform(platform, dt, sensors)))
            .collect();
        self.context.time.advance(dt);
        stepped
            .into_iter()
            .filter_map(|(platform, events)| self.report(platform, events))
            .collect()
    }

    pub fn snapshot(&self, platform: PlatformId) -> Option<PlatformSnapshot> {
        self.platforms.get(&platform).map(EngagementState::snapshot)
    }

    // --- Host notifications ---

    /// The platform's weapon inventory changed. Groups are rebuilt and
    /// running sequences follow their group by name or stop.
    pub fn on_structural_change(&mut self, platform: PlatformId, weapons: Vec<WeaponDescriptor>) -> bool {
        let Some(state) = self.platforms.get_mut(&platform) else {
            return false;
        };
        let events = self.pending_events.entry(platform).or_default();
        let previous = std::mem::replace(&mut state.ripple, RippleScheduler::default());
        state.ripple = previous.rebuild(&weapons, &mut self.ripple_prefs);
        state.weapons = weapons;

        let regroup = |group| {
            previous
                .group(group)
                .and_then(|old| state.ripple.groups().find(|g| g.name == old.name))
                .map(|g| g.id)
        };

        if let Some(mut task) = state.turret_task.take() {
            match regroup(task.group) {
                Some(group) => {
                    task.group = group;
                    state.turret_task = Some(task);
                }
                None => task.cancel(platform, events),
            }
        }
        if let Some(mut task) = state.launch_task.take() {
            let group = match &mut task {
                LaunchTask::Missile(t) => &mut t.group,
                LaunchTask::Bomb(t) => &mut t.group,
            };
            if let Some(new_group) = regroup(*group) {
                *group = new_group;
                state.launch_task = Some(task);
            }
        }

        let weapon_gone = state
            .current_weapon
            .is_some_and(|w| !state.weapons.iter().any(|d| d.id == w));
        if weapon_gone {
            state.current_weapon = None;
            state.weapon_kind = None;
            state.force_rescan = true;
        }
        tracing::debug!(platform = platform.0, groups = state.ripple.groups().count(), "engine.inventory_rebuilt");
        true
    }

    /// The host is changing scenes: stop every sequence, drop all platforms
    /// and start a fresh context. Returns the shutdown events.
    pub fn on_scene_transition(&mut self) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        for (platform, mut state) in std::mem::take(&mut self.platforms) {
            if let Some(pending) = self.pending_events.remove(&platform) {
                events.extend(pending);
            }
            guard::shutdown(&mut state, &mut self.context.registry, &mut events);
        }
        self.pending_events.clear();
        self.command_queue.clear();
        self.context.init();
        events
    }

    // --- Settings ---

    /// Apply persisted settings. Both keys are parsed before anything changes.
    pub fn load_settings(&mut self, settings: &PersistedSettings) -> Result<(), SettingsError> {
        let config = settings.get(GUARD_CONFIG_KEY).map(GuardConfig::from_json).transpose()?;
        let prefs = settings.get(RIPPLE_KEY).map(RipplePreferences::parse).transpose()?;

        if let Some(config) = config {
            for state in self.platforms.values_mut() {
                state.config = config.clone();
            }
            self.default_config = config;
        }
        if let Some(prefs) = prefs {
            for (name, option) in &prefs.0 {
                self.ripple_prefs.set(name, *option);
                for state in self.platforms.values_mut() {
                    state.ripple.set_option(name, *option);
                }
            }
        }
        tracing::info!(entries = settings.0.len(), "engine.settings_loaded");
        Ok(())
    }

    pub fn save_settings(&self) -> PersistedSettings {
        let mut settings = PersistedSettings::default();
        match self.default_config.to_json() {
            Ok(json) => settings.set(GUARD_CONFIG_KEY, json),
            Err(err) => tracing::warn!(%err, "engine.config_not_saved"),
        }
        settings.set(RIPPLE_KEY, self.ripple_prefs.to_record_string());
        settings
    }

    // --- Test accessors ---

    #[cfg(test)]
    pub fn platform_state(&self, platform: PlatformId) -> Option<&EngagementState> {
        self.platforms.get(&platform)
    }

    #[cfg(test)]
    pub fn platform_state_mut(&mut self, platform: PlatformId) -> Option<&mut EngagementState> {
        self.platforms.get_mut(&platform)
    }

    #[cfg(test)]
    pub fn ripple_preferences(&self) -> &RipplePreferences {
        &self.ripple_prefs
    }

    #[cfg(test)]
    pub fn pending_commands(&self) -> usize {
        self.command_queue.len()
    }

    // --- Internals ---

    fn scaled(&self, dt: f64) -> f64 {
        let scaled = dt * self.time_scale;
        if scaled.is_finite() && scaled >= 0.0 {
            scaled
        } else {
            tracing::warn!(dt, time_scale = self.time_scale, "engine.invalid_dt");
            0.0
        }
    }

    /// Process all queued commands.
    fn process_commands(&mut self) {
        while let Some(command) = self.command_queue.pop_front() {
            self.handle_command(command);
        }
    }

    /// Handle a single command.
    fn handle_command(&mut self, command: EngineCommand) {
        let platform = command.platform();
        let now = self.context.now();
        let Some(state) = self.platforms.get_mut(&platform) else {
            tracing::warn!(platform = platform.0, "engine.unknown_platform");
            return;
        };
        let events = self.pending_events.entry(platform).or_default();

        match command {
            EngineCommand::SetGuardMode { enabled, .. } => {
                if state.guard_enabled == enabled {
                    return;
                }
                state.guard_enabled = enabled;
                if !enabled {
                    guard::disable(state, &mut self.context.registry, events);
                }
                events.push(EngineEvent::GuardModeChanged { platform, enabled });
                tracing::info!(platform = platform.0, enabled, "engine.guard_mode");
            }
            EngineCommand::SetOverrideTarget {
                target,
                duration_secs,
                ..
            } => {
                let duration = if duration_secs.is_finite() && duration_secs > 0.0 {
                    duration_secs
                } else {
                    state.config.timing.override_duration
                };
                state.override_target = Some(OverrideTarget {
                    target,
                    expires_at: now + duration,
                });
                state.force_rescan = true;
                tracing::debug!(platform = platform.0, target_id = target.0, duration, "engine.override_set");
            }
            EngineCommand::ForceRescan { .. } => {
                state.force_rescan = true;
            }
            EngineCommand::SetRipple {
                weapon_name, option, ..
            } => {
                let option = if option.rpm.is_finite() && option.rpm > 0.0 {
                    option
                } else {
                    tracing::warn!(rpm = option.rpm, weapon = %weapon_name, "engine.ripple_rpm_reset");
                    RippleOption {
                        rpm: DEFAULT_RIPPLE_RPM,
                        ..option
                    }
                };
                self.ripple_prefs.set(&weapon_name, option);
                if !state.ripple.set_option(&weapon_name, option) {
                    tracing::debug!(platform = platform.0, weapon = %weapon_name, "engine.ripple_group_missing");
                }
            }
        }
    }

    /// Teammates of `platform` with their position and current target.
    fn allies_of(&self, platform: PlatformId) -> Vec<AllyStatus> {
        let Some(team) = self.platforms.get(&platform).map(|s| s.team) else {
            return Vec::new();
        };
        let roster = self.context.rosters.get(&team).map(Vec::as_slice).unwrap_or_default();
        roster
            .iter()
            .filter(|p| **p != platform)
            .filter_map(|p| {
                let position = self.context.kinematics(*p)?.position;
                let current_target = self.platforms.get(p).and_then(|s| s.current_target);
                Some(AllyStatus {
                    platform: *p,
                    position,
                    current_target,
                })
            })
            .collect()
    }

    fn step_platform(&mut self, platform: PlatformId, dt: f64, sensors: &mut dyn SensorSuite) -> Vec<EngineEvent> {
        let allies = self.allies_of(platform);
        let mut events = self.pending_events.remove(&platform).unwrap_or_default();
        let Some(state) = self.platforms.get_mut(&platform) else {
            return events;
        };
        let input = GuardInput {
            now: self.context.now(),
            dt,
            tick: self.context.time.tick,
            allies: &allies,
        };
        let mut commands = Vec::new();
        guard::run(state, &mut self.context, sensors, &input, &mut events, &mut commands);
        self.command_queue.extend(commands);
        events
    }

    fn report(&self, platform: PlatformId, events: Vec<EngineEvent>) -> Option<TickReport> {
        let snapshot = self.platforms.get(&platform)?.snapshot();
        Some(TickReport {
            tick: self.context.time.tick,
            elapsed_secs: self.context.time.elapsed_secs,
            snapshot,
            events,
        })
    }
}
