//! Per-platform guard configuration.
//!
//! Every field has a default so partial JSON documents load cleanly.
//! The multiplicative preferences used by the envelope matcher live in
//! `MatcherTuning` and every sequence timeout in `TimingConfig`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::*;
use crate::enums::SelectionMode;

/// Weight applied to each priority term in weighted-priority mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetWeights {
    pub range: f64,
    /// Antenna train angle.
    pub ata: f64,
    /// Angle over distance.
    pub aod: f64,
    pub accel: f64,
    pub closure_time: f64,
    /// Relative enemy weapon count.
    pub weapons: f64,
    pub mass: f64,
    pub friendlies_engaging: f64,
    pub threat: f64,
    pub protect_vip: f64,
    pub attack_vip: f64,
}

impl Default for TargetWeights {
    fn default() -> Self {
        Self {
            range: 0.0,
            ata: 0.0,
            aod: 2.0,
            accel: 0.0,
            closure_time: 0.0,
            weapons: 0.0,
            mass: 0.0,
            friendlies_engaging: 1.0,
            threat: 0.0,
            protect_vip: 0.0,
            attack_vip: 0.0,
        }
    }
}

impl TargetWeights {
    fn all(&self) -> [f64; 11] {
        [
            self.range,
            self.ata,
            self.aod,
            self.accel,
            self.closure_time,
            self.weapons,
            self.mass,
            self.friendlies_engaging,
            self.threat,
            self.protect_vip,
            self.attack_vip,
        ]
    }
}

/// Attractiveness multipliers used when ranking weapons of one class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherTuning {
    /// Generic bonus for turreted mounts.
    pub turret_bonus: f64,
    /// Bonus for turreted guns and rockets against missiles and aircraft.
    pub turret_intercept_bonus: f64,
    /// Bonus for airburst fuzes (timed, proximity, flak).
    pub airburst_bonus: f64,
    /// Bonus for a rocket that accelerates faster than the current pick.
    pub faster_rocket_bonus: f64,
    /// Penalty for impact-fuzed rockets against aircraft.
    pub impact_rocket_penalty: f64,
    /// Penalty for impact-fuzed rockets against missiles.
    pub contact_rocket_intercept_penalty: f64,
    /// Penalty for a target inside minimum range.
    pub min_range_penalty: f64,
    /// Penalty for a fixed mount pointing away from the target.
    pub off_angle_penalty: f64,
    /// Penalty for a laser target inside minimum range.
    pub laser_min_range_penalty: f64,
    /// Rocket rate-of-fire divisor.
    pub rocket_rpm_divisor: f64,
    /// A rocket must beat a gun by this factor to replace it against missiles.
    pub rocket_over_gun_margin: f64,
    /// Aircraft above this radius (m) are ranked by gun caliber instead of rate.
    pub large_air_target_radius: f64,
    /// Surface targets above this radius (m) are ranked by projectile impulse.
    pub large_surface_target_radius: f64,
    /// Caliber scale factor for large aircraft.
    pub caliber_scale: f64,
    /// Yield bonus per submunition against moving surface targets.
    pub cluster_bonus: f64,
    /// Margin applied to max range when testing feasibility.
    pub range_margin: f64,
    /// Turret gimbal tolerance while flying (deg).
    pub gimbal_tolerance_flying: f64,
    /// Turret gimbal tolerance while landed or splashed (deg).
    pub gimbal_tolerance_surface: f64,
    /// Fixed mounts beyond this off-axis angle are penalised (deg).
    pub fixed_fire_angle: f64,
}

impl Default for MatcherTuning {
    fn default() -> Self {
        Self {
            turret_bonus: 1.5,
            turret_intercept_bonus: 2.0,
            airburst_bonus: 1.5,
            faster_rocket_bonus: 1.5,
            impact_rocket_penalty: 0.5,
            contact_rocket_intercept_penalty: 0.01,
            min_range_penalty: 0.01,
            off_angle_penalty: 0.01,
            laser_min_range_penalty: 0.00001,
            rocket_rpm_divisor: 2.0,
            rocket_over_gun_margin: 2.0,
            large_air_target_radius: 8.0,
            large_surface_target_radius: 4.0,
            caliber_scale: 10.0,
            cluster_bonus: 2.0,
            range_margin: ENGAGEMENT_RANGE_MARGIN,
            gimbal_tolerance_flying: GIMBAL_TOLERANCE_FLYING_DEG,
            gimbal_tolerance_surface: GIMBAL_TOLERANCE_SURFACE_DEG,
            fixed_fire_angle: FIXED_FIRE_ANGLE_DEG,
        }
    }
}

/// Timeouts and waits of the guard sequences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Wait after requesting a turret radar lock (s).
    pub turret_lock_wait: f64,
    /// Radar lock attempt window (s).
    pub radar_lock_timeout: f64,
    /// Delay between radar lock attempts (s).
    pub lock_retry_interval: f64,
    /// Missile turret slew window (s).
    pub missile_turret_timeout: f64,
    /// Lower bound of the heat lock window (s).
    pub heat_lock_min: f64,
    /// Fraction of the scan interval given to lock windows.
    pub lock_window_fraction: f64,
    /// Anti-radiation designated point must be this close to the target (m).
    pub anti_rad_match_distance: f64,
    /// Laser spot must be this close to the target (m).
    pub laser_match_distance: f64,
    /// Lower bound of a bomb run (s).
    pub bomb_min_duration: f64,
    /// Floor on the bomb release radius (m).
    pub bomb_min_radius: f64,
    /// Ask for an extension when past the target inside this distance (m).
    pub bomb_extend_distance: f64,
    /// Wait between bomb releases when not rippling (s).
    pub single_release_interval: f64,
    /// Lifetime of an override target (s).
    pub override_duration: f64,
    /// Warning flags clear this long after the last detection (s).
    pub warning_reset: f64,
    /// Incoming threat distance is forgotten after this long (s).
    pub threat_distance_reset: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            turret_lock_wait: 0.5,
            radar_lock_timeout: 2.0,
            lock_retry_interval: 0.25,
            missile_turret_timeout: 5.0,
            heat_lock_min: 5.0,
            lock_window_fraction: 0.75,
            anti_rad_match_distance: 20.0,
            laser_match_distance: 10.0,
            bomb_min_duration: 12.0,
            bomb_min_radius: 50.0,
            bomb_extend_distance: 800.0,
            single_release_interval: 0.06,
            override_duration: OVERRIDE_TARGET_DURATION_SECS,
            warning_reset: WARNING_RESET_SECS,
            threat_distance_reset: THREAT_DISTANCE_RESET_SECS,
        }
    }
}

/// Countermeasure dispensing settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountermeasureConfig {
    /// Closing time at or below which flares and chaff are used (s).
    pub cm_threshold: f64,
    /// Fraction of `cm_threshold` below which everything is dispensed.
    pub imminent_fraction: f64,
    pub flare_repetitions: u32,
    pub flare_interval: f64,
    pub flare_wait: f64,
    pub chaff_repetitions: u32,
    pub chaff_interval: f64,
    pub chaff_wait: f64,
    /// Repetitions of the all-countermeasure salvo, one per second.
    pub salvo_repetitions: u32,
    pub jammer_duration: f64,
}

impl Default for CountermeasureConfig {
    fn default() -> Self {
        Self {
            cm_threshold: DEFAULT_CM_THRESHOLD_SECS,
            imminent_fraction: 0.5,
            flare_repetitions: 3,
            flare_interval: 0.2,
            flare_wait: 0.7,
            chaff_repetitions: 2,
            chaff_interval: 0.5,
            chaff_wait: 0.6,
            salvo_repetitions: 5,
            jammer_duration: JAMMER_DURATION_SECS,
        }
    }
}

/// Complete guard configuration of one platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub selection_mode: SelectionMode,
    pub weights: TargetWeights,
    /// Current-target score multiplier in weighted-priority mode.
    pub target_bias: f64,
    /// Seconds between target re-selection.
    pub scan_interval: f64,
    /// Autofire burst length (s); zero means half the scan interval.
    pub fire_burst_length: f64,
    /// Visual guard range (m).
    pub guard_range: f64,
    /// Guard field of view (deg, full cone).
    pub guard_angle: f64,
    /// Gun range used as a ladder cut-off (m).
    pub gun_range: f64,
    /// Missiles in flight allowed against one target.
    pub max_missiles_on_target: u32,
    /// Total targets engaged at once (primary plus secondaries).
    pub multi_target_count: u32,
    pub engage_air: bool,
    pub engage_missiles: bool,
    pub engage_surface: bool,
    pub engage_submerged: bool,
    /// Skip ammo checks entirely.
    pub unlimited_ammo: bool,
    /// Cap on any computed range (m).
    pub max_engagement_range: f64,
    pub countermeasures: CountermeasureConfig,
    pub tuning: MatcherTuning,
    pub timing: TimingConfig,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            selection_mode: SelectionMode::default(),
            weights: TargetWeights::default(),
            target_bias: DEFAULT_TARGET_BIAS,
            scan_interval: DEFAULT_SCAN_INTERVAL_SECS,
            fire_burst_length: 0.0,
            guard_range: DEFAULT_GUARD_RANGE,
            guard_angle: DEFAULT_GUARD_ANGLE_DEG,
            gun_range: DEFAULT_GUN_RANGE,
            max_missiles_on_target: 1,
            multi_target_count: 1,
            engage_air: true,
            engage_missiles: true,
            engage_surface: true,
            engage_submerged: true,
            unlimited_ammo: false,
            max_engagement_range: MAX_ENGAGEMENT_RANGE,
            countermeasures: CountermeasureConfig::default(),
            tuning: MatcherTuning::default(),
            timing: TimingConfig::default(),
        }
    }
}

/// Configuration loading or validation failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse guard config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid guard config field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl GuardConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        let config: GuardConfig = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("scan_interval", self.scan_interval)?;
        positive("guard_range", self.guard_range)?;
        positive("max_engagement_range", self.max_engagement_range)?;
        positive("target_bias", self.target_bias)?;
        non_negative("fire_burst_length", self.fire_burst_length)?;
        non_negative("gun_range", self.gun_range)?;
        non_negative("countermeasures.cm_threshold", self.countermeasures.cm_threshold)?;
        if !(0.0..=360.0).contains(&self.guard_angle) {
            return Err(invalid("guard_angle", "must be within 0..=360 degrees"));
        }
        if self.multi_target_count == 0 {
            return Err(invalid("multi_target_count", "must be at least 1"));
        }
        if self.max_missiles_on_target == 0 {
            return Err(invalid("max_missiles_on_target", "must be at least 1"));
        }
        if self.weights.all().iter().any(|w| !w.is_finite()) {
            return Err(invalid("weights", "all weights must be finite"));
        }
        if !(0.0..=1.0).contains(&self.countermeasures.imminent_fraction) {
            return Err(invalid("countermeasures.imminent_fraction", "must be within 0..=1"));
        }
        Ok(())
    }

    /// Autofire burst length, falling back to half a scan interval.
    pub fn burst_length(&self) -> f64 {
        if self.fire_burst_length < 0.01 {
            self.scan_interval / 2.0
        } else {
            self.fire_burst_length
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, &format!("must be positive, got {value}")))
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, &format!("must not be negative, got {value}")))
    }
}
