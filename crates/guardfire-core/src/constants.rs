//! Engine constants and default tuning parameters.
//!
//! Values that operators may want to tune are mirrored as defaults in
//! `config`; the rest are geometric or physical constants.

/// Default control rate (Hz).
pub const TICK_RATE: u32 = 50;

/// Seconds per tick at the default control rate.
pub const DT: f64 = 1.0 / TICK_RATE as f64;

/// Standard gravity (m/s²).
pub const GRAVITY: f64 = 9.81;

/// Vessels below this altitude (m) are submerged.
pub const SUBMERGED_ALTITUDE: f64 = -20.0;

/// Hard cap on any engagement or launch range (m).
pub const MAX_ENGAGEMENT_RANGE: f64 = 200_000.0;

// --- Guard timing ---

/// Seconds between target/weapon re-selection.
pub const DEFAULT_SCAN_INTERVAL_SECS: f64 = 3.0;

/// Lifetime of an override target (s).
pub const OVERRIDE_TARGET_DURATION_SECS: f64 = 15.0;

/// Default guard range (m).
pub const DEFAULT_GUARD_RANGE: f64 = 10_000.0;

/// Default guard field of view (deg, full cone).
pub const DEFAULT_GUARD_ANGLE_DEG: f64 = 360.0;

/// Default gun engagement range used by ladder cut-offs (m).
pub const DEFAULT_GUN_RANGE: f64 = 2_500.0;

// --- Target scoring ---

/// Score multiplier for the current target in weighted-priority mode.
pub const DEFAULT_TARGET_BIAS: f64 = 1.3;

/// Score multiplier for the current target in closest mode.
pub const CLOSEST_HYSTERESIS: f64 = 1.1;

/// Bearing preference for closest mode (1 = ignore bearing).
pub const CLOSEST_BEARING_BIAS: f64 = 2.0;

/// How long a team detection keeps a target visible (s), lower bound.
pub const VISIBILITY_MEMORY_SECS: f64 = 30.0;

/// Closure time normalisation window (s).
pub const CLOSURE_TIME_CAP_SECS: f64 = 60.0;

/// Air-to-air and missile selectors skip targets engaged by this many friendlies.
pub const MAX_FRIENDLIES_ON_TARGET: usize = 2;

// --- Envelope ---

/// Feasible up to this multiple of max range, to allow pre-emptive aiming.
pub const ENGAGEMENT_RANGE_MARGIN: f64 = 1.1;

/// Turret gimbal tolerance while flying (deg).
pub const GIMBAL_TOLERANCE_FLYING_DEG: f64 = 15.0;

/// Turret gimbal tolerance while landed or splashed (deg).
pub const GIMBAL_TOLERANCE_SURFACE_DEG: f64 = 0.0;

/// Turret gimbal tolerance when handing out secondary targets (deg).
pub const SECONDARY_TURRET_TOLERANCE_DEG: f64 = 7.0;

/// Fixed-mount weapons are treated as off-angle beyond this (deg).
pub const FIXED_FIRE_ANGLE_DEG: f64 = 10.0;

/// Look-ahead used for selection distances (s).
pub const SELECTION_LOOKAHEAD_SECS: f64 = 1.0;

// --- Launch zone ---

/// Blast radius cap used for safe-separation time (m).
pub const DLZ_BLAST_CAP: f64 = 150.0;

/// Missile active-time cap (s).
pub const DLZ_ACTIVE_TIME_CAP_SECS: f64 = 2.0;

/// Horizon used to extend max range with closing speed (s).
pub const DLZ_MAX_RANGE_TIME_SECS: f64 = 8.0;

/// Minimum width of the launch window (m).
pub const DLZ_MIN_WINDOW: f64 = 100.0;

/// Floor on the estimated missile turn load (g).
pub const DLZ_MIN_TURN_G: f64 = 15.0;

/// Boresight factor for landed launchers, landed targets or all-aspect seekers.
pub const BORESIGHT_FACTOR_WIDE: f64 = 0.75;

/// Boresight factor otherwise.
pub const BORESIGHT_FACTOR_NARROW: f64 = 0.35;

/// Look-ahead for the second launch authorization check (s).
pub const LAUNCH_EXTRAPOLATION_SECS: f64 = 2.0;

// --- Ripple ---

/// Ripple rate for groups with no stored preference (rpm).
pub const DEFAULT_RIPPLE_RPM: f64 = 650.0;

/// Direct-fire weapons at or above this rate never ripple (rpm).
pub const RIPPLE_RPM_CAP: f64 = 1500.0;

// --- Threat response ---

/// Warning flags clear this long after the last detection (s).
pub const WARNING_RESET_SECS: f64 = 1.0;

/// Incoming threat distance is forgotten after this long (s).
pub const THREAT_DISTANCE_RESET_SECS: f64 = 8.0;

/// Jammer burst length (s).
pub const JAMMER_DURATION_SECS: f64 = 10.0;

/// Closing time ceiling (s).
pub const MAX_CLOSING_TIME_SECS: f64 = 3600.0;

/// Default closing time below which countermeasures are used (s).
pub const DEFAULT_CM_THRESHOLD_SECS: f64 = 5.0;
