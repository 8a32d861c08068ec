//! Dynamic launch zone and launch authorization for guided munitions.
//!
//! The launch zone shifts the static engagement window with the closing
//! speed of the target over the time the munition needs to arm, and pushes
//! the minimum out by the arc it has to fly to turn onto the target. Authorization checks that the
//! target sits inside the seeker cone now and two seconds from now.

use glam::DVec3;

use guardfire_core::components::Kinematics;
use guardfire_core::constants::*;
use guardfire_core::types::angle_between_deg;
use guardfire_core::weapon::{WeaponClass, WeaponDescriptor};

/// Launch-relevant properties of a missile or ship-launched weapon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaunchProfile {
    pub min_range: f64,
    pub max_range: f64,
    /// Peak motor acceleration (m/s²), zero when unknown.
    pub acceleration: f64,
    pub blast_radius: f64,
    pub drop_time: f64,
    pub guided: bool,
    pub ship_launched: bool,
    /// Control authority in multiples of gravity.
    pub max_torque: f64,
    pub max_aoa: Option<f64>,
    pub optimum_airspeed: f64,
    pub max_off_boresight: f64,
    pub all_aspect: bool,
}

impl LaunchProfile {
    /// Profile of a launched weapon; `None` for guns, rockets, lasers and bombs.
    pub fn from_weapon(weapon: &WeaponDescriptor) -> Option<Self> {
        match &weapon.class {
            WeaponClass::Missile(m) => Some(Self {
                min_range: weapon.min_range,
                max_range: weapon.max_range,
                acceleration: m.acceleration(),
                blast_radius: m.blast_radius,
                drop_time: m.drop_time,
                guided: m.is_guided(),
                ship_launched: false,
                max_torque: m.max_torque,
                max_aoa: m.max_aoa,
                optimum_airspeed: m.optimum_airspeed,
                max_off_boresight: m.max_off_boresight,
                all_aspect: m.all_aspect,
            }),
            WeaponClass::Slw(s) => Some(Self {
                min_range: weapon.min_range,
                max_range: weapon.max_range,
                acceleration: 0.0,
                blast_radius: s.blast_radius,
                drop_time: s.drop_time,
                guided: true,
                ship_launched: true,
                max_torque: 0.0,
                max_aoa: None,
                optimum_airspeed: 0.0,
                max_off_boresight: 180.0,
                all_aspect: true,
            }),
            _ => None,
        }
    }
}

/// Dynamic min/max launch range window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaunchZone {
    pub min: f64,
    pub max: f64,
}

impl LaunchZone {
    /// Open interval test.
    pub fn contains(&self, distance: f64) -> bool {
        distance > self.min && distance < self.max
    }
}

/// Closing component of the relative velocity; positive when closing.
pub fn closing_speed(launcher: &Kinematics, target: &Kinematics) -> f64 {
    let to_target = launcher.position.offset_to(&target.position);
    let Some(los) = to_target.try_normalize() else {
        return 0.0;
    };
    let rel_v = target.velocity.to_dvec3() - launcher.velocity.to_dvec3();
    -rel_v.dot(los)
}

/// Compute the launch window of `profile` from `launcher` against `target`.
pub fn launch_zone(
    profile: &LaunchProfile,
    launcher: &Kinematics,
    surface_launch: bool,
    target: &Kinematics,
    range_cap: f64,
) -> LaunchZone {
    let rel_speed = closing_speed(launcher, target);
    let drop_time = if surface_launch { 0.0 } else { profile.drop_time };

    let active_time = if profile.acceleration > 0.0 {
        let blast = profile.blast_radius.min(DLZ_BLAST_CAP).max(0.0);
        (drop_time + (2.0 * blast / profile.acceleration).sqrt()).min(DLZ_ACTIVE_TIME_CAP_SECS)
    } else {
        DLZ_ACTIVE_TIME_CAP_SECS
    };

    // Guided air launches must first turn onto the target
    let arc = if !surface_launch && !profile.ship_launched && profile.guided {
        turn_arc_length(profile, launcher, target, drop_time)
    } else {
        0.0
    };
    let min = (profile.min_range + arc + rel_speed * active_time).clamp(0.0, range_cap);
    let add_max = rel_speed * DLZ_MAX_RANGE_TIME_SECS + (launcher.position.z - target.position.z);
    let max = (profile.max_range + add_max).clamp(min + DLZ_MIN_WINDOW, range_cap.max(min + DLZ_MIN_WINDOW));
    LaunchZone { min, max }
}

/// Arc the munition flies while turning onto the target.
fn turn_arc_length(
    profile: &LaunchProfile,
    launcher: &Kinematics,
    target: &Kinematics,
    drop_time: f64,
) -> f64 {
    let mut max_g = (GRAVITY * profile.max_torque).max(DLZ_MIN_TURN_G);
    if let Some(aoa) = profile.max_aoa {
        max_g *= aoa.to_radians().sin();
    }
    if max_g <= f64::EPSILON {
        return 0.0;
    }
    let future_time = drop_time.clamp(0.0, 2.0);
    let future_rel: DVec3 = target.predicted_position(future_time).to_dvec3()
        - launcher.predicted_position(future_time).to_dvec3();
    let turn_radius = profile.optimum_airspeed * profile.optimum_airspeed / max_g;
    let angle = angle_between_deg(launcher.forward, future_rel).unwrap_or(0.0);
    angle.to_radians() * turn_radius
}

/// Seeker cone check now and at positions extrapolated ahead.
pub fn launch_authorized(
    profile: &LaunchProfile,
    launcher: &Kinematics,
    launcher_surface: bool,
    target: &Kinematics,
    target_surface: bool,
) -> bool {
    let factor = if launcher_surface || target_surface || profile.all_aspect {
        BORESIGHT_FACTOR_WIDE
    } else {
        BORESIGHT_FACTOR_NARROW
    };
    let limit = profile.max_off_boresight * factor;

    let now = launcher.position.offset_to(&target.position);
    let Some(angle_now) = angle_between_deg(launcher.forward, now) else {
        return false;
    };
    if angle_now >= limit {
        return false;
    }

    let future = launcher
        .predicted_position(LAUNCH_EXTRAPOLATION_SECS)
        .offset_to(&target.predicted_position(LAUNCH_EXTRAPOLATION_SECS));
    angle_between_deg(launcher.forward, future).is_some_and(|a| a < limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use guardfire_core::types::{Position, Velocity};

    fn profile() -> LaunchProfile {
        LaunchProfile {
            min_range: 500.0,
            max_range: 8000.0,
            acceleration: 100.0,
            blast_radius: 20.0,
            drop_time: 0.5,
            guided: false,
            ship_launched: false,
            max_torque: 30.0,
            max_aoa: None,
            optimum_airspeed: 300.0,
            max_off_boresight: 60.0,
            all_aspect: false,
        }
    }

    fn at(x: f64, y: f64, z: f64, vel: Velocity) -> Kinematics {
        Kinematics {
            position: Position::new(x, y, z),
            velocity: vel,
            ..Default::default()
        }
    }

    #[test]
    fn test_static_window_for_stationary_target() {
        let launcher = at(0.0, 0.0, 1000.0, Velocity::default());
        let target = at(0.0, 4000.0, 1000.0, Velocity::default());
        let zone = launch_zone(&profile(), &launcher, false, &target, MAX_ENGAGEMENT_RANGE);
        assert!((zone.min - 500.0).abs() < 1e-6, "min {:.1}", zone.min);
        assert!((zone.max - 8000.0).abs() < 1e-6, "max {:.1}", zone.max);
        assert!(zone.contains(4000.0));
        assert!(!zone.contains(500.0), "Window is open at the lower bound");
    }

    #[test]
    fn test_closing_target_extends_max_range() {
        let launcher = at(0.0, 0.0, 0.0, Velocity::default());
        let target = at(0.0, 5000.0, 0.0, Velocity::new(0.0, -200.0, 0.0));
        assert!((closing_speed(&launcher, &target) - 200.0).abs() < 1e-9);
        let zone = launch_zone(&profile(), &launcher, false, &target, MAX_ENGAGEMENT_RANGE);
        assert!((zone.max - 9600.0).abs() < 1e-6, "max {:.1}", zone.max);
    }

    #[test]
    fn test_opening_target_shrinks_max_and_keeps_window() {
        let launcher = at(0.0, 0.0, 0.0, Velocity::default());
        let target = at(0.0, 5000.0, 0.0, Velocity::new(0.0, 2000.0, 0.0));
        let zone = launch_zone(&profile(), &launcher, false, &target, MAX_ENGAGEMENT_RANGE);
        assert!(zone.max >= zone.min + DLZ_MIN_WINDOW);
    }

    #[test]
    fn test_target_behind_adds_turn_arc() {
        let guided = LaunchProfile {
            guided: true,
            ..profile()
        };
        let launcher = at(0.0, 0.0, 0.0, Velocity::default());
        let target = at(0.0, -3000.0, 0.0, Velocity::default());
        let zone = launch_zone(&guided, &launcher, false, &target, MAX_ENGAGEMENT_RANGE);
        // 300²/294.3 m radius over half a turn, on top of the static minimum.
        let expected = 500.0 + std::f64::consts::PI * 300.0 * 300.0 / (GRAVITY * 30.0);
        assert!((zone.min - expected).abs() < 1e-6, "min {:.1}", zone.min);

        let surface = launch_zone(&guided, &launcher, true, &target, MAX_ENGAGEMENT_RANGE);
        assert!((surface.min - 500.0).abs() < 1e-6, "Surface launch has no arc, min {:.1}", surface.min);
    }

    #[test]
    fn test_closing_target_raises_min_range() {
        let launcher = at(0.0, 0.0, 0.0, Velocity::default());
        let target = at(0.0, 5000.0, 0.0, Velocity::new(0.0, -300.0, 0.0));
        let zone = launch_zone(&profile(), &launcher, false, &target, MAX_ENGAGEMENT_RANGE);
        // Active time 0.5 + sqrt(2 * 20 / 100) s.
        let active_time = 0.5 + (0.4f64).sqrt();
        let expected = 500.0 + 300.0 * active_time;
        assert!((zone.min - expected).abs() < 1e-6, "min {:.1}", zone.min);
        assert!(!zone.contains(800.0), "Inside blast separation of a closing target");
    }

    #[test]
    fn test_opening_target_lowers_min_range() {
        let launcher = at(0.0, 0.0, 0.0, Velocity::default());
        let target = at(0.0, 5000.0, 0.0, Velocity::new(0.0, 300.0, 0.0));
        let zone = launch_zone(&profile(), &launcher, false, &target, MAX_ENGAGEMENT_RANGE);
        assert!(zone.min < 500.0, "min {:.1}", zone.min);
        assert!(zone.min >= 0.0);
    }

    #[test]
    fn test_zone_clamped_to_cap() {
        let launcher = at(0.0, 0.0, 0.0, Velocity::default());
        let target = at(0.0, 5000.0, 0.0, Velocity::new(0.0, -200.0, 0.0));
        let zone = launch_zone(&profile(), &launcher, false, &target, 6000.0);
        assert_eq!(zone.max, 6000.0);
    }

    #[test]
    fn test_authorization_cone() {
        let launcher = at(0.0, 0.0, 1000.0, Velocity::new(0.0, 200.0, 0.0));
        let ahead = at(500.0, 4000.0, 1000.0, Velocity::default());
        assert!(launch_authorized(&profile(), &launcher, false, &ahead, false));

        // About 40 deg off the nose: outside 60 * 0.35, inside 60 * 0.75.
        let off = at(2500.0, 3000.0, 1000.0, Velocity::default());
        assert!(!launch_authorized(&profile(), &launcher, false, &off, false));
        assert!(launch_authorized(&profile(), &launcher, false, &off, true));
    }

    #[test]
    fn test_authorization_rejects_future_miss() {
        let launcher = at(0.0, 0.0, 1000.0, Velocity::default());
        // Inside the cone now, crossing out of it within two seconds.
        let crossing = at(200.0, 1000.0, 1000.0, Velocity::new(600.0, 0.0, 0.0));
        assert!(!launch_authorized(&profile(), &launcher, false, &crossing, false));
    }

    #[test]
    fn test_authorization_degenerate_geometry() {
        let launcher = at(0.0, 0.0, 0.0, Velocity::default());
        let same = at(0.0, 0.0, 0.0, Velocity::default());
        assert!(!launch_authorized(&profile(), &launcher, false, &same, false));
    }
}
