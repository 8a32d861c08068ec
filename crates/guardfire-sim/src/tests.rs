//! Tests for the fire-control engine: target selection, engagement
//! bookkeeping, fire scheduling, launch sequences and threat response.

use guardfire_core::components::{EntityId, Kinematics, MissileInfo, PlatformId, TeamId, VesselInfo};
use guardfire_core::config::{GuardConfig, MatcherTuning, TargetWeights, TimingConfig};
use guardfire_core::constants::{DT, MAX_ENGAGEMENT_RANGE};
use guardfire_core::enums::*;
use guardfire_core::events::{EngineEvent, Warning};
use guardfire_core::settings::{PersistedSettings, RippleOption, RipplePreferences, GUARD_CONFIG_KEY, RIPPLE_KEY};
use guardfire_core::state::TickReport;
use guardfire_core::target::TargetRecord;
use guardfire_core::types::{Position, Velocity};
use guardfire_core::weapon::*;

use crate::context::{entity_of, SimulationContext};
use crate::engine::{FireControlEngine, SettingsError, SimConfig};
use crate::sensors::{NoSensors, SensorSuite};
use crate::systems::envelope::{self, EnvelopeContext};
use crate::systems::matcher::{select_weapon, MatchContext};
use crate::systems::ripple::RippleScheduler;
use crate::systems::scoring;
use crate::systems::tasks::{BombContext, BombStep, BombTask, MissileContext, MissileStep, MissileTask};

const BLUE: TeamId = TeamId(1);
const RED: TeamId = TeamId(2);

// ---- Fixtures ----

/// Sensors with a scripted lock answer that record what they were asked.
#[derive(Default)]
struct ScriptedSensors {
    lock: bool,
    radar_enabled: u32,
    lock_attempts: Vec<(EntityId, LockKind)>,
}

impl SensorSuite for ScriptedSensors {
    fn sample(&mut self, _platform: PlatformId, _target: EntityId) -> Option<Kinematics> {
        None
    }

    fn try_lock(&mut self, _platform: PlatformId, target: EntityId, kind: LockKind) -> bool {
        self.lock_attempts.push((target, kind));
        self.lock
    }

    fn enable_radar(&mut self, _platform: PlatformId) {
        self.radar_enabled += 1;
    }

    fn rwr_sees(&self, _platform: PlatformId, _target: EntityId) -> bool {
        false
    }

    fn designated_point(&self, _platform: PlatformId, _kind: LockKind) -> Option<Position> {
        None
    }
}

fn vessel(team: TeamId, name: &str) -> VesselInfo {
    VesselInfo {
        name: name.into(),
        team,
        ..Default::default()
    }
}

fn at(x: f64, y: f64, z: f64) -> Kinematics {
    Kinematics {
        position: Position::new(x, y, z),
        ..Default::default()
    }
}

fn gun(id: u32, name: &str, max_range: f64, rpm: f64) -> WeaponDescriptor {
    WeaponDescriptor {
        id: WeaponId(id),
        name: name.into(),
        class: WeaponClass::Gun(GunSpec {
            caliber_mm: 20.0,
            bullet_mass: 0.1,
            bullet_velocity: 1000.0,
            projectiles_per_shot: 1,
            ..Default::default()
        }),
        min_range: 0.0,
        max_range,
        rpm,
        priority: 0,
        turret: None,
        readiness: Readiness::default(),
    }
}

fn radar_missile(id: u32) -> WeaponDescriptor {
    WeaponDescriptor {
        class: WeaponClass::Missile(MissileSpec {
            guidance: GuidanceMode::AirToAir,
            targeting: TargetingMode::Radar,
            thrust: 20_000.0,
            mass: 150.0,
            max_torque: 30.0,
            optimum_airspeed: 300.0,
            blast_radius: 10.0,
            min_launch_speed: 50.0,
            max_off_boresight: 60.0,
            ..Default::default()
        }),
        min_range: 500.0,
        max_range: 8000.0,
        rpm: 60.0,
        ..gun(id, "amraam", 8000.0, 60.0)
    }
}

/// Engine with one blue platform at the origin.
fn setup(weapons: Vec<WeaponDescriptor>) -> (FireControlEngine, PlatformId) {
    let mut engine = FireControlEngine::new(SimConfig::default());
    let own = engine
        .context_mut()
        .spawn_vessel(vessel(BLUE, "own"), Kinematics::default(), None);
    assert!(engine.add_platform(own, weapons));
    (engine, own)
}

/// Red vessel straight ahead, already detected by blue.
fn spawn_bandit(engine: &mut FireControlEngine, y: f64) -> EntityId {
    let ctx = engine.context_mut();
    let id = ctx.spawn_vessel(vessel(RED, "bandit"), at(0.0, y, 0.0), None);
    assert!(ctx.report_detection(BLUE, id));
    id
}

fn guard_on(engine: &mut FireControlEngine, platform: PlatformId) {
    engine.set_guard_mode(platform, true);
    engine.force_rescan(platform);
}

fn step(engine: &mut FireControlEngine, platform: PlatformId) -> TickReport {
    engine.tick(platform, DT, &mut NoSensors).unwrap()
}

fn closest_config() -> GuardConfig {
    GuardConfig {
        selection_mode: SelectionMode::ClosestWithHysteresis,
        ..Default::default()
    }
}

fn position_of(events: &[EngineEvent], wanted: &EngineEvent) -> usize {
    events
        .iter()
        .position(|e| e == wanted)
        .unwrap_or_else(|| panic!("Missing event {wanted:?} in {events:?}"))
}

// ---- Target selection ----

#[test]
fn test_closest_target_selected() {
    let (mut engine, own) = setup(vec![gun(1, "cannon", 2000.0, 600.0)]);
    engine.configure(own, closest_config()).unwrap();
    let near = spawn_bandit(&mut engine, 500.0);
    let _far = spawn_bandit(&mut engine, 1000.0);

    guard_on(&mut engine, own);
    let report = step(&mut engine, own);

    assert_eq!(report.snapshot.current_target, Some(near), "Nearest bandit should be picked");
    assert_eq!(report.snapshot.current_weapon, Some(WeaponId(1)));
    assert_eq!(report.snapshot.phase, GuardPhase::Engaging);
    assert!(report
        .events
        .contains(&EngineEvent::GuardModeChanged { platform: own, enabled: true }));
    assert!(report.events.contains(&EngineEvent::TargetChanged {
        platform: own,
        target: Some(near),
    }));
}

#[test]
fn test_idle_without_enemies() {
    let (mut engine, own) = setup(vec![gun(1, "cannon", 2000.0, 600.0)]);
    guard_on(&mut engine, own);

    for _ in 0..100 {
        let report = step(&mut engine, own);
        assert_eq!(report.snapshot.current_target, None);
        assert!(
            !report.events.iter().any(|e| matches!(e, EngineEvent::TriggerPulled { .. })),
            "Nothing to shoot at, yet a trigger was pulled"
        );
        assert_eq!(report.snapshot.phase, GuardPhase::Scanning);
    }
}

#[test]
fn test_no_weapons_no_target() {
    let (mut engine, own) = setup(Vec::new());
    spawn_bandit(&mut engine, 500.0);
    guard_on(&mut engine, own);

    for _ in 0..10 {
        let report = step(&mut engine, own);
        assert_eq!(report.snapshot.current_target, None, "Unarmed platform must not hold a target");
    }
}

#[test]
fn test_out_of_range_target_ignored() {
    let (mut engine, own) = setup(vec![gun(1, "cannon", 2000.0, 600.0)]);
    spawn_bandit(&mut engine, 50_000.0);
    guard_on(&mut engine, own);

    let report = step(&mut engine, own);
    assert_eq!(report.snapshot.current_target, None);
}

#[test]
fn test_stale_detection_needs_guard_range() {
    let (mut engine, own) = setup(vec![gun(1, "cannon", 2000.0, 600.0)]);
    let mut config = closest_config();
    config.guard_range = 100.0;
    engine.configure(own, config.clone()).unwrap();
    spawn_bandit(&mut engine, 500.0);
    // Let the only detection go stale.
    engine.tick(own, 31.0, &mut NoSensors).unwrap();
    guard_on(&mut engine, own);

    let report = step(&mut engine, own);
    assert_eq!(report.snapshot.current_target, None, "Stale contact outside guard range");

    config.guard_range = 1000.0;
    engine.configure(own, config).unwrap();
    engine.force_rescan(own);
    let report = step(&mut engine, own);
    assert!(report.snapshot.current_target.is_some(), "Contact inside guard range is visible");
}

#[test]
fn test_debilitated_target_ignored() {
    let (mut engine, own) = setup(vec![gun(1, "cannon", 2000.0, 600.0)]);
    let bandit = spawn_bandit(&mut engine, 500.0);
    let mut info = engine.context().info(bandit).unwrap();
    info.debilitated = true;
    engine.context_mut().update_info(bandit, info);
    guard_on(&mut engine, own);

    let report = step(&mut engine, own);
    assert_eq!(report.snapshot.current_target, None, "Debilitated vessels are no threat");
}

// ---- Engagement bookkeeping ----

#[test]
fn test_retarget_keeps_engagement_counts_balanced() {
    let (mut engine, own) = setup(vec![gun(1, "cannon", 2000.0, 600.0)]);
    engine.configure(own, closest_config()).unwrap();
    let near = spawn_bandit(&mut engine, 500.0);
    let far = spawn_bandit(&mut engine, 1000.0);
    guard_on(&mut engine, own);
    step(&mut engine, own);
    assert_eq!(engine.context().registry.num_friendlies_engaging(near, BLUE), 1);

    engine.set_override_target(own, far, 10.0);
    let report = step(&mut engine, own);

    assert_eq!(report.snapshot.current_target, Some(far));
    assert_eq!(report.snapshot.override_target, Some(far));
    let disengaged = position_of(&report.events, &EngineEvent::Disengaged { platform: own, target: near });
    let engaged = position_of(&report.events, &EngineEvent::Engaged { platform: own, target: far });
    let changed = position_of(
        &report.events,
        &EngineEvent::TargetChanged {
            platform: own,
            target: Some(far),
        },
    );
    assert!(disengaged < engaged && engaged < changed, "Events out of order: {:?}", report.events);

    let registry = &engine.context().registry;
    assert_eq!(registry.num_friendlies_engaging(near, BLUE), 0);
    assert_eq!(registry.num_friendlies_engaging(far, BLUE), 1);
}

#[test]
fn test_disabling_guard_releases_target() {
    let (mut engine, own) = setup(vec![gun(1, "cannon", 2000.0, 600.0)]);
    let bandit = spawn_bandit(&mut engine, 500.0);
    guard_on(&mut engine, own);
    step(&mut engine, own);
    assert_eq!(engine.snapshot(own).unwrap().current_target, Some(bandit));

    engine.set_guard_mode(own, false);
    let report = step(&mut engine, own);

    assert_eq!(report.snapshot.phase, GuardPhase::Disabled);
    assert_eq!(report.snapshot.current_target, None);
    assert!(report
        .events
        .contains(&EngineEvent::Disengaged { platform: own, target: bandit }));
    assert_eq!(engine.context().registry.num_friendlies_engaging(bandit, BLUE), 0);
}

#[test]
fn test_despawned_target_dropped() {
    let (mut engine, own) = setup(vec![gun(1, "cannon", 2000.0, 600.0)]);
    let bandit = spawn_bandit(&mut engine, 500.0);
    guard_on(&mut engine, own);
    step(&mut engine, own);

    assert!(engine.context_mut().despawn(bandit));
    let report = step(&mut engine, own);
    assert_eq!(report.snapshot.current_target, None);
    assert_eq!(report.snapshot.current_weapon, None);
}

#[test]
fn test_turret_slaves_then_fires() {
    let (mut engine, own) = setup(vec![gun(1, "cannon", 2000.0, 600.0)]);
    let bandit = spawn_bandit(&mut engine, 500.0);
    guard_on(&mut engine, own);

    let mut events = Vec::new();
    for _ in 0..40 {
        events.extend(step(&mut engine, own).events);
    }

    let autofire = position_of(
        &events,
        &EngineEvent::AutofireChanged {
            platform: own,
            group: WeaponGroupId(0),
            enabled: true,
        },
    );
    let trigger = position_of(
        &events,
        &EngineEvent::TriggerPulled {
            platform: own,
            weapon: WeaponId(1),
            target: bandit,
        },
    );
    assert!(autofire < trigger, "Trigger pulled before autofire was enabled");
}

#[test]
fn test_remove_platform_returns_shutdown_events() {
    let (mut engine, own) = setup(vec![gun(1, "cannon", 2000.0, 600.0)]);
    let bandit = spawn_bandit(&mut engine, 500.0);
    guard_on(&mut engine, own);
    step(&mut engine, own);

    let events = engine.remove_platform(own);
    assert!(events.contains(&EngineEvent::Disengaged { platform: own, target: bandit }));
    assert_eq!(engine.context().registry.num_friendlies_engaging(bandit, BLUE), 0);
    assert!(engine.snapshot(own).is_none());
    assert!(engine.tick(own, DT, &mut NoSensors).is_none(), "Removed platform still ticks");
    assert!(engine.remove_platform(own).is_empty());
}

#[test]
fn test_scene_transition_resets_context() {
    let (mut engine, own) = setup(vec![gun(1, "cannon", 2000.0, 600.0)]);
    spawn_bandit(&mut engine, 500.0);
    guard_on(&mut engine, own);
    for _ in 0..5 {
        step(&mut engine, own);
    }

    engine.on_scene_transition();

    assert!(engine.snapshot(own).is_none());
    assert!(engine.context().registry.is_empty());
    assert!(engine.context().rosters.is_empty());
    assert_eq!(engine.time().tick, 0);
    assert!(!engine.context().contains(own));
}

#[test]
fn test_add_platform_requires_vessel() {
    let mut engine = FireControlEngine::new(SimConfig::default());
    assert!(!engine.add_platform(EntityId(9999), Vec::new()));

    let own = engine
        .context_mut()
        .spawn_vessel(vessel(BLUE, "own"), Kinematics::default(), None);
    assert!(engine.add_platform(own, Vec::new()));
    assert!(!engine.add_platform(own, Vec::new()), "Adding twice must be rejected");

    let next_scan = engine.snapshot(own).unwrap().next_scan_in;
    assert!(
        (0.0..engine.default_config().scan_interval).contains(&next_scan),
        "First scan should be staggered inside one interval, got {next_scan}"
    );
}

#[test]
fn test_time_scale_applied() {
    let mut engine = FireControlEngine::new(SimConfig {
        time_scale: 2.0,
        ..Default::default()
    });
    let own = engine
        .context_mut()
        .spawn_vessel(vessel(BLUE, "own"), Kinematics::default(), None);
    engine.add_platform(own, Vec::new());

    let report = step(&mut engine, own);
    assert_eq!(report.tick, 1);
    assert!((report.elapsed_secs - 2.0 * DT).abs() < 1e-12);
}

#[test]
fn test_secondary_targets_chosen_when_multi_targeting() {
    let (mut engine, own) = setup(vec![gun(1, "cannon", 2000.0, 600.0)]);
    let config = GuardConfig {
        multi_target_count: 3,
        ..closest_config()
    };
    engine.configure(own, config).unwrap();
    let near = spawn_bandit(&mut engine, 500.0);
    let mid = spawn_bandit(&mut engine, 1000.0);
    let _far = spawn_bandit(&mut engine, 5000.0);

    guard_on(&mut engine, own);
    let report = step(&mut engine, own);

    assert_eq!(report.snapshot.current_target, Some(near));
    assert_eq!(
        report.snapshot.secondary_targets,
        vec![mid],
        "Out-of-range bandit has no weapon and is not a secondary"
    );
    assert!(report.events.contains(&EngineEvent::SecondaryTargetsChanged {
        platform: own,
        targets: vec![mid],
    }));
}

// ---- Override target ----

#[test]
fn test_override_expires() {
    let (mut engine, own) = setup(Vec::new());
    let bandit = spawn_bandit(&mut engine, 500.0);
    engine.set_override_target(own, bandit, 1.0);

    for _ in 0..10 {
        step(&mut engine, own);
    }
    assert_eq!(engine.snapshot(own).unwrap().override_target, Some(bandit));

    for _ in 0..50 {
        step(&mut engine, own);
    }
    assert_eq!(
        engine.snapshot(own).unwrap().override_target,
        None,
        "Override should expire after its duration"
    );
}

#[test]
fn test_unengageable_override_dropped() {
    let (mut engine, own) = setup(vec![gun(1, "cannon", 2000.0, 600.0)]);
    let unreachable = spawn_bandit(&mut engine, 50_000.0);
    guard_on(&mut engine, own);
    engine.set_override_target(own, unreachable, 10.0);

    let report = step(&mut engine, own);
    assert_eq!(report.snapshot.override_target, None);
    assert_eq!(report.snapshot.current_target, None);
}

#[test]
fn test_invalid_override_duration_uses_default() {
    let (mut engine, own) = setup(Vec::new());
    let bandit = spawn_bandit(&mut engine, 500.0);
    engine.set_override_target(own, bandit, f64::NAN);
    step(&mut engine, own);

    let forced = engine.platform_state(own).unwrap().override_target.unwrap();
    let expected = TimingConfig::default().override_duration;
    assert!((forced.expires_at - expected).abs() < 1e-9);
}

// ---- Fire scheduling ----

fn cannons(count: u32, rpm: f64) -> Vec<WeaponDescriptor> {
    (1..=count).map(|id| gun(id, "cannon", 2000.0, rpm)).collect()
}

fn rippling_prefs() -> RipplePreferences {
    let mut prefs = RipplePreferences::default();
    prefs.set("cannon", RippleOption { enabled: true, rpm: 650.0 });
    prefs
}

#[test]
fn test_ripple_delay_from_combined_rate() {
    let mut prefs = rippling_prefs();
    let scheduler = RippleScheduler::build(&cannons(2, 300.0), &mut prefs);
    let group = scheduler.group(WeaponGroupId(0)).unwrap();
    assert_eq!(group.size(), 2);
    assert!((group.combined_rpm - 600.0).abs() < 1e-9);
    assert!((group.delay() - 0.1).abs() < 1e-9, "Expected 0.1 s, got {}", group.delay());
    assert!(group.is_rippling());
}

#[test]
fn test_ripple_cycles_one_instance_per_window() {
    let mut prefs = rippling_prefs();
    let mut scheduler = RippleScheduler::build(&cannons(2, 300.0), &mut prefs);
    let ready = [WeaponId(1), WeaponId(2)];
    let group = scheduler.group_mut(WeaponGroupId(0)).unwrap();

    assert_eq!(group.fire(0.0, 0, &ready), vec![WeaponId(1)]);
    assert!(group.fire(0.0, 0, &ready).is_empty(), "Two pulses in one tick");
    assert!(group.fire(0.05, 1, &ready).is_empty(), "Pulse inside the delay window");
    assert_eq!(group.fire(0.1, 2, &ready), vec![WeaponId(2)]);
    assert_eq!(group.fire(0.2, 3, &ready), vec![WeaponId(1)]);
}

#[test]
fn test_ripple_skips_unready_slot() {
    let mut prefs = rippling_prefs();
    let mut scheduler = RippleScheduler::build(&cannons(3, 300.0), &mut prefs);
    let group = scheduler.group_mut(WeaponGroupId(0)).unwrap();

    assert_eq!(group.fire(0.0, 0, &[WeaponId(2), WeaponId(3)]), vec![WeaponId(2)]);
    assert_eq!(group.index(), 2);
    assert!(group.fire(1.0, 1, &[]).is_empty());
}

#[test]
fn test_ripple_off_fires_everything_ready() {
    let mut prefs = RipplePreferences::default();
    let mut scheduler = RippleScheduler::build(&cannons(3, 300.0), &mut prefs);
    let group = scheduler.group_mut(WeaponGroupId(0)).unwrap();
    assert!(!group.is_rippling());
    assert_eq!(
        group.fire(0.0, 0, &[WeaponId(1), WeaponId(3)]),
        vec![WeaponId(1), WeaponId(3)]
    );
    assert_eq!(prefs.get("cannon"), Some(RippleOption::default()), "Default preference stored");
}

#[test]
fn test_fast_guns_never_ripple() {
    let mut prefs = rippling_prefs();
    let mut scheduler = RippleScheduler::build(&cannons(2, 1800.0), &mut prefs);
    let group = scheduler.group_mut(WeaponGroupId(0)).unwrap();
    assert!(!group.can_ripple());
    assert_eq!(group.fire(0.0, 0, &[WeaponId(1), WeaponId(2)]).len(), 2);
}

#[test]
fn test_rebuild_clamps_index() {
    let mut prefs = rippling_prefs();
    let mut scheduler = RippleScheduler::build(&cannons(3, 300.0), &mut prefs);
    {
        let group = scheduler.group_mut(WeaponGroupId(0)).unwrap();
        let all = [WeaponId(1), WeaponId(2), WeaponId(3)];
        group.advance(&all);
        group.advance(&all);
        assert_eq!(group.index(), 2);
    }

    let rebuilt = scheduler.rebuild(&cannons(2, 300.0), &mut prefs);
    let group = rebuilt.group(WeaponGroupId(0)).unwrap();
    assert_eq!(group.size(), 2);
    assert_eq!(group.index(), 1);
    assert!(group.option.enabled, "Preference survives the rebuild");
}

#[test]
fn test_structural_change_drops_missing_weapon() {
    let (mut engine, own) = setup(cannons(3, 300.0));
    {
        let state = engine.platform_state_mut(own).unwrap();
        let group = state.ripple.group_mut(WeaponGroupId(0)).unwrap();
        let all = [WeaponId(1), WeaponId(2), WeaponId(3)];
        group.advance(&all);
        group.advance(&all);
        state.current_weapon = Some(WeaponId(3));
        state.weapon_kind = Some(WeaponKind::Gun);
    }

    assert!(engine.on_structural_change(own, cannons(2, 300.0)));

    let state = engine.platform_state(own).unwrap();
    assert_eq!(state.current_weapon, None);
    assert_eq!(state.weapon_kind, None);
    assert!(state.force_rescan);
    assert_eq!(state.ripple.group(WeaponGroupId(0)).unwrap().index(), 1);
    assert!(!engine.on_structural_change(EntityId(9999), Vec::new()));
}

#[test]
fn test_set_ripple_command() {
    let (mut engine, own) = setup(cannons(2, 300.0));
    engine.set_ripple(own, "cannon", RippleOption { enabled: true, rpm: -5.0 });
    let report = step(&mut engine, own);

    let ripple = &report.snapshot.ripple[0];
    assert!(ripple.enabled);
    assert_eq!(ripple.size, 2);
    assert_eq!(
        engine.ripple_preferences().get("cannon").map(|o| o.rpm),
        Some(650.0),
        "Invalid rate should fall back to the default"
    );
}

// ---- Envelope and matcher ----

fn envelope_run(weapon: &WeaponDescriptor, own: &Kinematics, target: &TargetRecord, tuning: &MatcherTuning) -> bool {
    let ctx = EnvelopeContext {
        own,
        own_situation: Situation::Flying,
        target,
        distance: own.position.range_to(&target.kinematics.position),
        tuning,
        unlimited_ammo: false,
        range_cap: MAX_ENGAGEMENT_RANGE,
    };
    envelope::check(weapon, &ctx).feasible
}

#[test]
fn test_envelope_monotonic_in_range() {
    let tuning = MatcherTuning::default();
    let own = Kinematics::default();
    let weapon = gun(1, "cannon", 2000.0, 600.0);
    let mut lost = false;
    for i in 1..60 {
        let target = TargetRecord::new(EntityId(7), VesselInfo::default(), at(0.0, i as f64 * 50.0, 0.0));
        let feasible = envelope_run(&weapon, &own, &target, &tuning);
        assert!(!(lost && feasible), "Feasible again at {} m after dropping out", i * 50);
        lost |= !feasible;
    }
    assert!(lost, "Gun never ran out of range");
}

fn missile_record(id: u64, y: f64) -> TargetRecord {
    let info = VesselInfo {
        team: RED,
        is_missile: true,
        ..Default::default()
    };
    TargetRecord::new(EntityId(id), info, at(0.0, y, 0.0))
}

fn pick_against(weapons: &[WeaponDescriptor], target: &TargetRecord) -> Option<WeaponId> {
    pick_from(weapons, &Kinematics::default(), Situation::Flying, target)
}

fn pick_from(
    weapons: &[WeaponDescriptor],
    own: &Kinematics,
    own_situation: Situation,
    target: &TargetRecord,
) -> Option<WeaponId> {
    let tuning = MatcherTuning::default();
    let ctx = MatchContext {
        envelope: EnvelopeContext {
            own,
            own_situation,
            target,
            distance: own.position.range_to(&target.kinematics.position),
            tuning: &tuning,
            unlimited_ammo: false,
            range_cap: MAX_ENGAGEMENT_RANGE,
        },
        gun_range: 2500.0,
        missiles_away: 0,
        max_missiles: 1,
        rwr_sees_target: false,
    };
    select_weapon(weapons, &ctx).weapon
}

#[test]
fn test_laser_preferred_against_missiles() {
    let laser = WeaponDescriptor {
        class: WeaponClass::Laser(LaserSpec {
            power: 10.0,
            electrolaser: false,
        }),
        ..gun(2, "laser", 3000.0, 60.0)
    };
    let weapons = vec![gun(1, "cannon", 2000.0, 600.0), laser];
    assert_eq!(pick_against(&weapons, &missile_record(7, 800.0)), Some(WeaponId(2)));
}

#[test]
fn test_gun_beats_contact_rocket_against_missiles() {
    let rocket = WeaponDescriptor {
        class: WeaponClass::Rocket(RocketSpec {
            acceleration: 300.0,
            blast_radius: 5.0,
            fuze: FuzeType::Impact,
        }),
        ..gun(2, "hydra", 2000.0, 600.0)
    };
    let weapons = vec![gun(1, "cannon", 2000.0, 600.0), rocket];
    assert_eq!(pick_against(&weapons, &missile_record(7, 800.0)), Some(WeaponId(1)));
}

#[test]
fn test_empty_inventory_selects_nothing() {
    assert_eq!(pick_against(&[], &missile_record(7, 800.0)), None);
}

fn ship(id: u64, situation: Situation, position: Position, velocity: Velocity) -> TargetRecord {
    let info = VesselInfo {
        team: RED,
        situation,
        radius: 10.0,
        ..Default::default()
    };
    let kinematics = Kinematics {
        position,
        velocity,
        ..Default::default()
    };
    TargetRecord::new(EntityId(id), info, kinematics)
}

fn bomb_with(id: u32, guidance: GuidanceMode, blast_radius: f64, cluster_count: u32) -> WeaponDescriptor {
    WeaponDescriptor {
        class: WeaponClass::Bomb(BombSpec {
            blast_radius,
            guidance,
            cluster_count,
            ..Default::default()
        }),
        ..gun(id, "bomb", 5000.0, 60.0)
    }
}

fn slw(id: u32, kind: SlwKind, drop_time: f64) -> WeaponDescriptor {
    WeaponDescriptor {
        class: WeaponClass::Slw(SlwSpec {
            kind,
            blast_radius: 10.0,
            targeting: TargetingMode::None,
            drop_time,
        }),
        ..gun(id, "slw", 3000.0, 30.0)
    }
}

#[test]
fn test_surface_ladder_follows_target_motion() {
    let own = at(0.0, 0.0, 1000.0);
    let weapons = vec![
        bomb_with(2, GuidanceMode::AirToGround, 20.0, 10),
        bomb_with(1, GuidanceMode::Unguided, 60.0, 1),
    ];

    let parked = ship(7, Situation::Splashed, Position::new(0.0, 1500.0, 0.0), Velocity::default());
    assert_eq!(
        pick_from(&weapons, &own, Situation::Flying, &parked),
        Some(WeaponId(1)),
        "Stationary target should get the dumb bomb"
    );

    let moving = ship(7, Situation::Splashed, Position::new(0.0, 1500.0, 0.0), Velocity::new(15.0, 0.0, 0.0));
    assert_eq!(
        pick_from(&weapons, &own, Situation::Flying, &moving),
        Some(WeaponId(2)),
        "Moving target should get the guided cluster bomb"
    );
}

#[test]
fn test_air_dropped_torpedo_used_against_ships() {
    let own = at(0.0, 0.0, 300.0);
    let target = ship(7, Situation::Splashed, Position::new(0.0, 1500.0, 0.0), Velocity::default());

    let air_dropped = vec![slw(1, SlwKind::Torpedo, 1.5)];
    assert_eq!(pick_from(&air_dropped, &own, Situation::Flying, &target), Some(WeaponId(1)));

    let ship_only = vec![slw(1, SlwKind::Torpedo, 0.0)];
    assert_eq!(pick_from(&ship_only, &own, Situation::Flying, &target), None);
    assert_eq!(pick_from(&ship_only, &at(0.0, 0.0, 0.0), Situation::Splashed, &target), Some(WeaponId(1)));
}

#[test]
fn test_submerged_ladder_depth_charge_then_torpedo() {
    let weapons = vec![slw(1, SlwKind::Torpedo, 0.0), slw(2, SlwKind::DepthCharge, 0.0)];
    let sub = ship(7, Situation::Submerged, Position::new(0.0, 500.0, -50.0), Velocity::default());

    let surfaced = at(0.0, 0.0, 0.0);
    assert_eq!(
        pick_from(&weapons, &surfaced, Situation::Splashed, &sub),
        Some(WeaponId(2)),
        "Depth charges while above the target"
    );

    let deep = at(0.0, 0.0, -100.0);
    assert_eq!(
        pick_from(&weapons, &deep, Situation::Submerged, &sub),
        Some(WeaponId(1)),
        "Torpedoes once below the target"
    );

    let torpedo_only = vec![slw(1, SlwKind::Torpedo, 0.0)];
    assert_eq!(pick_from(&torpedo_only, &surfaced, Situation::Splashed, &sub), Some(WeaponId(1)));
}

#[test]
fn test_air_ladder_missile_when_flying_gun_when_landed() {
    let mut missile = radar_missile(2);
    if let WeaponClass::Missile(spec) = &mut missile.class {
        spec.min_launch_speed = 0.0;
    }
    let weapons = vec![gun(1, "cannon", 4000.0, 600.0), missile];
    let bandit = ship(7, Situation::Flying, Position::new(0.0, 1500.0, 0.0), Velocity::default());

    let flying = Kinematics {
        velocity: Velocity::new(0.0, 250.0, 0.0),
        ..Default::default()
    };
    assert_eq!(pick_from(&weapons, &flying, Situation::Flying, &bandit), Some(WeaponId(2)));

    let taxiing = Kinematics {
        velocity: Velocity::new(0.0, 5.0, 0.0),
        ..Default::default()
    };
    assert_eq!(
        pick_from(&weapons, &taxiing, Situation::Landed, &bandit),
        Some(WeaponId(1)),
        "Landed platforms keep guns inside gun range"
    );
}

#[test]
fn test_missile_not_launched_outside_seeker_cone() {
    let timing = TimingConfig::default();
    let weapon = radar_missile(1);
    let own = Kinematics {
        velocity: Velocity::new(0.0, 250.0, 0.0),
        ..Default::default()
    };
    // About 40 deg off the nose, outside 60 * 0.35.
    let off_nose = TargetRecord::new(EntityId(7), vessel(RED, "bandit"), at(2500.0, 3000.0, 0.0));
    let mut events = Vec::new();
    let mut task = MissileTask::start(EntityId(1), &weapon, WeaponGroupId(0), off_nose.id, 0.0, 3.0, None, &timing, &mut events);
    let mut sensors = ScriptedSensors {
        lock: true,
        ..Default::default()
    };

    let poll = |task: &mut MissileTask, now: f64, target: &TargetRecord, sensors: &mut ScriptedSensors| {
        let ctx = MissileContext {
            platform: EntityId(1),
            now,
            own: &own,
            own_surface: false,
            target,
            weapon: &weapon,
            missiles_away: 0,
            max_missiles: 1,
            timing: &timing,
        };
        task.poll(&ctx, sensors)
    };

    assert_eq!(poll(&mut task, 0.0, &off_nose, &mut sensors), MissileStep::Waiting, "Locked but not authorized");
    assert_eq!(
        poll(&mut task, timing.radar_lock_timeout, &off_nose, &mut sensors),
        MissileStep::Finished { fired: false }
    );
    assert!(!sensors.lock_attempts.is_empty());

    let ahead = TargetRecord::new(EntityId(7), vessel(RED, "bandit"), at(0.0, 3000.0, 0.0));
    let mut task = MissileTask::start(EntityId(1), &weapon, WeaponGroupId(0), ahead.id, 0.0, 3.0, None, &timing, &mut events);
    assert_eq!(poll(&mut task, 0.0, &ahead, &mut sensors), MissileStep::Launch);
}

// ---- Scoring ----

#[test]
fn test_range_term_bounds() {
    assert_eq!(scoring::range_term(0.0, 1000.0), 1.0);
    assert_eq!(scoring::range_term(1000.0, 1000.0), 0.0);
    assert_eq!(scoring::range_term(5000.0, 1000.0), 0.0);
    assert_eq!(scoring::range_term(500.0, 0.0), 0.0, "Unknown weapon range scores nothing");
}

#[test]
fn test_friendlies_term_discourages_piling_on() {
    assert_eq!(scoring::friendlies_term(0, 0), 0.0);
    assert_eq!(scoring::friendlies_term(1, 3), 1.0);
    assert!(scoring::friendlies_term(3, 3) < scoring::friendlies_term(2, 3));
}

fn two_bandits() -> (TargetRecord, TargetRecord) {
    let mut near = TargetRecord::new(EntityId(7), vessel(RED, "near"), at(0.0, 300.0, 0.0));
    near.engaged_by.insert(BLUE, vec![EntityId(50), EntityId(51)]);
    let far = TargetRecord::new(EntityId(8), vessel(RED, "far"), at(0.0, 900.0, 0.0));
    (near, far)
}

fn pick_by_mode(mode: SelectionMode, weights: &TargetWeights, candidates: &[&TargetRecord]) -> Option<EntityId> {
    let own = Kinematics::default();
    let ctx = scoring::ScoringContext {
        platform: EntityId(1),
        team: BLUE,
        own: &own,
        own_mass: 1000.0,
        own_weapon_count: 1,
        current_target: None,
        incoming_threat: None,
        threatened: false,
        max_weapon_range: 2000.0,
        teammates: 3,
        team_vips: &[],
        weights,
        target_bias: 1.0,
    };
    scoring::select_by_mode(mode, candidates, &ctx)
}

#[test]
fn test_selection_modes_dispatch() {
    let (near, far) = two_bandits();
    let candidates = [&near, &far];
    let defaults = TargetWeights::default();

    assert_eq!(
        pick_by_mode(SelectionMode::ClosestWithHysteresis, &defaults, &candidates),
        Some(near.id)
    );
    assert_eq!(
        pick_by_mode(SelectionMode::LeastEngaged, &defaults, &candidates),
        Some(far.id),
        "Two friendlies already on the near bandit"
    );

    let by_range = TargetWeights {
        range: 1.0,
        aod: 0.0,
        friendlies_engaging: 0.0,
        ..Default::default()
    };
    assert_eq!(pick_by_mode(SelectionMode::WeightedPriority, &by_range, &candidates), Some(near.id));

    let by_friendlies = TargetWeights {
        aod: 0.0,
        friendlies_engaging: 1.0,
        ..Default::default()
    };
    assert_eq!(
        pick_by_mode(SelectionMode::WeightedPriority, &by_friendlies, &candidates),
        Some(far.id)
    );
}

// ---- Registry ----

#[test]
fn test_registry_engagement_bookkeeping() {
    let mut ctx = SimulationContext::new(7);
    let bandit = ctx.spawn_vessel(vessel(RED, "bandit"), at(0.0, 500.0, 0.0), None);
    let own = EntityId(1);

    assert!(!ctx.registry.engage(bandit, BLUE, own), "Unknown targets cannot be engaged");
    assert!(ctx.report_detection(BLUE, bandit));
    assert!(ctx.registry.engage(bandit, BLUE, own));
    assert!(!ctx.registry.engage(bandit, BLUE, own), "Engaging twice is a no-op");
    assert_eq!(ctx.registry.num_friendlies_engaging(bandit, BLUE), 1);

    assert!(!ctx.registry.disengage(bandit, BLUE, EntityId(2)));
    assert!(ctx.registry.disengage(bandit, BLUE, own));
    assert_eq!(ctx.registry.num_friendlies_engaging(bandit, BLUE), 0);
}

#[test]
fn test_registry_refresh_drops_despawned() {
    let mut ctx = SimulationContext::new(7);
    let bandit = ctx.spawn_vessel(vessel(RED, "bandit"), at(0.0, 500.0, 0.0), None);
    ctx.report_detection(BLUE, bandit);
    assert_eq!(ctx.registry.len(), 1);

    let entity = entity_of(bandit).unwrap();
    ctx.world.despawn(entity).unwrap();
    ctx.registry.refresh(&ctx.world);
    assert!(ctx.registry.is_empty());
}

#[test]
fn test_registry_visibility_memory() {
    let mut ctx = SimulationContext::new(7);
    let bandit = ctx.spawn_vessel(vessel(RED, "bandit"), at(0.0, 5000.0, 0.0), None);
    ctx.report_detection(BLUE, bandit);
    let origin = Position::default();

    assert!(ctx.registry.can_see(BLUE, bandit, 29.0, 3.0, &origin, 0.0));
    assert!(!ctx.registry.can_see(BLUE, bandit, 31.0, 3.0, &origin, 0.0), "Detection went stale");
    assert!(ctx.registry.can_see(BLUE, bandit, 31.0, 3.0, &origin, 6000.0), "Inside guard range");
    assert!(!ctx.registry.can_see(RED, bandit, 1.0, 3.0, &origin, 0.0));
}

#[test]
fn test_projectiles_tracked_on_spawn() {
    let mut ctx = SimulationContext::new(7);
    let missile = ctx.spawn_vessel(
        vessel(RED, "missile"),
        at(0.0, 500.0, 0.0),
        Some(MissileInfo {
            source: None,
            target: Some(EntityId(1)),
            kind: IncomingKind::Heat,
        }),
    );
    assert!(ctx.registry.contains(missile));
    assert_eq!(ctx.registry.targets(BLUE).count(), 0, "Tracking is not a detection");
}

#[test]
fn test_depth_reclassifies_situation() {
    let mut ctx = SimulationContext::new(7);
    let sub = ctx.spawn_vessel(
        VesselInfo {
            situation: Situation::Splashed,
            ..vessel(RED, "sub")
        },
        at(0.0, 0.0, 0.0),
        None,
    );
    ctx.update_kinematics(sub, at(0.0, 0.0, -50.0));
    assert_eq!(ctx.info(sub).unwrap().situation, Situation::Submerged);
    ctx.update_kinematics(sub, at(0.0, 0.0, 0.0));
    assert_eq!(ctx.info(sub).unwrap().situation, Situation::Splashed);
}

// ---- Launch sequences ----

#[test]
fn test_radar_missile_launch_sequence() {
    let mut engine = FireControlEngine::new(SimConfig::default());
    let own_kin = Kinematics {
        velocity: Velocity::new(0.0, 250.0, 0.0),
        ..Default::default()
    };
    let own = engine
        .context_mut()
        .spawn_vessel(vessel(BLUE, "own"), own_kin, None);
    engine.add_platform(own, vec![radar_missile(1)]);
    let bandit = spawn_bandit(&mut engine, 4000.0);
    guard_on(&mut engine, own);

    let mut sensors = ScriptedSensors {
        lock: true,
        ..Default::default()
    };
    let report = engine.tick(own, DT, &mut sensors).unwrap();

    let radar = position_of(&report.events, &EngineEvent::RadarRequested { platform: own });
    let lock = position_of(
        &report.events,
        &EngineEvent::LockRequested {
            platform: own,
            target: bandit,
            kind: LockKind::Radar,
        },
    );
    let launch = position_of(
        &report.events,
        &EngineEvent::MissileLaunched {
            platform: own,
            weapon: WeaponId(1),
            target: bandit,
        },
    );
    assert!(radar < lock && lock < launch, "Events out of order: {:?}", report.events);
    assert!(sensors.radar_enabled > 0);
    assert_eq!(sensors.lock_attempts, vec![(bandit, LockKind::Radar)]);
    assert_eq!(report.snapshot.missiles_away, 1);
    assert_eq!(report.snapshot.phase, GuardPhase::Cooldown);

    let report = engine.tick(own, DT, &mut sensors).unwrap();
    assert!(!report.snapshot.firing_missile, "Single launch should release the lock");
    assert!(
        !report.events.iter().any(|e| matches!(e, EngineEvent::MissileLaunched { .. })),
        "Only one missile allowed on target"
    );
}

#[test]
fn test_missile_without_lock_times_out() {
    let mut engine = FireControlEngine::new(SimConfig::default());
    let own_kin = Kinematics {
        velocity: Velocity::new(0.0, 250.0, 0.0),
        ..Default::default()
    };
    let own = engine
        .context_mut()
        .spawn_vessel(vessel(BLUE, "own"), own_kin, None);
    engine.add_platform(own, vec![radar_missile(1)]);
    spawn_bandit(&mut engine, 4000.0);
    guard_on(&mut engine, own);

    let mut sensors = ScriptedSensors::default();
    let mut launched = false;
    for _ in 0..150 {
        let report = engine.tick(own, DT, &mut sensors).unwrap();
        launched |= report.events.iter().any(|e| matches!(e, EngineEvent::MissileLaunched { .. }));
    }
    assert!(!launched, "Launched without a lock");
    assert!(sensors.lock_attempts.len() > 1, "Lock should be retried");
}

fn bomb(id: u32) -> WeaponDescriptor {
    WeaponDescriptor {
        class: WeaponClass::Bomb(BombSpec {
            blast_radius: 20.0,
            cluster_count: 1,
            ..Default::default()
        }),
        ..gun(id, "mk82", 5000.0, 60.0)
    }
}

#[test]
fn test_bomb_released_after_aim_point_passes() {
    let timing = TimingConfig::default();
    let target = TargetRecord::new(EntityId(7), vessel(RED, "depot"), at(0.0, 1000.0, 0.0));
    let mut task = BombTask::start(&bomb(1), WeaponGroupId(0), target.id, 0.0, 3.0, 1, 0.06, &timing);
    assert_eq!(task.radius(), timing.bomb_min_radius);

    let own_at = |y: f64| Kinematics {
        position: Position::new(0.0, y, 490.5),
        velocity: Velocity::new(0.0, 100.0, 0.0),
        ..Default::default()
    };
    let mut events = Vec::new();
    let mut poll = |task: &mut BombTask, now: f64, y: f64, away: u32| {
        let own = own_at(y);
        let ctx = BombContext {
            platform: EntityId(1),
            now,
            own: &own,
            target: &target,
            missiles_away: away,
            max_missiles: 1,
            timing: &timing,
        };
        task.poll(&ctx, &mut events)
    };

    assert_eq!(poll(&mut task, 0.0, -20.0, 0), BombStep::Waiting);
    assert_eq!(poll(&mut task, 0.1, 0.0, 0), BombStep::Waiting, "Aim point still closing");
    assert_eq!(poll(&mut task, 0.2, 10.0, 0), BombStep::Release);
    task.released(0.2);
    assert_eq!(poll(&mut task, 0.22, 12.0, 0), BombStep::Waiting);
    assert_eq!(poll(&mut task, 0.3, 20.0, 1), BombStep::Finished { released: true });
    assert_eq!(task.releases(), 1);
    assert!(events.is_empty());
}

#[test]
fn test_bomb_follow_on_release_needs_aim_point_in_radius() {
    let timing = TimingConfig::default();
    let target = TargetRecord::new(EntityId(7), vessel(RED, "depot"), at(0.0, 1000.0, 0.0));
    let mut task = BombTask::start(&bomb(1), WeaponGroupId(0), target.id, 0.0, 3.0, 4, 0.06, &timing);
    assert_eq!(task.radius(), timing.bomb_min_radius);

    let mut events = Vec::new();
    let mut poll = |task: &mut BombTask, now: f64, y: f64, away: u32| {
        let own = Kinematics {
            position: Position::new(0.0, y, 490.5),
            velocity: Velocity::new(0.0, 100.0, 0.0),
            ..Default::default()
        };
        let ctx = BombContext {
            platform: EntityId(1),
            now,
            own: &own,
            target: &target,
            missiles_away: away,
            max_missiles: 4,
            timing: &timing,
        };
        task.poll(&ctx, &mut events)
    };

    assert_eq!(poll(&mut task, 0.0, 0.0, 0), BombStep::Waiting);
    assert_eq!(poll(&mut task, 0.1, 10.0, 0), BombStep::Release);
    task.released(0.1);
    assert_eq!(poll(&mut task, 0.2, 20.0, 1), BombStep::Release, "Second bomb inside the radius");
    task.released(0.2);

    // Aim point 2 km past the target
    let step = poll(&mut task, 2.0, 2000.0, 2);
    assert_eq!(step, BombStep::Waiting, "Released with the aim point outside the radius");
    assert_eq!(task.releases(), 2);
    assert!(events.is_empty());
}

#[test]
fn test_bomb_overshoot_requests_extend() {
    let timing = TimingConfig::default();
    let target = TargetRecord::new(EntityId(7), vessel(RED, "depot"), at(0.0, 0.0, 0.0));
    let mut task = BombTask::start(&bomb(1), WeaponGroupId(0), target.id, 0.0, 3.0, 1, 0.06, &timing);
    let own = Kinematics {
        position: Position::new(0.0, 200.0, 490.5),
        velocity: Velocity::new(0.0, 100.0, 0.0),
        ..Default::default()
    };
    let ctx = BombContext {
        platform: EntityId(1),
        now: 0.0,
        own: &own,
        target: &target,
        missiles_away: 0,
        max_missiles: 1,
        timing: &timing,
    };
    let mut events = Vec::new();
    assert_eq!(task.poll(&ctx, &mut events), BombStep::Finished { released: false });
    assert_eq!(
        events,
        vec![EngineEvent::ExtendRequested {
            platform: EntityId(1),
            target: target.id,
        }]
    );
}

// ---- Threat response ----

struct Wingmen {
    engine: FireControlEngine,
    lead: PlatformId,
    wing: PlatformId,
    shooter: EntityId,
}

/// Two blue platforms, with a red shooter firing at the lead.
fn wingmen_under_fire() -> Wingmen {
    let mut engine = FireControlEngine::new(SimConfig::default());
    let ctx = engine.context_mut();
    let lead = ctx.spawn_vessel(vessel(BLUE, "lead"), Kinematics::default(), None);
    let wing = ctx.spawn_vessel(vessel(BLUE, "wing"), at(100.0, 0.0, 0.0), None);
    let shooter = ctx.spawn_vessel(vessel(RED, "shooter"), at(0.0, 2000.0, 0.0), None);
    ctx.report_detection(BLUE, shooter);
    ctx.spawn_vessel(
        vessel(RED, "round"),
        Kinematics {
            position: Position::new(0.0, 200.0, 0.0),
            velocity: Velocity::new(0.0, -800.0, 0.0),
            ..Default::default()
        },
        Some(MissileInfo {
            source: Some(shooter),
            target: Some(lead),
            kind: IncomingKind::DirectFire,
        }),
    );
    engine.add_platform(lead, Vec::new());
    engine.add_platform(wing, Vec::new());
    Wingmen {
        engine,
        lead,
        wing,
        shooter,
    }
}

fn report_for(reports: &[TickReport], platform: PlatformId) -> &TickReport {
    reports
        .iter()
        .find(|r| r.snapshot.platform == platform)
        .unwrap_or_else(|| panic!("No report for {platform:?}"))
}

#[test]
fn test_direct_fire_requests_help() {
    let Wingmen {
        mut engine,
        lead,
        wing,
        shooter,
    } = wingmen_under_fire();

    let reports = engine.tick_all(DT, &mut NoSensors);
    let lead_report = report_for(&reports, lead);
    assert!(lead_report.events.contains(&EngineEvent::HelpRequested {
        platform: lead,
        ally: wing,
        target: shooter,
    }));
    assert!(lead_report.snapshot.under_fire);
    assert_eq!(engine.pending_commands(), 1, "Request waits for the next tick boundary");
    assert_eq!(engine.snapshot(wing).unwrap().override_target, None);

    let reports = engine.tick_all(DT, &mut NoSensors);
    assert_eq!(report_for(&reports, wing).snapshot.override_target, Some(shooter));
    assert!(
        !report_for(&reports, lead)
            .events
            .iter()
            .any(|e| matches!(e, EngineEvent::HelpRequested { .. })),
        "Help should not be requested again for the same shooter"
    );
}

#[test]
fn test_busy_ally_swaps_targets() {
    let Wingmen {
        mut engine,
        lead,
        wing,
        shooter,
    } = wingmen_under_fire();
    let other = engine
        .context_mut()
        .spawn_vessel(vessel(RED, "other"), at(0.0, 3000.0, 0.0), None);
    engine.context_mut().report_detection(BLUE, other);
    engine.platform_state_mut(lead).unwrap().current_target = Some(shooter);
    engine.platform_state_mut(wing).unwrap().current_target = Some(other);

    engine.tick_all(DT, &mut NoSensors);
    assert_eq!(engine.pending_commands(), 2);

    engine.tick_all(DT, &mut NoSensors);
    assert_eq!(engine.snapshot(lead).unwrap().override_target, Some(other));
    assert_eq!(engine.snapshot(wing).unwrap().override_target, Some(shooter));
}

#[test]
fn test_lone_platform_cannot_request_help() {
    let Wingmen { mut engine, lead, wing, .. } = wingmen_under_fire();
    engine.remove_platform(wing);

    let reports = engine.tick_all(DT, &mut NoSensors);
    let lead_report = report_for(&reports, lead);
    assert!(!lead_report
        .events
        .iter()
        .any(|e| matches!(e, EngineEvent::HelpRequested { .. })));
    assert_eq!(engine.pending_commands(), 0);
}

#[test]
fn test_incoming_missile_raises_warning() {
    let (mut engine, own) = setup(Vec::new());
    engine.context_mut().spawn_vessel(
        VesselInfo {
            is_missile: true,
            ..vessel(RED, "missile")
        },
        Kinematics {
            position: Position::new(0.0, 3000.0, 0.0),
            velocity: Velocity::new(0.0, -600.0, 0.0),
            ..Default::default()
        },
        Some(MissileInfo {
            source: None,
            target: Some(own),
            kind: IncomingKind::Heat,
        }),
    );

    let report = step(&mut engine, own);
    assert!(report.snapshot.missile_incoming);
    assert!(report.events.iter().any(|e| matches!(
        e,
        EngineEvent::WarningChanged {
            warning: Warning::MissileIncoming,
            active: true,
            ..
        }
    )));
}

// ---- Settings ----

#[test]
fn test_settings_survive_save_and_load() {
    let (mut engine, own) = setup(cannons(2, 300.0));
    engine.set_ripple(own, "cannon", RippleOption { enabled: true, rpm: 300.0 });
    step(&mut engine, own);
    let saved = engine.save_settings();
    assert_eq!(saved.get(RIPPLE_KEY), Some("cannon,true,300;"));
    assert!(saved.get(GUARD_CONFIG_KEY).is_some());

    let (mut restored, other) = setup(cannons(2, 300.0));
    restored.load_settings(&saved).unwrap();
    assert_eq!(
        restored.ripple_preferences().get("cannon"),
        Some(RippleOption { enabled: true, rpm: 300.0 })
    );
    assert!(restored.snapshot(other).unwrap().ripple[0].enabled);
    assert_eq!(restored.default_config(), engine.default_config());
}

#[test]
fn test_bad_settings_change_nothing() {
    let (mut engine, _own) = setup(cannons(2, 300.0));
    let mut settings = PersistedSettings::default();
    settings.set(GUARD_CONFIG_KEY, "{not json".to_string());
    settings.set(RIPPLE_KEY, "flak,true,100;".to_string());

    let result = engine.load_settings(&settings);
    assert!(matches!(result, Err(SettingsError::Config(_))), "Got {result:?}");
    assert_eq!(engine.ripple_preferences().get("flak"), None);

    let mut settings = PersistedSettings::default();
    settings.set(RIPPLE_KEY, "flak,maybe,100;".to_string());
    assert!(matches!(engine.load_settings(&settings), Err(SettingsError::Ripple(_))));
}

#[test]
fn test_loaded_config_applies_to_platforms() {
    let (mut engine, own) = setup(Vec::new());
    let config = GuardConfig {
        scan_interval: 5.0,
        ..Default::default()
    };
    let mut settings = PersistedSettings::default();
    settings.set(GUARD_CONFIG_KEY, config.to_json().unwrap());

    engine.load_settings(&settings).unwrap();
    assert_eq!(engine.default_config().scan_interval, 5.0);
    assert_eq!(engine.platform_state(own).unwrap().config.scan_interval, 5.0);
}

// ---- Determinism ----

fn duel(seed: u64) -> FireControlEngine {
    let mut engine = FireControlEngine::new(SimConfig {
        seed,
        ..Default::default()
    });
    let ctx = engine.context_mut();
    let blue = ctx.spawn_vessel(vessel(BLUE, "blue"), Kinematics::default(), None);
    let red = ctx.spawn_vessel(
        vessel(RED, "red"),
        Kinematics {
            position: Position::new(0.0, 800.0, 0.0),
            forward: -glam::DVec3::Y,
            ..Default::default()
        },
        None,
    );
    ctx.report_detection(BLUE, red);
    ctx.report_detection(RED, blue);
    engine.add_platform(blue, cannons(2, 300.0));
    engine.add_platform(red, cannons(2, 300.0));
    engine.set_guard_mode(blue, true);
    engine.set_guard_mode(red, true);
    engine
}

#[test]
fn test_determinism_same_seed() {
    let mut engine_a = duel(12345);
    let mut engine_b = duel(12345);

    for _ in 0..300 {
        let reports_a = engine_a.tick_all(DT, &mut NoSensors);
        let reports_b = engine_b.tick_all(DT, &mut NoSensors);
        let json_a = serde_json::to_string(&reports_a).unwrap();
        let json_b = serde_json::to_string(&reports_b).unwrap();
        assert_eq!(json_a, json_b, "Reports diverged with same seed");
    }
}

#[test]
fn test_determinism_different_seeds() {
    let mut engine_a = duel(111);
    let mut engine_b = duel(222);

    let json_a = serde_json::to_string(&engine_a.tick_all(DT, &mut NoSensors)).unwrap();
    let json_b = serde_json::to_string(&engine_b.tick_all(DT, &mut NoSensors)).unwrap();
    assert_ne!(json_a, json_b, "Scan staggering should depend on the seed");
}

#[test]
fn test_duel_both_sides_fire() {
    let mut engine = duel(42);
    let mut triggers = 0;
    for _ in 0..300 {
        for report in engine.tick_all(DT, &mut NoSensors) {
            triggers += report
                .events
                .iter()
                .filter(|e| matches!(e, EngineEvent::TriggerPulled { .. }))
                .count();
        }
    }
    assert!(triggers > 0, "Neither side fired within 6 s");
}
