use orbitsim::simulation::engine::DEFAULT_GRACE;
use orbitsim::{
    BodyFlags, BodyHandle, BodySpec, Color, ImpactHooks, NVec2, Parameters, Scenario, ScenarioConfig,
    SimError, Simulation, World,
};

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Default parameters for tests: an 800 x 600 world centered on (400, 300)
pub fn test_params() -> Parameters {
    let mut p = Parameters::new(World::new(800.0, 600.0).unwrap());
    p.tick = Duration::from_millis(2);
    p.flash = Duration::from_secs(10);
    p
}

/// Flags for a body that only reacts to what others do to it
pub fn passive_flags() -> BodyFlags {
    BodyFlags {
        use_gravity: false,
        use_inertia: false,
        use_collisions: false,
        use_sound: false,
        wrap_mode: false,
    }
}

pub fn spec(name: &str, mass: f64, radius: f64, x: [f64; 2], v: [f64; 2], flags: BodyFlags) -> BodySpec {
    BodySpec {
        name: name.to_string(),
        mass,
        radius,
        position: x.into(),
        velocity: v.into(),
        gravity_divisor: 1000.0,
        flags,
    }
}

/// Two equal satellites mirrored about the anchor, plus the anchor itself
pub fn mirrored_pair(sim: &Simulation) -> (BodyHandle, BodyHandle, BodyHandle) {
    let earth = sim.create_anchor().unwrap();
    let a = sim.add_body(spec("a", 2.0, 3.0, [300.0, 200.0], [0.0, 0.0], passive_flags())).unwrap();
    let b = sim.add_body(spec("b", 2.0, 3.0, [500.0, 400.0], [0.0, 0.0], passive_flags())).unwrap();
    (earth, a, b)
}

/// Two bodies overlapping on the x axis and moving toward each other
pub fn head_on_pair(sim: &Simulation, mass: f64, sound: bool) -> (BodyHandle, BodyHandle) {
    let flags = BodyFlags {
        use_collisions: true,
        use_sound: sound,
        ..passive_flags()
    };
    let a = sim.add_body(spec("left", mass, 10.0, [100.0, 100.0], [1.0, 0.0], flags)).unwrap();
    let b = sim.add_body(spec("right", mass, 10.0, [110.0, 100.0], [-1.0, 0.0], flags)).unwrap();
    (a, b)
}

fn assert_close(a: NVec2, b: NVec2) {
    assert!((a - b).norm() < 1e-9, "{a:?} != {b:?}");
}

#[derive(Default)]
struct Recorder {
    flashes: Mutex<Vec<BodyHandle>>,
    impacts: Mutex<Vec<(BodyHandle, f64)>>,
}

impl ImpactHooks for Recorder {
    fn on_flash(&self, body: BodyHandle) {
        self.flashes.lock().unwrap().push(body);
    }

    fn on_impact(&self, body: BodyHandle, intensity: f64) {
        self.impacts.lock().unwrap().push((body, intensity));
    }
}

struct Exploding;

impl ImpactHooks for Exploding {
    fn on_flash(&self, _body: BodyHandle) {
        panic!("renderer went away");
    }
}

// ==================================================================================
// Gravity tests
// ==================================================================================

#[test]
fn anchor_pulls_mirrored_pair_symmetrically() {
    let sim = Simulation::new(test_params()).unwrap();
    let (earth, a, b) = mirrored_pair(&sim);
    let center = NVec2::new(400.0, 300.0);

    let mut last = (sim.position(a).unwrap() - center).norm();
    for _ in 0..20 {
        sim.step(earth).unwrap();
        let pa = sim.position(a).unwrap();
        let pb = sim.position(b).unwrap();

        // mirror images about the center
        assert_close(pa + pb, center * 2.0);

        let d = (pa - center).norm();
        assert!(d < last, "pair is not converging: {d} >= {last}");
        last = d;
    }
    assert_eq!(sim.position(earth).unwrap(), center);
}

#[test]
fn free_pair_converges_when_every_body_ticks() {
    let sim = Simulation::new(test_params()).unwrap();
    sim.create_anchor().unwrap();
    let a = sim.add_body(spec("a", 2.0, 3.0, [300.0, 200.0], [0.0, 0.0], BodyFlags::default())).unwrap();
    let b = sim.add_body(spec("b", 2.0, 3.0, [500.0, 400.0], [0.0, 0.0], BodyFlags::default())).unwrap();

    let separation = || (sim.position(a).unwrap() - sim.position(b).unwrap()).norm();
    let mut last = separation();
    for _ in 0..50 {
        sim.step_all();
        let d = separation();
        assert!(d < last, "pair is not converging: {d} >= {last}");
        last = d;
    }
}

#[test]
fn gravity_and_inertia_off_never_moves() {
    let sim = Simulation::new(test_params()).unwrap();
    let h = sim.add_body(spec("still", 5.0, 4.0, [50.0, 60.0], [3.0, -2.0], passive_flags())).unwrap();
    for _ in 0..10 {
        sim.step(h).unwrap();
    }
    assert_eq!(sim.position(h).unwrap(), NVec2::new(50.0, 60.0));
}

#[test]
fn anchor_is_never_moved_by_gravity() {
    let sim = Simulation::new(test_params()).unwrap();
    let earth = sim.create_anchor().unwrap();
    let heavy = BodyFlags { use_gravity: true, ..passive_flags() };
    let h = sim.add_body(spec("heavy", 5000.0, 5.0, [100.0, 100.0], [0.0, 0.0], heavy)).unwrap();
    sim.set_gravity_divisor(earth, 1.0).unwrap();

    for _ in 0..10 {
        sim.step(h).unwrap();
        sim.step(earth).unwrap();
    }
    assert_eq!(sim.position(earth).unwrap(), NVec2::new(400.0, 300.0));
    assert_eq!(sim.velocity(earth).unwrap(), NVec2::zeros());
    assert_ne!(sim.position(h).unwrap(), NVec2::new(100.0, 100.0));
}

#[test]
fn larger_divisor_means_smaller_pull() {
    let sim = Simulation::new(test_params()).unwrap();
    let earth = sim.create_anchor().unwrap();
    let strong = sim.add_body(spec("strong", 2.0, 3.0, [200.0, 100.0], [0.0, 0.0], passive_flags())).unwrap();
    let weak = sim.add_body(spec("weak", 2.0, 3.0, [600.0, 500.0], [0.0, 0.0], passive_flags())).unwrap();
    sim.set_gravity_divisor(weak, 5000.0).unwrap();

    sim.step(earth).unwrap();

    let d_strong = (sim.position(strong).unwrap() - NVec2::new(200.0, 100.0)).norm();
    let d_weak = (sim.position(weak).unwrap() - NVec2::new(600.0, 500.0)).norm();
    assert!(d_weak > 0.0);
    assert!((d_strong / d_weak - 5.0).abs() < 1e-9);
}

#[test]
fn inertia_turns_displacement_into_velocity() {
    let sim = Simulation::new(test_params()).unwrap();
    let drifting = BodyFlags { use_inertia: true, ..passive_flags() };
    let h = sim.add_body(spec("drift", 2.0, 3.0, [100.0, 100.0], [1.5, -0.5], drifting)).unwrap();

    sim.step(h).unwrap();
    sim.step(h).unwrap();

    assert_close(sim.position(h).unwrap(), NVec2::new(103.0, 99.0));
    assert_close(sim.velocity(h).unwrap(), NVec2::new(1.5, -0.5));
}

// ==================================================================================
// Collision tests
// ==================================================================================

#[test]
fn head_on_equal_masses_swap_velocities() {
    let sim = Simulation::new(test_params()).unwrap();
    let (a, b) = head_on_pair(&sim, 5.0, false);

    sim.step(a).unwrap();

    assert_close(sim.velocity(a).unwrap(), NVec2::new(-1.0, 0.0));
    assert_close(sim.velocity(b).unwrap(), NVec2::new(1.0, 0.0));
    assert_eq!(sim.snapshot(a).unwrap().color, Color::Cyan);
    assert_eq!(sim.snapshot(b).unwrap().color, Color::Cyan);

    // now separating: a second pass leaves them alone
    sim.step(a).unwrap();
    assert_close(sim.velocity(a).unwrap(), NVec2::new(-1.0, 0.0));
}

#[test]
fn collision_with_anchor_moves_only_the_satellite() {
    let sim = Simulation::new(test_params()).unwrap();
    let earth = sim.create_anchor().unwrap();
    let flags = BodyFlags { use_collisions: true, ..passive_flags() };
    let sat = sim.add_body(spec("sat", 5.0, 10.0, [450.0, 300.0], [-1.0, 0.0], flags)).unwrap();

    sim.step(sat).unwrap();

    assert!(sim.velocity(sat).unwrap().x > 0.0);
    assert_eq!(sim.velocity(earth).unwrap(), NVec2::zeros());
    assert_eq!(sim.position(earth).unwrap(), NVec2::new(400.0, 300.0));
    assert_eq!(sim.snapshot(earth).unwrap().color, Color::White);
    assert_eq!(sim.snapshot(sat).unwrap().color, Color::Cyan);
}

#[test]
fn collisions_off_means_no_bounce() {
    let sim = Simulation::new(test_params()).unwrap();
    let (a, b) = head_on_pair(&sim, 5.0, false);
    sim.set_use_collisions(a, false).unwrap();

    sim.step(a).unwrap();

    assert_eq!(sim.velocity(a).unwrap(), NVec2::new(1.0, 0.0));
    assert_eq!(sim.velocity(b).unwrap(), NVec2::new(-1.0, 0.0));
    assert_eq!(sim.snapshot(a).unwrap().color, Color::White);
}

#[test]
fn hooks_receive_flashes_and_impact() {
    let recorder = Arc::new(Recorder::default());
    let sim = Simulation::with_hooks(test_params(), recorder.clone()).unwrap();
    let (a, b) = head_on_pair(&sim, 50.0, true);

    sim.step(a).unwrap();

    assert_eq!(*recorder.flashes.lock().unwrap(), vec![a, b]);
    let impacts = recorder.impacts.lock().unwrap();
    assert_eq!(impacts.len(), 1);
    assert_eq!(impacts[0].0, b);
    assert!(impacts[0].1 <= 6.0);
}

#[test]
fn panicking_hook_does_not_break_the_tick() {
    let sim = Simulation::with_hooks(test_params(), Arc::new(Exploding)).unwrap();
    let (a, b) = head_on_pair(&sim, 5.0, false);

    sim.step(a).unwrap();

    assert_close(sim.velocity(b).unwrap(), NVec2::new(1.0, 0.0));
}

// ==================================================================================
// Anchor and lifecycle tests
// ==================================================================================

#[test]
fn anchor_is_a_singleton_until_reset() {
    let sim = Simulation::new(test_params()).unwrap();
    let first = sim.create_anchor().unwrap();
    assert_eq!(sim.create_anchor().unwrap(), first);
    assert_eq!(sim.name(first).unwrap(), "Earth");

    sim.set_position(first, NVec2::new(10.0, 10.0)).unwrap();
    let second = sim.reset_anchor().unwrap().unwrap();

    assert_ne!(first, second);
    assert!(matches!(sim.position(first), Err(SimError::StaleHandle(_))));
    assert_eq!(sim.position(second).unwrap(), NVec2::new(400.0, 300.0));
    assert_eq!(sim.create_anchor().unwrap(), second);
    assert_eq!(sim.len(), 1);
}

#[test]
fn wrap_mode_teleports_across_edges() {
    let sim = Simulation::new(test_params()).unwrap();
    let wrapping = BodyFlags { wrap_mode: true, ..passive_flags() };
    let right = sim.add_body(spec("right", 2.0, 3.0, [801.0, 50.0], [0.0, 0.0], wrapping)).unwrap();
    let top = sim.add_body(spec("top", 2.0, 3.0, [50.0, 0.0], [0.0, 0.0], wrapping)).unwrap();
    let inside = sim.add_body(spec("inside", 2.0, 3.0, [800.0, 600.0], [0.0, 0.0], wrapping)).unwrap();

    sim.step_all();

    assert_eq!(sim.position(right).unwrap(), NVec2::new(0.0, 50.0));
    assert_eq!(sim.position(top).unwrap(), NVec2::new(50.0, 600.0));
    assert_eq!(sim.position(inside).unwrap(), NVec2::new(800.0, 600.0));
}

#[test]
fn threads_start_once_and_stop_for_good() {
    let sim = Simulation::new(test_params()).unwrap();
    let (earth, a, _b) = mirrored_pair(&sim);

    assert_eq!(sim.start_all().unwrap(), 3);
    assert_eq!(sim.start_all().unwrap(), 0);
    sim.start(a).unwrap();
    assert!(sim.is_running(a).unwrap());

    thread::sleep(Duration::from_millis(50));
    assert_ne!(sim.position(a).unwrap(), NVec2::new(300.0, 200.0));

    sim.stop(a).unwrap();
    let deadline = Instant::now() + Duration::from_secs(2);
    while sim.is_running(a).unwrap() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    assert!(!sim.is_running(a).unwrap());
    assert!(!sim.is_alive(a).unwrap());

    // stopped is permanent
    sim.start(a).unwrap();
    assert!(!sim.is_running(a).unwrap());
    assert!(sim.is_running(earth).unwrap());

    sim.teardown(DEFAULT_GRACE);
    assert!(sim.is_empty());
    assert!(matches!(sim.is_running(earth), Err(SimError::StaleHandle(_))));
}

#[test]
fn crowded_colliding_threads_stay_finite_and_tear_down() {
    let mut params = test_params();
    params.world = World::new(200.0, 200.0).unwrap();
    let sim = Simulation::new(params).unwrap();
    sim.create_anchor().unwrap();

    let flags = BodyFlags {
        use_collisions: true,
        wrap_mode: true,
        use_sound: false,
        ..BodyFlags::default()
    };
    // 40 bodies on a tight grid: neighbours' colliders overlap from the start
    for i in 0..40 {
        let (col, row) = ((i % 8) as f64, (i / 8) as f64);
        let v = [if i % 2 == 0 { 0.4 } else { -0.4 }, if i % 3 == 0 { 0.3 } else { -0.3 }];
        sim.add_body(spec("rock", 2.0 + (i % 5) as f64, 5.0, [60.0 + col * 6.0, 80.0 + row * 6.0], v, flags))
            .unwrap();
    }

    assert_eq!(sim.start_all().unwrap(), 41);
    thread::sleep(Duration::from_secs(1));

    for snap in sim.snapshots() {
        assert!(snap.position.iter().all(|c| c.is_finite()), "{} went non-finite", snap.name);
    }

    let started = Instant::now();
    sim.teardown(DEFAULT_GRACE);
    assert!(started.elapsed() < DEFAULT_GRACE + Duration::from_secs(1));
    assert!(sim.is_empty());
}

#[test]
fn reset_anchor_restarts_a_running_anchor() {
    let sim = Simulation::new(test_params()).unwrap();
    let old = sim.create_anchor().unwrap();
    sim.start(old).unwrap();

    let new = sim.reset_anchor().unwrap().unwrap();

    assert!(sim.is_running(new).unwrap());
    assert!(matches!(sim.is_running(old), Err(SimError::StaleHandle(_))));
    sim.teardown(DEFAULT_GRACE);
}

// ==================================================================================
// Scenario tests
// ==================================================================================

#[test]
fn bundled_scenarios_load_and_populate() {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios");

    let cfg = ScenarioConfig::from_path(dir.join("default.yaml")).unwrap();
    let scenario = Scenario::build_scenario(cfg).unwrap();
    let sim = Simulation::new(scenario.parameters.clone()).unwrap();
    assert_eq!(scenario.populate(&sim).unwrap().len(), 26);

    let cfg = ScenarioConfig::from_path(dir.join("asteroids.yaml")).unwrap();
    let scenario = Scenario::build_scenario(cfg).unwrap();
    let sim = Simulation::new(scenario.parameters.clone()).unwrap();
    let handles = scenario.populate(&sim).unwrap();

    // Earth + 40 satellites + 2 hand-placed
    assert_eq!(handles.len(), 43);
    let comet = handles[41];
    assert_eq!(sim.name(comet).unwrap(), "Comet");
    assert_eq!(sim.velocity(comet).unwrap(), NVec2::new(1.0, 0.0));
    assert!(sim.flags(comet).unwrap().wrap_mode);
}

#[test]
fn missing_scenario_file_is_an_io_error() {
    let err = ScenarioConfig::from_path("/nonexistent/nowhere.yaml").unwrap_err();
    assert!(matches!(err, orbitsim::ConfigError::Io(_)));
}
