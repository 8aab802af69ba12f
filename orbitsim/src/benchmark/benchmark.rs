use std::time::Instant;

use crate::error::SimError;
use crate::simulation::engine::Simulation;
use crate::simulation::params::{Parameters, World};
use crate::simulation::states::{BodyFlags, BodySpec, NVec2};

/// Build a simulation of `n` satellites scattered around the world center
fn make_simulation(n: usize, use_collisions: bool) -> Result<Simulation, SimError> {
    let world = World { width: 1440.0, height: 810.0 };
    let params = Parameters::new(world);
    let sim = Simulation::new(params)?;
    let (cx, cy) = world.center();

    for i in 0..n {
        let i_f = i as f64;
        // deterministic positions, no rand needed
        let position = NVec2::new(
            cx + (i_f * 0.37).sin() * 600.0,
            cy + (i_f * 0.13).cos() * 350.0,
        );
        let spec = BodySpec {
            name: format!("bench {i}"),
            mass: 2.0 + (i % 11) as f64,
            radius: 3.0 + (i % 11) as f64,
            position,
            velocity: NVec2::new((i_f * 0.07).sin() * 0.5, (i_f * 0.11).cos() * 0.5),
            gravity_divisor: sim.params().gravity_divisor,
            flags: BodyFlags {
                use_collisions,
                use_sound: false,
                ..BodyFlags::default()
            },
        };
        sim.add_body(spec)?;
    }
    Ok(sim)
}

/// Time one synchronous round of ticks (every body once), gravity only and
/// with collisions enabled. No thread ever sleeps here, so this is the
/// per-round cost of the O(N^2) passes.
pub fn bench_tick() -> Result<(), SimError> {
    let ns = [25, 50, 100, 200, 400, 800];
    let rounds = 5;

    println!("N,gravity_ms,gravity_collisions_ms");

    for n in ns {
        let plain = make_simulation(n, false)?;
        let colliding = make_simulation(n, true)?;

        // Warm up
        plain.step_all();
        colliding.step_all();

        let t0 = Instant::now();
        for _ in 0..rounds {
            plain.step_all();
        }
        let ms_plain = t0.elapsed().as_secs_f64() * 1000.0 / rounds as f64;

        let t1 = Instant::now();
        for _ in 0..rounds {
            colliding.step_all();
        }
        let ms_colliding = t1.elapsed().as_secs_f64() * 1000.0 / rounds as f64;

        println!("{},{:.6},{:.6}", n, ms_plain, ms_colliding);
    }
    Ok(())
}
