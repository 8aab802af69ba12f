//! Per-body tick loop.
//!
//! Every live body runs [`Shared::tick`] on its own thread roughly every
//! `params.tick`, with no barrier between bodies. One tick:
//!
//! 1. wrap at the world edges (if `wrap_mode`)
//! 2. remember the start position
//! 3. collision pass against every other live body (if `use_collisions`)
//! 4. drift by velocity (if `use_inertia`)
//! 5. gravity pass, pulling every other live body (if `use_gravity`)
//! 6. sleep
//! 7. velocity = displacement since step 2 (if `use_inertia`)
//!
//! Flags are re-read under the body's lock at each step, so a setter called
//! mid-tick takes effect at the next step.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{info, trace};

use crate::simulation::collision::CollisionModel;
use crate::simulation::forces::NewtonianGravity;
use crate::simulation::hooks::{self, ImpactHooks};
use crate::simulation::integrator;
use crate::simulation::params::Parameters;
use crate::simulation::registry::Registry;
use crate::simulation::states::Body;

/// State every tick loop reads.
pub(crate) struct Shared {
    pub registry: Registry,
    pub params: Parameters,
    pub gravity: NewtonianGravity,
    pub collisions: CollisionModel,
    pub hooks: Arc<dyn ImpactHooks>,
}

impl Shared {
    pub fn new(params: Parameters, hooks: Arc<dyn ImpactHooks>) -> Self {
        Self {
            registry: Registry::new(),
            gravity: NewtonianGravity { G: params.G },
            collisions: CollisionModel::new(params.detection, params.flash),
            params,
            hooks,
        }
    }

    /// Advance `body` by one tick. `pause` runs between the gravity pass and
    /// the velocity measurement.
    pub fn tick<P: FnOnce()>(&self, body: &Body, pause: P) {
        let (flags, start) = {
            let mut state = body.lock();
            if state.flags.wrap_mode && integrator::wrap(&mut state, &self.params.world) {
                trace!(body = %body.id(), "wrapped");
            }
            (state.flags, state.position())
        };

        let peers = self.registry.members();

        if flags.use_collisions {
            let events = self.collisions.apply(body, &peers, Instant::now());
            hooks::deliver(self.hooks.as_ref(), &events);
        }

        {
            let mut state = body.lock();
            if state.flags.use_inertia {
                integrator::apply_inertia(&mut state);
            }
        }

        if body.lock().flags.use_gravity {
            self.gravity.apply(body, &peers);
        }

        pause();

        let mut state = body.lock();
        if state.flags.use_inertia {
            integrator::measure_velocity(&mut state, start);
        }
    }
}

/// Spawn the tick loop for a body whose runner slot the caller has claimed.
pub(crate) fn spawn(shared: Arc<Shared>, body: Arc<Body>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("body-{}", body.id().0))
        .spawn(move || run(&shared, &body))
}

fn run(shared: &Shared, body: &Body) {
    info!(body = %body.id(), name = body.name(), "tick loop started");

    let mut ticks: u64 = 0;
    while body.is_alive() {
        shared.tick(body, || thread::sleep(shared.params.tick));
        ticks += 1;
    }

    body.release_runner();
    info!(body = %body.id(), name = body.name(), ticks, "tick loop exited");
}
