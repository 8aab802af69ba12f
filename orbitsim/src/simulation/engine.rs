//! The simulation façade handed to the surrounding application.
//!
//! `Simulation` owns the registry, the anchor lifecycle and the tick threads.
//! Everything outside the crate talks to bodies through [`BodyHandle`]s; a
//! handle whose body was replaced (anchor reset) or cleared (teardown) is
//! rejected with [`SimError::StaleHandle`].
//!
//! Lock order: anchor cell, then registry, then body locks. No path takes
//! them the other way round.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::error::SimError;
use crate::simulation::anchor;
use crate::simulation::hooks::{ImpactHooks, NoHooks};
use crate::simulation::params::{Parameters, VelocityPolicy};
use crate::simulation::scheduler::{self, Shared};
use crate::simulation::states::{
    Body, BodyFlags, BodyHandle, BodyKind, BodySnapshot, BodySpec, BodyState, NVec2,
};

/// How long teardown waits for tick loops before detaching them.
pub const DEFAULT_GRACE: Duration = Duration::from_millis(250);

/// One running world. The anchor singleton is scoped to it: two
/// simulations in one process each get their own Earth.
pub struct Simulation {
    shared: Arc<Shared>,
    anchor: Mutex<Option<Arc<Body>>>,
    workers: Mutex<Vec<(Arc<Body>, JoinHandle<()>)>>,
    rng: Mutex<ChaCha8Rng>,
}

fn relock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Simulation {
    pub fn new(params: Parameters) -> Result<Self, SimError> {
        Self::with_hooks(params, Arc::new(NoHooks))
    }

    pub fn with_hooks(params: Parameters, hooks: Arc<dyn ImpactHooks>) -> Result<Self, SimError> {
        params.validate()?;
        let rng = ChaCha8Rng::seed_from_u64(params.seed);
        Ok(Self {
            shared: Arc::new(Shared::new(params, hooks)),
            anchor: Mutex::new(None),
            workers: Mutex::new(Vec::new()),
            rng: Mutex::new(rng),
        })
    }

    pub fn params(&self) -> &Parameters {
        &self.shared.params
    }

    pub(crate) fn rng(&self) -> MutexGuard<'_, ChaCha8Rng> {
        relock(&self.rng)
    }

    fn body(&self, handle: BodyHandle) -> Result<Arc<Body>, SimError> {
        self.shared.registry.get(handle)
    }

    // ---------------------------------------------------------------------
    // Population
    // ---------------------------------------------------------------------

    /// Create and register a satellite with default flags. Each velocity
    /// axis is either fixed or drawn from the simulation's seeded RNG.
    #[allow(clippy::too_many_arguments)]
    pub fn create_body(
        &self,
        name: impl Into<String>,
        mass: f64,
        radius: f64,
        x: f64,
        y: f64,
        velocity_x: VelocityPolicy,
        velocity_y: VelocityPolicy,
    ) -> Result<BodyHandle, SimError> {
        let velocity = {
            let mut rng = self.rng();
            NVec2::new(velocity_x.sample(&mut *rng), velocity_y.sample(&mut *rng))
        };
        self.add_body(BodySpec {
            name: name.into(),
            mass,
            radius,
            position: NVec2::new(x, y),
            velocity,
            gravity_divisor: self.params().gravity_divisor,
            flags: BodyFlags::default(),
        })
    }

    /// Register a fully specified satellite.
    pub fn add_body(&self, spec: BodySpec) -> Result<BodyHandle, SimError> {
        let body = self
            .shared
            .registry
            .insert_with(|slot| Body::new(spec, BodyKind::Satellite, slot))?;
        debug!(body = %body.id(), name = body.name(), slot = body.handle().slot(), "body created");
        Ok(body.handle())
    }

    /// The anchor's handle, creating and registering it on first use.
    /// Repeated calls return the same handle until [`Simulation::reset_anchor`].
    pub fn create_anchor(&self) -> Result<BodyHandle, SimError> {
        let mut cell = relock(&self.anchor);

        if let Some(current) = cell.as_ref() {
            if self.shared.registry.get(current.handle()).is_ok() {
                return Ok(current.handle());
            }
        }

        let params = &self.shared.params;
        let earth = self
            .shared
            .registry
            .insert_with(|slot| anchor::build(params, slot))?;
        info!(body = %earth.id(), "anchor created");
        *cell = Some(Arc::clone(&earth));
        Ok(earth.handle())
    }

    /// The registered anchor, if any.
    pub fn anchor(&self) -> Option<BodyHandle> {
        let cell = relock(&self.anchor);
        cell.as_ref()
            .map(|a| a.handle())
            .filter(|h| self.shared.registry.get(*h).is_ok())
    }

    /// Replace the anchor with a fresh instance in the same registry slot.
    ///
    /// The old instance is stopped and its handle goes stale. If it was
    /// running, the new one is started. Returns the new handle, or `None`
    /// when no anchor was registered (the next `create_anchor` then builds
    /// a fresh one).
    pub fn reset_anchor(&self) -> Result<Option<BodyHandle>, SimError> {
        let mut cell = relock(&self.anchor);

        let Some(old) = cell.take() else {
            return Ok(None);
        };
        if self.shared.registry.get(old.handle()).is_err() {
            return Ok(None);
        }

        let params = &self.shared.params;
        let (old, fresh) = self
            .shared
            .registry
            .replace_with(old.handle(), |slot| anchor::build(params, slot))?;
        let was_running = old.is_running();
        old.stop();
        *cell = Some(Arc::clone(&fresh));
        drop(cell);

        info!(old = %old.id(), new = %fresh.id(), "anchor reset");

        if was_running {
            self.launch(Arc::clone(&fresh))?;
        }
        Ok(Some(fresh.handle()))
    }

    pub fn handles(&self) -> Vec<BodyHandle> {
        self.shared.registry.members().iter().map(|b| b.handle()).collect()
    }

    pub fn len(&self) -> usize {
        self.shared.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.registry.is_empty()
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    fn launch(&self, body: Arc<Body>) -> Result<bool, SimError> {
        if !body.try_claim_runner() {
            return Ok(false);
        }

        match scheduler::spawn(Arc::clone(&self.shared), Arc::clone(&body)) {
            Ok(handle) => {
                let mut workers = relock(&self.workers);
                workers.retain(|(_, w)| !w.is_finished());
                workers.push((body, handle));
                Ok(true)
            }
            Err(e) => {
                body.release_runner();
                Err(SimError::Spawn(e))
            }
        }
    }

    /// Start the body's tick loop. A no-op if it is already running or has
    /// been stopped.
    pub fn start(&self, handle: BodyHandle) -> Result<(), SimError> {
        self.launch(self.body(handle)?)?;
        Ok(())
    }

    /// Start every registered body. Returns how many loops were launched.
    pub fn start_all(&self) -> Result<usize, SimError> {
        let mut launched = 0;
        for body in self.shared.registry.members() {
            if self.launch(body)? {
                launched += 1;
            }
        }
        info!(launched, bodies = self.len(), "simulation started");
        Ok(launched)
    }

    /// Ask the body's loop to exit before its next tick. Permanent.
    pub fn stop(&self, handle: BodyHandle) -> Result<(), SimError> {
        let body = self.body(handle)?;
        if body.stop() {
            debug!(body = %body.id(), "stop requested");
        }
        Ok(())
    }

    pub fn is_running(&self, handle: BodyHandle) -> Result<bool, SimError> {
        Ok(self.body(handle)?.is_running())
    }

    pub fn is_alive(&self, handle: BodyHandle) -> Result<bool, SimError> {
        Ok(self.body(handle)?.is_alive())
    }

    /// Run one tick for the body on the calling thread, without sleeping.
    /// A stopped body is left untouched.
    pub fn step(&self, handle: BodyHandle) -> Result<(), SimError> {
        let body = self.body(handle)?;
        if body.is_alive() {
            self.shared.tick(&body, || {});
        }
        Ok(())
    }

    /// One tick for every live body, in registry order.
    pub fn step_all(&self) {
        for body in self.shared.registry.members() {
            if body.is_alive() {
                self.shared.tick(&body, || {});
            }
        }
    }

    /// Stop every body, wait up to `grace` for the loops to exit, then clear
    /// the registry. Every outstanding handle goes stale.
    pub fn teardown(&self, grace: Duration) {
        let members = self.shared.registry.members();
        for body in &members {
            body.stop();
        }
        *relock(&self.anchor) = None;

        let deadline = Instant::now() + grace;
        while members.iter().any(|b| b.is_running()) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }

        let workers = std::mem::take(&mut *relock(&self.workers));
        let mut detached = 0;
        for (body, worker) in workers {
            if body.is_running() {
                detached += 1;
                continue;
            }
            if worker.join().is_err() {
                warn!(body = %body.id(), "tick loop panicked");
            }
        }
        if detached > 0 {
            warn!(detached, "tick loops still running after grace period; detached");
        }

        let cleared = self.shared.registry.clear();
        info!(bodies = cleared.len(), "simulation torn down");
    }

    // ---------------------------------------------------------------------
    // Per-body accessors
    // ---------------------------------------------------------------------

    /// Run `f` on the body's state under its lock.
    pub fn with_state<T>(&self, handle: BodyHandle, f: impl FnOnce(&mut BodyState) -> T) -> Result<T, SimError> {
        let body = self.body(handle)?;
        let mut state = body.lock();
        Ok(f(&mut state))
    }

    pub fn flags(&self, handle: BodyHandle) -> Result<BodyFlags, SimError> {
        self.with_state(handle, |s| s.flags)
    }

    pub fn update_flags(&self, handle: BodyHandle, f: impl FnOnce(&mut BodyFlags)) -> Result<(), SimError> {
        self.with_state(handle, |s| f(&mut s.flags))
    }

    pub fn set_use_gravity(&self, handle: BodyHandle, on: bool) -> Result<(), SimError> {
        self.update_flags(handle, |f| f.use_gravity = on)
    }

    pub fn set_use_inertia(&self, handle: BodyHandle, on: bool) -> Result<(), SimError> {
        self.update_flags(handle, |f| f.use_inertia = on)
    }

    pub fn set_use_collisions(&self, handle: BodyHandle, on: bool) -> Result<(), SimError> {
        self.update_flags(handle, |f| f.use_collisions = on)
    }

    pub fn set_use_sound(&self, handle: BodyHandle, on: bool) -> Result<(), SimError> {
        self.update_flags(handle, |f| f.use_sound = on)
    }

    pub fn set_wrap_mode(&self, handle: BodyHandle, on: bool) -> Result<(), SimError> {
        self.update_flags(handle, |f| f.wrap_mode = on)
    }

    pub fn gravity_divisor(&self, handle: BodyHandle) -> Result<f64, SimError> {
        self.with_state(handle, |s| s.gravity_divisor)
    }

    pub fn set_gravity_divisor(&self, handle: BodyHandle, divisor: f64) -> Result<(), SimError> {
        if !(divisor.is_finite() && divisor > 0.0) {
            return Err(SimError::InvalidGravityDivisor(divisor));
        }
        self.with_state(handle, |s| s.gravity_divisor = divisor)
    }

    pub fn position(&self, handle: BodyHandle) -> Result<NVec2, SimError> {
        self.with_state(handle, |s| s.position())
    }

    pub fn set_position(&self, handle: BodyHandle, position: NVec2) -> Result<(), SimError> {
        self.with_state(handle, |s| s.set_position(position))
    }

    pub fn velocity(&self, handle: BodyHandle) -> Result<NVec2, SimError> {
        self.with_state(handle, |s| s.velocity)
    }

    pub fn set_velocity(&self, handle: BodyHandle, velocity: NVec2) -> Result<(), SimError> {
        self.with_state(handle, |s| s.velocity = velocity)
    }

    pub fn name(&self, handle: BodyHandle) -> Result<String, SimError> {
        Ok(self.body(handle)?.name().to_string())
    }

    pub fn kind(&self, handle: BodyHandle) -> Result<BodyKind, SimError> {
        Ok(self.body(handle)?.kind())
    }

    pub fn snapshot(&self, handle: BodyHandle) -> Result<BodySnapshot, SimError> {
        Ok(self.body(handle)?.snapshot(Instant::now()))
    }

    /// One snapshot per registered body, each taken under that body's lock.
    /// Not a consistent cut across bodies.
    pub fn snapshots(&self) -> Vec<BodySnapshot> {
        let now = Instant::now();
        self.shared
            .registry
            .members()
            .iter()
            .map(|b| b.snapshot(now))
            .collect()
    }

    // ---------------------------------------------------------------------
    // Bulk controls
    // ---------------------------------------------------------------------

    fn for_each_state(&self, mut f: impl FnMut(&Body, &mut BodyState)) {
        for body in self.shared.registry.members() {
            let mut state = body.lock();
            f(&body, &mut state);
        }
    }

    pub fn toggle_gravity_all(&self) {
        self.for_each_state(|_, s| s.flags.use_gravity = !s.flags.use_gravity);
    }

    pub fn toggle_inertia_all(&self) {
        self.for_each_state(|_, s| s.flags.use_inertia = !s.flags.use_inertia);
    }

    pub fn toggle_sound_all(&self) {
        self.for_each_state(|_, s| s.flags.use_sound = !s.flags.use_sound);
    }

    pub fn set_sound_all(&self, on: bool) {
        self.for_each_state(|_, s| s.flags.use_sound = on);
    }

    pub fn set_gravity_divisor_all(&self, divisor: f64) -> Result<(), SimError> {
        if !(divisor.is_finite() && divisor > 0.0) {
            return Err(SimError::InvalidGravityDivisor(divisor));
        }
        self.for_each_state(|_, s| s.gravity_divisor = divisor);
        info!(divisor, "gravity divisor set for all bodies");
        Ok(())
    }

    pub(crate) fn members(&self) -> Vec<Arc<Body>> {
        self.shared.registry.members()
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        if !self.shared.registry.is_empty() || !relock(&self.workers).is_empty() {
            self.teardown(DEFAULT_GRACE);
        }
    }
}
