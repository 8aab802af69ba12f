//! Core state types for the satellite simulation.
//!
//! A [`Body`] pairs immutable identity (id, registry slot, name, kind) with a
//! lock-guarded [`BodyState`] holding everything another body's tick may read
//! or write. Callers outside the crate only ever see a [`BodyHandle`].

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use nalgebra::Vector2;

use crate::error::SimError;

pub type NVec2 = Vector2<f64>;

/// Side of a body's collider relative to its radius.
pub const COLLIDER_SCALE: f64 = 1.5;

static NEXT_BODY_ID: AtomicU64 = AtomicU64::new(1);

/// Creation-sequence identity. Unique per process, strictly increasing, and
/// the total order used whenever two body locks are held at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub u64);

impl BodyId {
    pub(crate) fn next() -> Self {
        Self(NEXT_BODY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque reference to a registered body: its registry slot plus the id that
/// is expected to live there. A handle goes stale when the slot is cleared or
/// refilled by a different body (anchor reset, teardown).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle {
    slot: usize,
    id: BodyId,
}

impl BodyHandle {
    pub(crate) fn new(slot: usize, id: BodyId) -> Self {
        Self { slot, id }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn id(&self) -> BodyId {
        self.id
    }
}

impl fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body {} (slot {})", self.id, self.slot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Satellite,
    /// The immovable singleton ("Earth").
    Anchor,
}

/// Presentation color, sampled by the external renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    White,
    /// Shown for a short while after a collision.
    Cyan,
}

/// Axis-aligned square of side `radius * COLLIDER_SCALE`, centered on the
/// body's position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collider {
    center: NVec2,
    half: f64,
}

impl Collider {
    pub fn new(center: NVec2, radius: f64) -> Self {
        Self {
            center,
            half: radius * COLLIDER_SCALE * 0.5,
        }
    }

    pub fn min(&self) -> NVec2 {
        self.center - NVec2::new(self.half, self.half)
    }

    pub fn max(&self) -> NVec2 {
        self.center + NVec2::new(self.half, self.half)
    }

    pub fn center(&self) -> NVec2 {
        self.center
    }

    /// Strict overlap; touching edges do not count.
    pub fn intersects(&self, other: &Collider) -> bool {
        let (a_min, a_max) = (self.min(), self.max());
        let (b_min, b_max) = (other.min(), other.max());
        a_min.x < b_max.x && b_min.x < a_max.x && a_min.y < b_max.y && b_min.y < a_max.y
    }

    fn move_to(&mut self, center: NVec2) {
        self.center = center;
    }
}

/// Behavior switches, all changeable while the body runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyFlags {
    pub use_gravity: bool,
    pub use_inertia: bool,
    pub use_collisions: bool,
    pub use_sound: bool,
    /// Asteroids-style wraparound at the world edges.
    pub wrap_mode: bool,
}

impl Default for BodyFlags {
    fn default() -> Self {
        Self {
            use_gravity: true,
            use_inertia: true,
            use_collisions: false,
            use_sound: true,
            wrap_mode: false,
        }
    }
}

/// Everything guarded by a body's lock.
///
/// `position` is private so that every write goes through
/// [`BodyState::set_position`], which moves the collider in the same
/// critical section.
#[derive(Debug, Clone)]
pub struct BodyState {
    pub mass: f64,
    radius: f64,
    position: NVec2,
    pub velocity: NVec2,
    collider: Collider,
    pub gravity_divisor: f64,
    pub flags: BodyFlags,
    flash_until: Option<Instant>,
}

impl BodyState {
    pub fn position(&self) -> NVec2 {
        self.position
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn collider(&self) -> &Collider {
        &self.collider
    }

    pub fn set_position(&mut self, position: NVec2) {
        self.position = position;
        self.collider.move_to(position);
    }

    pub fn translate(&mut self, delta: NVec2) {
        self.set_position(self.position + delta);
    }

    /// Show the impact color until `until`.
    pub fn flash(&mut self, until: Instant) {
        self.flash_until = Some(until);
    }

    pub fn color_at(&self, now: Instant) -> Color {
        match self.flash_until {
            Some(until) if now < until => Color::Cyan,
            _ => Color::White,
        }
    }
}

/// Construction parameters for a body, validated by [`Body::new`].
#[derive(Debug, Clone)]
pub struct BodySpec {
    pub name: String,
    pub mass: f64,
    pub radius: f64,
    pub position: NVec2,
    pub velocity: NVec2,
    pub gravity_divisor: f64,
    pub flags: BodyFlags,
}

/// One simulated entity.
#[derive(Debug)]
pub struct Body {
    id: BodyId,
    slot: usize,
    name: String,
    kind: BodyKind,
    state: Mutex<BodyState>,
    keep_alive: AtomicBool,
    running: AtomicBool,
}

impl Body {
    pub(crate) fn new(spec: BodySpec, kind: BodyKind, slot: usize) -> Result<Self, SimError> {
        if !(spec.radius.is_finite() && spec.radius > 0.0) {
            return Err(SimError::InvalidRadius(spec.radius));
        }
        if !(spec.mass.is_finite() && spec.mass >= 0.0) {
            return Err(SimError::InvalidMass(spec.mass));
        }
        if !(spec.gravity_divisor.is_finite() && spec.gravity_divisor > 0.0) {
            return Err(SimError::InvalidGravityDivisor(spec.gravity_divisor));
        }

        let state = BodyState {
            mass: spec.mass,
            radius: spec.radius,
            position: spec.position,
            velocity: spec.velocity,
            collider: Collider::new(spec.position, spec.radius),
            gravity_divisor: spec.gravity_divisor,
            flags: spec.flags,
            flash_until: None,
        };

        Ok(Self {
            id: BodyId::next(),
            slot,
            name: spec.name,
            kind,
            state: Mutex::new(state),
            keep_alive: AtomicBool::new(true),
            running: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn handle(&self) -> BodyHandle {
        BodyHandle::new(self.slot, self.id)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    pub fn is_anchor(&self) -> bool {
        self.kind == BodyKind::Anchor
    }

    /// Lock this body's physical state.
    ///
    /// A panic on another thread while holding the lock leaves plain numeric
    /// data behind, so poisoning is ignored.
    pub fn lock(&self) -> MutexGuard<'_, BodyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock two distinct bodies in ascending id order. Guards come back in
    /// argument order.
    pub fn lock_pair<'a>(
        a: &'a Body,
        b: &'a Body,
    ) -> (MutexGuard<'a, BodyState>, MutexGuard<'a, BodyState>) {
        debug_assert_ne!(a.id, b.id, "lock_pair on the same body");
        if a.id < b.id {
            let ga = a.lock();
            let gb = b.lock();
            (ga, gb)
        } else {
            let gb = b.lock();
            let ga = a.lock();
            (ga, gb)
        }
    }

    pub fn is_alive(&self) -> bool {
        self.keep_alive.load(Ordering::Acquire)
    }

    /// Clear `keep_alive`. One-way; returns whether this call flipped it.
    pub fn stop(&self) -> bool {
        self.keep_alive.swap(false, Ordering::AcqRel)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Claim the right to run this body's tick loop. Fails if a loop is
    /// already running or the body has been stopped.
    pub(crate) fn try_claim_runner(&self) -> bool {
        self.is_alive()
            && self
                .running
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
    }

    pub(crate) fn release_runner(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn snapshot(&self, now: Instant) -> BodySnapshot {
        let state = self.lock();
        BodySnapshot {
            handle: self.handle(),
            name: self.name.clone(),
            position: state.position,
            radius: state.radius,
            color: state.color_at(now),
        }
    }
}

/// What the renderer samples once per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct BodySnapshot {
    pub handle: BodyHandle,
    pub name: String,
    pub position: NVec2,
    pub radius: f64,
    pub color: Color,
}
