//! The anchor body ("Earth").
//!
//! Exactly one anchor is active per [`Simulation`](crate::simulation::engine::Simulation).
//! It pulls on everything, but neither gravity nor collisions ever move it.
//! The engine owns the lifecycle (lazy creation, reset); this module only
//! knows how to build a fresh one.

use crate::error::SimError;
use crate::simulation::params::Parameters;
use crate::simulation::states::{Body, BodyFlags, BodyKind, BodySpec, NVec2};

pub const ANCHOR_NAME: &str = "Earth";
pub const ANCHOR_MASS: f64 = 1074.96;
pub const ANCHOR_RADIUS: f64 = 60.0;

pub fn anchor_flags() -> BodyFlags {
    BodyFlags {
        use_gravity: true,
        use_inertia: true,
        use_collisions: false,
        use_sound: true,
        wrap_mode: false,
    }
}

/// A fresh anchor at the world center, at rest.
pub fn anchor_spec(params: &Parameters) -> BodySpec {
    let (cx, cy) = params.world.center();
    BodySpec {
        name: ANCHOR_NAME.to_string(),
        mass: ANCHOR_MASS,
        radius: ANCHOR_RADIUS,
        position: NVec2::new(cx, cy),
        velocity: NVec2::zeros(),
        gravity_divisor: params.gravity_divisor,
        flags: anchor_flags(),
    }
}

pub(crate) fn build(params: &Parameters, slot: usize) -> Result<Body, SimError> {
    Body::new(anchor_spec(params), BodyKind::Anchor, slot)
}
