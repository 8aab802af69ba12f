//! Self-motion for one body: wraparound, inertia, and measured velocity
//!
//! Velocity is never integrated from a force. Each tick the body drifts by
//! its velocity, peers push it around through gravity and collisions, and at
//! the end of the tick the net displacement becomes the next velocity:
//!
//! ```text
//! x_start  = x
//! x       += v             (inertia)
//! x       += pulls, bounces from peers (racy, any time during the tick)
//! v        = x - x_start   (measured velocity)
//! ```

use crate::simulation::params::World;
use crate::simulation::states::{BodyState, NVec2};

/// Asteroids-style wraparound. Past the far edge jumps to 0, at or below 0
/// jumps to the far edge. Returns whether the body moved.
pub fn wrap(state: &mut BodyState, world: &World) -> bool {
    let mut p = state.position();
    let before = p;

    if p.x > world.width {
        p.x = 0.0;
    } else if p.x <= 0.0 {
        p.x = world.width;
    }

    if p.y > world.height {
        p.y = 0.0;
    } else if p.y <= 0.0 {
        p.y = world.height;
    }

    if p != before {
        state.set_position(p);
        true
    } else {
        false
    }
}

/// Drift by the current velocity.
pub fn apply_inertia(state: &mut BodyState) {
    let v = state.velocity;
    state.translate(v);
}

/// Replace velocity with the displacement since `start`.
pub fn measure_velocity(state: &mut BodyState, start: NVec2) {
    state.velocity = state.position() - start;
}
