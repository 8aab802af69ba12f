//! Pairwise gravity for the satellite engine
//!
//! A body's gravity pass moves every *other* live body toward it in place.
//! There is no acceleration buffer: the pull is applied straight to the
//! target's position, and the target's tick later measures the displacement
//! as velocity (see `integrator`).

use std::sync::Arc;

use tracing::warn;

use crate::simulation::states::{Body, BodyId, BodyState, NVec2};

/// What a gravity pass needs to know about the body doing the pulling,
/// copied out under its lock so the pass never holds two body locks.
#[derive(Debug, Clone, Copy)]
pub struct Attractor {
    pub id: BodyId,
    pub position: NVec2,
    pub mass: f64,
    pub radius: f64,
}

impl Attractor {
    pub fn capture(body: &Body) -> Self {
        let state = body.lock();
        Self {
            id: body.id(),
            position: state.position(),
            mass: state.mass,
            radius: state.radius(),
        }
    }
}

/// Newtonian-style pull, `G * m / d^2`, scaled by the target's divisor
#[allow(non_snake_case)]
#[derive(Debug, Clone, Copy)]
pub struct NewtonianGravity {
    pub G: f64, // gravitational constant
}

impl NewtonianGravity {
    /// Displacement the attractor imposes on `target` this tick, or `None`
    /// when the pair is exempt.
    pub fn displacement(&self, attractor: &Attractor, target: &BodyState) -> Option<NVec2> {
        // r points from the target toward the attractor
        let r = attractor.position - target.position();
        let distance = r.norm();

        // Coincident (or corrupted) positions: skip the pair
        if !(distance.is_finite() && distance > 0.0) {
            return None;
        }

        // Near-field exclusion: only pull when the two are apart by more than
        // the sum of radii on *both* axes
        let reach = attractor.radius + target.radius();
        if r.x.abs() <= reach || r.y.abs() <= reach {
            return None;
        }

        // Pull of the attractor's mass at this distance
        let pull = self.G * attractor.mass / (distance * distance);

        // The divisor damps the applied displacement, not the pull itself
        let delta = r * (pull / target.gravity_divisor);

        if delta.iter().all(|c| c.is_finite()) {
            Some(delta)
        } else {
            warn!(attractor = %attractor.id, "discarding non-finite gravity displacement");
            None
        }
    }

    /// Run `body`'s gravity pass over `peers`. Returns how many peers moved.
    ///
    /// Each peer is locked alone; the anchor and stopped bodies are never
    /// moved.
    pub fn apply(&self, body: &Body, peers: &[Arc<Body>]) -> usize {
        let attractor = Attractor::capture(body);
        let mut moved = 0;

        for peer in peers {
            if peer.id() == attractor.id || peer.is_anchor() || !peer.is_alive() {
                continue;
            }

            let mut state = peer.lock();
            if let Some(delta) = self.displacement(&attractor, &state) {
                state.translate(delta);
                moved += 1;
            }
        }

        moved
    }
}
