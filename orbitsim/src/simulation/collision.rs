//! Overlap detection and elastic bounce between bodies.
//!
//! ## Model
//!
//! - **Detection**: collider (AABB) intersection is the authority. The
//!   `Banded` policy puts a signed per-axis band in front of it, so only
//!   the body lying right of and below its partner reports the contact.
//! - **Response**: the 1-D elastic collision formula applied to each velocity
//!   axis independently, with no rotation into the contact normal:
//!
//! ```text
//! v1' = v1 (m1 - m2) / (m1 + m2) + v2 2 m2 / (m1 + m2)
//! v2' = v2 (m2 - m1) / (m1 + m2) + v1 2 m1 / (m1 + m2)
//! ```
//!
//! - **Closing test**: only bodies moving toward each other bounce, so a pair
//!   that is still overlapping while separating is left alone.
//! - **Anchor**: never changes velocity; only its partner bounces.
//!
//! Both participants are locked together, lower `BodyId` first.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::simulation::hooks::{impact_intensity, ImpactEvent};
use crate::simulation::params::DetectionPolicy;
use crate::simulation::states::{Body, BodyState, NVec2};

/// Post-collision velocities for masses `m1`, `m2`. `None` if the masses
/// sum to zero or the result is not finite.
pub fn elastic_bounce(v1: NVec2, v2: NVec2, m1: f64, m2: f64) -> Option<(NVec2, NVec2)> {
    let total = m1 + m2;
    if !(total.is_finite() && total > 0.0) {
        return None;
    }

    let v1_after = v1 * ((m1 - m2) / total) + v2 * (2.0 * m2 / total);
    let v2_after = v2 * ((m2 - m1) / total) + v1 * (2.0 * m1 / total);

    let finite = v1_after.iter().chain(v2_after.iter()).all(|c| c.is_finite());
    finite.then_some((v1_after, v2_after))
}

/// `true` when `a` and `b` approach each other (or are at rest relative to
/// each other).
pub fn is_closing(a: &BodyState, b: &BodyState) -> bool {
    let relative_velocity = a.velocity - b.velocity;
    let separation = b.position() - a.position();
    relative_velocity.dot(&separation) >= 0.0
}

/// `0 < a - b < r_a + r_b / 2` on both axes.
fn in_band(a: &BodyState, b: &BodyState) -> bool {
    let d = a.position() - b.position();
    let reach = a.radius() + b.radius() / 2.0;
    d.iter().all(|&c| c > 0.0 && c < reach)
}

#[derive(Debug, Clone, Copy)]
pub struct CollisionModel {
    pub policy: DetectionPolicy,
    pub flash: Duration,
}

impl CollisionModel {
    pub fn new(policy: DetectionPolicy, flash: Duration) -> Self {
        Self { policy, flash }
    }

    /// Whether invoking body `a` touches `b` under this policy.
    pub fn touching(&self, a: &BodyState, b: &BodyState) -> bool {
        if self.policy == DetectionPolicy::Banded && !in_band(a, b) {
            return false;
        }
        a.collider().intersects(b.collider())
    }

    /// Run `body`'s collision pass over `peers`, bouncing every closing
    /// overlap. Returns the side effects to deliver once locks are released.
    pub fn apply(&self, body: &Body, peers: &[Arc<Body>], now: Instant) -> Vec<ImpactEvent> {
        let mut events = Vec::new();

        for peer in peers {
            if peer.id() == body.id() || !peer.is_alive() {
                continue;
            }
            if body.is_anchor() && peer.is_anchor() {
                continue;
            }

            let (mut me, mut other) = Body::lock_pair(body, peer);

            if !self.touching(&me, &other) || !is_closing(&me, &other) {
                continue;
            }

            let Some((v_me, v_other)) = elastic_bounce(me.velocity, other.velocity, me.mass, other.mass)
            else {
                continue;
            };

            let until = now + self.flash;
            if !body.is_anchor() {
                me.velocity = v_me;
                me.flash(until);
                events.push(ImpactEvent::Flash(body.handle()));
            }
            if !peer.is_anchor() {
                other.velocity = v_other;
                other.flash(until);
                events.push(ImpactEvent::Flash(peer.handle()));
            }

            debug!(
                body = %body.id(),
                peer = %peer.id(),
                v_body = ?(me.velocity.x, me.velocity.y),
                v_peer = ?(other.velocity.x, other.velocity.y),
                "bounce"
            );

            if me.flags.use_sound {
                // The sound follows whichever side actually moved
                let (handle, struck) = if peer.is_anchor() {
                    (body.handle(), &*me)
                } else {
                    (peer.handle(), &*other)
                };
                if let Some(db) = impact_intensity((struck.velocity.x, struck.velocity.y), struck.mass) {
                    events.push(ImpactEvent::Impact(handle, db));
                }
            }
        }

        events
    }
}
