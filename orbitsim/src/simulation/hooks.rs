//! Side channels for collision events.
//!
//! The engine reports impacts to whoever renders and plays sound, but never
//! waits on them: hooks run after all body locks are released, and a panic
//! inside a hook is caught and logged.

use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

use crate::simulation::states::BodyHandle;

/// Receiver for collision side effects. Both methods default to no-ops.
pub trait ImpactHooks: Send + Sync {
    /// A body was recolored for a collision.
    fn on_flash(&self, _body: BodyHandle) {}

    /// An impact loud enough to be heard; `intensity` is a gain in dB,
    /// at most [`MAX_IMPACT_DB`].
    fn on_impact(&self, _body: BodyHandle, _intensity: f64) {}
}

/// Hooks that ignore every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl ImpactHooks for NoHooks {}

pub const MAX_IMPACT_DB: f64 = 6.0;

/// Impacts quieter than this gain are not reported.
pub const MIN_IMPACT_GAIN: f64 = 0.2;

/// Gain for a struck body moving at `velocity` with `mass`, mapped to dB and
/// clamped. `None` when the impact is too faint.
pub fn impact_intensity(velocity: (f64, f64), mass: f64) -> Option<f64> {
    let gain = (velocity.0.abs() + velocity.1.abs()) * (mass / 100.0) / 2.0;
    if !(gain.is_finite() && gain > MIN_IMPACT_GAIN) {
        return None;
    }
    Some((20.0 * gain.log10()).min(MAX_IMPACT_DB))
}

/// Queued side effect, delivered once locks are released.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImpactEvent {
    Flash(BodyHandle),
    Impact(BodyHandle, f64),
}

pub(crate) fn deliver(hooks: &dyn ImpactHooks, events: &[ImpactEvent]) {
    for event in events {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| match *event {
            ImpactEvent::Flash(body) => hooks.on_flash(body),
            ImpactEvent::Impact(body, intensity) => hooks.on_impact(body, intensity),
        }));
        if outcome.is_err() {
            warn!(?event, "impact hook panicked; event dropped");
        }
    }
}
