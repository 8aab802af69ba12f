//! Numerical and physical parameters for the simulation
//!
//! `Parameters` holds runtime settings:
//! - world extent (wraparound bounds, anchor placement),
//! - tick period of every body's loop,
//! - gravitational constant and default gravity divisor,
//! - flash duration and collision detection policy,
//! - random seed for population setup

use std::time::Duration;

use rand::Rng;
use serde::Deserialize;

use crate::error::SimError;

/// Simulation-scale gravitational constant. Tuned for pixel distances and
/// masses in the 1..1000 range, not physically exact.
pub const GRAVITATIONAL_CONSTANT: f64 = 6.674;

/// Default per-body gravity divisor. Smaller is a stronger pull.
pub const DEFAULT_GRAVITY_DIVISOR: f64 = 1000.0;

pub const DEFAULT_TICK: Duration = Duration::from_millis(8);

pub const DEFAULT_FLASH: Duration = Duration::from_millis(32);

/// How a collision pass decides two bodies touch.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DetectionPolicy {
    /// Collider intersection only.
    #[default]
    Aabb,
    /// Signed per-axis band before the collider test: the invoking body
    /// must sit past its partner on both axes by less than
    /// `r_self + r_other / 2`.
    Banded,
}

/// Initial velocity along one axis for a newly created body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VelocityPolicy {
    Fixed(f64),
    /// Uniform in [-0.5, 0.5).
    Random,
}

impl VelocityPolicy {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match *self {
            Self::Fixed(v) => v,
            Self::Random => (rng.gen::<f64>() * 2.0 - 1.0) * 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct World {
    pub width: f64,
    pub height: f64,
}

impl World {
    pub fn new(width: f64, height: f64) -> Result<Self, SimError> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(SimError::InvalidWorld { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }
}

#[derive(Debug, Clone)]
#[allow(non_snake_case)]
pub struct Parameters {
    pub world: World,
    pub tick: Duration, // sleep between a body's gravity pass and velocity measurement
    pub G: f64, // gravitational constant
    pub gravity_divisor: f64, // default divisor for new bodies
    pub flash: Duration, // impact color duration
    pub detection: DetectionPolicy,
    pub seed: u64, // deterministic seed for population setup
}

impl Parameters {
    pub fn new(world: World) -> Self {
        Self {
            world,
            tick: DEFAULT_TICK,
            G: GRAVITATIONAL_CONSTANT,
            gravity_divisor: DEFAULT_GRAVITY_DIVISOR,
            flash: DEFAULT_FLASH,
            detection: DetectionPolicy::default(),
            seed: 42,
        }
    }

    pub fn validate(&self) -> Result<(), SimError> {
        World::new(self.world.width, self.world.height)?;
        if self.tick.is_zero() {
            return Err(SimError::InvalidTickPeriod);
        }
        if !(self.gravity_divisor.is_finite() && self.gravity_divisor > 0.0) {
            return Err(SimError::InvalidGravityDivisor(self.gravity_divisor));
        }
        Ok(())
    }
}
