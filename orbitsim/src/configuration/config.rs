//! Configuration types for loading simulation scenarios from YAML.
//!
//! This module defines a thin, `serde`-deserializable representation of a
//! scenario. A scenario consists of:
//!
//! - [`WorldConfig`]      – simulation extent (wraparound, anchor placement)
//! - [`ParametersConfig`] – tick period, gravity tuning, collision policy, seed
//! - [`PopulationConfig`] – how many satellites, where, and with which flags
//! - [`BodyConfig`]       – optional hand-placed bodies
//! - [`ScenarioConfig`]   – top-level wrapper used to load a scenario from YAML
//!
//! Every field has a default, so an empty file is a valid scenario.
//!
//! # YAML format
//!
//! ```yaml
//! world:
//!   width: 1440.0
//!   height: 810.0
//!
//! parameters:
//!   gravitational_constant: 6.674
//!   tick_ms: 8               # sleep inside every body's loop
//!   gravity_divisor: 1000.0  # lower = stronger pull
//!   flash_ms: 32             # impact color duration
//!   detection: aabb          # or "banded"
//!   seed: 42
//!
//! population:
//!   satellites: 25
//!   use_earth: true
//!   use_moon: true
//!   placement: above         # all_around_beyond | all_around_inside | above | below | left | right
//!   velocity_x: -0.5         # a number, or "random"
//!   velocity_y: random
//!   wrap_mode: false
//!   use_collisions: false
//!   use_sound: true
//!
//! bodies:
//!   - name: "Comet"
//!     x: [ 100.0, 100.0 ]
//!     v: [ 1.0, 0.0 ]
//!     m: 3.0
//!     radius: 4.0
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::simulation::params::{DetectionPolicy, VelocityPolicy};
use crate::simulation::scenario::Placement;

/// Simulation extent in pixels
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct WorldConfig {
    pub width: f64,
    pub height: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 1440.0,
            height: 810.0,
        }
    }
}

/// Global numerical and physical parameters for a scenario
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ParametersConfig {
    pub gravitational_constant: f64,
    pub tick_ms: u64,
    pub gravity_divisor: f64,
    pub flash_ms: u64,
    pub detection: DetectionPolicy,
    pub seed: u64,
}

impl Default for ParametersConfig {
    fn default() -> Self {
        Self {
            gravitational_constant: crate::simulation::params::GRAVITATIONAL_CONSTANT,
            tick_ms: 8,
            gravity_divisor: crate::simulation::params::DEFAULT_GRAVITY_DIVISOR,
            flash_ms: 32,
            detection: DetectionPolicy::Aabb,
            seed: 42,
        }
    }
}

/// Initial velocity along one axis: a number, or the word `random`
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum VelocityConfig {
    Fixed(f64),
    Keyword(String),
}

impl VelocityConfig {
    pub fn to_policy(&self, field: &str) -> Result<VelocityPolicy, ConfigError> {
        match self {
            Self::Fixed(v) if v.is_finite() => Ok(VelocityPolicy::Fixed(*v)),
            Self::Fixed(v) => Err(ConfigError::invalid(field, format!("{v} is not finite"))),
            Self::Keyword(word) if word.eq_ignore_ascii_case("random") => Ok(VelocityPolicy::Random),
            Self::Keyword(word) => Err(ConfigError::invalid(
                field,
                format!("expected a number or \"random\", got \"{word}\""),
            )),
        }
    }
}

/// The generated population
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PopulationConfig {
    pub satellites: usize, // includes the moon when `use_moon` is set
    pub use_earth: bool,
    pub use_moon: bool,
    pub placement: Placement,
    pub velocity_x: VelocityConfig,
    pub velocity_y: VelocityConfig,
    pub wrap_mode: bool,
    pub use_collisions: bool,
    pub use_sound: bool,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            satellites: 25,
            use_earth: true,
            use_moon: true,
            placement: Placement::Above,
            velocity_x: VelocityConfig::Fixed(-0.5),
            velocity_y: VelocityConfig::Keyword("random".to_string()),
            wrap_mode: false,
            use_collisions: false,
            use_sound: true,
        }
    }
}

/// Configuration for a single hand-placed body
#[derive(Deserialize, Debug, Clone)]
pub struct BodyConfig {
    pub name: String,
    pub x: Vec<f64>, // initial position [x, y]
    #[serde(default)]
    pub v: Vec<f64>, // initial velocity [vx, vy], defaults to rest
    pub m: f64,      // mass
    pub radius: f64, // radius, also sizes the collider
}

/// Top-level scenario configuration loaded from YAML.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ScenarioConfig {
    pub world: WorldConfig,
    pub parameters: ParametersConfig,
    pub population: PopulationConfig,
    pub bodies: Vec<BodyConfig>,
}

impl ScenarioConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = File::open(path.as_ref())?;
        let reader = BufReader::new(file);
        let cfg: ScenarioConfig = serde_yaml::from_reader(reader)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let cfg: ScenarioConfig = serde_yaml::from_str(yaml)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Field-level checks; body-level checks (radius, mass) happen again
    /// when the bodies are created.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.world.width > 0.0 && self.world.width.is_finite()) {
            return Err(ConfigError::invalid("world.width", "must be > 0"));
        }
        if !(self.world.height > 0.0 && self.world.height.is_finite()) {
            return Err(ConfigError::invalid("world.height", "must be > 0"));
        }
        if self.parameters.tick_ms == 0 {
            return Err(ConfigError::invalid("parameters.tick_ms", "must be > 0"));
        }
        if !(self.parameters.gravity_divisor > 0.0 && self.parameters.gravity_divisor.is_finite()) {
            return Err(ConfigError::invalid("parameters.gravity_divisor", "must be > 0"));
        }
        if !self.parameters.gravitational_constant.is_finite() {
            return Err(ConfigError::invalid("parameters.gravitational_constant", "must be finite"));
        }
        self.population.velocity_x.to_policy("population.velocity_x")?;
        self.population.velocity_y.to_policy("population.velocity_y")?;

        for (i, b) in self.bodies.iter().enumerate() {
            if b.x.len() != 2 {
                return Err(ConfigError::invalid(&format!("bodies[{i}].x"), "expected [x, y]"));
            }
            if !(b.v.is_empty() || b.v.len() == 2) {
                return Err(ConfigError::invalid(&format!("bodies[{i}].v"), "expected [vx, vy]"));
            }
            if !(b.radius > 0.0 && b.radius.is_finite()) {
                return Err(ConfigError::invalid(&format!("bodies[{i}].radius"), "must be > 0"));
            }
            if !(b.m >= 0.0 && b.m.is_finite()) {
                return Err(ConfigError::invalid(&format!("bodies[{i}].m"), "must be >= 0"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = ScenarioConfig::from_yaml_str("{}").unwrap();
        assert_eq!(cfg.population.satellites, 25);
        assert_eq!(cfg.parameters.tick_ms, 8);
        assert_eq!(cfg.population.placement, Placement::Above);
        assert_eq!(
            cfg.population.velocity_y.to_policy("vy").unwrap(),
            VelocityPolicy::Random
        );
    }

    #[test]
    fn parses_full_document() {
        let yaml = r#"
world: { width: 640, height: 480 }
parameters:
  detection: banded
  seed: 7
population:
  satellites: 5
  placement: all_around_inside
  velocity_x: random
  velocity_y: 1.5
  use_collisions: true
bodies:
  - name: Comet
    x: [10, 20]
    m: 3
    radius: 4
"#;
        let cfg = ScenarioConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(cfg.world.width, 640.0);
        assert_eq!(cfg.parameters.detection, DetectionPolicy::Banded);
        assert_eq!(cfg.population.placement, Placement::AllAroundInside);
        assert_eq!(
            cfg.population.velocity_y.to_policy("vy").unwrap(),
            VelocityPolicy::Fixed(1.5)
        );
        assert!(cfg.population.use_collisions);
        assert_eq!(cfg.bodies[0].name, "Comet");
        assert!(cfg.bodies[0].v.is_empty());
    }

    #[test]
    fn rejects_bad_velocity_keyword() {
        let err = ScenarioConfig::from_yaml_str("population: { velocity_x: fast }").unwrap_err();
        assert!(err.to_string().contains("population.velocity_x"));
    }

    #[test]
    fn rejects_zero_radius_body() {
        let yaml = "bodies: [ { name: dot, x: [0, 0], m: 1, radius: 0 } ]";
        let err = ScenarioConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn rejects_zero_width() {
        assert!(ScenarioConfig::from_yaml_str("world: { width: 0, height: 10 }").is_err());
    }
}
